//! Patch Archive - 아카이브 메타데이터 읽기
//!
//! 아카이브 컨테이너 포맷 자체는 이 크레이트의 관심사가 아니다.
//! 필요한 것은 이름, 생성 시각, scope -> 코드 유닛 목록뿐이다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotfix_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

// ============================================================================
// PatchManifest - 아카이브 메타데이터
// ============================================================================

/// 아카이브가 노출하는 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchManifest {
    /// 패치 이름
    pub name: String,

    /// 패치 빌드 시 기록된 생성 시각
    pub created_time: DateTime<Utc>,

    /// scope 이름 -> 교체할 코드 유닛 (순서 유지)
    #[serde(default)]
    pub scopes: BTreeMap<String, Vec<String>>,
}

impl PatchManifest {
    pub fn new(name: impl Into<String>, created_time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_time,
            scopes: BTreeMap::new(),
        }
    }

    /// scope 와 코드 유닛 추가
    pub fn with_scope<I, S>(mut self, scope: impl Into<String>, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes
            .insert(scope.into(), units.into_iter().map(Into::into).collect());
        self
    }
}

// ============================================================================
// ArchiveReader - 외부 파서 인터페이스
// ============================================================================

/// 아카이브에서 메타데이터를 읽어오는 파서
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    /// 메타데이터 읽기 (실패 시 `Error::Parse`)
    async fn read(&self, path: &Path) -> Result<PatchManifest>;
}

/// JSON 메타데이터 문서를 읽는 기본 파서
///
/// 알 수 없는 필드(payload 등)는 무시한다.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestReader;

#[async_trait]
impl ArchiveReader for ManifestReader {
    async fn read(&self, path: &Path) -> Result<PatchManifest> {
        let bytes = fs::read(path)
            .await
            .map_err(|e| Error::parse(path, format!("read failed: {}", e)))?;

        let manifest: PatchManifest = serde_json::from_slice(&bytes)
            .map_err(|e| Error::parse(path, e.to_string()))?;

        if manifest.name.trim().is_empty() {
            return Err(Error::parse(path, "patch name is empty"));
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_manifest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fix.apatch");
        std::fs::write(
            &path,
            r#"{
                "name": "fix-login",
                "createdTime": "2024-05-01T10:00:00Z",
                "scopes": { "core": ["Login", "Session"] },
                "payload": "ignored"
            }"#,
        )
        .unwrap();

        let manifest = ManifestReader.read(&path).await.unwrap();
        assert_eq!(manifest.name, "fix-login");
        assert_eq!(
            manifest.created_time,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(manifest.scopes["core"], vec!["Login", "Session"]);
    }

    #[tokio::test]
    async fn test_missing_created_time_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.apatch");
        std::fs::write(&path, r#"{ "name": "x", "scopes": {} }"#).unwrap();

        let err = ManifestReader.read(&path).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[tokio::test]
    async fn test_empty_name_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.apatch");
        std::fs::write(&path, r#"{ "name": " ", "createdTime": "2024-05-01T10:00:00Z" }"#)
            .unwrap();

        let err = ManifestReader.read(&path).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
