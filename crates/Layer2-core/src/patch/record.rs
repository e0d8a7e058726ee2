//! Patch Record - 패치 아카이브 하나의 파싱된 메타데이터

use super::archive::{ArchiveReader, PatchManifest};
use chrono::{DateTime, Utc};
use hotfix_foundation::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// PatchKey - 정렬 키
// ============================================================================

/// 패치 정렬 키: 생성 시각 오름차순, 같으면 파일명
///
/// 타임스탬프가 같은 서로 다른 패치가 합쳐지지 않도록 파일명을 보조 키로 쓴다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatchKey {
    pub created_time: DateTime<Utc>,
    pub file_name: String,
}

// ============================================================================
// PatchRecord
// ============================================================================

/// 패치 아카이브 메타데이터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    /// 관리 디렉토리 안의 아카이브 경로
    file: PathBuf,

    /// 아카이브 파일명
    file_name: String,

    /// 패치 이름
    name: String,

    /// 생성 시각 (주 정렬 키)
    created_time: DateTime<Utc>,

    /// scope -> 코드 유닛 목록
    classes_by_scope: BTreeMap<String, Vec<String>>,
}

impl PatchRecord {
    /// 메타데이터로부터 생성
    pub fn from_manifest(file: impl Into<PathBuf>, manifest: PatchManifest) -> Result<Self> {
        let file = file.into();
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::parse(&file, "archive path has no file name"))?;

        Ok(Self {
            file,
            file_name,
            name: manifest.name,
            created_time: manifest.created_time,
            classes_by_scope: manifest.scopes,
        })
    }

    /// 아카이브를 읽어서 생성
    pub async fn parse(file: &Path, reader: &dyn ArchiveReader) -> Result<Self> {
        let manifest = reader.read(file).await?;
        Self::from_manifest(file, manifest)
    }

    pub fn key(&self) -> PatchKey {
        PatchKey {
            created_time: self.created_time,
            file_name: self.file_name.clone(),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_time(&self) -> DateTime<Utc> {
        self.created_time
    }

    /// 이 패치가 수정을 선언한 scope 이름들
    pub fn target_scopes(&self) -> impl Iterator<Item = &str> {
        self.classes_by_scope.keys().map(String::as_str)
    }

    /// scope 대상 여부
    pub fn targets(&self, scope: &str) -> bool {
        self.classes_by_scope.contains_key(scope)
    }

    /// scope 에 대한 코드 유닛 목록
    pub fn classes(&self, scope: &str) -> Option<&[String]> {
        self.classes_by_scope.get(scope).map(Vec::as_slice)
    }
}

impl PartialOrd for PatchRecord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PatchRecord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.created_time
            .cmp(&other.created_time)
            .then_with(|| self.file_name.cmp(&other.file_name))
            .then_with(|| self.file.cmp(&other.file))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.classes_by_scope.cmp(&other.classes_by_scope))
    }
}
