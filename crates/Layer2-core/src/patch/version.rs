//! Version Gate - 앱 버전이 바뀌면 기존 패치를 무효화

use hotfix_foundation::{Error, Preferences, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// 버전 마커 키
pub const VERSION_KEY: &str = "version";

/// 버전 비교 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// 신규 설치 또는 업그레이드: 모든 패치 삭제
    Purge,
    /// 같은 버전: 기존 패치 유지
    Keep,
}

/// 영속화된 앱 버전 마커와 현재 버전 비교
pub struct VersionGate {
    prefs: Arc<dyn Preferences>,
}

impl VersionGate {
    pub fn new(prefs: Arc<dyn Preferences>) -> Self {
        Self { prefs }
    }

    /// 현재 버전과 마커 비교
    ///
    /// 마커가 없거나 다르면(대소문자 무시) 마커를 먼저 갱신하고 `Purge` 를 반환한다.
    /// 마커 갱신은 이후 삭제의 성공 여부와 무관하게 유지된다.
    pub fn check(&self, current_version: &str) -> Result<Decision> {
        let stored = self
            .prefs
            .get(VERSION_KEY)
            .map_err(|e| Error::Persistence(format!("Failed to read version marker: {}", e)))?;

        match stored {
            Some(ver) if same_version(&ver, current_version) => {
                debug!("App version unchanged ({}), keeping patches", ver);
                Ok(Decision::Keep)
            }
            previous => {
                self.prefs.put(VERSION_KEY, current_version).map_err(|e| {
                    Error::Persistence(format!("Failed to record version marker: {}", e))
                })?;
                info!(
                    "App version changed ({} -> {}), patches will be purged",
                    previous.as_deref().unwrap_or("<none>"),
                    current_version
                );
                Ok(Decision::Purge)
            }
        }
    }

    /// 현재 저장된 마커
    pub fn current_marker(&self) -> Result<Option<String>> {
        self.prefs.get(VERSION_KEY)
    }

    /// 영속화된 모든 상태 삭제
    pub fn reset(&self) -> Result<()> {
        self.prefs
            .clear()
            .map_err(|e| Error::Persistence(format!("Failed to clear preferences: {}", e)))
    }
}

/// 문자 단위 대소문자 무시 비교 (문자열 길이는 바뀌지 않음)
fn same_version(a: &str, b: &str) -> bool {
    let mut a = a.chars();
    let mut b = b.chars();
    loop {
        match (a.next(), b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if same_char(x, y) => {}
            _ => return false,
        }
    }
}

fn same_char(x: char, y: char) -> bool {
    x == y || x.to_uppercase().eq(y.to_uppercase()) || x.to_lowercase().eq(y.to_lowercase())
}
