//! Preferences - 단순 key-value 영속화
//!
//! 버전 마커처럼 작은 문자열 값을 저장한다. 마지막 쓰기가 이긴다.

use super::JsonStore;
use crate::Result;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

/// key-value 영속화 인터페이스
///
/// `put`/`clear` 는 반환 전에 커밋을 끝내야 한다.
pub trait Preferences: Send + Sync {
    /// 값 조회
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// 값 저장
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// 네임스페이스 전체 삭제
    fn clear(&self) -> Result<()>;
}

// ============================================================================
// JsonPreferences - 파일 기반
// ============================================================================

/// JSON 파일 하나에 모든 값을 저장하는 Preferences
pub struct JsonPreferences {
    store: JsonStore,
    filename: String,
    /// read-modify-write 직렬화
    lock: Mutex<()>,
}

impl JsonPreferences {
    pub fn new(store: JsonStore, filename: impl Into<String>) -> Self {
        Self {
            store,
            filename: filename.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .store
            .load_optional::<BTreeMap<String, String>>(&self.filename)?
            .unwrap_or_default())
    }
}

impl Preferences for JsonPreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.store.save(&self.filename, &values)?;
        debug!("Committed preference {} = {}", key, value);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock();
        self.store.remove(&self.filename)?;
        debug!("Cleared preferences {}", self.filename);
        Ok(())
    }
}

// ============================================================================
// MemoryPreferences - 인메모리
// ============================================================================

/// 프로세스 메모리에만 존재하는 Preferences (임베딩/테스트용)
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.values.lock().clear();
        Ok(())
    }
}
