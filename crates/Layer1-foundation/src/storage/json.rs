//! JSON 파일 저장소

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

/// JSON 파일 저장소
///
/// 저장은 임시 파일에 쓴 뒤 rename 하므로 크래시가 나도
/// 반쯤 쓰인 파일이 남지 않는다.
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 글로벌 설정 (~/.config/hotfix/)
    pub fn global() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?
            .join("hotfix");
        Ok(Self::new(dir))
    }

    /// 프로젝트 설정 (.hotfix/)
    pub fn project(root: impl Into<PathBuf>) -> Self {
        Self::new(root.into().join(".hotfix"))
    }

    /// 현재 디렉토리 프로젝트 설정
    pub fn current_project() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("Cannot get current directory: {}", e)))?;
        Ok(Self::project(cwd))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            std::fs::create_dir_all(&self.base_dir).map_err(|e| {
                Error::Persistence(format!(
                    "Failed to create directory {}: {}",
                    self.base_dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// JSON 로드
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        let path = self.file_path(filename);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Persistence(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Persistence(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// JSON 로드 (Optional)
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        if !path.exists() {
            return Ok(None);
        }
        self.load(filename).map(Some)
    }

    /// JSON 저장 (동기 커밋)
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.file_path(filename);
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Persistence(format!("Failed to serialize: {}", e)))?;

        let tmp = self
            .base_dir
            .join(format!(".{}.{}.tmp", filename, uuid::Uuid::new_v4()));
        std::fs::write(&tmp, content).map_err(|e| {
            Error::Persistence(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            Error::Persistence(format!("Failed to commit {}: {}", path.display(), e))
        })
    }

    /// 파일 존재 여부
    pub fn exists(&self, filename: &str) -> bool {
        self.file_path(filename).exists()
    }

    /// 파일 삭제
    pub fn remove(&self, filename: &str) -> Result<()> {
        let path = self.file_path(filename);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| {
                Error::Persistence(format!("Failed to remove {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path().join("nested"));

        let mut data = BTreeMap::new();
        data.insert("version".to_string(), "1.0".to_string());
        store.save("prefs.json", &data).unwrap();

        assert!(store.exists("prefs.json"));
        let loaded: BTreeMap<String, String> = store.load("prefs.json").unwrap();
        assert_eq!(loaded, data);

        // 임시 파일이 남지 않아야 함
        let leftovers = std::fs::read_dir(store.base_dir())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .map(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_load_optional_missing() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path());
        let loaded: Option<BTreeMap<String, String>> = store.load_optional("none.json").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_remove() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path());
        store.save("a.json", &vec![1, 2, 3]).unwrap();
        store.remove("a.json").unwrap();
        assert!(!store.exists("a.json"));
        // 없는 파일 삭제는 no-op
        store.remove("a.json").unwrap();
    }
}
