//! Hotfix Config - 통합 설정
//!
//! 글로벌(~/.config/hotfix) + 프로젝트(.hotfix) 설정을 병합한다.

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 설정 파일명
pub const HOTFIX_CONFIG_FILE: &str = "hotfix.json";

const DEFAULT_PATCH_DIR: &str = "apatch";
const DEFAULT_SUFFIX: &str = ".apatch";
const DEFAULT_PREFS_FILE: &str = "_hotfix_.json";
const DEFAULT_EVENT_HISTORY: usize = 100;

// ============================================================================
// HotfixConfig
// ============================================================================

/// HotFix 통합 설정
///
/// 모든 필드는 선택적이며, 비어 있으면 기본값을 사용한다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotfixConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// 데이터 디렉토리 (패치 디렉토리와 preferences 의 부모)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// 데이터 디렉토리 아래 패치 디렉토리 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_dir: Option<String>,

    /// 패치 파일 확장자
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// 버전 마커를 저장하는 preferences 파일명
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefs_file: Option<String>,

    /// 이벤트 히스토리 크기
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_history: Option<usize>,
}

fn default_version() -> u32 {
    1
}

impl Default for HotfixConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HotfixConfig {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            data_dir: None,
            patch_dir: None,
            suffix: None,
            prefs_file: None,
            event_history: None,
        }
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = Self::load_from(&global)? {
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(project_config) = Self::load_from(&project)? {
                config.merge(project_config);
            }
        }

        Ok(config)
    }

    /// 특정 저장소에서 로드
    pub fn load_from(store: &JsonStore) -> Result<Option<Self>> {
        store
            .load_optional::<HotfixConfig>(HOTFIX_CONFIG_FILE)
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// 특정 저장소에 저장
    pub fn save_to(&self, store: &JsonStore) -> Result<()> {
        store.save(HOTFIX_CONFIG_FILE, self)
    }

    /// 다른 설정을 덮어쓰기 병합 (other 가 우선)
    pub fn merge(&mut self, other: HotfixConfig) {
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.patch_dir.is_some() {
            self.patch_dir = other.patch_dir;
        }
        if other.suffix.is_some() {
            self.suffix = other.suffix;
        }
        if other.prefs_file.is_some() {
            self.prefs_file = other.prefs_file;
        }
        if other.event_history.is_some() {
            self.event_history = other.event_history;
        }
    }

    // ========================================================================
    // Resolved values
    // ========================================================================

    /// 데이터 디렉토리 (기본: <data_dir>/hotfix)
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("hotfix"))
                .ok_or_else(|| Error::Config("Cannot find data directory".to_string())),
        }
    }

    /// 패치 디렉토리 경로
    pub fn patch_dir_path(&self) -> Result<PathBuf> {
        Ok(self.resolved_data_dir()?.join(self.patch_dir_name()))
    }

    pub fn patch_dir_name(&self) -> &str {
        self.patch_dir.as_deref().unwrap_or(DEFAULT_PATCH_DIR)
    }

    pub fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX)
    }

    pub fn prefs_file(&self) -> &str {
        self.prefs_file.as_deref().unwrap_or(DEFAULT_PREFS_FILE)
    }

    pub fn event_history(&self) -> usize {
        self.event_history.unwrap_or(DEFAULT_EVENT_HISTORY)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_patch_dir(mut self, name: impl Into<String>) -> Self {
        self.patch_dir = Some(name.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}
