//! # hotfix-foundation
//!
//! Foundation layer for HotFix:
//! - Error: 에러 분류 (Directory, NotFound, Parse, Apply, Persistence)
//! - Config: 통합 설정 (HotfixConfig)
//! - Storage: JsonStore (범용), Preferences (버전 마커 key-value)

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{HotfixConfig, HOTFIX_CONFIG_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{JsonPreferences, JsonStore, MemoryPreferences, Preferences};
