//! Config - 통합 설정 관리
//!
//! - `hotfix.rs` - HotfixConfig 통합 설정

mod hotfix;

pub use hotfix::{HotfixConfig, HOTFIX_CONFIG_FILE};
