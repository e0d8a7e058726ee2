//! Storage module for HotFix
//!
//! - `json`: JSON - 범용 파일 저장/로드
//! - `prefs`: key-value Preferences (버전 마커 등)

mod json;
mod prefs;

// JSON Storage (범용)
pub use json::JsonStore;

// Preferences (key-value)
pub use prefs::{JsonPreferences, MemoryPreferences, Preferences};
