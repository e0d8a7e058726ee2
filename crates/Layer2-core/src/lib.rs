//! hotfix-core: Core Runtime for HotFix
//!
//! Layer2 - 패치 관리 레이어
//!
//! # 주요 모듈
//!
//! - `patch`: 패치 저장소, scope 레지스트리, 버전 게이트, 코디네이터
//!
//! # 사용 예시
//!
//! ```ignore
//! use hotfix_core::{PatchCoordinator, ScopeHandle};
//!
//! let coordinator = PatchCoordinator::builder()
//!     .data_dir(data_dir)
//!     .applier(applier)
//!     .build()?;
//!
//! coordinator.init(env!("CARGO_PKG_VERSION")).await?;
//! coordinator.load_patch().await;
//!
//! // 플러그인이 로드되었을 때
//! coordinator.load_patch_for("plugin-a", ScopeHandle::new(plugin_loader)).await;
//! ```

pub mod patch;

// Re-exports: Patch
pub use patch::{
    // Applier
    Applier,
    // Coordinator
    ApplyReport,
    // Archive
    ArchiveReader,
    // Version
    Decision,
    // Events
    EventBus,
    EventType,
    InitOutcome,
    ManifestReader,
    PatchCoordinator,
    PatchCoordinatorBuilder,
    PatchEvent,
    // Record
    PatchKey,
    PatchManifest,
    PatchRecord,
    // Store
    PatchStore,
    PurgeReport,
    // Scope
    Scope,
    ScopeHandle,
    ScopeRegistry,
    VersionGate,
    VERSION_KEY,
    WILDCARD,
};

// Layer1 re-exports
pub use hotfix_foundation::{Error, HotfixConfig, Result};

/// Layer2 버전
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
