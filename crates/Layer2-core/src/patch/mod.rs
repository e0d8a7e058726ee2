//! # Patch System
//!
//! 재시작 없이 실행 중인 프로세스에 적용되는 핫패치 관리
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    PatchCoordinator                      │
//! │     init / add_patch / load_patch / remove_all_patches   │
//! │                                                          │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ VersionGate │  │  PatchStore  │  │  ScopeRegistry  │  │
//! │  │ Preferences │  │  *.apatch    │  │  "*" + named    │  │
//! │  └─────────────┘  └──────┬───────┘  └────────┬────────┘  │
//! │                          │ 오름차순          │ resolve   │
//! │                          ▼                   ▼           │
//! │                 ┌─────────────────────────────────┐      │
//! │                 │  Applier (외부: 실제 코드 교체) │      │
//! │                 └─────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! let coordinator = PatchCoordinator::builder()
//!     .data_dir("/data/app")
//!     .applier(Arc::new(MyApplier))
//!     .default_scope(ScopeHandle::new(main_loader))
//!     .build()?;
//!
//! coordinator.init("1.0.3").await?;
//! coordinator.load_patch().await;
//! coordinator.add_patch("/sdcard/out.apatch").await?;
//! ```

mod applier;
mod archive;
mod coordinator;
mod events;
mod record;
mod scope;
mod store;
mod version;

pub use applier::{Applier, ScopeHandle};
pub use archive::{ArchiveReader, ManifestReader, PatchManifest};
pub use coordinator::{ApplyReport, InitOutcome, PatchCoordinator, PatchCoordinatorBuilder};
pub use events::{EventBus, EventType, PatchEvent};
pub use record::{PatchKey, PatchRecord};
pub use scope::{Scope, ScopeRegistry, WILDCARD};
pub use store::{PatchStore, PurgeReport};
pub use version::{Decision, VersionGate, VERSION_KEY};
