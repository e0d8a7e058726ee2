//! TraceApplier - 실제 코드 교체 없이 적용 요청을 로그로 남기는 Applier

use async_trait::async_trait;
use hotfix_core::{Applier, ScopeHandle};
use hotfix_foundation::Result;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// CLI 용 Applier
///
/// 런타임 코드 교체는 호스트 프로세스의 몫이므로, CLI 에서는 어떤 패치가
/// 어떤 scope 에 어떤 유닛으로 적용될지만 보여준다.
#[derive(Default)]
pub struct TraceApplier {
    applied: AtomicUsize,
    cleaned: AtomicUsize,
}

impl TraceApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지의 apply 호출 수
    pub fn applied(&self) -> usize {
        self.applied.load(Ordering::Relaxed)
    }

    pub fn cleaned(&self) -> usize {
        self.cleaned.load(Ordering::Relaxed)
    }
}

/// 로그용 scope 라벨
pub fn scope_label(scope: &ScopeHandle) -> String {
    if let Some(name) = scope.downcast_ref::<String>() {
        name.clone()
    } else if let Some(name) = scope.downcast_ref::<&'static str>() {
        (*name).to_string()
    } else {
        "<opaque>".to_string()
    }
}

#[async_trait]
impl Applier for TraceApplier {
    async fn apply(&self, archive: &Path, scope: &ScopeHandle, units: &[String]) -> Result<()> {
        self.applied.fetch_add(1, Ordering::Relaxed);
        info!(
            "apply {} -> scope {} units [{}]",
            archive.display(),
            scope_label(scope),
            units.join(", ")
        );
        Ok(())
    }

    async fn remove_derived(&self, archive: &Path) -> Result<()> {
        self.cleaned.fetch_add(1, Ordering::Relaxed);
        info!("cleanup derived artifacts of {}", archive.display());
        Ok(())
    }
}
