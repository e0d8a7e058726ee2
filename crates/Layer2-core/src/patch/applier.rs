//! Applier - 실제 코드 교체를 수행하는 외부 협력자

use async_trait::async_trait;
use hotfix_foundation::Result;
use std::any::Any;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// ScopeHandle - 불투명 실행 컨텍스트
// ============================================================================

/// 실행 scope 컨텍스트 핸들
///
/// 코어는 내용을 보지 않고 Applier 에게 그대로 넘긴다.
/// Applier 는 `downcast_ref` 로 자신의 컨텍스트 타입을 꺼낼 수 있다.
#[derive(Clone)]
pub struct ScopeHandle {
    inner: Arc<dyn Any + Send + Sync>,
}

impl ScopeHandle {
    pub fn new<T: Any + Send + Sync>(context: T) -> Self {
        Self {
            inner: Arc::new(context),
        }
    }

    /// 타입 캐스팅 (다운캐스팅 지원)
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// 같은 컨텍스트를 가리키는지 확인
    pub fn ptr_eq(&self, other: &ScopeHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScopeHandle(..)")
    }
}

// ============================================================================
// Applier Trait
// ============================================================================

/// 패치 적용기
///
/// 유닛 단위 실패를 하나의 에러로 묶을지, 첫 실패에서 멈출지는 구현체가 정한다.
#[async_trait]
pub trait Applier: Send + Sync {
    /// `archive` 의 `units` 를 `scope` 에 적용 (실패 시 `Error::Apply`)
    async fn apply(&self, archive: &Path, scope: &ScopeHandle, units: &[String]) -> Result<()>;

    /// 아카이브에서 파생된 캐시 산출물 제거 (삭제 직전에 호출)
    async fn remove_derived(&self, _archive: &Path) -> Result<()> {
        Ok(())
    }
}
