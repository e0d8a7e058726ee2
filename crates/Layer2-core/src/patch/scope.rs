//! Scope Registry - 실행 scope 이름 -> 컨텍스트 핸들

use super::applier::ScopeHandle;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// 와일드카드 scope 를 나타내는 외부 표기
pub const WILDCARD: &str = "*";

// ============================================================================
// Scope
// ============================================================================

/// 등록 대상 scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// 프로세스 전체 (현재와 미래의 모든 scope)
    Wildcard,
    /// 이름 있는 scope
    Named(String),
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        if name == WILDCARD {
            Scope::Wildcard
        } else {
            Scope::Named(name.to_string())
        }
    }
}

impl From<String> for Scope {
    fn from(name: String) -> Self {
        if name == WILDCARD {
            Scope::Wildcard
        } else {
            Scope::Named(name)
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => f.write_str(WILDCARD),
            Self::Named(name) => f.write_str(name),
        }
    }
}

// ============================================================================
// ScopeRegistry
// ============================================================================

#[derive(Default)]
struct Bindings {
    wildcard: Option<ScopeHandle>,
    named: HashMap<String, ScopeHandle>,
}

/// scope 레지스트리 - 프로세스 수명 동안 줄어들지 않는다
#[derive(Default)]
pub struct ScopeRegistry {
    bindings: RwLock<Bindings>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// scope 등록 (같은 이름은 덮어쓴다)
    pub fn register(&self, scope: impl Into<Scope>, handle: ScopeHandle) {
        let scope = scope.into();
        let mut bindings = self.bindings.write();
        match &scope {
            Scope::Wildcard => {
                bindings.wildcard = Some(handle);
                info!("Registered wildcard scope");
            }
            Scope::Named(name) => {
                if bindings.named.insert(name.clone(), handle).is_some() {
                    debug!("Rebound scope: {}", name);
                } else {
                    debug!("Registered scope: {}", name);
                }
            }
        }
    }

    /// 와일드카드 등록
    pub fn register_wildcard(&self, handle: ScopeHandle) {
        self.register(Scope::Wildcard, handle);
    }

    /// scope 이름으로 핸들 조회
    ///
    /// 와일드카드가 등록되어 있으면 이름과 무관하게 와일드카드 핸들을 반환한다.
    /// 더 구체적인 이름 바인딩이 있어도 와일드카드가 우선이다.
    pub fn resolve(&self, name: &str) -> Option<ScopeHandle> {
        let bindings = self.bindings.read();
        match &bindings.wildcard {
            Some(handle) => Some(handle.clone()),
            None => bindings.named.get(name).cloned(),
        }
    }

    /// 와일드카드 등록 여부
    pub fn has_wildcard(&self) -> bool {
        self.bindings.read().wildcard.is_some()
    }

    /// 이름 있는 scope 등록 여부
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().named.contains_key(name)
    }

    /// 등록된 이름 목록 (정렬)
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.bindings.read().named.keys().cloned().collect();
        names.sort();
        names
    }

    /// 등록된 바인딩 수 (와일드카드 포함)
    pub fn len(&self) -> usize {
        let bindings = self.bindings.read();
        bindings.named.len() + usize::from(bindings.wildcard.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
