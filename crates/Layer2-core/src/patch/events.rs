//! Patch Events - 이벤트 시스템
//!
//! 적용 실패는 호출 지점에서 보이지 않으므로 이벤트로 관찰한다.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

// ============================================================================
// PatchEvent - 패치 이벤트 타입
// ============================================================================

/// 패치 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchEvent {
    /// 이벤트 타입
    pub event_type: EventType,

    /// 이벤트 데이터
    pub data: Value,

    /// 타임스탬프
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// 소스 (이벤트 발생 위치)
    pub source: String,
}

impl PatchEvent {
    /// 새 이벤트 생성
    pub fn new(event_type: EventType, data: Value, source: impl Into<String>) -> Self {
        Self {
            event_type,
            data,
            timestamp: chrono::Utc::now(),
            source: source.into(),
        }
    }
}

/// 이벤트 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ScopeRegistered,
    PatchRegistered,
    PatchApplied,
    PatchApplyFailed,
    PatchesPurged,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScopeRegistered => write!(f, "scope_registered"),
            Self::PatchRegistered => write!(f, "patch_registered"),
            Self::PatchApplied => write!(f, "patch_applied"),
            Self::PatchApplyFailed => write!(f, "patch_apply_failed"),
            Self::PatchesPurged => write!(f, "patches_purged"),
        }
    }
}

// ============================================================================
// EventBus - 이벤트 버스 (발행/구독)
// ============================================================================

/// 이벤트 버스 - 이벤트 발행 및 구독 관리
pub struct EventBus {
    /// 브로드캐스트 채널 발신자
    sender: broadcast::Sender<PatchEvent>,

    /// 이벤트 히스토리 (최근 N개)
    history: RwLock<Vec<PatchEvent>>,

    /// 히스토리 최대 크기
    history_size: usize,
}

impl EventBus {
    /// 새 이벤트 버스 생성
    pub fn new() -> Self {
        Self::with_capacity(1024, 100)
    }

    /// 용량 지정하여 생성
    pub fn with_capacity(channel_capacity: usize, history_size: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            sender,
            history: RwLock::new(Vec::with_capacity(history_size)),
            history_size,
        }
    }

    /// 이벤트 발행
    pub async fn publish(&self, event: PatchEvent) {
        debug!("Publishing event: {}", event.event_type);

        // 히스토리에 추가
        if self.history_size > 0 {
            let mut history = self.history.write().await;
            if history.len() >= self.history_size {
                history.remove(0);
            }
            history.push(event.clone());
        }

        // 브로드캐스트 (구독자가 없어도 OK)
        let _ = self.sender.send(event);
    }

    /// 이벤트 구독
    pub fn subscribe(&self) -> broadcast::Receiver<PatchEvent> {
        self.sender.subscribe()
    }

    /// 이벤트 히스토리 조회
    pub async fn history(&self) -> Vec<PatchEvent> {
        self.history.read().await.clone()
    }

    /// 특정 타입의 이벤트 히스토리 조회
    pub async fn history_by_type(&self, event_type: EventType) -> Vec<PatchEvent> {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// 히스토리 클리어
    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
