//! Patch Coordinator - 패치 라이프사이클 관리
//!
//! 시작 시 또는 요청 시 PatchStore 의 레코드를 ScopeRegistry 의 바인딩과
//! 매칭하고 Applier 를 호출한다. 자체적인 장기 상태는 없다.

use super::applier::{Applier, ScopeHandle};
use super::archive::{ArchiveReader, ManifestReader};
use super::events::{EventBus, EventType, PatchEvent};
use super::record::PatchRecord;
use super::scope::{Scope, ScopeRegistry};
use super::store::{PatchStore, PurgeReport};
use super::version::{Decision, VersionGate};
use hotfix_foundation::{
    Error, HotfixConfig, JsonPreferences, JsonStore, Preferences, Result,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const EVENT_SOURCE: &str = "patch_coordinator";

// ============================================================================
// 결과 타입
// ============================================================================

/// `init` 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// 버전 변경으로 기존 패치 삭제
    Purged(PurgeReport),
    /// 같은 버전: 디렉토리에서 로드한 패치 수
    Loaded(usize),
}

/// 한 번의 적용 패스 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Applier 호출 성공
    pub applied: usize,
    /// Applier 호출 실패 (레코드는 해당 scope 에 대해 Registered 로 남음)
    pub failed: usize,
    /// 바인딩된 scope 가 없어 대기 중
    pub skipped: usize,
}

impl ApplyReport {
    pub fn total(&self) -> usize {
        self.applied + self.failed + self.skipped
    }
}

// ============================================================================
// PatchCoordinator
// ============================================================================

/// 패치 코디네이터 - 공개 API (init / add_patch / load_patch / remove_all_patches)
///
/// 호스트가 한 번 만들고 `Arc` 로 공유한다.
pub struct PatchCoordinator {
    store: Arc<PatchStore>,
    scopes: Arc<ScopeRegistry>,
    gate: VersionGate,
    applier: Arc<dyn Applier>,
    default_scope: ScopeHandle,
    events: Arc<EventBus>,
}

impl PatchCoordinator {
    /// 빌더 생성
    pub fn builder() -> PatchCoordinatorBuilder {
        PatchCoordinatorBuilder::default()
    }

    // ========================================================================
    // 초기화
    // ========================================================================

    /// 초기화
    ///
    /// 디렉토리 준비 실패는 치명적이며 패치를 로드하지 않는다.
    /// 버전이 바뀌었으면 모든 패치를 삭제하고, 같으면 디렉토리에서 로드한다.
    pub async fn init(&self, app_version: &str) -> Result<InitOutcome> {
        info!("Initializing patches for app version {}", app_version);

        self.store.init_directory().await?;

        match self.gate.check(app_version)? {
            Decision::Purge => {
                let report = self.store.remove_all(self.applier.as_ref()).await?;
                self.publish_purge(&report).await;
                if !report.is_complete() {
                    error!(
                        "Version purge left {} file(s) behind",
                        report.failed.len()
                    );
                    return Err(Error::Purge {
                        failed: report.failed,
                    });
                }
                Ok(InitOutcome::Purged(report))
            }
            Decision::Keep => {
                let loaded = self.store.load_existing().await?;
                Ok(InitOutcome::Loaded(loaded))
            }
        }
    }

    // ========================================================================
    // 적용
    // ========================================================================

    /// 시작 시 호출: 모든 패치를 기본 scope 에 적용
    ///
    /// 와일드카드를 기본 scope 에 바인딩한 뒤, 생성 시각 오름차순으로
    /// 각 레코드의 모든 대상 scope 를 적용한다.
    pub async fn load_patch(&self) -> ApplyReport {
        self.register_scope(Scope::Wildcard, self.default_scope.clone())
            .await;

        let mut report = ApplyReport::default();
        for record in self.store.snapshot() {
            self.apply_resolved(&record, &mut report).await;
        }

        info!(
            "Applied patches: {} ok, {} failed, {} pending",
            report.applied, report.failed, report.skipped
        );
        report
    }

    /// 새 scope 가 생겼을 때 호출 (동적 로드 컴포넌트 등)
    ///
    /// scope 를 등록하고, 그 scope 를 대상으로 하는 모든 레코드를 `handle` 에 적용한다.
    pub async fn load_patch_for(&self, scope_name: &str, handle: ScopeHandle) -> ApplyReport {
        self.register_scope(Scope::from(scope_name), handle.clone())
            .await;

        let mut report = ApplyReport::default();
        for record in self.store.snapshot() {
            if record.targets(scope_name) {
                self.apply_one(&record, scope_name, &handle, &mut report)
                    .await;
            }
        }

        debug!(
            "Applied patches for scope {}: {} ok, {} failed",
            scope_name, report.applied, report.failed
        );
        report
    }

    /// 런타임에 패치 추가 후 즉시 적용
    ///
    /// 이미 로드된 패치면 `None` 을 반환하고 Applier 는 호출하지 않는다.
    pub async fn add_patch(&self, path: impl AsRef<Path>) -> Result<Option<Arc<PatchRecord>>> {
        let path = path.as_ref();
        let Some(record) = self.store.add(path).await? else {
            return Ok(None);
        };

        self.events
            .publish(PatchEvent::new(
                EventType::PatchRegistered,
                json!({
                    "patch": record.name(),
                    "file": record.file_name(),
                    "createdTime": record.created_time(),
                }),
                EVENT_SOURCE,
            ))
            .await;

        let mut report = ApplyReport::default();
        self.apply_resolved(&record, &mut report).await;
        debug!(
            "Patch {} applied on add: {} ok, {} failed, {} pending",
            record.name(),
            report.applied,
            report.failed,
            report.skipped
        );

        Ok(Some(record))
    }

    // ========================================================================
    // 삭제
    // ========================================================================

    /// 모든 패치 삭제 및 영속 상태 초기화
    pub async fn remove_all_patches(&self) -> Result<PurgeReport> {
        let report = self.store.remove_all(self.applier.as_ref()).await?;
        self.gate.reset()?;
        self.publish_purge(&report).await;
        Ok(report)
    }

    // ========================================================================
    // 접근자
    // ========================================================================

    /// 생성 시각 오름차순 패치 목록
    pub fn patches(&self) -> Vec<Arc<PatchRecord>> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &Arc<PatchStore> {
        &self.store
    }

    pub fn scopes(&self) -> &Arc<ScopeRegistry> {
        &self.scopes
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn version_gate(&self) -> &VersionGate {
        &self.gate
    }

    // ========================================================================
    // 내부
    // ========================================================================

    async fn register_scope(&self, scope: Scope, handle: ScopeHandle) {
        let name = scope.to_string();
        self.scopes.register(scope, handle);
        self.events
            .publish(PatchEvent::new(
                EventType::ScopeRegistered,
                json!({ "scope": name }),
                EVENT_SOURCE,
            ))
            .await;
    }

    /// 레코드의 모든 대상 scope 를 레지스트리 바인딩으로 해석해 적용
    async fn apply_resolved(&self, record: &PatchRecord, report: &mut ApplyReport) {
        for scope_name in record.target_scopes() {
            match self.scopes.resolve(scope_name) {
                Some(handle) => {
                    self.apply_one(record, scope_name, &handle, report).await;
                }
                None => {
                    debug!(
                        "No scope bound for {}, patch {} stays dormant",
                        scope_name,
                        record.name()
                    );
                    report.skipped += 1;
                }
            }
        }
    }

    async fn apply_one(
        &self,
        record: &PatchRecord,
        scope_name: &str,
        handle: &ScopeHandle,
        report: &mut ApplyReport,
    ) {
        let units = record.classes(scope_name).unwrap_or_default();

        match self.applier.apply(record.file(), handle, units).await {
            Ok(()) => {
                report.applied += 1;
                debug!(
                    "Applied patch {} to scope {} ({} units)",
                    record.name(),
                    scope_name,
                    units.len()
                );
                self.events
                    .publish(PatchEvent::new(
                        EventType::PatchApplied,
                        json!({
                            "patch": record.name(),
                            "file": record.file_name(),
                            "scope": scope_name,
                            "units": units,
                        }),
                        EVENT_SOURCE,
                    ))
                    .await;
            }
            Err(e) => {
                report.failed += 1;
                warn!(
                    "Failed to apply patch {} to scope {}: {}",
                    record.name(),
                    scope_name,
                    e
                );
                self.events
                    .publish(PatchEvent::new(
                        EventType::PatchApplyFailed,
                        json!({
                            "patch": record.name(),
                            "file": record.file_name(),
                            "scope": scope_name,
                            "error": e.to_string(),
                        }),
                        EVENT_SOURCE,
                    ))
                    .await;
            }
        }
    }

    async fn publish_purge(&self, report: &PurgeReport) {
        self.events
            .publish(PatchEvent::new(
                EventType::PatchesPurged,
                json!({
                    "removed": report.removed.len(),
                    "failed": report.failed.len(),
                }),
                EVENT_SOURCE,
            ))
            .await;
    }
}

// ============================================================================
// PatchCoordinatorBuilder
// ============================================================================

/// PatchCoordinator 빌더
#[derive(Default)]
pub struct PatchCoordinatorBuilder {
    config: HotfixConfig,
    applier: Option<Arc<dyn Applier>>,
    default_scope: Option<ScopeHandle>,
    prefs: Option<Arc<dyn Preferences>>,
    reader: Option<Arc<dyn ArchiveReader>>,
}

impl PatchCoordinatorBuilder {
    /// 설정 지정
    pub fn config(mut self, config: HotfixConfig) -> Self {
        self.config = config;
        self
    }

    /// 데이터 디렉토리 지정 (설정의 data_dir 를 덮어씀)
    pub fn data_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.config.data_dir = Some(dir.into());
        self
    }

    /// 패치 적용기 (필수)
    pub fn applier(mut self, applier: Arc<dyn Applier>) -> Self {
        self.applier = Some(applier);
        self
    }

    /// 프로세스 기본 scope 컨텍스트
    pub fn default_scope(mut self, handle: ScopeHandle) -> Self {
        self.default_scope = Some(handle);
        self
    }

    /// 버전 마커 저장소 (기본: data_dir 의 JSON 파일)
    pub fn preferences(mut self, prefs: Arc<dyn Preferences>) -> Self {
        self.prefs = Some(prefs);
        self
    }

    /// 아카이브 파서 (기본: ManifestReader)
    pub fn archive_reader(mut self, reader: Arc<dyn ArchiveReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// 빌드
    pub fn build(self) -> Result<PatchCoordinator> {
        let applier = self
            .applier
            .ok_or_else(|| Error::InvalidInput("an Applier is required".to_string()))?;

        let data_dir = self.config.resolved_data_dir()?;
        let patch_dir = data_dir.join(self.config.patch_dir_name());

        let prefs = match self.prefs {
            Some(prefs) => prefs,
            None => Arc::new(JsonPreferences::new(
                JsonStore::new(&data_dir),
                self.config.prefs_file(),
            )),
        };
        let reader = self
            .reader
            .unwrap_or_else(|| Arc::new(ManifestReader));

        debug!("Patch dir: {:?}", patch_dir);

        Ok(PatchCoordinator {
            store: Arc::new(PatchStore::new(patch_dir, self.config.suffix(), reader)),
            scopes: Arc::new(ScopeRegistry::new()),
            gate: VersionGate::new(prefs),
            applier,
            default_scope: self.default_scope.unwrap_or_else(|| ScopeHandle::new(())),
            events: Arc::new(EventBus::with_capacity(1024, self.config.event_history())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hotfix_foundation::MemoryPreferences;
    use tempfile::TempDir;

    struct OkApplier;

    #[async_trait]
    impl Applier for OkApplier {
        async fn apply(&self, _archive: &Path, _scope: &ScopeHandle, _units: &[String]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_build_requires_applier() {
        let result = PatchCoordinator::builder().data_dir("/tmp/hotfix").build();
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_init_fresh_install_purges() {
        let temp = TempDir::new().unwrap();
        let coordinator = PatchCoordinator::builder()
            .data_dir(temp.path())
            .applier(Arc::new(OkApplier))
            .preferences(Arc::new(MemoryPreferences::new()))
            .build()
            .unwrap();

        let outcome = coordinator.init("1.0").await.unwrap();
        assert_eq!(outcome, InitOutcome::Purged(PurgeReport::default()));
        assert!(temp.path().join("apatch").is_dir());

        let outcome = coordinator.init("1.0").await.unwrap();
        assert_eq!(outcome, InitOutcome::Loaded(0));
    }

    #[tokio::test]
    async fn test_init_directory_error_is_fatal() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("apatch"), "occupied").unwrap();

        let prefs = Arc::new(MemoryPreferences::new());
        let coordinator = PatchCoordinator::builder()
            .data_dir(temp.path())
            .applier(Arc::new(OkApplier))
            .preferences(prefs.clone())
            .build()
            .unwrap();

        let err = coordinator.init("1.0").await.unwrap_err();
        assert!(matches!(err, Error::NotADirectory(_)));
        // 버전 게이트까지 진행하지 않음
        assert_eq!(prefs.get("version").unwrap(), None);
    }

    #[test]
    fn test_apply_report_total() {
        let report = ApplyReport {
            applied: 2,
            failed: 1,
            skipped: 3,
        };
        assert_eq!(report.total(), 6);
    }
}
