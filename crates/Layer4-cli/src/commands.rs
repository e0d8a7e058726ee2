//! HotFix CLI commands
//!
//! 상태를 바꾸는 명령은 코디네이터를 만들고 `init` 을 먼저 실행한다.
//! `list` 는 버전 게이트를 거치지 않는다.

use crate::applier::TraceApplier;
use hotfix_core::{InitOutcome, PatchCoordinator, PatchRecord, PurgeReport, ScopeHandle};
use hotfix_foundation::HotfixConfig;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 프로세스 기본 scope 이름
pub const MAIN_SCOPE: &str = "main";

/// 초기화된 코디네이터
pub struct Session {
    pub coordinator: PatchCoordinator,
    pub applier: Arc<TraceApplier>,
    pub outcome: InitOutcome,
}

fn build(config: HotfixConfig, applier: Arc<TraceApplier>) -> anyhow::Result<PatchCoordinator> {
    Ok(PatchCoordinator::builder()
        .config(config)
        .applier(applier)
        .default_scope(ScopeHandle::new(MAIN_SCOPE))
        .build()?)
}

/// 코디네이터 생성 + init
pub async fn open(config: HotfixConfig, app_version: &str) -> anyhow::Result<Session> {
    let applier = Arc::new(TraceApplier::new());
    let coordinator = build(config, applier.clone())?;

    let outcome = coordinator.init(app_version).await?;
    Ok(Session {
        coordinator,
        applier,
        outcome,
    })
}

/// 읽기 전용 조회용 코디네이터
///
/// 버전 마커를 읽거나 쓰지 않고, 디렉토리도 만들지 않는다.
pub async fn inspect(config: HotfixConfig) -> anyhow::Result<PatchCoordinator> {
    let coordinator = build(config, Arc::new(TraceApplier::new()))?;
    if coordinator.store().dir().is_dir() {
        coordinator.store().load_existing().await?;
    }
    Ok(coordinator)
}

/// 글로벌/프로젝트 설정에 CLI 옵션 반영
pub fn resolve_config(data_dir: Option<PathBuf>) -> anyhow::Result<HotfixConfig> {
    let mut config = HotfixConfig::load()?;
    if let Some(dir) = data_dir {
        config = config.data_dir(dir);
    }
    Ok(config)
}

// ============================================================================
// Commands
// ============================================================================

pub fn init(session: &Session) {
    match &session.outcome {
        InitOutcome::Purged(report) => {
            println!("Version changed: {}", describe_purge(report));
        }
        InitOutcome::Loaded(count) => {
            println!("✓ {} patch(es) ready", count);
        }
    }
}

pub async fn add(session: &Session, path: &Path) -> anyhow::Result<()> {
    let coordinator = &session.coordinator;
    // 저장된 패치는 다시 적용하지 않고 와일드카드만 바인딩
    coordinator
        .scopes()
        .register_wildcard(ScopeHandle::new(MAIN_SCOPE));
    let before = session.applier.applied();

    match coordinator.add_patch(path).await? {
        Some(record) => println!(
            "✓ Added {} ({} apply call(s))",
            record.name(),
            session.applier.applied() - before
        ),
        None => println!("Patch {} is already loaded", path.display()),
    }
    Ok(())
}

pub async fn load(session: &Session, scope: Option<String>) {
    let coordinator = &session.coordinator;
    let report = match scope {
        Some(name) => {
            let handle = ScopeHandle::new(name.clone());
            coordinator.load_patch_for(&name, handle).await
        }
        None => coordinator.load_patch().await,
    };

    println!(
        "Applied {}, failed {}, pending {}",
        report.applied, report.failed, report.skipped
    );
}

pub fn list(coordinator: &PatchCoordinator, as_json: bool) -> anyhow::Result<()> {
    let patches = coordinator.patches();

    if as_json {
        let items: Vec<_> = patches.iter().map(|p| record_json(p)).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if patches.is_empty() {
        println!("No patches found.");
        return Ok(());
    }

    println!("{:<24} {:<28} {:<22} {}", "NAME", "FILE", "CREATED", "SCOPES");
    println!("{}", "-".repeat(90));
    for line in patches.iter().map(|p| format_row(p)) {
        println!("{}", line);
    }
    Ok(())
}

pub async fn clear(session: &Session) -> anyhow::Result<()> {
    let report = session.coordinator.remove_all_patches().await?;
    println!("{}", describe_purge(&report));
    Ok(())
}

// ============================================================================
// Formatting
// ============================================================================

fn describe_purge(report: &PurgeReport) -> String {
    if report.is_complete() {
        format!("removed {} file(s)", report.removed.len())
    } else {
        format!(
            "removed {} file(s), {} left behind",
            report.removed.len(),
            report.failed.len()
        )
    }
}

fn format_row(record: &PatchRecord) -> String {
    let scopes: Vec<_> = record.target_scopes().collect();
    format!(
        "{:<24} {:<28} {:<22} {}",
        record.name(),
        record.file_name(),
        record.created_time().format("%Y-%m-%d %H:%M:%S"),
        scopes.join(",")
    )
}

fn record_json(record: &PatchRecord) -> serde_json::Value {
    let scopes: serde_json::Map<String, serde_json::Value> = record
        .target_scopes()
        .map(|scope| {
            (
                scope.to_string(),
                json!(record.classes(scope).unwrap_or_default()),
            )
        })
        .collect();

    json!({
        "name": record.name(),
        "file": record.file_name(),
        "createdTime": record.created_time(),
        "scopes": scopes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotfix_core::PatchManifest;
    use tempfile::TempDir;

    fn write_patch(dir: &Path, file: &str) -> PathBuf {
        let path = dir.join(file);
        let manifest = json!({
            "name": "fix-login",
            "createdTime": "2024-05-01T10:00:00Z",
            "scopes": { "main": ["LoginActivity"], "plugin": ["Widget"] },
        });
        std::fs::write(&path, manifest.to_string()).unwrap();
        path
    }

    fn config(temp: &TempDir) -> HotfixConfig {
        HotfixConfig::new().data_dir(temp.path().join("data"))
    }

    #[tokio::test]
    async fn test_add_then_list_across_sessions() {
        let temp = TempDir::new().unwrap();
        let src = write_patch(temp.path(), "fix.apatch");

        let session = open(config(&temp), "1.0").await.unwrap();
        add(&session, &src).await.unwrap();
        // main 은 와일드카드로 즉시 적용, plugin 도 와일드카드가 받음
        assert_eq!(session.applier.applied(), 2);

        let session = open(config(&temp), "1.0").await.unwrap();
        assert_eq!(session.outcome, InitOutcome::Loaded(1));
        assert_eq!(session.coordinator.patches().len(), 1);
    }

    #[tokio::test]
    async fn test_add_does_not_reapply_stored_patches() {
        let temp = TempDir::new().unwrap();
        let first = write_patch(temp.path(), "first.apatch");
        let second = write_patch(temp.path(), "second.apatch");

        let session = open(config(&temp), "1.0").await.unwrap();
        add(&session, &first).await.unwrap();

        let session = open(config(&temp), "1.0").await.unwrap();
        add(&session, &second).await.unwrap();
        // second.apatch 의 두 scope 만 적용
        assert_eq!(session.applier.applied(), 2);
        assert_eq!(session.coordinator.patches().len(), 2);
    }

    #[tokio::test]
    async fn test_list_ignores_version_mismatch() {
        let temp = TempDir::new().unwrap();
        let src = write_patch(temp.path(), "fix.apatch");
        let session = open(config(&temp), "3.1").await.unwrap();
        add(&session, &src).await.unwrap();

        let coordinator = inspect(config(&temp)).await.unwrap();
        list(&coordinator, true).unwrap();

        assert_eq!(coordinator.patches().len(), 1);
        assert!(coordinator.store().dir().join("fix.apatch").is_file());
        assert_eq!(
            coordinator.version_gate().current_marker().unwrap(),
            Some("3.1".to_string())
        );
    }

    #[tokio::test]
    async fn test_inspect_missing_data_dir_creates_nothing() {
        let temp = TempDir::new().unwrap();

        let coordinator = inspect(config(&temp)).await.unwrap();

        assert!(coordinator.patches().is_empty());
        assert!(!temp.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_load_named_scope_only() {
        let temp = TempDir::new().unwrap();
        let src = write_patch(temp.path(), "fix.apatch");
        let session = open(config(&temp), "1.0").await.unwrap();
        add(&session, &src).await.unwrap();

        let session = open(config(&temp), "1.0").await.unwrap();
        load(&session, Some("plugin".to_string())).await;
        assert_eq!(session.applier.applied(), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_state() {
        let temp = TempDir::new().unwrap();
        let src = write_patch(temp.path(), "fix.apatch");
        let session = open(config(&temp), "1.0").await.unwrap();
        add(&session, &src).await.unwrap();

        clear(&session).await.unwrap();
        assert!(session.coordinator.patches().is_empty());
        assert_eq!(session.applier.cleaned(), 1);
        assert_eq!(
            session.coordinator.version_gate().current_marker().unwrap(),
            None
        );
    }

    #[test]
    fn test_record_json_shape() {
        let manifest = PatchManifest::new("fix", "2024-05-01T10:00:00Z".parse().unwrap())
            .with_scope("main", vec!["A".to_string()]);
        let record = PatchRecord::from_manifest("/tmp/fix.apatch", manifest).unwrap();

        let value = record_json(&record);
        assert_eq!(value["name"], "fix");
        assert_eq!(value["file"], "fix.apatch");
        assert_eq!(value["scopes"]["main"][0], "A");
    }

    #[test]
    fn test_describe_purge() {
        let report = PurgeReport {
            removed: vec![PathBuf::from("a"), PathBuf::from("b")],
            failed: vec![PathBuf::from("c")],
        };
        assert_eq!(describe_purge(&report), "removed 2 file(s), 1 left behind");
        assert_eq!(describe_purge(&PurgeReport::default()), "removed 0 file(s)");
    }
}
