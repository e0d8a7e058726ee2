//! Patch Store - 패치 디렉토리와 정렬된 패치 목록 관리
//!
//! 관리 디렉토리는 이 저장소만 쓴다. 디렉토리 변경(복사/삭제/스캔)은
//! 디렉토리 락으로 직렬화하고, 메모리 목록은 별도의 읽기/쓰기 락으로 보호한다.

use super::applier::Applier;
use super::archive::ArchiveReader;
use super::record::{PatchKey, PatchRecord};
use hotfix_foundation::{Error, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

// ============================================================================
// PurgeReport - 전체 삭제 결과
// ============================================================================

/// 전체 삭제 결과 (best-effort)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// 삭제된 파일
    pub removed: Vec<PathBuf>,

    /// 삭제에 실패한 파일
    pub failed: Vec<PathBuf>,
}

impl PurgeReport {
    /// 모든 파일이 삭제되었는지
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ============================================================================
// Index - 정렬 키 기반 아레나
// ============================================================================

#[derive(Default)]
struct Index {
    /// 정렬 키 -> 레코드 (오름차순 순회)
    by_key: BTreeMap<PatchKey, Arc<PatchRecord>>,

    /// 파일명 -> 정렬 키 (중복 제거)
    by_file: HashMap<String, PatchKey>,
}

impl Index {
    /// 삽입. 같은 파일의 동일 레코드가 이미 있으면 false
    fn insert(&mut self, record: Arc<PatchRecord>) -> bool {
        let key = record.key();
        if let Some(existing) = self.by_file.get(record.file_name()) {
            if *existing == key {
                return false;
            }
            let stale = existing.clone();
            self.by_key.remove(&stale);
        }
        self.by_file.insert(record.file_name().to_string(), key.clone());
        self.by_key.insert(key, record);
        true
    }

    fn clear(&mut self) {
        self.by_key.clear();
        self.by_file.clear();
    }
}

// ============================================================================
// PatchStore
// ============================================================================

/// 패치 저장소
pub struct PatchStore {
    /// 관리 디렉토리
    dir: PathBuf,

    /// 패치 파일 확장자
    suffix: String,

    /// 아카이브 메타데이터 파서
    reader: Arc<dyn ArchiveReader>,

    /// 정렬된 패치 목록
    records: RwLock<Index>,

    /// 디렉토리 변경 직렬화
    dir_lock: Mutex<()>,
}

impl PatchStore {
    /// 새 저장소 생성 (디렉토리는 `init_directory` 에서 준비)
    pub fn new(
        dir: impl Into<PathBuf>,
        suffix: impl Into<String>,
        reader: Arc<dyn ArchiveReader>,
    ) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
            reader,
            records: RwLock::new(Index::default()),
            dir_lock: Mutex::new(()),
        }
    }

    /// 관리 디렉토리 경로
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 패치 파일 확장자
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    fn is_patch_name(&self, name: &str) -> bool {
        name.ends_with(&self.suffix) && !name.starts_with('.')
    }

    // ========================================================================
    // 디렉토리
    // ========================================================================

    /// 관리 디렉토리 준비
    ///
    /// 경로에 파일이 있으면 삭제하고 `NotADirectory` 로 실패한다.
    /// 호출자는 환경을 고친 뒤 다시 시도해야 한다.
    pub async fn init_directory(&self) -> Result<()> {
        let _guard = self.dir_lock.lock().await;

        match fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => {
                error!("Patch dir {:?} is not a directory, removing it", self.dir);
                if let Err(e) = fs::remove_file(&self.dir).await {
                    error!("Failed to remove {:?}: {}", self.dir, e);
                }
                Err(Error::NotADirectory(self.dir.clone()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.dir).await.map_err(|source| {
                    error!("Patch dir create error: {:?}", self.dir);
                    Error::DirectoryCreate {
                        path: self.dir.clone(),
                        source,
                    }
                })?;
                debug!("Created patch dir {:?}", self.dir);
                Ok(())
            }
            Err(e) => Err(Error::Directory(format!(
                "Cannot inspect {}: {}",
                self.dir.display(),
                e
            ))),
        }
    }

    // ========================================================================
    // 로드 / 추가
    // ========================================================================

    /// 디렉토리의 모든 패치 파일 로드
    ///
    /// 파싱 실패한 파일은 로그 후 건너뛴다. 새로 등록된 레코드 수를 반환한다.
    pub async fn load_existing(&self) -> Result<usize> {
        let _guard = self.dir_lock.lock().await;

        let mut entries = fs::read_dir(&self.dir).await.map_err(|e| {
            Error::Directory(format!("Cannot read {}: {}", self.dir.display(), e))
        })?;

        let mut loaded = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            Error::Directory(format!("Cannot read {}: {}", self.dir.display(), e))
        })? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !self.is_patch_name(&name) {
                continue;
            }
            if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let path = entry.path();
            match PatchRecord::parse(&path, self.reader.as_ref()).await {
                Ok(record) => {
                    debug!(
                        "Found patch {} ({}) created at {}",
                        record.name(),
                        name,
                        record.created_time()
                    );
                    if self.records.write().insert(Arc::new(record)) {
                        loaded += 1;
                    }
                }
                Err(e) => warn!("Skipping unreadable patch {}: {}", name, e),
            }
        }

        info!("Loaded {} patches from {:?}", loaded, self.dir);
        Ok(loaded)
    }

    /// 런타임에 패치 추가
    ///
    /// 같은 이름의 파일이 이미 관리 디렉토리에 있으면 `None` (이미 로드됨).
    pub async fn add(&self, source: &Path) -> Result<Option<Arc<PatchRecord>>> {
        match fs::metadata(source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(Error::InvalidInput(format!(
                    "Patch source is not a file: {}",
                    source.display()
                )))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(source.to_path_buf()))
            }
            Err(e) => return Err(Error::Io(e)),
        }

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidInput(format!("Patch path has no file name: {}", source.display()))
            })?;
        if !self.is_patch_name(&name) {
            return Err(Error::InvalidInput(format!(
                "Patch file name must end with {}: {}",
                self.suffix, name
            )));
        }

        let _guard = self.dir_lock.lock().await;

        let dest = self.dir.join(&name);
        if fs::metadata(&dest).await.is_ok() {
            debug!("Patch [{}] has already been loaded", source.display());
            return Ok(None);
        }

        // 임시 이름으로 복사 후 rename: 스캐너가 반쯤 복사된 파일을 보지 않도록
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()));
        if let Err(e) = fs::copy(source, &tmp).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(Error::Io(e));
        }
        if let Err(e) = fs::rename(&tmp, &dest).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(Error::Io(e));
        }

        match PatchRecord::parse(&dest, self.reader.as_ref()).await {
            Ok(record) => {
                let record = Arc::new(record);
                self.records.write().insert(Arc::clone(&record));
                info!(
                    "Added patch {} ({}) created at {}",
                    record.name(),
                    name,
                    record.created_time()
                );
                Ok(Some(record))
            }
            Err(e) => {
                warn!("Rejecting unreadable patch {}: {}", name, e);
                if let Err(rm) = fs::remove_file(&dest).await {
                    error!("{} delete error: {}", name, rm);
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // 삭제
    // ========================================================================

    /// 관리 디렉토리의 모든 파일 삭제 및 목록 비우기
    ///
    /// 파일마다 Applier 의 정리 훅을 먼저 호출한다. 개별 실패는 로그만 남기고
    /// 나머지 파일 처리를 계속한다.
    pub async fn remove_all(&self, applier: &dyn Applier) -> Result<PurgeReport> {
        let _guard = self.dir_lock.lock().await;

        self.records.write().clear();

        let mut report = PurgeReport::default();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
            Err(e) => {
                return Err(Error::Directory(format!(
                    "Cannot read {}: {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to list {:?}: {}", self.dir, e);
                    break;
                }
            };
            let path = entry.path();

            if let Err(e) = applier.remove_derived(&path).await {
                warn!("Failed to remove derived artifacts of {:?}: {}", path, e);
            }

            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            let removed = if is_dir {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };

            match removed {
                Ok(()) => report.removed.push(path),
                Err(e) if e.kind() == ErrorKind::NotFound => report.removed.push(path),
                Err(e) => {
                    error!("{:?} delete error: {}", path, e);
                    report.failed.push(path);
                }
            }
        }

        info!(
            "Removed {} patch files ({} failed)",
            report.removed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 생성 시각 오름차순 스냅샷
    ///
    /// 스냅샷 이후 추가된 패치는 보이지 않을 수 있다.
    pub fn snapshot(&self) -> Vec<Arc<PatchRecord>> {
        self.records.read().by_key.values().cloned().collect()
    }

    /// 파일명으로 조회
    pub fn get(&self, file_name: &str) -> Option<Arc<PatchRecord>> {
        let records = self.records.read();
        records
            .by_file
            .get(file_name)
            .and_then(|key| records.by_key.get(key))
            .cloned()
    }

    /// 패치 수
    pub fn len(&self) -> usize {
        self.records.read().by_key.len()
    }

    /// 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.records.read().by_key.is_empty()
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::applier::ScopeHandle;
    use crate::patch::archive::ManifestReader;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use tempfile::TempDir;

    struct NoopApplier {
        cleaned: SyncMutex<Vec<PathBuf>>,
        fail_cleanup: bool,
    }

    impl NoopApplier {
        fn new(fail_cleanup: bool) -> Self {
            Self {
                cleaned: SyncMutex::new(Vec::new()),
                fail_cleanup,
            }
        }
    }

    #[async_trait]
    impl Applier for NoopApplier {
        async fn apply(&self, _archive: &Path, _scope: &ScopeHandle, _units: &[String]) -> Result<()> {
            Ok(())
        }

        async fn remove_derived(&self, archive: &Path) -> Result<()> {
            self.cleaned.lock().push(archive.to_path_buf());
            if self.fail_cleanup {
                return Err(Error::apply(archive, "cache locked"));
            }
            Ok(())
        }
    }

    fn write_patch(dir: &Path, file: &str, created: &str, scope: &str) -> PathBuf {
        let path = dir.join(file);
        std::fs::write(
            &path,
            format!(
                r#"{{ "name": "{}", "createdTime": "{}", "scopes": {{ "{}": ["A"] }} }}"#,
                file, created, scope
            ),
        )
        .unwrap();
        path
    }

    async fn test_store() -> (PatchStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = PatchStore::new(
            temp.path().join("apatch"),
            ".apatch",
            Arc::new(ManifestReader),
        );
        store.init_directory().await.unwrap();
        (store, temp)
    }

    #[tokio::test]
    async fn test_init_directory_creates() {
        let (store, _temp) = test_store().await;
        assert!(store.dir().is_dir());
        // 두 번째 호출은 no-op
        store.init_directory().await.unwrap();
    }

    #[tokio::test]
    async fn test_init_directory_rejects_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("apatch");
        std::fs::write(&path, "not a dir").unwrap();

        let store = PatchStore::new(&path, ".apatch", Arc::new(ManifestReader));
        let err = store.init_directory().await.unwrap_err();

        assert!(matches!(err, Error::NotADirectory(_)));
        // 문제의 파일은 제거되어 재시도가 가능해야 함
        assert!(!path.exists());
        store.init_directory().await.unwrap();
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn test_load_existing_skips_bad_and_unrelated() {
        let (store, _temp) = test_store().await;
        write_patch(store.dir(), "p2.apatch", "2024-01-02T00:00:00Z", "core");
        write_patch(store.dir(), "p1.apatch", "2024-01-01T00:00:00Z", "core");
        std::fs::write(store.dir().join("broken.apatch"), "{ nope").unwrap();
        std::fs::write(store.dir().join("notes.txt"), "hello").unwrap();

        let loaded = store.load_existing().await.unwrap();
        assert_eq!(loaded, 2);

        let names: Vec<_> = store
            .snapshot()
            .iter()
            .map(|r| r.file_name().to_string())
            .collect();
        assert_eq!(names, vec!["p1.apatch", "p2.apatch"]);
    }

    #[tokio::test]
    async fn test_load_existing_twice_does_not_duplicate() {
        let (store, _temp) = test_store().await;
        write_patch(store.dir(), "p1.apatch", "2024-01-01T00:00:00Z", "core");

        assert_eq!(store.load_existing().await.unwrap(), 1);
        assert_eq!(store.load_existing().await.unwrap(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_add_copies_and_registers() {
        let (store, temp) = test_store().await;
        let src = write_patch(temp.path(), "fix.apatch", "2024-01-01T00:00:00Z", "core");

        let record = store.add(&src).await.unwrap().unwrap();
        assert_eq!(record.file(), store.dir().join("fix.apatch"));
        assert!(store.dir().join("fix.apatch").is_file());
        assert!(store.get("fix.apatch").is_some());
    }

    #[tokio::test]
    async fn test_add_twice_is_noop() {
        let (store, temp) = test_store().await;
        let src = write_patch(temp.path(), "fix.apatch", "2024-01-01T00:00:00Z", "core");

        assert!(store.add(&src).await.unwrap().is_some());
        assert!(store.add(&src).await.unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_add_missing_source() {
        let (store, temp) = test_store().await;
        let err = store
            .add(&temp.path().join("missing.apatch"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_add_wrong_suffix() {
        let (store, temp) = test_store().await;
        let src = temp.path().join("fix.zip");
        std::fs::write(&src, "{}").unwrap();

        let err = store.add(&src).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!store.dir().join("fix.zip").exists());
    }

    #[tokio::test]
    async fn test_add_unparsable_removes_copy() {
        let (store, temp) = test_store().await;
        let src = temp.path().join("bad.apatch");
        std::fs::write(&src, "garbage").unwrap();

        let err = store.add(&src).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(!store.dir().join("bad.apatch").exists());

        // 고친 뒤 재시도하면 등록되어야 함
        write_patch(temp.path(), "bad.apatch", "2024-01-01T00:00:00Z", "core");
        assert!(store.add(&src).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_timestamp_collision_keeps_both() {
        let (store, _temp) = test_store().await;
        write_patch(store.dir(), "b.apatch", "2024-01-01T00:00:00Z", "core");
        write_patch(store.dir(), "a.apatch", "2024-01-01T00:00:00Z", "core");

        store.load_existing().await.unwrap();
        let names: Vec<_> = store
            .snapshot()
            .iter()
            .map(|r| r.file_name().to_string())
            .collect();
        assert_eq!(names, vec!["a.apatch", "b.apatch"]);
    }

    #[tokio::test]
    async fn test_remove_all_is_best_effort() {
        let (store, _temp) = test_store().await;
        write_patch(store.dir(), "p1.apatch", "2024-01-01T00:00:00Z", "core");
        write_patch(store.dir(), "p2.apatch", "2024-01-02T00:00:00Z", "core");
        std::fs::create_dir(store.dir().join("p1.apatch.opt")).unwrap();
        store.load_existing().await.unwrap();

        // 정리 훅이 실패해도 삭제는 진행
        let applier = NoopApplier::new(true);
        let report = store.remove_all(&applier).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.removed.len(), 3);
        assert_eq!(applier.cleaned.lock().len(), 3);
        assert!(store.is_empty());
        assert_eq!(std::fs::read_dir(store.dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_remove_all_missing_dir() {
        let temp = TempDir::new().unwrap();
        let store = PatchStore::new(temp.path().join("nope"), ".apatch", Arc::new(ManifestReader));

        let report = store.remove_all(&NoopApplier::new(false)).await.unwrap();
        assert_eq!(report, PurgeReport::default());
    }
}
