use crate::memory::{MemoryMigrationStore, MemoryState};
use crate::store::{
    ConfigurationRepository, MigrationJobRepository, StoreError, StoreResult,
    TranslationRepository,
};
use bridge_canonical::{CanonicalTranslation, MigrationJob, TransformationConfiguration};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const STATE_FILE_NAME: &str = "migration-state.json";

/// Memory store that snapshots its whole state to one JSON file after
/// every write. Snapshots are taken and written one at a time, so the
/// file never goes back to an older state.
#[derive(Clone, Debug)]
pub struct FsMigrationStore {
    state_file: PathBuf,
    inner: MemoryMigrationStore,
    persist_lock: Arc<Mutex<()>>,
}

impl FsMigrationStore {
    pub fn new<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        fs::create_dir_all(root.as_ref())
            .map_err(|err| StoreError::Backend(format!("create fs store root failed: {err}")))?;
        let state_file = root.as_ref().join(STATE_FILE_NAME);
        let state = if state_file.exists() {
            let raw = fs::read(&state_file)
                .map_err(|err| StoreError::Backend(format!("read state file failed: {err}")))?;
            serde_json::from_slice::<MemoryState>(&raw)
                .map_err(|err| StoreError::Serialization(err.to_string()))?
        } else {
            MemoryState::default()
        };

        Ok(Self {
            state_file,
            inner: MemoryMigrationStore::from_state(state),
            persist_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    fn persist(&self) -> StoreResult<()> {
        let _guard = self
            .persist_lock
            .lock()
            .map_err(|_| StoreError::Backend("fs store persist mutex poisoned".to_string()))?;
        let snapshot = self.inner.snapshot()?;
        let raw = serde_json::to_vec_pretty(&snapshot)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        let tmp = self.state_file.with_extension("json.tmp");
        fs::write(&tmp, raw)
            .map_err(|err| StoreError::Backend(format!("write state file failed: {err}")))?;
        fs::rename(&tmp, &self.state_file)
            .map_err(|err| StoreError::Backend(format!("rename state file failed: {err}")))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MigrationJobRepository for FsMigrationStore {
    async fn save_job(&self, job: MigrationJob) -> StoreResult<()> {
        self.inner.save_job(job).await?;
        self.persist()
    }

    async fn get_job(&self, job_id: &str) -> StoreResult<Option<MigrationJob>> {
        self.inner.get_job(job_id).await
    }

    async fn list_jobs(&self) -> StoreResult<Vec<MigrationJob>> {
        self.inner.list_jobs().await
    }
}

#[async_trait::async_trait]
impl TranslationRepository for FsMigrationStore {
    async fn append_translation(&self, translation: CanonicalTranslation) -> StoreResult<()> {
        self.inner.append_translation(translation).await?;
        self.persist()
    }

    async fn list_translations(&self, key: &str) -> StoreResult<Vec<CanonicalTranslation>> {
        self.inner.list_translations(key).await
    }
}

#[async_trait::async_trait]
impl ConfigurationRepository for FsMigrationStore {
    async fn save_configuration(
        &self,
        configuration: TransformationConfiguration,
    ) -> StoreResult<()> {
        self.inner.save_configuration(configuration).await?;
        self.persist()
    }

    async fn get_configuration(
        &self,
        configuration_id: &str,
    ) -> StoreResult<Option<TransformationConfiguration>> {
        self.inner.get_configuration(configuration_id).await
    }

    async fn list_configurations(&self) -> StoreResult<Vec<TransformationConfiguration>> {
        self.inner.list_configurations().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_canonical::{EntityType, SystemId};

    #[tokio::test(flavor = "current_thread")]
    async fn reopen_restores_saved_jobs() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = FsMigrationStore::new(dir.path()).expect("open store");
            store
                .save_job(MigrationJob::new(
                    "job-1",
                    "first",
                    SystemId::new("zephyr"),
                    SystemId::new("qtest"),
                    vec![EntityType::TestCase],
                ))
                .await
                .expect("save job");
            assert!(store.state_file().exists());
        }

        let reopened = FsMigrationStore::new(dir.path()).expect("reopen store");
        let job = reopened
            .get_job("job-1")
            .await
            .expect("get job")
            .expect("job should persist");
        assert_eq!(job.name, "first");
    }

    #[test]
    fn concurrent_writers_all_persist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsMigrationStore::new(dir.path()).expect("open store");
        std::thread::scope(|scope| {
            let writers: Vec<_> = (0..8)
                .map(|index| {
                    let store = store.clone();
                    scope.spawn(move || {
                        let runtime = tokio::runtime::Builder::new_current_thread()
                            .build()
                            .expect("runtime");
                        runtime.block_on(store.save_job(MigrationJob::new(
                            format!("job-{index}"),
                            "parallel",
                            SystemId::new("zephyr"),
                            SystemId::new("qtest"),
                            vec![EntityType::TestCase],
                        )))
                    })
                })
                .collect();
            for writer in writers {
                writer
                    .join()
                    .expect("writer thread should not panic")
                    .expect("save should succeed");
            }
        });

        assert!(!store.state_file().with_extension("json.tmp").exists());
        let reopened = FsMigrationStore::new(dir.path()).expect("reopen store");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let jobs = runtime.block_on(reopened.list_jobs()).expect("list jobs");
        assert_eq!(jobs.len(), 8);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn corrupt_state_file_is_reported_as_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(STATE_FILE_NAME), b"{not json").expect("write garbage");
        let error = FsMigrationStore::new(dir.path()).expect_err("open should fail");
        assert!(matches!(error, StoreError::Serialization(_)));
    }
}
