use crate::store::{
    ConfigurationRepository, MigrationJobRepository, StoreError, StoreResult,
    TranslationRepository,
};
use bridge_canonical::{CanonicalTranslation, MigrationJob, TransformationConfiguration};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub(crate) struct MemoryState {
    pub jobs: BTreeMap<String, MigrationJob>,
    pub job_order: Vec<String>,
    pub translations: BTreeMap<String, Vec<CanonicalTranslation>>,
    pub configurations: BTreeMap<String, TransformationConfiguration>,
}

impl MemoryState {
    fn upsert_job(&mut self, job: MigrationJob) {
        if !self.jobs.contains_key(&job.id) {
            self.job_order.push(job.id.clone());
        }
        self.jobs.insert(job.id.clone(), job);
    }

    fn ordered_jobs(&self) -> Vec<MigrationJob> {
        self.job_order
            .iter()
            .filter_map(|id| self.jobs.get(id).cloned())
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryMigrationStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryMigrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: MemoryState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub(crate) fn snapshot(&self) -> StoreResult<MemoryState> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store mutex poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl MigrationJobRepository for MemoryMigrationStore {
    async fn save_job(&self, job: MigrationJob) -> StoreResult<()> {
        if job.id.trim().is_empty() {
            return Err(StoreError::InvalidInput("job id cannot be empty".to_string()));
        }
        self.lock()?.upsert_job(job);
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> StoreResult<Option<MigrationJob>> {
        Ok(self.lock()?.jobs.get(job_id).cloned())
    }

    async fn list_jobs(&self) -> StoreResult<Vec<MigrationJob>> {
        Ok(self.lock()?.ordered_jobs())
    }
}

#[async_trait::async_trait]
impl TranslationRepository for MemoryMigrationStore {
    async fn append_translation(&self, translation: CanonicalTranslation) -> StoreResult<()> {
        let key = translation.key();
        self.lock()?
            .translations
            .entry(key)
            .or_default()
            .push(translation);
        Ok(())
    }

    async fn list_translations(&self, key: &str) -> StoreResult<Vec<CanonicalTranslation>> {
        Ok(self
            .lock()?
            .translations
            .get(key)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl ConfigurationRepository for MemoryMigrationStore {
    async fn save_configuration(
        &self,
        configuration: TransformationConfiguration,
    ) -> StoreResult<()> {
        if configuration.id.trim().is_empty() {
            return Err(StoreError::InvalidInput(
                "configuration id cannot be empty".to_string(),
            ));
        }
        self.lock()?
            .configurations
            .insert(configuration.id.clone(), configuration);
        Ok(())
    }

    async fn get_configuration(
        &self,
        configuration_id: &str,
    ) -> StoreResult<Option<TransformationConfiguration>> {
        Ok(self.lock()?.configurations.get(configuration_id).cloned())
    }

    async fn list_configurations(&self) -> StoreResult<Vec<TransformationConfiguration>> {
        Ok(self.lock()?.configurations.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_canonical::{EntityType, SystemId};

    fn job(id: &str) -> MigrationJob {
        MigrationJob::new(
            id,
            "job",
            SystemId::new("zephyr"),
            SystemId::new("qtest"),
            vec![EntityType::TestCase],
        )
    }

    #[tokio::test(flavor = "current_thread")]
    async fn save_job_upserts_and_keeps_creation_order() {
        let store = MemoryMigrationStore::new();
        store.save_job(job("b")).await.expect("save b");
        store.save_job(job("a")).await.expect("save a");

        let mut updated = job("b");
        updated.total_items = 10;
        store.save_job(updated).await.expect("update b");

        let jobs = store.list_jobs().await.expect("list jobs");
        let ids: Vec<&str> = jobs.iter().map(|job| job.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(jobs[0].total_items, 10);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn save_job_rejects_empty_id() {
        let store = MemoryMigrationStore::new();
        let error = store.save_job(job(" ")).await.expect_err("empty id should fail");
        assert!(matches!(error, StoreError::InvalidInput(_)));
    }
}
