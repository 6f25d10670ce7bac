use bridge_canonical::{CanonicalTranslation, MigrationJob, TransformationConfiguration};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("resource not found: {resource} ({id})")]
    NotFound { resource: &'static str, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait::async_trait]
pub trait MigrationJobRepository: Send + Sync {
    /// Inserts or replaces the job under its id.
    async fn save_job(&self, job: MigrationJob) -> StoreResult<()>;

    async fn get_job(&self, job_id: &str) -> StoreResult<Option<MigrationJob>>;

    /// Jobs in creation order.
    async fn list_jobs(&self) -> StoreResult<Vec<MigrationJob>>;
}

#[async_trait::async_trait]
pub trait TranslationRepository: Send + Sync {
    /// Appends one attempt. Earlier attempts under the same key are kept.
    async fn append_translation(&self, translation: CanonicalTranslation) -> StoreResult<()>;

    /// All attempts recorded under `key`, oldest first.
    async fn list_translations(&self, key: &str) -> StoreResult<Vec<CanonicalTranslation>>;

    async fn latest_translation(&self, key: &str) -> StoreResult<Option<CanonicalTranslation>> {
        Ok(self.list_translations(key).await?.pop())
    }
}

#[async_trait::async_trait]
pub trait ConfigurationRepository: Send + Sync {
    async fn save_configuration(&self, configuration: TransformationConfiguration)
    -> StoreResult<()>;

    async fn get_configuration(
        &self,
        configuration_id: &str,
    ) -> StoreResult<Option<TransformationConfiguration>>;

    async fn list_configurations(&self) -> StoreResult<Vec<TransformationConfiguration>>;
}
