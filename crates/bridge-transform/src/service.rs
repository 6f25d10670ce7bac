use crate::{
    MapperRegistry, TransformOutcome, TransformationContext, TransformationError, Transformer,
};
use bridge_canonical::{
    EntityType, FieldMappings, ItemOutcome, JobStatus, MigrationJob, Payload, SystemId,
    TranslationStatus, ValueMappings,
};
use bridge_store::{ConfigurationRepository, MigrationJobRepository, TranslationRepository};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Request to open a migration job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMigrationJob {
    pub name: String,
    pub source_system: SystemId,
    pub target_system: SystemId,
    pub entity_types: Vec<EntityType>,
    #[serde(default)]
    pub source_config: Value,
    #[serde(default)]
    pub target_config: Value,
    #[serde(default)]
    pub field_mappings: FieldMappings,
    #[serde(default)]
    pub value_mappings: ValueMappings,
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,
    #[serde(default)]
    pub total_items: u64,
}

impl NewMigrationJob {
    pub fn new(
        name: impl Into<String>,
        source_system: SystemId,
        target_system: SystemId,
        entity_types: Vec<EntityType>,
    ) -> Self {
        Self {
            name: name.into(),
            source_system,
            target_system,
            entity_types,
            source_config: Value::Null,
            target_config: Value::Null,
            field_mappings: FieldMappings::new(),
            value_mappings: ValueMappings::new(),
            filters: BTreeMap::new(),
            total_items: 0,
        }
    }

    pub fn with_total_items(mut self, total_items: u64) -> Self {
        self.total_items = total_items;
        self
    }

    pub fn with_mappings(mut self, field_mappings: FieldMappings, value_mappings: ValueMappings) -> Self {
        self.field_mappings = field_mappings;
        self.value_mappings = value_mappings;
        self
    }
}

/// Migration-job bookkeeping around a [`Transformer`].
///
/// Owns no retry or scheduling policy. Each `transform` call converts one
/// item, appends its translation to the translation repository and, when
/// the call names a migration job, counts the item on that job.
pub struct TransformationService {
    transformer: Transformer,
    jobs: Arc<dyn MigrationJobRepository>,
    translations: Arc<dyn TranslationRepository>,
    configurations: Option<Arc<dyn ConfigurationRepository>>,
    job_updates: Mutex<()>,
}

impl TransformationService {
    pub fn new(
        registry: Arc<MapperRegistry>,
        jobs: Arc<dyn MigrationJobRepository>,
        translations: Arc<dyn TranslationRepository>,
    ) -> Self {
        Self {
            transformer: Transformer::new(registry),
            jobs,
            translations,
            configurations: None,
            job_updates: Mutex::new(()),
        }
    }

    pub fn with_configurations(mut self, configurations: Arc<dyn ConfigurationRepository>) -> Self {
        self.configurations = Some(configurations);
        self
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    /// Allocates a fresh job id and stores the job as `CREATED` with zeroed
    /// counters.
    pub async fn create_migration_job(
        &self,
        request: NewMigrationJob,
    ) -> Result<MigrationJob, TransformationError> {
        let mut job = MigrationJob::new(
            Uuid::new_v4().to_string(),
            request.name,
            request.source_system,
            request.target_system,
            request.entity_types,
        );
        job.source_config = request.source_config;
        job.target_config = request.target_config;
        job.field_mappings = request.field_mappings;
        job.value_mappings = request.value_mappings;
        job.filters = request.filters;
        job.set_total(request.total_items)?;

        self.jobs.save_job(job.clone()).await?;
        info!(
            job_id = %job.id,
            source = %job.source_system,
            target = %job.target_system,
            "migration job created"
        );
        Ok(job)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<MigrationJob, TransformationError> {
        self.jobs
            .get_job(job_id)
            .await?
            .ok_or_else(|| TransformationError::JobNotFound(job_id.to_string()))
    }

    pub async fn list_jobs(&self) -> Result<Vec<MigrationJob>, TransformationError> {
        Ok(self.jobs.list_jobs().await?)
    }

    pub async fn set_job_total(
        &self,
        job_id: &str,
        total_items: u64,
    ) -> Result<MigrationJob, TransformationError> {
        self.update_job(job_id, |job| job.set_total(total_items)).await
    }

    pub async fn start_job(&self, job_id: &str) -> Result<MigrationJob, TransformationError> {
        self.transition_job(job_id, JobStatus::Running).await
    }

    pub async fn pause_job(&self, job_id: &str) -> Result<MigrationJob, TransformationError> {
        self.transition_job(job_id, JobStatus::Paused).await
    }

    pub async fn complete_job(&self, job_id: &str) -> Result<MigrationJob, TransformationError> {
        self.transition_job(job_id, JobStatus::Completed).await
    }

    pub async fn fail_job(&self, job_id: &str) -> Result<MigrationJob, TransformationError> {
        self.transition_job(job_id, JobStatus::Failed).await
    }

    /// Converts one item. With a `migration_id`, the job's mapping tables
    /// build the context and the item is counted on the job.
    pub async fn transform(
        &self,
        source_system: &SystemId,
        target_system: &SystemId,
        entity_type: EntityType,
        source: &Payload,
        migration_id: Option<&str>,
    ) -> Result<Payload, TransformationError> {
        let context = match migration_id {
            Some(job_id) => {
                let job = self.get_job(job_id).await?;
                let mut context =
                    TransformationContext::new(source_system.clone(), target_system.clone())
                        .with_migration_id(job.id);
                context.field_mappings = job.field_mappings;
                context.value_mappings = job.value_mappings;
                context
            }
            None => TransformationContext::new(source_system.clone(), target_system.clone()),
        };
        self.transform_in_context(entity_type, source, &context).await
    }

    /// Converts one item with the mapping tables and options of a stored
    /// configuration.
    pub async fn transform_with_configuration(
        &self,
        configuration_id: &str,
        entity_type: EntityType,
        source: &Payload,
        migration_id: Option<&str>,
    ) -> Result<Payload, TransformationError> {
        let configurations = self
            .configurations
            .as_ref()
            .ok_or(TransformationError::ConfigurationsUnavailable)?;
        let configuration = configurations
            .get_configuration(configuration_id)
            .await?
            .ok_or_else(|| TransformationError::ConfigurationNotFound(configuration_id.to_string()))?;

        let mut context = TransformationContext::from(&configuration);
        if let Some(job_id) = migration_id {
            context = context.with_migration_id(self.get_job(job_id).await?.id);
        }
        self.transform_in_context(entity_type, source, &context).await
    }

    /// Converts one item with a caller-built context. The migration id on
    /// the context, if any, selects the job to count against; a job already
    /// at its total rejects the item before anything is converted or stored.
    pub async fn transform_in_context(
        &self,
        entity_type: EntityType,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<Payload, TransformationError> {
        let Some(job_id) = context.migration_id.as_deref() else {
            let outcome = self.convert_item(entity_type, source, context)?;
            self.translations
                .append_translation(outcome.translation)
                .await?;
            return outcome.result;
        };

        let _guard = self.job_updates.lock().await;
        let mut job = self.get_job(job_id).await?;
        job.ensure_capacity()?;
        let outcome = self.convert_item(entity_type, source, context)?;
        let item = match outcome.translation.status {
            TranslationStatus::Success => ItemOutcome::Success,
            TranslationStatus::Partial => ItemOutcome::Warning,
            TranslationStatus::Error => ItemOutcome::Error,
        };
        job.record_outcome(item)?;
        self.translations
            .append_translation(outcome.translation)
            .await?;
        self.jobs.save_job(job).await?;
        debug!(job_id, outcome = ?item, "item counted");
        outcome.result
    }

    fn convert_item(
        &self,
        entity_type: EntityType,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<TransformOutcome, TransformationError> {
        self.transformer.transform_detailed(
            &context.source_system,
            &context.target_system,
            entity_type,
            source,
            Some(context),
        )
    }

    async fn transition_job(
        &self,
        job_id: &str,
        next: JobStatus,
    ) -> Result<MigrationJob, TransformationError> {
        let job = self.update_job(job_id, |job| job.transition(next)).await?;
        info!(job_id, status = %job.status, "migration job status changed");
        Ok(job)
    }

    /// Read-modify-write of one job, serialized across concurrent items.
    async fn update_job<F>(&self, job_id: &str, change: F) -> Result<MigrationJob, TransformationError>
    where
        F: FnOnce(&mut MigrationJob) -> Result<(), bridge_canonical::CanonicalError>,
    {
        let _guard = self.job_updates.lock().await;
        let mut job = self.get_job(job_id).await?;
        change(&mut job)?;
        self.jobs.save_job(job.clone()).await?;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_registry;
    use bridge_canonical::{CanonicalError, payload_from_value, translation_key};
    use bridge_store::MemoryMigrationStore;
    use serde_json::json;

    fn service(store: &Arc<MemoryMigrationStore>) -> TransformationService {
        TransformationService::new(
            Arc::new(default_registry()),
            store.clone(),
            store.clone(),
        )
        .with_configurations(store.clone())
    }

    fn zephyr_case(key: &str, status: &str) -> Payload {
        payload_from_value(json!({
            "key": key,
            "name": "Search filters",
            "status": status,
            "testScript": { "steps": [{ "index": 1, "description": "Type query" }] }
        }))
        .expect("fixture should be an object")
    }

    fn request(total: u64) -> NewMigrationJob {
        NewMigrationJob::new(
            "zephyr to qtest",
            SystemId::new("zephyr"),
            SystemId::new("qtest"),
            vec![EntityType::TestCase],
        )
        .with_total_items(total)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn create_migration_job_stores_created_job() {
        let store = Arc::new(MemoryMigrationStore::new());
        let service = service(&store);
        let first = service
            .create_migration_job(request(3))
            .await
            .expect("job should be created");
        let second = service
            .create_migration_job(request(3))
            .await
            .expect("job should be created");

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, JobStatus::Created);
        assert_eq!(first.processed_items, 0);
        assert_eq!(
            service.get_job(&first.id).await.expect("job should load"),
            first
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn transform_counts_outcomes_on_job() {
        let store = Arc::new(MemoryMigrationStore::new());
        let service = service(&store);
        let job = service
            .create_migration_job(request(3))
            .await
            .expect("job should be created");
        service.start_job(&job.id).await.expect("job should start");

        let zephyr = SystemId::new("zephyr");
        let qtest = SystemId::new("qtest");
        service
            .transform(&zephyr, &qtest, EntityType::TestCase, &zephyr_case("TC-1", "Ready"), Some(&job.id))
            .await
            .expect("clean item");
        service
            .transform(&zephyr, &qtest, EntityType::TestCase, &zephyr_case("TC-2", "Limbo"), Some(&job.id))
            .await
            .expect("lenient item");
        let mut broken = zephyr_case("TC-3", "Ready");
        broken.remove("name");
        service
            .transform(&zephyr, &qtest, EntityType::TestCase, &broken, Some(&job.id))
            .await
            .expect_err("broken item should fail");

        let job = service.get_job(&job.id).await.expect("job should load");
        assert_eq!(job.processed_items, 3);
        assert_eq!(job.success_count, 1);
        assert_eq!(job.warning_count, 1);
        assert_eq!(job.error_count, 1);

        let history = store
            .list_translations(&translation_key(&zephyr, &qtest, EntityType::TestCase, "TC-3"))
            .await
            .expect("translations should load");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, TranslationStatus::Error);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn transform_past_total_expected_counter_overflow() {
        let store = Arc::new(MemoryMigrationStore::new());
        let service = service(&store);
        let job = service
            .create_migration_job(request(1))
            .await
            .expect("job should be created");
        let zephyr = SystemId::new("zephyr");
        let qtest = SystemId::new("qtest");
        service
            .transform(&zephyr, &qtest, EntityType::TestCase, &zephyr_case("TC-1", "Ready"), Some(&job.id))
            .await
            .expect("first item fits");
        let error = service
            .transform(&zephyr, &qtest, EntityType::TestCase, &zephyr_case("TC-2", "Ready"), Some(&job.id))
            .await
            .expect_err("second item exceeds total");
        assert!(matches!(
            error,
            TransformationError::Job(CanonicalError::CounterOverflow { .. })
        ));

        let rejected = store
            .list_translations(&translation_key(&zephyr, &qtest, EntityType::TestCase, "TC-2"))
            .await
            .expect("translations should load");
        assert!(rejected.is_empty());
        let job = service.get_job(&job.id).await.expect("job should load");
        assert_eq!(job.processed_items, 1);
        assert_eq!(job.success_count, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn job_transitions_follow_lifecycle() {
        let store = Arc::new(MemoryMigrationStore::new());
        let service = service(&store);
        let job = service
            .create_migration_job(request(0))
            .await
            .expect("job should be created");

        let error = service
            .complete_job(&job.id)
            .await
            .expect_err("created job cannot complete");
        assert!(matches!(
            error,
            TransformationError::Job(CanonicalError::InvalidTransition { .. })
        ));

        service.start_job(&job.id).await.expect("start");
        service.pause_job(&job.id).await.expect("pause");
        service.start_job(&job.id).await.expect("resume");
        let done = service.complete_job(&job.id).await.expect("complete");
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unknown_job_expected_not_found() {
        let store = Arc::new(MemoryMigrationStore::new());
        let service = service(&store);
        let error = service
            .transform(
                &SystemId::new("zephyr"),
                &SystemId::new("qtest"),
                EntityType::TestCase,
                &zephyr_case("TC-1", "Ready"),
                Some("missing"),
            )
            .await
            .expect_err("unknown job");
        assert!(matches!(error, TransformationError::JobNotFound(id) if id == "missing"));
    }
}
