use bridge_canonical::{
    CanonicalTranslation, EntityType, SystemId, TransformationConfiguration, TranslationStatus,
};
use bridge_store::{
    ConfigurationRepository, FsMigrationStore, MemoryMigrationStore, StoreResult,
    TranslationRepository,
};
use chrono::Utc;

fn attempt(status: TranslationStatus, target_id: &str) -> CanonicalTranslation {
    CanonicalTranslation {
        source_system: SystemId::new("zephyr"),
        target_system: SystemId::new("qtest"),
        entity_type: EntityType::TestCase,
        source_id: "TC-1".to_string(),
        target_id: target_id.to_string(),
        status,
        timestamp: Utc::now(),
        source_payload: None,
        target_payload: None,
        messages: Vec::new(),
    }
}

async fn exercise_append_only_translations<T: TranslationRepository>(store: &T) -> StoreResult<()> {
    store
        .append_translation(attempt(TranslationStatus::Error, "failed"))
        .await?;
    store
        .append_translation(attempt(TranslationStatus::Success, "101"))
        .await?;

    let history = store
        .list_translations("zephyr:qtest:test-case:TC-1")
        .await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, TranslationStatus::Error);
    assert_eq!(history[1].target_id, "101");

    let latest = store
        .latest_translation("zephyr:qtest:test-case:TC-1")
        .await?
        .expect("latest attempt should exist");
    assert_eq!(latest.status, TranslationStatus::Success);

    assert!(store.list_translations("missing").await?.is_empty());
    Ok(())
}

async fn exercise_configurations<T: ConfigurationRepository>(store: &T) -> StoreResult<()> {
    let mut config = TransformationConfiguration::new(
        "cfg-1",
        "default",
        SystemId::new("zephyr"),
        SystemId::new("qtest"),
    );
    config
        .field_mappings
        .insert("Component".to_string(), "Module".to_string());
    store.save_configuration(config.clone()).await?;

    let loaded = store
        .get_configuration("cfg-1")
        .await?
        .expect("configuration should exist");
    assert_eq!(loaded, config);
    assert_eq!(store.list_configurations().await?.len(), 1);
    assert!(store.get_configuration("cfg-2").await?.is_none());
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn memory_store_translation_history_is_append_only() {
    let store = MemoryMigrationStore::new();
    exercise_append_only_translations(&store)
        .await
        .expect("memory store should keep history");
}

#[tokio::test(flavor = "current_thread")]
async fn fs_store_translation_history_is_append_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsMigrationStore::new(dir.path()).expect("open store");
    exercise_append_only_translations(&store)
        .await
        .expect("fs store should keep history");

    let reopened = FsMigrationStore::new(dir.path()).expect("reopen store");
    let history = reopened
        .list_translations("zephyr:qtest:test-case:TC-1")
        .await
        .expect("list after reopen");
    assert_eq!(history.len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn configurations_round_trip_in_both_stores() {
    let memory = MemoryMigrationStore::new();
    exercise_configurations(&memory)
        .await
        .expect("memory configurations");

    let dir = tempfile::tempdir().expect("tempdir");
    let fs_store = FsMigrationStore::new(dir.path()).expect("open store");
    exercise_configurations(&fs_store)
        .await
        .expect("fs configurations");
}
