use crate::{
    MapperRegistry, MappingError, SharedMapper, TransformationContext, TransformationError,
};
use bridge_canonical::{
    CanonicalEntity, CanonicalTranslation, EntityType, FAILED_TARGET_ID, Payload, SystemId,
    TranslationStatus, translation_key,
};
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Source id recorded when the source mapper cannot identify the payload.
pub const UNKNOWN_SOURCE_ID: &str = "unknown";

/// Prefix for messages produced by the target mapper's validator.
pub const TARGET_MESSAGE_PREFIX: &str = "target: ";

/// A finished attempt: the ledger record plus what the caller gets back.
#[derive(Debug)]
pub struct TransformOutcome {
    pub translation: CanonicalTranslation,
    pub result: Result<Payload, TransformationError>,
}

/// Source, canonical and target side by side.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformPreview {
    pub source: Payload,
    pub canonical: CanonicalEntity,
    pub target: Payload,
    pub messages: Vec<String>,
}

struct Conversion {
    canonical: CanonicalEntity,
    target: Payload,
    messages: Vec<String>,
}

/// Pivots payloads between systems through the canonical model and keeps an
/// in-process ledger of every attempt, one entry per translation key.
pub struct Transformer {
    registry: Arc<MapperRegistry>,
    ledger: RwLock<IndexMap<String, CanonicalTranslation>>,
}

impl Transformer {
    pub fn new(registry: Arc<MapperRegistry>) -> Self {
        Self {
            registry,
            ledger: RwLock::new(IndexMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<MapperRegistry> {
        &self.registry
    }

    /// Converts `source` from `source_system`'s shape into `target_system`'s.
    ///
    /// Every attempt past mapper resolution is recorded in the ledger,
    /// including failed ones.
    pub fn transform(
        &self,
        source_system: &SystemId,
        target_system: &SystemId,
        entity_type: EntityType,
        source: &Payload,
        context: Option<&TransformationContext>,
    ) -> Result<Payload, TransformationError> {
        self.transform_detailed(source_system, target_system, entity_type, source, context)?
            .result
    }

    /// Like [`Transformer::transform`], but also hands back the recorded
    /// translation. The outer `Err` is reserved for configuration errors,
    /// which are never recorded.
    pub fn transform_detailed(
        &self,
        source_system: &SystemId,
        target_system: &SystemId,
        entity_type: EntityType,
        source: &Payload,
        context: Option<&TransformationContext>,
    ) -> Result<TransformOutcome, TransformationError> {
        let source_mapper = self.mapper(source_system, entity_type)?;
        let target_mapper = self.mapper(target_system, entity_type)?;

        let fallback;
        let context = match context {
            Some(context) => context,
            None => {
                fallback = TransformationContext::new(source_system.clone(), target_system.clone());
                &fallback
            }
        };

        let source_id = source_mapper
            .payload_id(source)
            .unwrap_or_else(|| UNKNOWN_SOURCE_ID.to_string());

        let outcome = match convert(&source_mapper, &target_mapper, source, context) {
            Ok(conversion) => {
                let status = if conversion.messages.is_empty() {
                    TranslationStatus::Success
                } else {
                    TranslationStatus::Partial
                };
                let target_id = target_mapper
                    .payload_id(&conversion.target)
                    .unwrap_or_else(|| conversion.canonical.id().to_string());
                let translation = CanonicalTranslation {
                    source_system: source_system.clone(),
                    target_system: target_system.clone(),
                    entity_type,
                    source_id: source_id.clone(),
                    target_id,
                    status,
                    timestamp: Utc::now(),
                    source_payload: Some(source.clone()),
                    target_payload: Some(conversion.target.clone()),
                    messages: conversion.messages,
                };
                TransformOutcome {
                    translation,
                    result: Ok(conversion.target),
                }
            }
            Err(cause) => {
                let translation = CanonicalTranslation {
                    source_system: source_system.clone(),
                    target_system: target_system.clone(),
                    entity_type,
                    source_id: source_id.clone(),
                    target_id: FAILED_TARGET_ID.to_string(),
                    status: TranslationStatus::Error,
                    timestamp: Utc::now(),
                    source_payload: Some(source.clone()),
                    target_payload: None,
                    messages: vec![cause.to_string()],
                };
                TransformOutcome {
                    translation,
                    result: Err(TransformationError::Mapping {
                        source_system: source_system.clone(),
                        target_system: target_system.clone(),
                        entity_type,
                        source_id,
                        cause,
                    }),
                }
            }
        };

        self.record(outcome.translation.clone())?;
        Ok(outcome)
    }

    /// Source payload to canonical form only.
    pub fn get_canonical_form(
        &self,
        system: &SystemId,
        entity_type: EntityType,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<CanonicalEntity, TransformationError> {
        let mapper = self.mapper(system, entity_type)?;
        mapper
            .to_canonical(source, context)
            .map_err(|cause| TransformationError::Mapping {
                source_system: system.clone(),
                target_system: context.target_system.clone(),
                entity_type,
                source_id: mapper
                    .payload_id(source)
                    .unwrap_or_else(|| UNKNOWN_SOURCE_ID.to_string()),
                cause,
            })
    }

    /// Canonical form to `system`'s payload shape only.
    pub fn from_canonical_form(
        &self,
        system: &SystemId,
        canonical: &CanonicalEntity,
        context: &TransformationContext,
    ) -> Result<Payload, TransformationError> {
        let entity_type = canonical.entity_type();
        let mapper = self.mapper(system, entity_type)?;
        mapper
            .from_canonical(canonical, context)
            .map_err(|cause| TransformationError::Mapping {
                source_system: context.source_system.clone(),
                target_system: system.clone(),
                entity_type,
                source_id: canonical.id().to_string(),
                cause,
            })
    }

    /// Runs a full conversion without touching the ledger.
    pub fn preview(
        &self,
        entity_type: EntityType,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<TransformPreview, TransformationError> {
        let source_mapper = self.mapper(&context.source_system, entity_type)?;
        let target_mapper = self.mapper(&context.target_system, entity_type)?;
        let conversion = convert(&source_mapper, &target_mapper, source, context).map_err(
            |cause| TransformationError::Mapping {
                source_system: context.source_system.clone(),
                target_system: context.target_system.clone(),
                entity_type,
                source_id: source_mapper
                    .payload_id(source)
                    .unwrap_or_else(|| UNKNOWN_SOURCE_ID.to_string()),
                cause,
            },
        )?;
        Ok(TransformPreview {
            source: source.clone(),
            canonical: conversion.canonical,
            target: conversion.target,
            messages: conversion.messages,
        })
    }

    /// Validation messages a transform of `source` would record, source
    /// side first, then target side.
    pub fn validate_transformation(
        &self,
        entity_type: EntityType,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<Vec<String>, TransformationError> {
        Ok(self.preview(entity_type, source, context)?.messages)
    }

    /// Ledger entries in first-recorded order.
    pub fn translations(&self) -> Result<Vec<CanonicalTranslation>, TransformationError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| TransformationError::LedgerPoisoned)?;
        Ok(ledger.values().cloned().collect())
    }

    pub fn translation(
        &self,
        key: &str,
    ) -> Result<Option<CanonicalTranslation>, TransformationError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| TransformationError::LedgerPoisoned)?;
        Ok(ledger.get(key).cloned())
    }

    pub fn translation_for(
        &self,
        source_system: &SystemId,
        target_system: &SystemId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<Option<CanonicalTranslation>, TransformationError> {
        self.translation(&translation_key(
            source_system,
            target_system,
            entity_type,
            source_id,
        ))
    }

    pub fn clear_translations(&self) -> Result<(), TransformationError> {
        let mut ledger = self
            .ledger
            .write()
            .map_err(|_| TransformationError::LedgerPoisoned)?;
        ledger.clear();
        Ok(())
    }

    fn mapper(
        &self,
        system: &SystemId,
        entity_type: EntityType,
    ) -> Result<SharedMapper, TransformationError> {
        self.registry
            .get(system, entity_type)
            .ok_or_else(|| TransformationError::MapperNotFound {
                system: system.clone(),
                entity_type,
            })
    }

    fn record(&self, translation: CanonicalTranslation) -> Result<(), TransformationError> {
        let key = translation.key();
        match translation.status {
            TranslationStatus::Success => {
                debug!(key = %key, target_id = %translation.target_id, "translation recorded");
            }
            TranslationStatus::Partial => {
                warn!(
                    key = %key,
                    messages = translation.messages.len(),
                    "translation recorded with validation messages"
                );
            }
            TranslationStatus::Error => {
                warn!(key = %key, error = ?translation.messages.first(), "translation failed");
            }
        }
        let mut ledger = self
            .ledger
            .write()
            .map_err(|_| TransformationError::LedgerPoisoned)?;
        ledger.insert(key, translation);
        Ok(())
    }
}

fn convert(
    source_mapper: &SharedMapper,
    target_mapper: &SharedMapper,
    source: &Payload,
    context: &TransformationContext,
) -> Result<Conversion, MappingError> {
    let canonical = source_mapper.to_canonical(source, context)?;
    let target = target_mapper.from_canonical(&canonical, context)?;
    let mut messages = source_mapper.validate_mapping(source, &canonical, context);
    messages.extend(
        target_mapper
            .validate_target(&canonical, &target)
            .into_iter()
            .map(|message| format!("{TARGET_MESSAGE_PREFIX}{message}")),
    );
    Ok(Conversion {
        canonical,
        target,
        messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_registry;
    use bridge_canonical::{PayloadExt, payload_from_value};
    use serde_json::json;

    fn transformer() -> Transformer {
        Transformer::new(Arc::new(default_registry()))
    }

    fn zephyr_case(key: &str, status: &str) -> Payload {
        payload_from_value(json!({
            "key": key,
            "name": "Login works",
            "status": status,
            "priority": "High",
            "testScript": { "steps": [{ "index": 1, "description": "Open page" }] }
        }))
        .expect("fixture should be an object")
    }

    #[test]
    fn transform_success_records_ledger_entry() {
        let transformer = transformer();
        let target = transformer
            .transform(
                &SystemId::new("zephyr"),
                &SystemId::new("qtest"),
                EntityType::TestCase,
                &zephyr_case("TC-1", "Approved"),
                None,
            )
            .expect("transform should succeed");
        assert_eq!(target.get_str("pid"), Some("TC-1"));

        let entry = transformer
            .translation("zephyr:qtest:test-case:TC-1")
            .expect("ledger readable")
            .expect("entry recorded");
        assert_eq!(entry.status, TranslationStatus::Success);
        assert_eq!(entry.target_id, "TC-1");
        assert!(entry.messages.is_empty());
    }

    #[test]
    fn transform_unknown_status_expected_partial() {
        let transformer = transformer();
        transformer
            .transform(
                &SystemId::new("zephyr"),
                &SystemId::new("qtest"),
                EntityType::TestCase,
                &zephyr_case("TC-2", "Limbo"),
                None,
            )
            .expect("lenient mapping should still succeed");
        let entry = transformer
            .translation_for(
                &SystemId::new("zephyr"),
                &SystemId::new("qtest"),
                EntityType::TestCase,
                "TC-2",
            )
            .expect("ledger readable")
            .expect("entry recorded");
        assert_eq!(entry.status, TranslationStatus::Partial);
        assert_eq!(
            entry.messages,
            vec!["Unrecognized status 'Limbo' mapped to DRAFT".to_string()]
        );
    }

    #[test]
    fn transform_value_mapping_to_unknown_label_expected_partial() {
        let transformer = transformer();
        let context = TransformationContext::new(SystemId::new("zephyr"), SystemId::new("qtest"))
            .with_value_mapping("status", "Approved", "Signed Off");
        transformer
            .transform(
                &SystemId::new("zephyr"),
                &SystemId::new("qtest"),
                EntityType::TestCase,
                &zephyr_case("TC-8", "Approved"),
                Some(&context),
            )
            .expect("lenient mapping should still succeed");
        let entry = transformer
            .translation("zephyr:qtest:test-case:TC-8")
            .expect("ledger readable")
            .expect("entry recorded");
        assert_eq!(entry.status, TranslationStatus::Partial);
        assert_eq!(
            entry.messages,
            vec![
                "Unrecognized status 'Signed Off' (value mapping of 'Approved') mapped to DRAFT"
                    .to_string()
            ]
        );
    }

    #[test]
    fn transform_missing_mapper_is_not_recorded() {
        let transformer = transformer();
        let error = transformer
            .transform(
                &SystemId::new("zephyr"),
                &SystemId::new("testrail"),
                EntityType::TestCase,
                &zephyr_case("TC-3", "Draft"),
                None,
            )
            .expect_err("unknown target should fail");
        assert!(error.is_configuration_error());
        assert_eq!(error.to_string(), "No mapper found for testrail/test-case");
        assert!(transformer.translations().expect("ledger readable").is_empty());
    }

    #[test]
    fn transform_mapping_failure_recorded_as_error() {
        let transformer = transformer();
        let mut source = zephyr_case("TC-4", "Draft");
        source.remove("name");
        let error = transformer
            .transform(
                &SystemId::new("zephyr"),
                &SystemId::new("qtest"),
                EntityType::TestCase,
                &source,
                None,
            )
            .expect_err("missing name should fail");
        match &error {
            TransformationError::Mapping { source_id, cause, .. } => {
                assert_eq!(source_id, "TC-4");
                assert_eq!(cause, &MappingError::missing("name"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let entry = transformer
            .translation("zephyr:qtest:test-case:TC-4")
            .expect("ledger readable")
            .expect("failed attempt recorded");
        assert_eq!(entry.status, TranslationStatus::Error);
        assert_eq!(entry.target_id, FAILED_TARGET_ID);
        assert_eq!(entry.messages, vec!["missing required field 'name'".to_string()]);
    }

    #[test]
    fn preview_does_not_touch_ledger() {
        let transformer = transformer();
        let context = TransformationContext::new(SystemId::new("zephyr"), SystemId::new("qtest"));
        let preview = transformer
            .preview(EntityType::TestCase, &zephyr_case("TC-5", "Ready"), &context)
            .expect("preview should succeed");
        assert_eq!(preview.canonical.id(), "TC-5");
        assert_eq!(preview.target.get_str("name"), Some("Login works"));
        assert!(transformer.translations().expect("ledger readable").is_empty());
    }

    #[test]
    fn validate_transformation_reports_fallbacks_without_recording() {
        let transformer = transformer();
        let context = TransformationContext::new(SystemId::new("zephyr"), SystemId::new("qtest"));
        let messages = transformer
            .validate_transformation(EntityType::TestCase, &zephyr_case("TC-7", "Limbo"), &context)
            .expect("validation should run");
        assert_eq!(
            messages,
            vec!["Unrecognized status 'Limbo' mapped to DRAFT".to_string()]
        );
        assert!(transformer.translations().expect("ledger readable").is_empty());
    }

    #[test]
    fn canonical_form_round_trips_through_both_halves() {
        let transformer = transformer();
        let context = TransformationContext::new(SystemId::new("zephyr"), SystemId::new("qtest"));
        let canonical = transformer
            .get_canonical_form(
                &SystemId::new("zephyr"),
                EntityType::TestCase,
                &zephyr_case("TC-6", "Draft"),
                &context,
            )
            .expect("canonical form");
        assert_eq!(canonical.entity_type(), EntityType::TestCase);
        let target = transformer
            .from_canonical_form(&SystemId::new("qtest"), &canonical, &context)
            .expect("target form");
        assert_eq!(target.get_str("pid"), Some("TC-6"));
    }
}
