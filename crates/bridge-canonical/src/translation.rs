use crate::{EntityType, Payload, SystemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Target id recorded for attempts that never produced a target payload.
pub const FAILED_TARGET_ID: &str = "failed";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    Success,
    Partial,
    Error,
}

impl TranslationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }
}

/// Audit record of one transformation attempt. Never mutated once built; a
/// retried attempt produces a new record under the same key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTranslation {
    pub source_system: SystemId,
    pub target_system: SystemId,
    pub entity_type: EntityType,
    pub source_id: String,
    pub target_id: String,
    pub status: TranslationStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_payload: Option<Payload>,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl CanonicalTranslation {
    pub fn key(&self) -> String {
        translation_key(
            &self.source_system,
            &self.target_system,
            self.entity_type,
            &self.source_id,
        )
    }

    pub fn is_success_like(&self) -> bool {
        matches!(
            self.status,
            TranslationStatus::Success | TranslationStatus::Partial
        )
    }
}

/// `source:target:entityType:sourceId`, e.g. `zephyr:qtest:test-case:TC-1`.
pub fn translation_key(
    source_system: &SystemId,
    target_system: &SystemId,
    entity_type: EntityType,
    source_id: &str,
) -> String {
    format!(
        "{}:{}:{}:{}",
        source_system,
        target_system,
        entity_type.as_str(),
        source_id
    )
}
