use crate::{FieldMappings, SystemId, ValueMappings};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Stored field/value mapping setup for one source/target pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationConfiguration {
    pub id: String,
    pub name: String,
    pub source_system: SystemId,
    pub target_system: SystemId,
    #[serde(default)]
    pub field_mappings: FieldMappings,
    #[serde(default)]
    pub value_mappings: ValueMappings,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl TransformationConfiguration {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source_system: SystemId,
        target_system: SystemId,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_system,
            target_system,
            field_mappings: FieldMappings::new(),
            value_mappings: ValueMappings::new(),
            options: BTreeMap::new(),
        }
    }
}
