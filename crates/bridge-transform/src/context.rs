use bridge_canonical::{FieldMappings, SystemId, TransformationConfiguration, ValueMappings};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Everything a mapper may consult besides the payload itself.
///
/// Value mappings are applied when reading a source payload into canonical
/// form; field-name mappings are applied when writing canonical custom fields
/// out to the target payload. Each remapping therefore happens exactly once
/// per source-to-target conversion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationContext {
    pub source_system: SystemId,
    pub target_system: SystemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub field_mappings: FieldMappings,
    #[serde(default)]
    pub value_mappings: ValueMappings,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl TransformationContext {
    pub fn new(source_system: SystemId, target_system: SystemId) -> Self {
        Self {
            source_system,
            target_system,
            migration_id: None,
            user_id: None,
            field_mappings: FieldMappings::new(),
            value_mappings: ValueMappings::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_migration_id(mut self, migration_id: impl Into<String>) -> Self {
        self.migration_id = Some(migration_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_field_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.field_mappings.insert(from.into(), to.into());
        self
    }

    pub fn with_value_mapping(
        mut self,
        field: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.value_mappings
            .entry(field.into())
            .or_default()
            .insert(from.into(), to.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn map_field_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.field_mappings
            .get(name)
            .map(String::as_str)
            .unwrap_or(name)
    }

    /// Looks up `value` in the table for `field`; exact match first, then
    /// case-insensitive.
    pub fn map_value<'a>(&'a self, field: &str, value: &'a str) -> &'a str {
        let Some(table) = self.value_mappings.get(field) else {
            return value;
        };
        if let Some(mapped) = table.get(value) {
            return mapped;
        }
        table
            .iter()
            .find(|(from, _)| from.eq_ignore_ascii_case(value))
            .map(|(_, to)| to.as_str())
            .unwrap_or(value)
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(Value::as_bool)
    }
}

impl From<&TransformationConfiguration> for TransformationContext {
    fn from(configuration: &TransformationConfiguration) -> Self {
        Self {
            source_system: configuration.source_system.clone(),
            target_system: configuration.target_system.clone(),
            migration_id: None,
            user_id: None,
            field_mappings: configuration.field_mappings.clone(),
            value_mappings: configuration.value_mappings.clone(),
            options: configuration.options.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> TransformationContext {
        TransformationContext::new(SystemId::new("zephyr"), SystemId::new("qtest"))
    }

    #[test]
    fn map_field_name_defaults_to_identity() {
        let context = context().with_field_mapping("Component", "Module");
        assert_eq!(context.map_field_name("Component"), "Module");
        assert_eq!(context.map_field_name("Sprint"), "Sprint");
    }

    #[test]
    fn map_value_prefers_exact_then_case_insensitive() {
        let context = context()
            .with_value_mapping("status", "Approved", "Ready")
            .with_value_mapping("status", "approved", "Approved");
        assert_eq!(context.map_value("status", "approved"), "Approved");
        assert_eq!(context.map_value("status", "Approved"), "Ready");

        let context = TransformationContext::new(SystemId::new("a"), SystemId::new("b"))
            .with_value_mapping("status", "Obsolete", "Deprecated");
        assert_eq!(context.map_value("status", "OBSOLETE"), "Deprecated");
        assert_eq!(context.map_value("priority", "High"), "High");
    }

    #[test]
    fn from_configuration_copies_tables_and_options() {
        let mut configuration = TransformationConfiguration::new(
            "cfg-1",
            "default",
            SystemId::new("zephyr"),
            SystemId::new("qtest"),
        );
        configuration
            .options
            .insert("includeAttachments".to_string(), json!(false));
        let context = TransformationContext::from(&configuration);
        assert_eq!(context.option_bool("includeAttachments"), Some(false));
        assert_eq!(context.target_system, "qtest");
    }
}
