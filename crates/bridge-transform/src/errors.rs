use bridge_canonical::{CanonicalError, EntityType, SystemId};
use bridge_store::StoreError;
use thiserror::Error;

/// Failure inside a single mapper call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MappingError {
    #[error("missing required field '{field}'")]
    MissingField { field: String },
    #[error("invalid value for field '{field}': {message}")]
    InvalidField { field: String, message: String },
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

impl MappingError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransformationError {
    /// Configuration error; retrying cannot help.
    #[error("No mapper found for {system}/{entity_type}")]
    MapperNotFound {
        system: SystemId,
        entity_type: EntityType,
    },
    #[error(
        "transformation of {entity_type} '{source_id}' from {source_system} to {target_system} failed: {cause}"
    )]
    Mapping {
        source_system: SystemId,
        target_system: SystemId,
        entity_type: EntityType,
        source_id: String,
        #[source]
        cause: MappingError,
    },
    #[error("migration job not found: {0}")]
    JobNotFound(String),
    #[error("transformation configuration not found: {0}")]
    ConfigurationNotFound(String),
    #[error("no configuration repository attached")]
    ConfigurationsUnavailable,
    #[error("translation ledger lock poisoned")]
    LedgerPoisoned,
    #[error(transparent)]
    Job(#[from] CanonicalError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TransformationError {
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MapperNotFound { .. }
                | Self::ConfigurationNotFound(_)
                | Self::ConfigurationsUnavailable
        )
    }
}
