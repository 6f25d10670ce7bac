use crate::{MappingError, TransformationContext};
use bridge_canonical::{CanonicalEntity, CanonicalRecord, EntityType, Payload};
use std::sync::Arc;

/// Bidirectional converter between one system's payload shape and one
/// canonical record type.
///
/// Implementations must be pure functions of `(payload, context)`: no I/O and
/// no state carried between calls.
pub trait EntityMapper: Send + Sync {
    type Entity: CanonicalRecord;

    fn to_canonical(
        &self,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<Self::Entity, MappingError>;

    fn from_canonical(
        &self,
        entity: &Self::Entity,
        context: &TransformationContext,
    ) -> Result<Payload, MappingError>;

    /// Messages describing lossy or lenient decisions taken while reading
    /// `source` under `context`'s value mappings. Empty means the mapping
    /// was exact.
    fn validate_mapping(
        &self,
        source: &Payload,
        entity: &Self::Entity,
        context: &TransformationContext,
    ) -> Vec<String>;

    /// Messages describing required target fields the written payload lacks.
    fn validate_target(&self, entity: &Self::Entity, target: &Payload) -> Vec<String> {
        let _ = (entity, target);
        Vec::new()
    }

    /// Identifier of a payload in this system's shape, used to key ledger
    /// entries even when conversion fails.
    fn payload_id(&self, payload: &Payload) -> Option<String>;
}

/// Object-safe view of an [`EntityMapper`], dispatching on [`CanonicalEntity`].
pub trait Mapper: Send + Sync {
    fn entity_type(&self) -> EntityType;

    fn to_canonical(
        &self,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<CanonicalEntity, MappingError>;

    fn from_canonical(
        &self,
        entity: &CanonicalEntity,
        context: &TransformationContext,
    ) -> Result<Payload, MappingError>;

    fn validate_mapping(
        &self,
        source: &Payload,
        entity: &CanonicalEntity,
        context: &TransformationContext,
    ) -> Vec<String>;

    fn validate_target(&self, entity: &CanonicalEntity, target: &Payload) -> Vec<String>;

    fn payload_id(&self, payload: &Payload) -> Option<String>;
}

pub type SharedMapper = Arc<dyn Mapper>;

impl<M> Mapper for M
where
    M: EntityMapper,
{
    fn entity_type(&self) -> EntityType {
        M::Entity::ENTITY_TYPE
    }

    fn to_canonical(
        &self,
        source: &Payload,
        context: &TransformationContext,
    ) -> Result<CanonicalEntity, MappingError> {
        EntityMapper::to_canonical(self, source, context).map(CanonicalRecord::into_entity)
    }

    fn from_canonical(
        &self,
        entity: &CanonicalEntity,
        context: &TransformationContext,
    ) -> Result<Payload, MappingError> {
        let record = M::Entity::from_entity(entity)?;
        EntityMapper::from_canonical(self, record, context)
    }

    fn validate_mapping(
        &self,
        source: &Payload,
        entity: &CanonicalEntity,
        context: &TransformationContext,
    ) -> Vec<String> {
        match M::Entity::from_entity(entity) {
            Ok(record) => EntityMapper::validate_mapping(self, source, record, context),
            Err(error) => vec![error.to_string()],
        }
    }

    fn validate_target(&self, entity: &CanonicalEntity, target: &Payload) -> Vec<String> {
        match M::Entity::from_entity(entity) {
            Ok(record) => EntityMapper::validate_target(self, record, target),
            Err(error) => vec![error.to_string()],
        }
    }

    fn payload_id(&self, payload: &Payload) -> Option<String> {
        EntityMapper::payload_id(self, payload)
    }
}
