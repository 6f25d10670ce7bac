use crate::mappers::{qtest, zephyr};
use crate::{Mapper, SharedMapper};
use bridge_canonical::{EntityType, SystemId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Mapper lookup keyed by `(system, entity type)`.
///
/// Built once at startup and then shared read-only. A missing entry is a
/// distinct outcome (`None`) from a mapper that exists but fails.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: BTreeMap<(SystemId, EntityType), SharedMapper>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `mapper` for its own entity type, returning the mapper it
    /// replaced.
    pub fn register(
        &mut self,
        system: impl Into<SystemId>,
        mapper: SharedMapper,
    ) -> Option<SharedMapper> {
        let entity_type = mapper.entity_type();
        self.mappers.insert((system.into(), entity_type), mapper)
    }

    pub fn register_mapper<M>(&mut self, system: impl Into<SystemId>, mapper: M) -> Option<SharedMapper>
    where
        M: Mapper + 'static,
    {
        self.register(system, Arc::new(mapper))
    }

    pub fn get(&self, system: &SystemId, entity_type: EntityType) -> Option<SharedMapper> {
        self.mappers.get(&(system.clone(), entity_type)).cloned()
    }

    pub fn contains(&self, system: &SystemId, entity_type: EntityType) -> bool {
        self.mappers.contains_key(&(system.clone(), entity_type))
    }

    pub fn systems(&self) -> Vec<SystemId> {
        let mut systems: Vec<SystemId> = self.mappers.keys().map(|(system, _)| system.clone()).collect();
        systems.dedup();
        systems
    }

    pub fn entity_types_for(&self, system: &SystemId) -> Vec<EntityType> {
        self.mappers
            .keys()
            .filter(|(candidate, _)| candidate == system)
            .map(|(_, entity_type)| *entity_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

/// Registry with the test-case and test-execution mappers of every built-in
/// system.
pub fn default_registry() -> MapperRegistry {
    let mut registry = MapperRegistry::new();
    registry.register_mapper(zephyr::SYSTEM, zephyr::ZephyrTestCaseMapper);
    registry.register_mapper(zephyr::SYSTEM, zephyr::ZephyrTestExecutionMapper);
    registry.register_mapper(qtest::SYSTEM, qtest::QTestTestCaseMapper);
    registry.register_mapper(qtest::SYSTEM, qtest::QTestTestExecutionMapper);
    registry
}
