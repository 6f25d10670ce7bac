//! Caller-side persistence for migration jobs, translation records and
//! transformation configurations.

pub mod fs;
pub mod memory;
pub mod store;

pub use fs::FsMigrationStore;
pub use memory::MemoryMigrationStore;
pub use store::{
    ConfigurationRepository, MigrationJobRepository, StoreError, StoreResult,
    TranslationRepository,
};
