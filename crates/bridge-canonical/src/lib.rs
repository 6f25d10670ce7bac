//! Canonical, system-agnostic model for migrating test-management assets.
//!
//! Every cross-system conversion pivots through the records defined here:
//! provider payloads are mapped into canonical records, and canonical records
//! are mapped back out into the target provider's payload shape.

pub mod configuration;
pub mod entity;
pub mod errors;
pub mod execution;
pub mod job;
pub mod payload;
pub mod planning;
pub mod shared;
pub mod system;
pub mod test_case;
pub mod translation;

pub use configuration::*;
pub use entity::*;
pub use errors::*;
pub use execution::*;
pub use job::*;
pub use payload::*;
pub use planning::*;
pub use shared::*;
pub use system::*;
pub use test_case::*;
pub use translation::*;
