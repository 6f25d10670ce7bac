//! Conversion of provider payloads through the canonical model.
//!
//! A [`Transformer`] resolves one mapper for the source system and one for
//! the target system, pivots the payload through its canonical form and keeps
//! a ledger of every attempt. [`TransformationService`] layers migration-job
//! bookkeeping on top.

pub mod context;
pub mod errors;
pub mod mapper;
pub mod mappers;
pub mod registry;
pub mod service;
pub mod transformer;

pub use context::*;
pub use errors::*;
pub use mapper::*;
pub use registry::*;
pub use service::*;
pub use transformer::*;
