//! Operation planning and execution for migration items.
//!
//! Operations declare which other operation types they depend on. The
//! resolver turns those declarations into a [`DependencyGraph`] and a
//! deterministic execution order; the [`OperationExecutor`] runs an ordered
//! list with retries, backoff and cooperative abort.

pub mod abort;
pub mod catalog;
pub mod context;
pub mod diagnostics;
pub mod errors;
pub mod events;
pub mod executor;
pub mod graph;
pub mod operation;
pub mod resolver;
pub mod retry;
pub mod visualize;

pub use abort::*;
pub use catalog::*;
pub use context::*;
pub use diagnostics::*;
pub use errors::*;
pub use events::*;
pub use executor::*;
pub use graph::*;
pub use operation::*;
pub use resolver::*;
pub use retry::*;
pub use visualize::*;
