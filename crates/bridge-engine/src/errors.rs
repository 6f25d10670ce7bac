use crate::{OperationType, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("operation graph is unresolvable; cycle: {}", join_cycle(.cycle))]
    Unresolvable { cycle: Vec<OperationType> },
    #[error("no operation registered for {0}")]
    MissingOperation(OperationType),
    #[error("goal operation {0} is not in the graph")]
    UnknownGoal(OperationType),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Error returned by an operation body. Always retryable from the
/// executor's point of view.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct OperationError {
    pub message: String,
}

impl OperationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for OperationError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for OperationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

pub(crate) fn join_cycle(cycle: &[OperationType]) -> String {
    cycle
        .iter()
        .map(OperationType::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
