use crate::{EntityType, JobStatus};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),
    #[error("entity type mismatch: expected {expected}, found {found}")]
    EntityMismatch {
        expected: EntityType,
        found: EntityType,
    },
    #[error("counter overflow on job {job_id}: {message}")]
    CounterOverflow { job_id: String, message: String },
    #[error("invalid job status transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}
