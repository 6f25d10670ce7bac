use crate::OperationType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    CircularDependency,
    MissingOperation,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CircularDependency => "circular_dependency",
            Self::MissingOperation => "missing_operation",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<OperationType>,
}

impl DependencyIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
            dependency: None,
        }
    }

    pub fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_dependency(mut self, dependency: OperationType) -> Self {
        self.dependency = Some(dependency);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyValidation {
    pub valid: bool,
    pub errors: Vec<DependencyIssue>,
}

impl DependencyValidation {
    pub fn from_issues(errors: Vec<DependencyIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn has(&self, kind: IssueKind) -> bool {
        self.errors.iter().any(|issue| issue.kind == kind)
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.valid {
            Ok(())
        } else {
            Err(ValidationError::new(self.errors))
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("dependency validation failed with {errors_count} error(s)")]
pub struct ValidationError {
    pub issues: Vec<DependencyIssue>,
    pub errors_count: usize,
}

impl ValidationError {
    pub fn new(issues: Vec<DependencyIssue>) -> Self {
        let errors_count = issues.len();
        Self {
            issues,
            errors_count,
        }
    }
}
