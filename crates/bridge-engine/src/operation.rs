use crate::{ExecutionContext, OperationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Tag naming one kind of provider call, e.g. `GET_TEST_CASE`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationType(Cow<'static, str>);

impl OperationType {
    pub const AUTHENTICATE: Self = Self::from_static("AUTHENTICATE");
    pub const GET_PROJECTS: Self = Self::from_static("GET_PROJECTS");
    pub const GET_PROJECT: Self = Self::from_static("GET_PROJECT");
    pub const GET_MODULES: Self = Self::from_static("GET_MODULES");
    pub const GET_TEST_CASES: Self = Self::from_static("GET_TEST_CASES");
    pub const GET_TEST_CASE: Self = Self::from_static("GET_TEST_CASE");
    pub const GET_TEST_EXECUTIONS: Self = Self::from_static("GET_TEST_EXECUTIONS");
    pub const CREATE_TEST_CASE: Self = Self::from_static("CREATE_TEST_CASE");
    pub const CREATE_TEST_EXECUTION: Self = Self::from_static("CREATE_TEST_EXECUTION");
    pub const UPLOAD_ATTACHMENT: Self = Self::from_static("UPLOAD_ATTACHMENT");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for OperationType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Static description of an operation: what it needs before it can run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDefinition {
    pub operation_type: OperationType,
    #[serde(default)]
    pub dependencies: Vec<OperationType>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub required_params: Vec<String>,
    #[serde(default)]
    pub estimated_time_ms: u64,
}

fn default_required() -> bool {
    true
}

impl OperationDefinition {
    pub fn new(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            dependencies: Vec::new(),
            required: true,
            required_params: Vec::new(),
            estimated_time_ms: 0,
        }
    }

    pub fn depends_on(mut self, dependency: OperationType) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn requires_param(mut self, name: impl Into<String>) -> Self {
        self.required_params.push(name.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_estimated_time_ms(mut self, estimated_time_ms: u64) -> Self {
        self.estimated_time_ms = estimated_time_ms;
        self
    }
}

/// One externally observable unit of work. Implementations are supplied by
/// provider clients; the executor only relies on this shape.
#[async_trait::async_trait]
pub trait Operation: Send + Sync {
    fn definition(&self) -> &OperationDefinition;

    async fn execute(&self, context: &ExecutionContext) -> Result<Value, OperationError>;

    fn operation_type(&self) -> &OperationType {
        &self.definition().operation_type
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingParameter,
    OperationFailed,
    Aborted,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingParameter => "missing_parameter",
            Self::OperationFailed => "operation_failed",
            Self::Aborted => "aborted",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl OperationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_parameter(name: &str, operation_type: &OperationType) -> Self {
        Self::new(
            FailureKind::MissingParameter,
            format!("Missing required parameter: {name} for operation {operation_type}"),
        )
    }

    pub fn aborted(operation_type: &OperationType) -> Self {
        Self::new(
            FailureKind::Aborted,
            format!("Operation {operation_type} aborted"),
        )
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of running one operation, including all of its attempts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub operation_type: OperationType,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationFailure>,
    pub attempts: u32,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl OperationResult {
    pub fn succeeded(operation_type: OperationType, data: Value, attempts: u32, duration_ms: u64) -> Self {
        Self {
            operation_type,
            success: true,
            data: Some(data),
            error: None,
            attempts,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        operation_type: OperationType,
        error: OperationFailure,
        attempts: u32,
        duration_ms: u64,
    ) -> Self {
        Self {
            operation_type,
            success: false,
            data: None,
            error: Some(error),
            attempts,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(|error| error.kind)
    }
}
