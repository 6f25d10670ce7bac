use crate::{AbortHandle, EngineError, OperationType};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub type ExecutionParams = BTreeMap<String, Value>;

/// State shared by the operations of one migration item.
///
/// `params` are the caller's inputs and never change during a run. Results
/// of successful operations are stored under their operation type so later
/// operations can read them. Clones share results and abort state.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    params: ExecutionParams,
    results: Arc<RwLock<BTreeMap<OperationType, Value>>>,
    abort: AbortHandle,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: ExecutionParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// A present parameter is non-null.
    pub fn has_param(&self, name: &str) -> bool {
        self.params.get(name).is_some_and(|value| !value.is_null())
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    pub fn set_result(&self, operation_type: OperationType, value: Value) -> Result<(), EngineError> {
        let mut results = self
            .results
            .write()
            .map_err(|_| EngineError::Runtime("execution context write lock poisoned".to_string()))?;
        results.insert(operation_type, value);
        Ok(())
    }

    pub fn result(&self, operation_type: &OperationType) -> Result<Option<Value>, EngineError> {
        let results = self
            .results
            .read()
            .map_err(|_| EngineError::Runtime("execution context read lock poisoned".to_string()))?;
        Ok(results.get(operation_type).cloned())
    }

    pub fn results(&self) -> Result<BTreeMap<OperationType, Value>, EngineError> {
        let results = self
            .results
            .read()
            .map_err(|_| EngineError::Runtime("execution context read lock poisoned".to_string()))?;
        Ok(results.clone())
    }

    pub fn abort_handle(&self) -> &AbortHandle {
        &self.abort
    }

    pub fn is_abort_requested(&self) -> bool {
        self.abort.is_abort_requested()
    }
}
