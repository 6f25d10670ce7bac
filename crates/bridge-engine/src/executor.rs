use crate::{
    EngineError, EventSink, ExecutionContext, ExecutionEvent, ExecutionEventKind, ExecutorConfig,
    FailureKind, Operation, OperationDefinition, OperationFailure, OperationResult, OperationType,
    build_dependency_graph, delay_for_attempt, plan_for_goal,
};
use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub type SharedOperation = Arc<dyn Operation>;

/// Implementations available to the planner, keyed by the type they run.
pub type OperationRegistry = IndexMap<OperationType, SharedOperation>;

pub fn operation_registry(operations: impl IntoIterator<Item = SharedOperation>) -> OperationRegistry {
    operations
        .into_iter()
        .map(|operation| (operation.operation_type().clone(), operation))
        .collect()
}

/// Outcome of planning and running everything a goal operation needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub goal: OperationType,
    pub plan: Vec<OperationType>,
    /// Optional operations in the plan with no registered implementation.
    pub skipped: Vec<OperationType>,
    pub results: Vec<OperationResult>,
    pub aborted: bool,
    pub total_duration_ms: u64,
}

impl ExecutionReport {
    /// Every planned operation ran and succeeded.
    pub fn is_complete(&self) -> bool {
        !self.aborted
            && self.results.len() + self.skipped.len() == self.plan.len()
            && self.results.iter().all(|result| result.success)
    }

    pub fn failed(&self) -> Option<&OperationResult> {
        self.results.iter().find(|result| !result.success)
    }

    pub fn result(&self, operation_type: &OperationType) -> Option<&OperationResult> {
        self.results
            .iter()
            .find(|result| &result.operation_type == operation_type)
    }
}

/// Runs operations one after another against a shared context.
///
/// Each operation gets up to `max_attempts` tries with exponential backoff
/// between them. The first operation that ends unsuccessful stops the
/// sequence. Failures never escape as errors; every run yields one
/// [`OperationResult`] per operation attempted.
pub struct OperationExecutor {
    config: ExecutorConfig,
    events: EventSink,
    sequence: AtomicU64,
}

impl Default for OperationExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

impl OperationExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            events: EventSink::default(),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs `operations` in the given order. Stops before the next operation
    /// once an abort is requested, and after the first unsuccessful result.
    /// Data of successful operations is stored in `context` under their type.
    pub async fn execute_operations(
        &self,
        operations: &[SharedOperation],
        context: &ExecutionContext,
    ) -> Vec<OperationResult> {
        self.emit(ExecutionEventKind::SequenceStarted {
            operations: operations
                .iter()
                .map(|operation| operation.operation_type().clone())
                .collect(),
        });

        let mut results = Vec::with_capacity(operations.len());
        for (index, operation) in operations.iter().enumerate() {
            if context.is_abort_requested() {
                let remaining = operations.len() - index;
                info!(completed = results.len(), remaining, "operation sequence aborted");
                self.emit(ExecutionEventKind::SequenceAborted {
                    completed: results.len(),
                    remaining,
                });
                return results;
            }

            let result = self
                .store_result(self.execute_with_resilience(operation.as_ref(), context).await, context);
            let succeeded = result.success;
            results.push(result);
            if !succeeded {
                break;
            }
        }

        let succeeded =
            results.len() == operations.len() && results.iter().all(|result| result.success);
        debug!(results = results.len(), succeeded, "operation sequence finished");
        self.emit(ExecutionEventKind::SequenceCompleted {
            results: results.len(),
            succeeded,
        });
        results
    }

    /// Runs one operation with retries. Required parameters are checked
    /// before every attempt; a missing one fails immediately.
    pub async fn execute_with_resilience(
        &self,
        operation: &dyn Operation,
        context: &ExecutionContext,
    ) -> OperationResult {
        let definition = operation.definition();
        let operation_type = definition.operation_type.clone();
        let max_attempts = self.config.attempts();
        let backoff = self.config.backoff();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if context.is_abort_requested() {
                return self.fail(
                    OperationFailure::aborted(&operation_type),
                    operation_type,
                    attempt,
                    started,
                );
            }
            attempt += 1;

            if let Some(name) = missing_parameter(definition, context) {
                let failure = OperationFailure::missing_parameter(name, &operation_type);
                return self.fail(failure, operation_type, attempt, started);
            }

            self.emit(ExecutionEventKind::OperationStarted {
                operation_type: operation_type.clone(),
                attempt,
            });
            debug!(operation = %operation_type, attempt, "operation attempt started");

            match operation.execute(context).await {
                Ok(data) => {
                    let duration_ms = elapsed_ms(started);
                    self.emit(ExecutionEventKind::OperationSucceeded {
                        operation_type: operation_type.clone(),
                        attempt,
                        duration_ms,
                    });
                    debug!(operation = %operation_type, attempt, duration_ms, "operation succeeded");
                    return OperationResult::succeeded(operation_type, data, attempt, duration_ms);
                }
                Err(error) if attempt >= max_attempts => {
                    let failure = OperationFailure::new(FailureKind::OperationFailed, error.message);
                    return self.fail(failure, operation_type, attempt, started);
                }
                Err(error) => {
                    let delay = delay_for_attempt(attempt, &backoff);
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    warn!(
                        operation = %operation_type,
                        attempt,
                        delay_ms,
                        error = %error,
                        "operation attempt failed; retrying"
                    );
                    self.emit(ExecutionEventKind::OperationRetrying {
                        operation_type: operation_type.clone(),
                        attempt,
                        next_attempt: attempt + 1,
                        delay_ms,
                        error: error.message,
                    });
                    if !context.abort_handle().wait_or_abort(delay).await {
                        return self.fail(
                            OperationFailure::aborted(&operation_type),
                            operation_type,
                            attempt,
                            started,
                        );
                    }
                }
            }
        }
    }

    /// Plans the operations `goal` needs from `definitions` and runs them.
    ///
    /// Required operations in the plan must have an implementation in
    /// `operations`; optional ones without one are skipped.
    pub async fn plan_and_execute(
        &self,
        definitions: &[OperationDefinition],
        operations: &OperationRegistry,
        goal: &OperationType,
        context: &ExecutionContext,
    ) -> Result<ExecutionReport, EngineError> {
        let graph = build_dependency_graph(definitions);
        let plan = plan_for_goal(&graph, goal)?;

        let mut selected = Vec::with_capacity(plan.len());
        let mut skipped = Vec::new();
        for operation_type in &plan {
            match operations.get(operation_type) {
                Some(operation) => selected.push(Arc::clone(operation)),
                None if graph
                    .definition(operation_type)
                    .is_some_and(|definition| !definition.required) =>
                {
                    debug!(operation = %operation_type, "skipping optional operation without implementation");
                    skipped.push(operation_type.clone());
                }
                None => return Err(EngineError::MissingOperation(operation_type.clone())),
            }
        }

        info!(goal = %goal, planned = plan.len(), skipped = skipped.len(), "executing operation plan");
        let started = Instant::now();
        let results = self.execute_operations(&selected, context).await;
        Ok(ExecutionReport {
            goal: goal.clone(),
            plan,
            skipped,
            results,
            aborted: context.is_abort_requested(),
            total_duration_ms: elapsed_ms(started),
        })
    }

    fn store_result(&self, result: OperationResult, context: &ExecutionContext) -> OperationResult {
        let Some(data) = result.data.as_ref().filter(|_| result.success) else {
            return result;
        };
        match context.set_result(result.operation_type.clone(), data.clone()) {
            Ok(()) => result,
            Err(error) => {
                let failure = OperationFailure::new(FailureKind::OperationFailed, error.to_string());
                warn!(operation = %result.operation_type, error = %error, "could not store operation result");
                OperationResult::failed(result.operation_type, failure, result.attempts, result.duration_ms)
            }
        }
    }

    fn fail(
        &self,
        failure: OperationFailure,
        operation_type: OperationType,
        attempts: u32,
        started: Instant,
    ) -> OperationResult {
        let duration_ms = elapsed_ms(started);
        warn!(
            operation = %operation_type,
            attempts,
            kind = failure.kind.as_str(),
            error = %failure,
            "operation failed"
        );
        self.emit(ExecutionEventKind::OperationFailed {
            operation_type: operation_type.clone(),
            attempts,
            failure: failure.kind,
            error: failure.message.clone(),
        });
        OperationResult::failed(operation_type, failure, attempts, duration_ms)
    }

    fn emit(&self, kind: ExecutionEventKind) {
        if !self.events.is_enabled() {
            return;
        }
        self.events.emit(ExecutionEvent {
            sequence_no: self.sequence.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            kind,
        });
    }
}

fn missing_parameter<'d>(definition: &'d OperationDefinition, context: &ExecutionContext) -> Option<&'d str> {
    definition
        .required_params
        .iter()
        .find(|name| !context.has_param(name))
        .map(String::as_str)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
