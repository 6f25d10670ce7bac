use crate::{FailureKind, OperationType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub sequence_no: u64,
    pub timestamp: String,
    pub kind: ExecutionEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionEventKind {
    SequenceStarted {
        operations: Vec<OperationType>,
    },
    SequenceCompleted {
        results: usize,
        succeeded: bool,
    },
    SequenceAborted {
        completed: usize,
        remaining: usize,
    },
    OperationStarted {
        operation_type: OperationType,
        attempt: u32,
    },
    OperationSucceeded {
        operation_type: OperationType,
        attempt: u32,
        duration_ms: u64,
    },
    OperationRetrying {
        operation_type: OperationType,
        attempt: u32,
        next_attempt: u32,
        delay_ms: u64,
        error: String,
    },
    OperationFailed {
        operation_type: OperationType,
        attempts: u32,
        failure: FailureKind,
        error: String,
    },
}

pub trait ExecutionEventObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

impl<F> ExecutionEventObserver for F
where
    F: Fn(&ExecutionEvent) + Send + Sync,
{
    fn on_event(&self, event: &ExecutionEvent) {
        self(event);
    }
}

pub type SharedExecutionEventObserver = Arc<dyn ExecutionEventObserver>;
pub type ExecutionEventSender = mpsc::UnboundedSender<ExecutionEvent>;
pub type ExecutionEventReceiver = mpsc::UnboundedReceiver<ExecutionEvent>;

/// Where executor lifecycle events go. Both targets are optional; a sink
/// with neither drops events.
#[derive(Clone, Default)]
pub struct EventSink {
    observer: Option<SharedExecutionEventObserver>,
    sender: Option<ExecutionEventSender>,
}

impl EventSink {
    pub fn with_observer(observer: SharedExecutionEventObserver) -> Self {
        Self {
            observer: Some(observer),
            sender: None,
        }
    }

    pub fn with_sender(sender: ExecutionEventSender) -> Self {
        Self {
            observer: None,
            sender: Some(sender),
        }
    }

    pub fn observer(mut self, observer: SharedExecutionEventObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn sender(mut self, sender: ExecutionEventSender) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.observer.is_some() || self.sender.is_some()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        if let Some(observer) = self.observer.as_ref() {
            observer.on_event(&event);
        }
        if let Some(sender) = self.sender.as_ref() {
            let _ = sender.send(event);
        }
    }
}

pub fn execution_event_channel() -> (ExecutionEventSender, ExecutionEventReceiver) {
    mpsc::unbounded_channel()
}
