use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the controller to every scheduled execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub u64);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reports delivered to the controller's output sink.
///
/// Every event is sent as a single message, so a consumer never sees one
/// command's output interleaved with another's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    Completed {
        id: ExecutionId,
        command: String,
        output: String,
        elapsed_ms: u64,
        finished_at: String,
    },
    Failed {
        id: ExecutionId,
        command: String,
        error: String,
        elapsed_ms: u64,
    },
    UnknownCommand {
        name: String,
    },
    InvalidInput {
        reason: String,
    },
}

impl DispatchEvent {
    /// Execution this event belongs to, if one was scheduled.
    pub fn id(&self) -> Option<ExecutionId> {
        match self {
            DispatchEvent::Completed { id, .. } | DispatchEvent::Failed { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, DispatchEvent::Completed { .. })
    }

    /// Render a human-readable message for the CLI layer.
    pub fn to_message(&self) -> String {
        match self {
            DispatchEvent::Completed { output, .. } => output.clone(),
            DispatchEvent::Failed { command, error, .. } => {
                format!("{}: failed: {}", command, error)
            }
            DispatchEvent::UnknownCommand { name } => format!("unknown command `{}`", name),
            DispatchEvent::InvalidInput { reason } => format!("invalid input: {}", reason),
        }
    }
}
