//! Execution engine.
//!
//! Runs one handler invocation per scheduled execution on the tokio runtime.
//! `Handler::execute` may block, so it is moved onto the blocking pool while
//! a lightweight supervisor task enforces the optional timeout and
//! cancellation, then reports the outcome to the sink. The concurrency permit
//! travels with the blocking job, so a slot stays taken until `execute`
//! returns even when its report was abandoned.

use crate::handler::Handler;
use crate::model::{DispatchEvent, ExecutionId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to a scheduled execution.
///
/// Dropping the handle does not cancel the execution.
#[derive(Debug)]
pub struct ExecutionHandle {
    id: ExecutionId,
    command: String,
    cancelled: Arc<Mutex<bool>>,
    task: JoinHandle<bool>,
}

impl ExecutionHandle {
    pub fn id(&self) -> ExecutionId {
        self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Cancel the execution. A cancelled execution never reports an event;
    /// other executions are unaffected. No-op once the result was reported.
    ///
    /// A handler already running keeps its concurrency slot until it returns.
    pub fn cancel(&self) {
        *self.cancelled.lock() = true;
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the execution has reported or was cancelled.
    /// Returns whether an event was reported.
    pub async fn wait(self) -> bool {
        match self.task.await {
            Ok(reported) => reported,
            Err(e) if e.is_cancelled() => false,
            Err(e) => {
                warn!(id = %self.id, error = %e, "execution supervisor failed");
                false
            }
        }
    }
}

/// Schedules handler executions and reports their outcome.
pub(crate) struct Executor {
    runtime: Handle,
    limiter: Arc<Semaphore>,
    timeout: Option<Duration>,
    event_tx: mpsc::UnboundedSender<DispatchEvent>,
}

impl Executor {
    pub(crate) fn new(
        runtime: Handle,
        max_concurrent: usize,
        timeout: Option<Duration>,
        event_tx: mpsc::UnboundedSender<DispatchEvent>,
    ) -> Self {
        Self {
            runtime,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
            event_tx,
        }
    }

    /// Schedule `handler` with `args` and return immediately.
    pub(crate) fn spawn(
        &self,
        id: ExecutionId,
        handler: Arc<dyn Handler>,
        args: Vec<String>,
    ) -> ExecutionHandle {
        let command = handler.name().to_string();
        let cancelled = Arc::new(Mutex::new(false));

        let limiter = Arc::clone(&self.limiter);
        let timeout = self.timeout;
        let event_tx = self.event_tx.clone();
        let cancelled2 = cancelled.clone();
        let command2 = command.clone();
        let task = self.runtime.spawn(async move {
            // Queued executions wait here without holding up the dispatcher.
            let permit = match limiter.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return false,
            };
            if *cancelled2.lock() {
                debug!(%id, command = %command2, "cancelled before start");
                return false;
            }

            let started = Instant::now();
            let job = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                handler.execute(&args)
            });
            let joined = match timeout {
                Some(limit) => match tokio::time::timeout(limit, job).await {
                    Ok(joined) => Some(joined),
                    Err(_) => None,
                },
                None => Some(job.await),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let event = match joined {
                Some(Ok(Ok(output))) => DispatchEvent::Completed {
                    id,
                    command: command2,
                    output,
                    elapsed_ms,
                    finished_at: now_rfc3339(),
                },
                Some(Ok(Err(e))) => DispatchEvent::Failed {
                    id,
                    command: command2,
                    error: format!("{e:#}"),
                    elapsed_ms,
                },
                Some(Err(e)) if e.is_panic() => DispatchEvent::Failed {
                    id,
                    command: command2,
                    error: format!("handler panicked: {}", panic_message(e.into_panic())),
                    elapsed_ms,
                },
                Some(Err(e)) => DispatchEvent::Failed {
                    id,
                    command: command2,
                    error: format!("execution aborted: {e}"),
                    elapsed_ms,
                },
                None => DispatchEvent::Failed {
                    id,
                    command: command2,
                    error: format!(
                        "timed out after {}",
                        humantime::format_duration(timeout.unwrap_or_default())
                    ),
                    elapsed_ms,
                },
            };
            if let DispatchEvent::Failed { error, .. } = &event {
                warn!(%id, %error, "execution failed");
            }
            // Checked and sent under the same lock `cancel` takes, so a
            // cancelled execution can never report.
            let cancelled = cancelled2.lock();
            if *cancelled {
                debug!(%id, "cancelled before reporting");
                return false;
            }
            // The receiver may already be gone during shutdown.
            let _ = event_tx.send(event);
            true
        });

        ExecutionHandle {
            id,
            command,
            cancelled,
            task,
        }
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
