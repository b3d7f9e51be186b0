//! The execution controller: background execution with timeout,
//! interruption, and one-shot result handoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::Value;
use crate::error::{EvalError, Result};

use super::task::{AbortHandle, CompiledUnit, TaskKey, WorkloadError};

/// One in-flight workload. Owned exclusively by the controller that created
/// it and removed on completion, cancellation, or timeout.
struct InFlight {
    /// Resolves the waiter early; taken by the first cancellation.
    cancel: Option<oneshot::Sender<()>>,
    /// Cooperative stop signal handed to the workload.
    abort: AbortHandle,
}

type RunningTable = Mutex<FxHashMap<TaskKey, InFlight>>;

enum Outcome {
    Value(Option<Value>),
    Fault(WorkloadError),
    Panicked(String),
    Cancelled,
    TimedOut(Duration),
}

/// Runs accepted, compiled work on background workers.
///
/// Workloads execute on the async runtime's blocking pool (workers are
/// created lazily and reused), so a hung workload never prevents
/// [`interrupt`](Self::interrupt) from being served. Each submission gets a
/// fresh [`TaskKey`]; on success the produced value is recorded in the
/// result slot under that key and **must** be retrieved with
/// [`take_result`](Self::take_result), including along the caller's own
/// error paths, or the entry leaks permanently.
///
/// The timeout is fixed at construction. A timed-out or interrupted
/// workload is abandoned, not destroyed: it keeps its worker until it
/// notices the abort flag or finishes on its own.
pub struct ExecutionController {
    timeout: Option<Duration>,
    running: Arc<RunningTable>,
    results: Mutex<FxHashMap<TaskKey, Option<Value>>>,
    closed: Arc<AtomicBool>,
}

impl ExecutionController {
    /// Create a controller. `timeout` of `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            running: Arc::new(Mutex::new(FxHashMap::default())),
            results: Mutex::new(FxHashMap::default()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configured per-submission timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run one unit of compiled work to completion, timeout, or
    /// cancellation.
    ///
    /// On success the workload's value is recorded under the returned key;
    /// the caller must redeem it with [`take_result`](Self::take_result)
    /// exactly once.
    pub async fn invoke(&self, unit: CompiledUnit) -> Result<TaskKey> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EvalError::Termination);
        }

        let CompiledUnit { source, work } = unit;
        let key = TaskKey::new();
        let abort = AbortHandle::new();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.running.lock().unwrap().insert(
            key,
            InFlight {
                cancel: Some(cancel_tx),
                abort: abort.clone(),
            },
        );
        tracing::debug!(task = %key, "workload submitted");

        let join = tokio::task::spawn_blocking(move || work(&abort));
        let outcome = self.wait(join, cancel_rx).await;

        // The task is done as far as this controller is concerned, whatever
        // the outcome; its key must become available again.
        self.running.lock().unwrap().remove(&key);

        match outcome {
            Outcome::Value(value) => {
                self.results.lock().unwrap().insert(key, value);
                tracing::debug!(task = %key, "workload completed");
                Ok(key)
            }
            Outcome::Fault(WorkloadError::UnresolvedReference { id, unresolved }) => {
                Err(EvalError::UnresolvedReference { id, unresolved })
            }
            Outcome::Fault(WorkloadError::Raised {
                type_name,
                message,
                trace,
            }) => Err(EvalError::User {
                type_name,
                message,
                trace,
            }),
            Outcome::Panicked(message) => Err(EvalError::User {
                type_name: "panic".to_string(),
                message,
                trace: Vec::new(),
            }),
            Outcome::Cancelled => {
                if self.closed.load(Ordering::SeqCst) {
                    Err(EvalError::Termination)
                } else {
                    Err(EvalError::Interrupted {
                        source: source.trim().to_string(),
                    })
                }
            }
            Outcome::TimedOut(duration) => {
                tracing::debug!(task = %key, "workload timed out");
                Err(EvalError::Timeout {
                    duration,
                    source: source.trim().to_string(),
                })
            }
        }
    }

    /// Await the workload, racing it against cancellation and the
    /// configured deadline.
    async fn wait(
        &self,
        join: JoinHandle<std::result::Result<Option<Value>, WorkloadError>>,
        cancel_rx: oneshot::Receiver<()>,
    ) -> Outcome {
        let finished = async move {
            match join.await {
                Ok(Ok(value)) => Outcome::Value(value),
                Ok(Err(fault)) => Outcome::Fault(fault),
                Err(join_error) => {
                    if join_error.is_panic() {
                        Outcome::Panicked(panic_message(join_error.into_panic()))
                    } else {
                        Outcome::Cancelled
                    }
                }
            }
        };
        let raced = async move {
            tokio::select! {
                outcome = finished => outcome,
                _ = cancel_rx => Outcome::Cancelled,
            }
        };
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, raced)
                .await
                .unwrap_or(Outcome::TimedOut(limit)),
            None => raced.await,
        }
    }

    /// Redeem the result of a successful invocation.
    ///
    /// Removes the value from the result slot; a key can be redeemed at
    /// most once.
    ///
    /// # Panics
    ///
    /// Panics if no result is recorded under `key`. That is always a caller
    /// bug (a leaked execution or a double retrieval), never a recoverable
    /// state.
    pub fn take_result(&self, key: &TaskKey) -> Option<Value> {
        match self.results.lock().unwrap().remove(key) {
            Some(value) => value,
            None => panic!(
                "no result recorded for task {}; every successful invocation must be retrieved exactly once",
                key
            ),
        }
    }

    /// Cancel every currently in-flight workload.
    ///
    /// Idempotent; workloads submitted after this call are unaffected.
    /// Cancelled waiters resolve with an interruption fault (or a
    /// termination fault if the controller is shutting down).
    pub fn interrupt(&self) {
        cancel_all(&self.running);
    }

    /// Shut the controller down: cancel all in-flight work and reject
    /// further submissions. In-flight waiters resolve with a fatal
    /// termination fault.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("execution controller shutting down");
        }
        cancel_all(&self.running);
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// A clonable handle that can interrupt this controller's in-flight
    /// work from another task or thread.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            running: Arc::clone(&self.running),
        }
    }
}

/// Thread-safe handle for interrupting a controller from elsewhere.
///
/// Clonable; interrupting when nothing is in flight is a no-op.
#[derive(Clone)]
pub struct InterruptHandle {
    running: Arc<RunningTable>,
}

impl InterruptHandle {
    /// Cancel every workload in flight at the time of the call.
    pub fn interrupt(&self) {
        cancel_all(&self.running);
    }
}

fn cancel_all(running: &RunningTable) {
    let mut running = running.lock().unwrap();
    for (key, task) in running.iter_mut() {
        task.abort.abort();
        if let Some(cancel) = task.cancel.take() {
            let _ = cancel.send(());
            tracing::debug!(task = %key, "cancellation requested");
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "workload panicked".to_string()
    }
}
