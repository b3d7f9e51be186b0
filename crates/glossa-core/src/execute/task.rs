//! Task identity, cancellation flags, and the unit of compiled work.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use uuid::Uuid;

use crate::Value;

/// Identity of one submitted workload.
///
/// The key is the only channel through which a workload's value crosses back
/// to the caller: its canonical string form travels over the text-only
/// boundary and is redeemed against the controller's result slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskKey(Uuid);

impl TaskKey {
    /// Mint a fresh key. Keys are never reused while a result is
    /// outstanding.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Handle for cooperative cancellation of a running workload.
///
/// Clonable and thread-safe; any clone can trigger the abort, and all clones
/// observe it. Workloads should poll [`AbortHandle::is_aborted`] during
/// long-running operations and bail out early when it returns `true`.
#[derive(Clone, Default)]
pub struct AbortHandle {
    aborted: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Create a new, un-aborted handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether abort has been requested.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    /// Request abort. Cooperative: the workload must notice and return.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }
}

/// A fault raised by a workload while it ran.
#[derive(Debug, Clone, Error)]
pub enum WorkloadError {
    /// A declaration ran while its dependencies are unresolved.
    #[error("unresolved references in {id}: {}", .unresolved.join(", "))]
    UnresolvedReference {
        /// Identity of the failing declaration.
        id: String,
        /// The unresolved dependency names.
        unresolved: Vec<String>,
    },

    /// The workload raised an arbitrary error.
    #[error("{type_name}: {message}")]
    Raised {
        /// Type name of the original error, for re-presentation.
        type_name: String,
        /// Message of the original error.
        message: String,
        /// Stack-trace lines, outermost first.
        trace: Vec<String>,
    },
}

/// The closure a runtime hands back for one accepted statement.
///
/// Returns `Ok(Some(value))` for statements with a result, `Ok(None)` for
/// statements with no meaningful value. A workload must resolve exactly
/// once; the abort handle it receives is the controller's cooperative
/// cancellation signal.
pub type Workload =
    Box<dyn FnOnce(&AbortHandle) -> Result<Option<Value>, WorkloadError> + Send + 'static>;

/// A pending unit of accepted, compiled work.
pub struct CompiledUnit {
    /// The source text this unit was compiled from.
    pub source: String,
    /// The work itself.
    pub work: Workload,
}

impl CompiledUnit {
    /// Package compiled work together with the source it came from.
    pub fn new(
        source: impl Into<String>,
        work: impl FnOnce(&AbortHandle) -> Result<Option<Value>, WorkloadError> + Send + 'static,
    ) -> Self {
        Self {
            source: source.into(),
            work: Box::new(work),
        }
    }
}

impl fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
