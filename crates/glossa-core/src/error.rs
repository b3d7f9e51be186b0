//! Error types for glossa-core.

use std::fmt;
use std::ops::Range;
use std::time::Duration;

/// Result type for glossa-core operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// A single compiler diagnostic, with an optional byte span into the
/// offending source for highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable message.
    pub message: String,
    /// Byte range of the problem within the submitted source, if known.
    pub span: Option<Range<usize>>,
}

impl Diagnostic {
    /// Create a diagnostic without span information.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    /// Create a diagnostic pointing at a byte range of the source.
    pub fn spanned(message: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
        }
    }
}

/// Errors that can occur while evaluating a fragment.
#[derive(Debug, Clone)]
pub enum EvalError {
    /// The fragment failed to compile.
    Compilation {
        /// The source prefix that failed to compile.
        source: String,
        /// Compiler diagnostics, most specific first.
        diagnostics: Vec<Diagnostic>,
        /// Names the fragment depends on that could not be resolved.
        unresolved: Vec<String>,
    },

    /// The fragment ended before a statement was complete; nothing past the
    /// last accepted prefix was executed.
    IncompleteSource {
        /// The trimmed unconsumed remainder.
        remainder: String,
    },

    /// The configured deadline expired before the workload finished. The
    /// workload itself may still be running.
    Timeout {
        /// The controller's configured timeout.
        duration: Duration,
        /// The trimmed source of the timed-out statement.
        source: String,
    },

    /// The workload was cancelled by an explicit interrupt.
    Interrupted {
        /// The trimmed source of the interrupted statement.
        source: String,
    },

    /// A declaration was run while one of its dependencies is unresolved.
    UnresolvedReference {
        /// Identity of the failing declaration.
        id: String,
        /// The unresolved dependency names.
        unresolved: Vec<String>,
    },

    /// The workload raised an error of its own. Carries the original type
    /// name so the user sees the true identity, not a wrapper.
    User {
        /// Type name of the original error.
        type_name: String,
        /// Message of the original error.
        message: String,
        /// Stack-trace lines of the original error, outermost first.
        trace: Vec<String>,
    },

    /// A language-switch directive named a language nobody registered.
    UnsupportedLanguage {
        /// The identifier from the directive.
        requested: String,
        /// Registered identifiers, in registration order.
        available: Vec<String>,
    },

    /// The execution engine is shut down. Fatal; the current operation is
    /// aborted and nothing will be retried.
    Termination,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Compilation { diagnostics, .. } => write!(
                f,
                "compilation failed: {}",
                diagnostics
                    .iter()
                    .map(|d| d.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
            EvalError::IncompleteSource { remainder } => {
                write!(f, "incomplete input: {remainder}")
            }
            EvalError::Timeout { duration, .. } => {
                write!(f, "evaluation timed out after {} ms", duration.as_millis())
            }
            EvalError::Interrupted { .. } => write!(f, "evaluation interrupted"),
            EvalError::UnresolvedReference { id, unresolved } => {
                write!(
                    f,
                    "unresolved references in {id}: {}",
                    unresolved.join(", ")
                )
            }
            EvalError::User {
                type_name, message, ..
            } => write!(f, "{type_name}: {message}"),
            EvalError::UnsupportedLanguage {
                requested,
                available,
            } => write!(
                f,
                "language '{requested}' is not supported; available languages are: {}",
                available.join(", ")
            ),
            EvalError::Termination => write!(f, "execution engine is shut down"),
        }
    }
}

impl std::error::Error for EvalError {}

impl EvalError {
    /// Whether the error is fatal for the session. Fatal errors are never
    /// retried and abort the current operation outright.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EvalError::Termination)
    }
}
