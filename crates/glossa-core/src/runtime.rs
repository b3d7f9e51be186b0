//! The capability through which actual language front ends are consumed.
//!
//! The kernel never compiles or runs guest code itself; a
//! [`LanguageRuntime`] supplies completeness analysis, compilation to a
//! runnable workload, top-level binding access, and (optionally) completion
//! suggestions for one language.

use serde::{Deserialize, Serialize};

use crate::Value;
use crate::analyze::CompletenessVerdict;
use crate::error::Diagnostic;
use crate::execute::CompiledUnit;

/// A fragment failed to compile.
#[derive(Debug, Clone, Default)]
pub struct CompileFailure {
    /// Compiler diagnostics, most specific first.
    pub diagnostics: Vec<Diagnostic>,
    /// Names the fragment depends on that could not be resolved.
    pub unresolved: Vec<String>,
}

impl CompileFailure {
    /// A failure with a single unspanned diagnostic.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            diagnostics: vec![Diagnostic::message(message)],
            unresolved: Vec::new(),
        }
    }
}

/// A top-level binding refused a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingWriteError {
    /// The target binding is read-only or constant in its runtime.
    Unsupported,
}

/// Completion candidates plus the span of text they replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacements {
    /// Candidate strings, best first.
    pub options: Vec<String>,
    /// Byte offset where replacement starts.
    pub replace_start: usize,
    /// Byte offset where replacement ends (usually the cursor).
    pub replace_end: usize,
}

/// One language's front end, as consumed by a session.
///
/// Implementations own whatever interpreter or compiler state the language
/// needs; the kernel only sees this narrow surface. The workload inside a
/// returned [`CompiledUnit`] runs on a background worker, so it must be
/// `Send` even though the runtime itself stays with the session.
pub trait LanguageRuntime: Send + Sync {
    /// The language identifier users select with the switch directive.
    fn language(&self) -> &str;

    /// Classify `text` and isolate its leading complete statement.
    ///
    /// Runtimes without structural analysis (see
    /// [`can_analyze`](Self::can_analyze)) return
    /// [`CompletenessVerdict::unknown`] for non-blank input so the whole
    /// fragment executes as one unit.
    fn analyze(&self, text: &str) -> CompletenessVerdict;

    /// Compile one accepted source prefix into a runnable workload.
    fn compile(&self, source: &str) -> Result<CompiledUnit, CompileFailure>;

    /// Names of all top-level bindings currently visible.
    fn bindings(&self) -> Vec<String>;

    /// Read one top-level binding.
    fn binding(&self, name: &str) -> Option<Value>;

    /// Write one top-level binding.
    fn set_binding(&self, name: &str, value: Value) -> Result<(), BindingWriteError>;

    /// Completion candidates at a byte offset into `text`.
    fn completions(&self, _text: &str, _cursor: usize) -> Option<Replacements> {
        None
    }

    /// Whether [`analyze`](Self::analyze) performs real structural
    /// analysis. When `false`, completeness checks answer "unknown" instead
    /// of trusting the verdict.
    fn can_analyze(&self) -> bool {
        true
    }
}
