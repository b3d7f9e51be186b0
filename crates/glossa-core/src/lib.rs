//! Core engine for the Glossa polyglot evaluation kernel.
//!
//! This crate provides:
//! - Completeness verdicts and the indentation heuristic for continuation
//!   prompts
//! - A balance-based lexical analyzer for brace/semicolon languages
//! - The execution controller: background workers, timeout, interruption,
//!   and the one-shot result-handoff table
//! - The `LanguageRuntime` capability through which actual language
//!   front ends are consumed

pub mod analyze;
pub mod error;
pub mod execute;
pub mod runtime;

pub use analyze::{
    BalancedAnalyzer, Completeness, CompletenessVerdict, suggest_continuation_indent,
};
pub use error::{Diagnostic, EvalError, Result};
pub use execute::{
    AbortHandle, CompiledUnit, ExecutionController, InterruptHandle, TaskKey, Workload,
    WorkloadError,
};
pub use runtime::{BindingWriteError, CompileFailure, LanguageRuntime, Replacements};

/// Interchange type for statement results and top-level bindings.
///
/// Runtimes expose their top-level state as JSON values so that results can
/// cross the kernel boundary and the binding broker can copy variables
/// between unrelated runtimes.
pub type Value = serde_json::Value;
