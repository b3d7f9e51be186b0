//! Per-language evaluation sessions.
//!
//! A session owns one language's runtime, its execution controller, and the
//! state that makes incremental evaluation work: the startup scripts (run
//! once, lazily), and the pristine binding set the broker diffs imports
//! against. Sessions persist for the life of the process once created;
//! switching away and back never resets a language's top-level state.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use glossa_core::{
    Completeness, EvalError, ExecutionController, InterruptHandle, LanguageRuntime, Replacements,
    Result, Value, suggest_continuation_indent,
};

/// Answer to a completeness check, as exposed to the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckOutcome {
    /// The fragment is ready to run.
    Complete,
    /// More input is expected; `indent` is the suggested indentation for
    /// the continuation line.
    Incomplete {
        /// Suggested indentation for the next line.
        indent: String,
    },
    /// The fragment can only fail; running it will produce the diagnosis.
    Invalid,
    /// This language cannot tell without executing.
    Unknown,
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckOutcome::Complete => write!(f, "complete"),
            CheckOutcome::Incomplete { indent } => {
                write!(f, "incomplete-with-suggested-indent:{}", indent)
            }
            CheckOutcome::Invalid => write!(f, "invalid"),
            CheckOutcome::Unknown => write!(f, "unknown"),
        }
    }
}

/// Configuration for one language session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Per-submission execution timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// One indentation unit for continuation-indent suggestions.
    pub indent_unit: String,
    /// Scripts to run, in order, before the first user fragment.
    pub startup_scripts: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            indent_unit: "  ".to_string(),
            startup_scripts: Vec::new(),
        }
    }
}

/// State for incremental evaluation in one language.
pub struct LanguageSession {
    runtime: Arc<dyn LanguageRuntime>,
    controller: ExecutionController,
    startup_scripts: Vec<String>,
    initialized: bool,
    pristine: Option<FxHashSet<String>>,
    indent_unit: String,
}

impl LanguageSession {
    /// Create a session around a runtime.
    pub fn new(runtime: Arc<dyn LanguageRuntime>, config: SessionConfig) -> Self {
        Self {
            runtime,
            controller: ExecutionController::new(config.timeout),
            startup_scripts: config.startup_scripts,
            initialized: false,
            pristine: None,
            indent_unit: config.indent_unit,
        }
    }

    /// The language this session evaluates.
    pub fn language(&self) -> &str {
        self.runtime.language()
    }

    /// The runtime behind this session.
    pub fn runtime(&self) -> &Arc<dyn LanguageRuntime> {
        &self.runtime
    }

    /// Evaluate one fragment.
    ///
    /// The first call runs the session's startup scripts, in order, each as
    /// its own incremental-acceptance submission; they are cleared afterwards
    /// and never run again. Statements inside the fragment execute strictly
    /// in source order, each submitted only after the previous one finished.
    pub async fn eval(&mut self, code: &str) -> Result<Option<Value>> {
        // Startup work is deferred to the first evaluation so its errors
        // surface through the ordinary reporting path.
        if !self.initialized {
            self.initialized = true;
            let scripts = std::mem::take(&mut self.startup_scripts);
            for script in &scripts {
                tracing::debug!(language = self.language(), "running startup script");
                self.accept(script).await?;
            }
            // Names created by startup scripts are part of the session's
            // fresh state: the baseline closes here, before any user
            // fragment runs.
            self.pristine_bindings();
        }

        self.accept(code).await
    }

    /// The incremental acceptance loop: peel off complete statement
    /// prefixes one at a time and execute each before looking at the rest.
    async fn accept(&mut self, code: &str) -> Result<Option<Value>> {
        let mut result = None;
        let mut verdict = self.runtime.analyze(code);
        while verdict.completeness.is_complete() {
            result = self.run_statement(&verdict.source).await?;
            verdict = self.runtime.analyze(&verdict.remaining);
        }
        if verdict.completeness != Completeness::Empty {
            return Err(EvalError::IncompleteSource {
                remainder: verdict.remaining.trim().to_string(),
            });
        }
        Ok(result)
    }

    /// Compile and run a single accepted statement.
    async fn run_statement(&self, source: &str) -> Result<Option<Value>> {
        let unit = self
            .runtime
            .compile(source)
            .map_err(|failure| EvalError::Compilation {
                source: source.to_string(),
                diagnostics: failure.diagnostics,
                unresolved: failure.unresolved,
            })?;
        let key = self.controller.invoke(unit).await?;
        // Retrieval is mandatory after a successful invoke; skipping it
        // would leak the result-slot entry.
        Ok(self.controller.take_result(&key))
    }

    /// Classify a fragment without executing anything.
    ///
    /// Side-effect free and idempotent: the same text yields the same
    /// outcome.
    pub fn check(&self, code: &str) -> CheckOutcome {
        if !self.runtime.can_analyze() {
            return CheckOutcome::Unknown;
        }
        let mut verdict = self.runtime.analyze(code);
        loop {
            match verdict.completeness {
                Completeness::Complete | Completeness::CompleteWithTerminator => {
                    verdict = self.runtime.analyze(&verdict.remaining);
                }
                Completeness::Empty => return CheckOutcome::Complete,
                Completeness::ConsideredIncomplete | Completeness::DefinitelyIncomplete => {
                    return CheckOutcome::Incomplete {
                        indent: suggest_continuation_indent(&verdict.remaining, &self.indent_unit),
                    };
                }
                Completeness::Unknown => return CheckOutcome::Invalid,
            }
        }
    }

    /// Completion candidates at a byte offset into `code`.
    pub fn completions(&self, code: &str, cursor: usize) -> Option<Replacements> {
        self.runtime.completions(code, cursor)
    }

    /// The top-level names that existed before any user code ran.
    ///
    /// Captured from the runtime on first use and immutable afterwards.
    pub fn pristine_bindings(&mut self) -> &FxHashSet<String> {
        if self.pristine.is_none() {
            let names: FxHashSet<String> = self.runtime.bindings().into_iter().collect();
            tracing::debug!(
                language = self.language(),
                count = names.len(),
                "captured pristine binding set"
            );
            self.pristine = Some(names);
        }
        self.pristine.as_ref().unwrap()
    }

    /// Cancel this session's in-flight work.
    pub fn interrupt(&self) {
        self.controller.interrupt();
    }

    /// A clonable handle that can interrupt this session from another task.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.controller.interrupt_handle()
    }

    /// Shut this session's controller down; nothing can be submitted
    /// afterwards.
    pub fn shutdown(&self) {
        self.controller.shutdown();
    }
}
