//! The kernel's single entry point.
//!
//! The dispatcher resolves which language a fragment addresses (via the
//! `#!` switch directive or the current active language), creates and keeps
//! that language's session, triggers binding transfer on a switch, and
//! routes evaluation, completeness, and completion requests.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;

use glossa_core::{EvalError, InterruptHandle, LanguageRuntime, Replacements, Result, Value};

use crate::broker::{BindingBroker, NamingConventions};
use crate::output::{OutputSink, StdioSink};
use crate::session::{CheckOutcome, LanguageSession, SessionConfig};

/// The wire form of the language-switch directive: this marker at the very
/// start of a fragment, immediately followed by a language identifier.
pub const SWITCH_LANGUAGE_PREFIX: &str = "#!";

/// Split a leading switch directive off a fragment.
///
/// Returns the language identifier and the remainder to evaluate. The
/// identifier runs from the marker to the first whitespace; whitespace after
/// it is consumed up to and including the first line separator. A marker
/// with no identifier is not a directive and the fragment parses as
/// ordinary code.
fn split_directive(code: &str) -> Option<(&str, &str)> {
    let rest = code.strip_prefix(SWITCH_LANGUAGE_PREFIX)?;
    let ident_end = rest
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map_or(rest.len(), |(i, _)| i);
    if ident_end == 0 {
        return None;
    }
    let ident = &rest[..ident_end];
    let tail = &rest[ident_end..];

    let mut consumed = 0;
    while consumed < tail.len() {
        let t = &tail[consumed..];
        if let Some(after) = t.strip_prefix("\r\n") {
            consumed = tail.len() - after.len();
            break;
        }
        if let Some(after) = t.strip_prefix('\n') {
            consumed = tail.len() - after.len();
            break;
        }
        match t.chars().next() {
            Some(c) if c.is_whitespace() => consumed += c.len_utf8(),
            _ => break,
        }
    }
    Some((ident, &tail[consumed..]))
}

struct Registration {
    runtime: Arc<dyn LanguageRuntime>,
    startup_scripts: Vec<String>,
}

/// Assembles a [`Dispatcher`].
pub struct KernelBuilder {
    registrations: Vec<Registration>,
    timeout: Option<Duration>,
    indent_unit: String,
    sink: Arc<dyn OutputSink>,
    conventions: NamingConventions,
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
            timeout: None,
            indent_unit: "  ".to_string(),
            sink: Arc::new(StdioSink),
            conventions: NamingConventions::default(),
        }
    }
}

impl KernelBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a language runtime. The first registered language is the
    /// initial active language.
    pub fn runtime(self, runtime: Arc<dyn LanguageRuntime>) -> Self {
        self.runtime_with_startup(runtime, Vec::new())
    }

    /// Register a language runtime together with startup scripts that run,
    /// in order, before the first user fragment in that language.
    pub fn runtime_with_startup(
        mut self,
        runtime: Arc<dyn LanguageRuntime>,
        startup_scripts: Vec<String>,
    ) -> Self {
        self.registrations.push(Registration {
            runtime,
            startup_scripts,
        });
        self
    }

    /// Per-submission execution timeout for every session.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// One indentation unit for continuation-indent suggestions.
    pub fn indent_unit(mut self, unit: impl Into<String>) -> Self {
        self.indent_unit = unit.into();
        self
    }

    /// Where user-visible report lines go.
    pub fn output_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Naming conventions for cross-language binding transfer.
    pub fn conventions(mut self, conventions: NamingConventions) -> Self {
        self.conventions = conventions;
        self
    }

    /// Build the dispatcher.
    ///
    /// # Panics
    ///
    /// Panics if no runtime was registered, or if two runtimes claim the
    /// same language identifier; both are assembly-time bugs.
    pub fn build(self) -> Dispatcher {
        assert!(
            !self.registrations.is_empty(),
            "at least one language runtime must be registered"
        );
        for (i, reg) in self.registrations.iter().enumerate() {
            let id = reg.runtime.language();
            assert!(
                !self.registrations[..i]
                    .iter()
                    .any(|other| other.runtime.language() == id),
                "duplicate language identifier '{}'",
                id
            );
        }
        let active = self.registrations[0].runtime.language().to_string();
        Dispatcher {
            registry: self.registrations,
            sessions: FxHashMap::default(),
            active,
            last_run: None,
            broker: BindingBroker::new(self.conventions),
            sink: self.sink,
            timeout: self.timeout,
            indent_unit: self.indent_unit,
            closed: false,
        }
    }
}

/// Routes fragments to language sessions.
///
/// One dispatcher processes one cell at a time: a fragment is fully
/// evaluated (including its internal multi-statement loop) before the next
/// is accepted. Sessions are created on first use and persist for the life
/// of the dispatcher.
pub struct Dispatcher {
    registry: Vec<Registration>,
    sessions: FxHashMap<String, LanguageSession>,
    /// The currently selected language; changed only by a switch directive.
    active: String,
    /// The language that last executed; binding transfer fires when the
    /// next execution addresses a different one.
    last_run: Option<String>,
    broker: BindingBroker,
    sink: Arc<dyn OutputSink>,
    timeout: Option<Duration>,
    indent_unit: String,
    closed: bool,
}

impl Dispatcher {
    /// The registered language identifiers, in registration order.
    pub fn available_languages(&self) -> Vec<String> {
        self.registry
            .iter()
            .map(|reg| reg.runtime.language().to_string())
            .collect()
    }

    /// The currently selected language.
    pub fn active_language(&self) -> &str {
        &self.active
    }

    /// Evaluate one raw cell.
    ///
    /// Strips an optional switch directive, selects (and if needed creates)
    /// the target session, transfers bindings when the language changed
    /// since the last execution, and runs the fragment through the target's
    /// incremental acceptance loop.
    pub async fn evaluate(&mut self, code: &str) -> Result<Option<Value>> {
        if self.closed {
            return Err(EvalError::Termination);
        }
        let (language, remainder) = self.resolve(code)?;
        self.active = language.clone();
        self.ensure_session(&language);
        self.transfer_if_switched(&language);
        let session = self
            .sessions
            .get_mut(&language)
            .expect("session created above");
        session.eval(remainder).await
    }

    /// Classify a raw cell without executing anything.
    pub fn check_complete(&mut self, code: &str) -> Result<CheckOutcome> {
        let (language, remainder) = self.resolve(code)?;
        self.active = language.clone();
        self.ensure_session(&language);
        let session = self.sessions.get(&language).expect("session created above");
        Ok(session.check(remainder))
    }

    /// Completion candidates at a byte offset into a raw cell.
    ///
    /// A cursor inside the directive's identifier token completes language
    /// names; anywhere else, the directive is stripped and the request is
    /// forwarded to the target runtime with the cursor re-based.
    pub fn complete(&mut self, code: &str, cursor: usize) -> Result<Option<Replacements>> {
        if let Some(options) = self.directive_completions(code, cursor) {
            return Ok(Some(options));
        }
        let (language, remainder) = self.resolve(code)?;
        self.active = language.clone();
        self.ensure_session(&language);
        let offset = code.len() - remainder.len();
        let cursor = cursor.saturating_sub(offset);
        let session = self.sessions.get(&language).expect("session created above");
        Ok(session.completions(remainder, cursor))
    }

    /// Cancel in-flight work in the active language's session.
    pub fn interrupt(&self) {
        if let Some(session) = self.sessions.get(&self.active) {
            session.interrupt();
        }
    }

    /// A clonable handle that interrupts the active session from another
    /// task. `None` until that session exists.
    pub fn interrupt_handle(&self) -> Option<InterruptHandle> {
        self.sessions
            .get(&self.active)
            .map(LanguageSession::interrupt_handle)
    }

    /// Shut every session down. Any in-flight work resolves with a fatal
    /// termination fault and nothing can be submitted afterwards, in any
    /// language.
    pub fn shutdown(&mut self) {
        self.closed = true;
        for session in self.sessions.values() {
            session.shutdown();
        }
    }

    fn resolve<'a>(&self, code: &'a str) -> Result<(String, &'a str)> {
        match split_directive(code) {
            Some((ident, remainder)) => {
                if self.is_registered(ident) {
                    Ok((ident.to_string(), remainder))
                } else {
                    Err(EvalError::UnsupportedLanguage {
                        requested: ident.to_string(),
                        available: self.available_languages(),
                    })
                }
            }
            None => Ok((self.active.clone(), code)),
        }
    }

    fn is_registered(&self, language: &str) -> bool {
        self.registry
            .iter()
            .any(|reg| reg.runtime.language() == language)
    }

    fn ensure_session(&mut self, language: &str) {
        if self.sessions.contains_key(language) {
            return;
        }
        let reg = self
            .registry
            .iter()
            .find(|reg| reg.runtime.language() == language)
            .expect("resolve() only returns registered languages");
        tracing::debug!(language = language, "creating language session");
        let session = LanguageSession::new(
            reg.runtime.clone(),
            SessionConfig {
                timeout: self.timeout,
                indent_unit: self.indent_unit.clone(),
                startup_scripts: reg.startup_scripts.clone(),
            },
        );
        self.sessions.insert(language.to_string(), session);
    }

    /// Run the binding transfer when execution moves to a new language.
    ///
    /// The transfer happens strictly between dispatcher steps, so it is the
    /// only writer of the target session's bindings at that moment.
    fn transfer_if_switched(&mut self, target: &str) {
        if let Some(previous) = self.last_run.clone()
            && previous != target
            && self.sessions.contains_key(&previous)
        {
            let mut from = self
                .sessions
                .remove(&previous)
                .expect("checked contains_key above");
            let to = self
                .sessions
                .get_mut(target)
                .expect("target session created before transfer");
            self.broker.transfer(&mut from, to, self.sink.as_ref());
            self.sessions.insert(previous, from);
        }
        self.last_run = Some(target.to_string());
    }

    fn directive_completions(&self, code: &str, cursor: usize) -> Option<Replacements> {
        if !code.starts_with(SWITCH_LANGUAGE_PREFIX) || cursor < SWITCH_LANGUAGE_PREFIX.len() {
            return None;
        }
        let prefix = code.get(SWITCH_LANGUAGE_PREFIX.len()..cursor)?;
        if prefix.chars().any(|c| c.is_whitespace()) {
            return None;
        }
        let options = self
            .registry
            .iter()
            .map(|reg| reg.runtime.language().to_string())
            .filter(|lang| {
                lang.get(..prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            })
            .collect();
        Some(Replacements {
            options,
            replace_start: SWITCH_LANGUAGE_PREFIX.len(),
            replace_end: cursor,
        })
    }
}
