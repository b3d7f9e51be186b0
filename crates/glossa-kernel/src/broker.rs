//! Cross-language transfer of top-level variables.
//!
//! When the active language changes, every user-defined top-level name of
//! the outgoing language is offered to the incoming one. "User-defined"
//! means: not in the outgoing language's pristine set. Names whose
//! translation collides with the incoming language's pristine set are
//! skipped so built-ins are never shadowed.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use glossa_core::BindingWriteError;

use crate::output::OutputSink;
use crate::session::LanguageSession;

/// Per-language naming conventions for top-level variables.
///
/// Some languages mark globals with a leading sigil. Exporting from such a
/// language strips the sigil; importing into one applies it. The default
/// table carries the one convention the kernel ships with: `$` for
/// `rubyish`-style runtimes. Pairs not in the table copy names verbatim.
#[derive(Debug, Clone)]
pub struct NamingConventions {
    sigils: FxHashMap<String, char>,
}

impl Default for NamingConventions {
    fn default() -> Self {
        let mut sigils = FxHashMap::default();
        sigils.insert("rubyish".to_string(), '$');
        Self { sigils }
    }
}

impl NamingConventions {
    /// An empty table: all names copy verbatim.
    pub fn none() -> Self {
        Self {
            sigils: FxHashMap::default(),
        }
    }

    /// Register a global-variable sigil for a language.
    pub fn with_sigil(mut self, language: impl Into<String>, sigil: char) -> Self {
        self.sigils.insert(language.into(), sigil);
        self
    }

    /// Translate a top-level name from one language's convention to
    /// another's.
    pub fn translate(&self, from_language: &str, to_language: &str, name: &str) -> String {
        let mut name = name.to_string();
        if let Some(&sigil) = self.sigils.get(from_language)
            && let Some(stripped) = name.strip_prefix(sigil)
        {
            name = stripped.to_string();
        }
        if let Some(&sigil) = self.sigils.get(to_language) {
            name.insert(0, sigil);
        }
        name
    }
}

/// What one transfer did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReport {
    /// Destination names successfully imported, in encounter order.
    pub imported: Vec<String>,
    /// Source names the destination runtime refused to write.
    pub unsupported: Vec<String>,
}

/// Copies top-level variables between two language sessions on a switch.
pub struct BindingBroker {
    conventions: NamingConventions,
}

impl BindingBroker {
    /// Create a broker with the given naming conventions.
    pub fn new(conventions: NamingConventions) -> Self {
        Self { conventions }
    }

    /// Transfer user-defined top-level variables from `from` to `to`.
    ///
    /// Called exactly once per language switch, before the incoming
    /// language runs its first statement of the new active period. Captures
    /// both pristine sets first, so imports are always diffed against a
    /// stable baseline. Refused writes are reported, never dropped
    /// silently.
    pub fn transfer(
        &self,
        from: &mut LanguageSession,
        to: &mut LanguageSession,
        sink: &dyn OutputSink,
    ) -> TransferReport {
        let from_pristine = from.pristine_bindings().clone();
        let to_pristine = to.pristine_bindings().clone();
        let from_language = from.language().to_string();
        let to_language = to.language().to_string();

        let mut report = TransferReport::default();
        for name in from.runtime().bindings() {
            if from_pristine.contains(&name) {
                continue;
            }
            let target = self
                .conventions
                .translate(&from_language, &to_language, &name);
            if to_pristine.contains(&target) {
                continue;
            }
            let Some(value) = from.runtime().binding(&name) else {
                continue;
            };
            match to.runtime().set_binding(&target, value) {
                Ok(()) => report.imported.push(target),
                Err(BindingWriteError::Unsupported) => report.unsupported.push(name.clone()),
            }
        }

        tracing::debug!(
            from = %from_language,
            to = %to_language,
            imported = report.imported.len(),
            unsupported = report.unsupported.len(),
            "binding transfer finished"
        );
        if !report.imported.is_empty() {
            sink.out_line(&format!(
                "Imported variables: {}",
                report.imported.join(", ")
            ));
        }
        if !report.unsupported.is_empty() {
            sink.err_line(&format!(
                "Import of following variables is not supported: {}",
                report.unsupported.join(", ")
            ));
        }
        report
    }
}
