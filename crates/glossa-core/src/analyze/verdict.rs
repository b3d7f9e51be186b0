//! Completeness classification for a source fragment.

use serde::{Deserialize, Serialize};

/// How far a fragment got toward being a runnable statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completeness {
    /// Nothing but whitespace and comments.
    Empty,
    /// A complete statement that can run as written.
    Complete,
    /// A complete statement ending in its terminator.
    CompleteWithTerminator,
    /// Could be completed by further input; probably meant to continue.
    ConsideredIncomplete,
    /// Cannot possibly be complete yet (an open group or unterminated
    /// literal is pending).
    DefinitelyIncomplete,
    /// Undecidable without executing it. Treated as complete so the real
    /// error (if any) surfaces at execution time.
    Unknown,
}

impl Completeness {
    /// Whether the matched prefix should be handed to the executor.
    ///
    /// `Unknown` counts as complete: only running the text will tell.
    pub fn is_complete(self) -> bool {
        matches!(
            self,
            Completeness::Complete | Completeness::CompleteWithTerminator | Completeness::Unknown
        )
    }
}

/// Result of analyzing one fragment: a classification, the matched complete
/// prefix, and whatever input was not consumed.
///
/// Verdicts are produced fresh for every analysis call and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessVerdict {
    /// The classification of the fragment.
    pub completeness: Completeness,
    /// The matched complete prefix (empty unless `completeness.is_complete()`).
    pub source: String,
    /// The unconsumed remainder of the input.
    pub remaining: String,
}

impl CompletenessVerdict {
    /// All input consumed; nothing left to run.
    pub fn empty() -> Self {
        Self {
            completeness: Completeness::Empty,
            source: String::new(),
            remaining: String::new(),
        }
    }

    /// A complete statement plus the text after it.
    pub fn complete(source: impl Into<String>, remaining: impl Into<String>) -> Self {
        Self {
            completeness: Completeness::Complete,
            source: source.into(),
            remaining: remaining.into(),
        }
    }

    /// A complete, terminator-ended statement plus the text after it.
    pub fn complete_with_terminator(
        source: impl Into<String>,
        remaining: impl Into<String>,
    ) -> Self {
        Self {
            completeness: Completeness::CompleteWithTerminator,
            source: source.into(),
            remaining: remaining.into(),
        }
    }

    /// Partial text that could still become a statement.
    pub fn considered_incomplete(remaining: impl Into<String>) -> Self {
        Self {
            completeness: Completeness::ConsideredIncomplete,
            source: String::new(),
            remaining: remaining.into(),
        }
    }

    /// Partial text with structure still open.
    pub fn definitely_incomplete(remaining: impl Into<String>) -> Self {
        Self {
            completeness: Completeness::DefinitelyIncomplete,
            source: String::new(),
            remaining: remaining.into(),
        }
    }

    /// Undecidable text. The whole input becomes the matched prefix so the
    /// acceptance loop executes it and lets the runtime report the truth.
    pub fn unknown(text: impl Into<String>) -> Self {
        Self {
            completeness: Completeness::Unknown,
            source: text.into(),
            remaining: String::new(),
        }
    }
}
