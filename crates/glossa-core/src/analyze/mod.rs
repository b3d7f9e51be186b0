//! Completeness analysis for interactively typed source fragments.
//!
//! A fragment may hold several complete statements, a complete statement
//! followed by partial text, or only partial text. Analysis classifies the
//! fragment and isolates the leading complete prefix so the session layer
//! can accept input one statement at a time.

mod balance;
mod indent;
mod verdict;

pub use balance::BalancedAnalyzer;
pub use indent::suggest_continuation_indent;
pub use verdict::{Completeness, CompletenessVerdict};
