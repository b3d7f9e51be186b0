//! A reusable lexical completeness analyzer for brace/semicolon languages.
//!
//! This is not a parser: it scans tokens just far enough to skip comments,
//! string and character literals, track group nesting, and find the first
//! top-level statement terminator. Language runtimes with a real front end
//! should use it; runtimes with smarter analysis can ignore it.

use super::verdict::CompletenessVerdict;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    Str,
    Char,
}

/// Lexical completeness analysis for languages with `{}`/`()`/`[]` grouping,
/// `;`-terminated statements, `//` and `/* */` comments, and `"`/`'` literals
/// with backslash escapes.
///
/// A complete leading statement ends at the first `;` outside any group, or
/// at the `}` that closes a top-level brace group. Text that closes a group
/// that was never opened is classified [`Completeness::Unknown`]: it can only
/// be diagnosed by running it.
///
/// [`Completeness::Unknown`]: super::Completeness::Unknown
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedAnalyzer;

impl BalancedAnalyzer {
    /// Create a new analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Classify `text` and isolate its leading complete statement, if any.
    pub fn analyze(&self, text: &str) -> CompletenessVerdict {
        let mut mode = Mode::Code;
        let mut escaped = false;
        let mut depth = 0u32;
        let mut saw_code = false;
        let mut last_code_char = ' ';
        // Byte offset just past the first top-level terminator, plus whether
        // that terminator was a semicolon.
        let mut split: Option<(usize, bool)> = None;

        let mut chars = text.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match mode {
                Mode::Code => match c {
                    '/' if chars.peek().is_some_and(|&(_, n)| n == '/') => {
                        chars.next();
                        mode = Mode::LineComment;
                    }
                    '/' if chars.peek().is_some_and(|&(_, n)| n == '*') => {
                        chars.next();
                        mode = Mode::BlockComment;
                    }
                    '"' => {
                        saw_code = true;
                        last_code_char = c;
                        mode = Mode::Str;
                    }
                    '\'' => {
                        saw_code = true;
                        last_code_char = c;
                        mode = Mode::Char;
                    }
                    '{' | '(' | '[' => {
                        saw_code = true;
                        last_code_char = c;
                        depth += 1;
                    }
                    '}' | ')' | ']' => {
                        if depth == 0 {
                            // A closer with no opener can never become
                            // valid by typing more; let execution report it.
                            return CompletenessVerdict::unknown(text);
                        }
                        saw_code = true;
                        last_code_char = c;
                        depth -= 1;
                        if depth == 0 && c == '}' {
                            split = Some((i + 1, false));
                            break;
                        }
                    }
                    ';' => {
                        saw_code = true;
                        last_code_char = c;
                        if depth == 0 {
                            split = Some((i + 1, true));
                            break;
                        }
                    }
                    c if c.is_whitespace() => {}
                    c => {
                        saw_code = true;
                        last_code_char = c;
                    }
                },
                Mode::LineComment => {
                    if c == '\n' {
                        mode = Mode::Code;
                    }
                }
                Mode::BlockComment => {
                    if c == '*' && chars.peek().is_some_and(|&(_, n)| n == '/') {
                        chars.next();
                        mode = Mode::Code;
                    }
                }
                Mode::Str => {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        mode = Mode::Code;
                    }
                }
                Mode::Char => {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '\'' {
                        mode = Mode::Code;
                    }
                }
            }
        }

        if let Some((end, semicolon)) = split {
            let source = &text[..end];
            let remaining = &text[end..];
            return if semicolon {
                CompletenessVerdict::complete_with_terminator(source, remaining)
            } else {
                CompletenessVerdict::complete(source, remaining)
            };
        }

        match mode {
            // An unterminated literal or block comment needs more input.
            Mode::Str | Mode::Char | Mode::BlockComment => {
                CompletenessVerdict::definitely_incomplete(text)
            }
            Mode::Code | Mode::LineComment => {
                if !saw_code {
                    CompletenessVerdict::empty()
                } else if depth > 0 {
                    CompletenessVerdict::definitely_incomplete(text)
                } else if is_continuation_char(last_code_char) {
                    CompletenessVerdict::considered_incomplete(text)
                } else {
                    // Balanced, unterminated text reads as an expression or
                    // a statement missing its optional terminator.
                    CompletenessVerdict::complete(text, "")
                }
            }
        }
    }
}

/// Characters that, when last on a line, clearly expect a right-hand side.
fn is_continuation_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '=' | '&' | '|' | '<' | '>' | ',' | '.' | '!' | '?' | ':'
    )
}
