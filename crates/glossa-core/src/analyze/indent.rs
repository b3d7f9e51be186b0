//! Continuation-indent inference for interactive prompts.

/// Suggest the indentation for the next line of a partial statement.
///
/// Takes the whitespace prefix of the remainder's last line; if a brace or
/// paren was opened on that line and not closed on it, the suggestion is one
/// `unit` deeper, otherwise it is the prefix unchanged. Closers with no
/// matching opener on the same line are ignored. Only the final line is
/// inspected; this is a heuristic, not a parse.
pub fn suggest_continuation_indent(partial: &str, unit: &str) -> String {
    let last_line = partial.rsplit('\n').next().unwrap_or(partial);
    let prefix_len = last_line
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(last_line.len(), |(i, _)| i);
    let prefix = &last_line[..prefix_len];

    let mut open_braces = 0u32;
    let mut open_parens = 0u32;
    for c in last_line.chars() {
        match c {
            '{' => open_braces += 1,
            '}' if open_braces > 0 => open_braces -= 1,
            '(' => open_parens += 1,
            ')' if open_parens > 0 => open_parens -= 1,
            _ => {}
        }
    }

    if open_braces > 0 || open_parens > 0 {
        format!("{}{}", prefix, unit)
    } else {
        prefix.to_string()
    }
}
