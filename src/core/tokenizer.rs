//! Splits a raw input line into whitespace-delimited words.

use log::warn;

/// Maximum number of words kept from a single line. Anything past this is
/// dropped.
pub const MAX_TOKENS: usize = 63;

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Splits `line` on runs of spaces, tabs, carriage returns and newlines.
///
/// There is no quoting or escaping. An empty or all-whitespace line yields no
/// tokens. Only the first [`MAX_TOKENS`] words are kept.
///
/// # Examples
/// ```
/// use henrysh::core::tokenizer::tokenize;
///
/// assert_eq!(tokenize("  ls\t-l \r\n"), vec!["ls", "-l"]);
/// assert!(tokenize(" \t ").is_empty());
/// ```
pub fn tokenize(line: &str) -> Vec<String> {
    let mut words = line.split(is_separator).filter(|word| !word.is_empty());
    let tokens: Vec<String> = words.by_ref().take(MAX_TOKENS).map(String::from).collect();

    let dropped = words.count();
    if dropped > 0 {
        warn!(
            "dropped {} word(s) past the {}-word limit: {:?}",
            dropped, MAX_TOKENS, line
        );
    }

    tokens
}
