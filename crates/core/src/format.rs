//! Text layout helpers for the TAP reporter: word wrapping and the
//! YAML-like diagnostic block.

use std::io::IsTerminal;

/// Width used when stdout is not a terminal
pub const DEFAULT_WIDTH: usize = 80;

/// Indent for continuation lines and diagnostic blocks
pub const INDENT: &str = "  ";

/// Output width: the terminal's column count, or [`DEFAULT_WIDTH`]
pub fn detect_width() -> usize {
    if !std::io::stdout().is_terminal() {
        return DEFAULT_WIDTH;
    }
    match crossterm::terminal::size() {
        Ok((columns, _)) if columns > 0 => columns as usize,
        _ => DEFAULT_WIDTH,
    }
}

/// Take the next physical line from `text`, at most `width` chars.
///
/// Breaks after the first embedded newline in the window. When the window is
/// full, breaks after the first char of the last whitespace run so the word
/// that would straddle the edge moves to the next line.
fn cut_line(text: &str, width: usize) -> &str {
    let end = text
        .char_indices()
        .nth(width)
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    let window = &text[..end];

    if let Some(newline) = window.find(|c| c == '\n' || c == '\r') {
        let after = if window[newline..].starts_with("\r\n") {
            newline + 2
        } else {
            newline + 1
        };
        return &window[..after];
    }

    if window.chars().count() == width {
        let head = window.trim_end_matches(|c: char| !c.is_whitespace());
        let run_start = head.trim_end().len();
        if run_start < head.len() {
            let first = head[run_start..].chars().next().map_or(1, char::len_utf8);
            return &window[..run_start + first];
        }
    }

    window
}

/// Wrap `text` to `width` columns.
///
/// The first `skip` lines are emitted as-is at full width; every later line
/// is prefixed with `prefix` and wrapped to `width - prefix.len()`. Trailing
/// whitespace is trimmed from each line.
pub fn wordwrap(text: &str, width: usize, prefix: &str, skip: usize) -> Vec<String> {
    let indent = prefix.chars().count();
    let mut remaining = text;
    let mut skip = skip;
    let mut out = Vec::new();

    while !remaining.is_empty() {
        let (max, line_prefix) = if skip > 0 {
            (width, "")
        } else {
            (width.saturating_sub(indent), prefix)
        };
        let line = cut_line(remaining, max.max(1));
        remaining = &remaining[line.len()..];
        out.push(format!("{}{}", line_prefix, line.trim_end()));
        skip = skip.saturating_sub(1);
    }

    out
}

/// Quote a scalar unless it is only word characters and whitespace
pub fn safe_value(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace());
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

/// One entry of a diagnostic block
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Scalar(&'static str, String),
    List(&'static str, Vec<String>),
}

impl Field {
    pub fn key(&self) -> &'static str {
        match self {
            Field::Scalar(key, _) | Field::List(key, _) => key,
        }
    }
}

/// A line of the diagnostic block before styling
#[derive(Debug, Clone, PartialEq)]
pub enum BlockLine {
    Marker(&'static str),
    /// `key:` plus the aligned value text (empty for list headers)
    Key(&'static str, String),
    /// A list item, already quoted
    Item(String),
}

impl BlockLine {
    pub fn plain(&self) -> String {
        match self {
            BlockLine::Marker(marker) => marker.to_string(),
            BlockLine::Key(key, rest) if rest.is_empty() => format!("{}:", key),
            BlockLine::Key(key, rest) => format!("{}:{}", key, rest),
            BlockLine::Item(item) => format!("{}- {}", INDENT, item),
        }
    }
}

/// Lay out fields as a `---` ... `...` block with keys aligned to the longest
pub fn diagnostic_block(fields: &[Field]) -> Vec<BlockLine> {
    let width = fields.iter().map(|f| f.key().len()).max().unwrap_or(0);
    let mut lines = vec![BlockLine::Marker("---")];

    for field in fields {
        match field {
            Field::Scalar(key, value) => {
                let pad = " ".repeat(width - key.len());
                lines.push(BlockLine::Key(key, format!("{} {}", pad, safe_value(value))));
            }
            Field::List(key, items) => {
                lines.push(BlockLine::Key(key, String::new()));
                lines.extend(items.iter().map(|item| BlockLine::Item(safe_value(item))));
            }
        }
    }

    lines.push(BlockLine::Marker("..."));
    lines
}

/// Pass rate as a percentage, NaN when nothing ran
pub fn rate(pass: usize, total: usize) -> f64 {
    if total == 0 {
        return f64::NAN;
    }
    pass as f64 / total as f64 * 100.0
}

/// Rate rounded to two decimals, `NaN` for an empty run
pub fn format_rate(pass: usize, total: usize) -> String {
    let value = rate(pass, total);
    if value.is_nan() {
        "NaN".to_string()
    } else {
        // half away from zero; `{:.2}` alone rounds ties to even
        format!("{:.2}", (value * 100.0).round() / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(wordwrap("ok 1 - mint", 80, INDENT, 1), vec!["ok 1 - mint"]);
    }

    #[test]
    fn test_breaks_at_last_whitespace_in_window() {
        let lines = wordwrap("alpha beta gamma", 12, INDENT, 1);
        assert_eq!(lines, vec!["alpha beta", "  gamma"]);
    }

    #[test]
    fn test_breaks_at_embedded_newline() {
        let lines = wordwrap("---\nmessage: boom\n...", 80, INDENT, 0);
        assert_eq!(lines, vec!["  ---", "  message: boom", "  ..."]);
    }

    #[test]
    fn test_crlf_counts_as_one_break() {
        let lines = wordwrap("a\r\nb", 80, "", 0);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_skip_lines_are_not_indented() {
        let lines = wordwrap("one two three four", 9, "  ", 1);
        assert_eq!(lines, vec!["one two", "  three", "  four"]);
    }

    #[test]
    fn test_unbroken_word_is_hard_split() {
        let lines = wordwrap("abcdefghij", 4, "", 0);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_multibyte_text_wraps_on_chars() {
        let lines = wordwrap("héllo wörld", 7, "", 0);
        assert_eq!(lines, vec!["héllo", "wörld"]);
    }

    #[test]
    fn test_safe_value_quotes_symbols() {
        assert_eq!(safe_value("expected 1 to equal 2"), "expected 1 to equal 2");
        assert_eq!(safe_value("tests/token.rs:3:9"), "'tests/token.rs:3:9'");
        assert_eq!(safe_value("it's"), "'it\\'s'");
        assert_eq!(safe_value(""), "''");
    }

    #[test]
    fn test_block_aligns_keys() {
        let lines: Vec<String> = diagnostic_block(&[
            Field::Scalar("message", "boom".into()),
            Field::Scalar("operator", "equal".into()),
            Field::List("location", vec!["a.rs:1:1".into()]),
        ])
        .iter()
        .map(BlockLine::plain)
        .collect();

        assert_eq!(
            lines,
            vec![
                "---",
                "message:  boom",
                "operator: equal",
                "location:",
                "  - 'a.rs:1:1'",
                "...",
            ]
        );
    }

    #[test]
    fn test_rate_rounding_and_empty_run() {
        assert_eq!(format_rate(2, 3), "66.67");
        assert_eq!(format_rate(3, 3), "100.00");
        assert_eq!(format_rate(1, 800), "0.13");
        assert_eq!(format_rate(5, 800), "0.63");
        assert_eq!(format_rate(0, 0), "NaN");
        assert!(rate(0, 0).is_nan());
    }
}
