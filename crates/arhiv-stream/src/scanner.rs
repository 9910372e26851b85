//! Bounded string scanner
//!
//! A byte-level state machine that knows whether the current position is
//! inside a JSON string literal. Every structural decision in this crate
//! (brace depth, quote counting, key/value tokenizing) goes through it, so an
//! escaped quote is treated the same way everywhere.
//!
//! Scanning bytes rather than chars is safe: every structural JSON character
//! is ASCII and UTF-8 continuation bytes never collide with ASCII.

/// What a single byte turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Outside any string, not a quote
    Structural,
    /// Opening quote of a string
    StringOpen,
    /// Closing quote of a string
    StringClose,
    /// Content of a string (including escapes and escaped quotes)
    InString,
}

/// Tracks string and escape state across a byte sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringScanner {
    in_string: bool,
    escaped: bool,
    open_at: usize,
}

impl StringScanner {
    /// Scanner positioned outside any string
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance over `byte`, located at `offset` in the scanned text
    pub fn step(&mut self, offset: usize, byte: u8) -> Step {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
                return Step::InString;
            }
            match byte {
                b'\\' => {
                    self.escaped = true;
                    Step::InString
                }
                b'"' => {
                    self.in_string = false;
                    Step::StringClose
                }
                _ => Step::InString,
            }
        } else if byte == b'"' {
            self.in_string = true;
            self.open_at = offset;
            Step::StringOpen
        } else {
            Step::Structural
        }
    }

    /// True while inside a string literal
    pub fn in_string(&self) -> bool {
        self.in_string
    }

    /// True when the previous byte was an unconsumed backslash inside a string
    pub fn escape_pending(&self) -> bool {
        self.escaped
    }

    /// Offset of the opening quote of the string currently open
    pub fn open_string_at(&self) -> Option<usize> {
        self.in_string.then_some(self.open_at)
    }
}

/// Count quote characters that open or close a string.
///
/// Escaped quotes inside strings are not counted, so an odd result means a
/// string is open at the end of `text`.
pub fn count_unescaped_quotes(text: &str) -> usize {
    let mut scanner = StringScanner::new();
    text.bytes()
        .enumerate()
        .filter(|&(i, b)| matches!(scanner.step(i, b), Step::StringOpen | Step::StringClose))
        .count()
}

/// Find the closing quote of the string opening at `start`.
///
/// Returns `None` if `text[start]` is not a quote or the string never closes.
pub fn string_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'"') {
        return None;
    }

    let mut scanner = StringScanner::new();
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if scanner.step(i, b) == Step::StringClose {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(text: &str) -> Vec<Step> {
        let mut scanner = StringScanner::new();
        text.bytes().enumerate().map(|(i, b)| scanner.step(i, b)).collect()
    }

    #[test]
    fn test_plain_string() {
        assert_eq!(
            steps(r#"{"a"}"#),
            vec![
                Step::Structural,
                Step::StringOpen,
                Step::InString,
                Step::StringClose,
                Step::Structural,
            ]
        );
    }

    #[test]
    fn test_escaped_quote_stays_in_string() {
        let mut scanner = StringScanner::new();
        for (i, b) in r#""a\"b"#.bytes().enumerate() {
            scanner.step(i, b);
        }
        assert!(scanner.in_string());
        assert_eq!(scanner.open_string_at(), Some(0));
    }

    #[test]
    fn test_escaped_backslash_then_quote_closes() {
        let mut scanner = StringScanner::new();
        for (i, b) in r#""a\\""#.bytes().enumerate() {
            scanner.step(i, b);
        }
        assert!(!scanner.in_string());
        assert_eq!(scanner.open_string_at(), None);
    }

    #[test]
    fn test_escape_pending_at_end() {
        let mut scanner = StringScanner::new();
        for (i, b) in r#""abc\"#.bytes().enumerate() {
            scanner.step(i, b);
        }
        assert!(scanner.escape_pending());
    }

    #[test]
    fn test_braces_inside_strings_are_not_structural() {
        let structural: Vec<_> = {
            let text = r#"{"x":"}{"}"#;
            let mut scanner = StringScanner::new();
            text.bytes()
                .enumerate()
                .filter(|&(i, b)| scanner.step(i, b) == Step::Structural)
                .map(|(_, b)| b as char)
                .collect()
        };
        assert_eq!(structural, vec!['{', ':', '}']);
    }

    #[test]
    fn test_count_unescaped_quotes() {
        assert_eq!(count_unescaped_quotes(r#"{"a":"1""#), 4);
        assert_eq!(count_unescaped_quotes(r#"{"a":"say \"hi"#), 3);
        assert_eq!(count_unescaped_quotes(""), 0);
    }

    #[test]
    fn test_string_end() {
        let text = r#"x "a \" b" y"#;
        assert_eq!(string_end(text, 2), Some(9));
        assert_eq!(string_end(text, 0), None);
        assert_eq!(string_end(r#""open"#, 0), None);
    }
}
