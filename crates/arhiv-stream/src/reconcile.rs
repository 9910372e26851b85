//! Partial record reconciler
//!
//! Recovers the complete `"key": "value"` pairs from an object span that is
//! not valid JSON on its own: usually a record still being written, sometimes
//! one the model botched.
//!
//! Two tiers:
//!
//! 1. Auto-completion: cut off a pair whose value string is still open,
//!    close an open string if the quote count is odd, close the brace,
//!    strict-parse.
//! 2. Tokenizer fallback: walk the object's top level with the shared
//!    [`StringScanner`] and collect every `string : string` triple.

use crate::scanner::{count_unescaped_quotes, Step, StringScanner};
use crate::value::record_from_object;
use arhiv_domain::Record;
use serde_json::Value;
use tracing::trace;

/// Recover as many complete pairs as possible from `span`.
///
/// `span` is expected to start at the record's opening brace. Returns `None`
/// when nothing at all is recoverable.
///
/// # Examples
///
/// ```
/// use arhiv_stream::reconcile;
///
/// let record = reconcile(r#"{"a":"1","b":"hel"#).unwrap();
/// assert_eq!(record.get("a"), Some("1"));
/// assert!(record.get("b").is_none());
/// ```
pub fn reconcile(span: &str) -> Option<Record> {
    let scan = tokenize(span);

    let record = match autocomplete(span, scan.open_pair_start) {
        Some(record) => record,
        None => {
            trace!(span_len = span.len(), "auto-completion failed, using tokenizer pairs");
            scan.pairs
        }
    };

    (!record.is_empty()).then_some(record)
}

/// Tier 1: close the span and strict-parse it
fn autocomplete(span: &str, open_pair_start: Option<usize>) -> Option<Record> {
    if span.trim_end().ends_with('}') {
        // Already closed and still invalid: closing it again cannot help
        return None;
    }

    // A value still being written never reaches the parser
    let body = match open_pair_start {
        Some(offset) => {
            let head = span[..offset].trim_end();
            head.strip_suffix(',').unwrap_or(head)
        }
        None => span,
    };

    let mut fixed = String::with_capacity(body.len() + 2);
    fixed.push_str(body);
    if count_unescaped_quotes(body) % 2 != 0 {
        fixed.push('"');
    }
    fixed.push('}');

    let value: Value = serde_json::from_str(&fixed).ok()?;
    Some(record_from_object(value.as_object()?))
}

/// What the tokenizer found in a span
#[derive(Debug, Default)]
struct SpanScan {
    /// Every complete top-level `string : string` pair
    pairs: Record,
    /// Offset of the key quote of a pair whose value string is still open
    /// at the end of the span
    open_pair_start: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Key,
    Colon,
    Value,
    Separator,
}

/// Tier 2: tokenize the object's top level.
///
/// Lenient by construction: a string arriving where a comma was expected
/// starts a new pair, and anything that is not a string value is skipped up
/// to the next top-level comma.
fn tokenize(span: &str) -> SpanScan {
    let bytes = span.as_bytes();
    let mut scanner = StringScanner::new();
    let mut depth = 0usize;
    let mut expect = Expect::Key;
    let mut key: Option<String> = None;
    let mut key_start = 0usize;
    let mut string_start = 0usize;
    let mut scan = SpanScan::default();

    for (i, &b) in bytes.iter().enumerate() {
        let step = scanner.step(i, b);

        // Nested containers are skipped wholesale
        if depth != 1 {
            if step == Step::Structural {
                match b {
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
            continue;
        }

        match step {
            Step::StringOpen => string_start = i,
            Step::InString => {}
            Step::StringClose => {
                let text = decode_string(&span[string_start..=i]);
                match expect {
                    Expect::Key | Expect::Separator | Expect::Colon => {
                        key = text;
                        key_start = string_start;
                        expect = Expect::Colon;
                    }
                    Expect::Value => {
                        if let (Some(k), Some(v)) = (key.take(), text) {
                            scan.pairs.insert(k, v);
                        }
                        expect = Expect::Separator;
                    }
                }
            }
            Step::Structural => match b {
                b' ' | b'\t' | b'\n' | b'\r' => {}
                b':' if expect == Expect::Colon => expect = Expect::Value,
                b',' => {
                    key = None;
                    expect = Expect::Key;
                }
                b'{' | b'[' => {
                    depth += 1;
                    key = None;
                    expect = Expect::Separator;
                }
                b'}' | b']' => {
                    depth -= 1;
                    key = None;
                    expect = Expect::Separator;
                }
                _ => {
                    // Bare scalar (number, literal) or stray byte
                    key = None;
                    expect = Expect::Separator;
                }
            },
        }
    }

    if scanner.in_string() && depth == 1 && expect == Expect::Value {
        scan.open_pair_start = Some(key_start);
    }
    scan
}

/// Decode a complete JSON string literal (quotes included)
fn decode_string(literal: &str) -> Option<String> {
    serde_json::from_str::<String>(literal).ok()
}
