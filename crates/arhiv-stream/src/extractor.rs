//! Incremental JSON record extractor
//!
//! Turns the accumulated model output into the best current approximation of
//! the record list. Two tiers:
//!
//! 1. **Fast path**: strict parse of the whole buffer. Succeeds once the model
//!    has finished (or happens to have produced a valid prefix).
//! 2. **Degraded path**: locate the records array and scan it byte by byte,
//!    cutting out balanced `{...}` spans. Closed spans are strict-parsed (or
//!    reconciled if broken); a span still open at the end of the buffer is the
//!    trailing partial record and is reconciled.
//!
//! [`IncrementalExtractor`] keeps a checkpoint after the last closed object
//! and only rescans the tail on the next call. Its output for a buffer is
//! identical to a fresh pass over the same buffer.

use crate::reconcile::reconcile;
use crate::scanner::{Step, StringScanner};
use crate::value::{record_from_object, records_in_document, strict_parse, RECORDS_KEY};
use arhiv_domain::{Extraction, Record};
use serde_json::Value;
use tracing::{debug, trace};

/// Extractor tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorOptions {
    /// Key of the records array in the model's JSON object
    pub records_key: String,
    /// Emit an empty record for spans that recover no pairs at all
    pub emit_placeholders: bool,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            records_key: RECORDS_KEY.to_string(),
            emit_placeholders: false,
        }
    }
}

/// Extract records from `buffer` with default options.
///
/// Stateless and deterministic: the same buffer always yields the same
/// extraction.
///
/// # Examples
///
/// ```
/// use arhiv_stream::extract_records;
///
/// let extraction = extract_records(r#"{"records":[{"id":"1","title":"Alpha"},{"id":"2","tit"#);
/// let records = extraction.records();
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0].get("title"), Some("Alpha"));
/// assert_eq!(records[1].get("id"), Some("2"));
/// assert!(records[1].get("title").is_none());
/// ```
pub fn extract_records(buffer: &str) -> Extraction {
    extract_records_with(buffer, &ExtractorOptions::default())
}

/// [`extract_records`] with explicit options
pub fn extract_records_with(buffer: &str, options: &ExtractorOptions) -> Extraction {
    IncrementalExtractor::with_options(options.clone()).extract(buffer)
}

/// Scan position after the last closed object
#[derive(Debug, Clone, Default)]
struct Checkpoint {
    /// Next byte to scan
    offset: usize,
    /// String state at `offset` (brace depth is always 0 here)
    scanner: StringScanner,
    /// Records from every closed span before `offset`
    completed: Vec<Record>,
    /// The records array's closing bracket has been seen
    closed: bool,
}

/// Where the records array starts, if anywhere yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayStart {
    /// Offset of the opening `[`
    Found(usize),
    /// Not determinable yet; more text may reveal it
    Pending,
    /// The records key exists but its value is not an array
    NotArray,
}

/// Stateful extractor for one append-only buffer
///
/// Callers must pass buffers that extend the previous one. A buffer shorter
/// than what was already scanned resets the extractor; use
/// [`IncrementalExtractor::reset`] when a new operation starts.
#[derive(Debug, Clone, Default)]
pub struct IncrementalExtractor {
    options: ExtractorOptions,
    array_start: Option<usize>,
    checkpoint: Checkpoint,
    seen_len: usize,
}

impl IncrementalExtractor {
    /// Create an extractor with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with custom options
    pub fn with_options(options: ExtractorOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Options in use
    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Forget all scan state
    pub fn reset(&mut self) {
        self.array_start = None;
        self.checkpoint = Checkpoint::default();
        self.seen_len = 0;
    }

    /// Best current approximation of the record list for `buffer`
    pub fn extract(&mut self, buffer: &str) -> Extraction {
        if buffer.len() < self.seen_len {
            debug!(
                previous = self.seen_len,
                current = buffer.len(),
                "buffer shrank, resetting extractor"
            );
            self.reset();
        }
        self.seen_len = buffer.len();

        if let Some(records) = self.fast_path(buffer) {
            return Extraction::from_records(records);
        }

        Extraction::from_records(self.degraded_path(buffer))
    }

    /// Strict parse of the whole buffer
    fn fast_path(&self, buffer: &str) -> Option<Vec<Record>> {
        // A complete document can only end in one of these
        let last = buffer.trim_end().chars().last()?;
        if !matches!(last, '}' | ']' | '`') {
            return None;
        }

        let document: Value = strict_parse(buffer).ok()?;
        match records_in_document(&document, &self.options.records_key) {
            Ok(records) => Some(records),
            Err(_) => Some(Vec::new()),
        }
    }

    fn degraded_path(&mut self, buffer: &str) -> Vec<Record> {
        let array_start = match self.array_start {
            Some(start) => start,
            None => match locate_records_array(buffer, &self.options.records_key) {
                ArrayStart::Found(start) => {
                    debug!(offset = start, "records array located");
                    self.array_start = Some(start);
                    self.checkpoint = Checkpoint {
                        offset: start + 1,
                        ..Checkpoint::default()
                    };
                    start
                }
                ArrayStart::Pending | ArrayStart::NotArray => return Vec::new(),
            },
        };
        trace!(array_start, resume_at = self.checkpoint.offset, "scanning records array");

        let trailing = scan_array(buffer, &mut self.checkpoint, &self.options);

        let mut records = self.checkpoint.completed.clone();
        records.extend(trailing);
        records
    }
}

/// Scan from the checkpoint to the end of `buffer`.
///
/// Moves the checkpoint past every object that closes and returns the
/// reconciled trailing record, if one is open at the end.
fn scan_array(buffer: &str, checkpoint: &mut Checkpoint, options: &ExtractorOptions) -> Option<Record> {
    if checkpoint.closed {
        return None;
    }

    let bytes = buffer.as_bytes();
    let mut scanner = checkpoint.scanner;
    let mut depth = 0usize;
    let mut span_start = None;

    for (i, &b) in bytes.iter().enumerate().skip(checkpoint.offset) {
        if scanner.step(i, b) != Step::Structural {
            continue;
        }

        match b {
            b'{' => {
                if depth == 0 {
                    span_start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(start) = span_start.take() {
                        if let Some(record) = closed_span_record(&buffer[start..=i], options) {
                            checkpoint.completed.push(record);
                        }
                    }
                    checkpoint.offset = i + 1;
                    checkpoint.scanner = scanner;
                }
            }
            b']' if depth == 0 => {
                checkpoint.closed = true;
                checkpoint.offset = i + 1;
                checkpoint.scanner = scanner;
                return None;
            }
            _ => {}
        }
    }

    match span_start {
        Some(start) => trailing_span_record(&buffer[start..], options),
        None => {
            // Nothing open: the tail between objects never needs rescanning
            checkpoint.offset = bytes.len();
            checkpoint.scanner = scanner;
            None
        }
    }
}

/// Record for a brace-balanced span
fn closed_span_record(span: &str, options: &ExtractorOptions) -> Option<Record> {
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(object)) => Some(record_from_object(&object)),
        Ok(_) => None,
        Err(e) => {
            trace!(error = %e, "closed span is not valid JSON, reconciling");
            reconcile(span).or_else(|| placeholder(options))
        }
    }
}

/// Record for a span still open at the end of the buffer
fn trailing_span_record(span: &str, options: &ExtractorOptions) -> Option<Record> {
    reconcile(span).or_else(|| placeholder(options))
}

fn placeholder(options: &ExtractorOptions) -> Option<Record> {
    options.emit_placeholders.then(Record::new)
}

/// Find the `[` that opens the records array.
///
/// A top-level array (optionally inside a markdown fence) is used directly.
/// Otherwise the first `"key":` whose value is `[` wins. Occurrences holding
/// some other value are passed over, so a nested `"records"` field does not
/// hide the real array behind it.
fn locate_records_array(buffer: &str, key: &str) -> ArrayStart {
    if let Some(start) = leading_array(buffer) {
        return ArrayStart::Found(start);
    }

    let needle = format!("\"{}\"", key);
    let bytes = buffer.as_bytes();
    let mut from = 0;
    let mut passed_over = false;

    while let Some(found) = buffer[from..].find(&needle) {
        let after_key = from + found + needle.len();
        let colon = skip_whitespace(bytes, after_key);
        match bytes.get(colon) {
            None => return ArrayStart::Pending,
            Some(b':') => {
                let value = skip_whitespace(bytes, colon + 1);
                match bytes.get(value) {
                    None => return ArrayStart::Pending,
                    Some(b'[') => return ArrayStart::Found(value),
                    Some(_) => {
                        passed_over = true;
                        from = value;
                    }
                }
            }
            Some(_) => from = after_key,
        }
    }

    if passed_over {
        ArrayStart::NotArray
    } else {
        ArrayStart::Pending
    }
}

/// Offset of a `[` that opens the whole document
fn leading_array(buffer: &str) -> Option<usize> {
    let bytes = buffer.as_bytes();
    let mut start = skip_whitespace(bytes, 0);

    if buffer[start..].starts_with("```") {
        let newline = buffer[start..].find('\n')?;
        start = skip_whitespace(bytes, start + newline + 1);
    }

    (bytes.get(start) == Some(&b'[')).then_some(start)
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}
