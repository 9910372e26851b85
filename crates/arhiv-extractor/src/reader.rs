//! Document text extraction
//!
//! Format selection is by declared media type or file extension only; the
//! bytes are never sniffed.

use crate::error::ExtractorError;
use arhiv_domain::traits::DocumentReader;
use arhiv_domain::Document;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

/// Media type of Word 2007+ documents
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Readable document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// UTF-8 text
    PlainText,
    /// PDF
    Pdf,
    /// Office Open XML word processing
    Docx,
    /// Legacy Word binary, read as lossy text
    Doc,
}

impl DocumentKind {
    /// Pick the format for `document`, checking each kind's media type and
    /// extension in turn
    pub fn detect(document: &Document) -> Option<Self> {
        let media_type = document.media_type.as_str();
        let extension = document.extension();
        let ext = extension.as_deref();

        if media_type == "text/plain" || ext == Some("txt") {
            Some(DocumentKind::PlainText)
        } else if media_type == "application/pdf" || ext == Some("pdf") {
            Some(DocumentKind::Pdf)
        } else if media_type == DOCX_MEDIA_TYPE || ext == Some("docx") {
            Some(DocumentKind::Docx)
        } else if media_type == "application/msword" || ext == Some("doc") {
            Some(DocumentKind::Doc)
        } else {
            None
        }
    }
}

/// Reads plain text, PDF and Word documents
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextReader;

impl FileTextReader {
    /// Create a reader
    pub fn new() -> Self {
        Self
    }
}

impl DocumentReader for FileTextReader {
    type Error = ExtractorError;

    fn extract_text(&self, document: &Document) -> Result<String, Self::Error> {
        let kind = DocumentKind::detect(document).ok_or_else(|| {
            let label = if document.media_type.is_empty() {
                document.filename.clone()
            } else {
                document.media_type.clone()
            };
            ExtractorError::UnsupportedFormat(label)
        })?;
        debug!(filename = %document.filename, ?kind, bytes = document.bytes.len(), "reading document");

        match kind {
            DocumentKind::PlainText | DocumentKind::Doc => Ok(lossy_text(&document.bytes)),
            DocumentKind::Pdf => pdf_text(&document.bytes),
            DocumentKind::Docx => docx_text(&document.bytes),
        }
    }
}

/// Collapse every whitespace run to a single space and trim
///
/// # Examples
///
/// ```
/// use arhiv_extractor::normalize_text;
///
/// assert_eq!(normalize_text("  Fond\n\n\tserija  "), "Fond serija");
/// ```
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn lossy_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn pdf_text(bytes: &[u8]) -> Result<String, ExtractorError> {
    // The PDF backend panics on some malformed inputs
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractorError::DocumentRead("PDF parser crashed on malformed input".to_string()))?;
    extracted.map_err(|e| ExtractorError::DocumentRead(format!("Invalid PDF: {}", e)))
}

fn docx_text(bytes: &[u8]) -> Result<String, ExtractorError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractorError::DocumentRead(format!("Failed to open DOCX archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractorError::DocumentRead(format!("Missing document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractorError::DocumentRead(format!("Failed to read document.xml: {}", e)))?;

    body_text(&xml)
}

/// Visible text of a WordprocessingML body
///
/// Only `w:t` runs count as text. Deleted revisions (`w:delText`) and field
/// instructions (`w:instrText`) are skipped.
fn body_text(xml: &str) -> Result<String, ExtractorError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = in_run,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            // Tab stops in paragraph properties share the `tab` name
            Ok(Event::Empty(ref e)) if in_run => match e.local_name().as_ref() {
                b"br" | b"cr" => text.push('\n'),
                b"tab" => text.push('\t'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let unescaped = e
                    .unescape()
                    .map_err(|err| ExtractorError::DocumentRead(format!("Invalid DOCX text: {}", err)))?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractorError::DocumentRead(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(text.trim().to_string())
}
