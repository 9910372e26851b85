//! Uploaded input documents

/// A document as uploaded by the user, before text extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Original file name (used for extension-based format selection)
    pub filename: String,
    /// Declared media type, e.g. `application/pdf`
    pub media_type: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl Document {
    /// Create a document from its parts
    pub fn new(filename: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Lower-cased file extension, if any
    ///
    /// # Examples
    ///
    /// ```
    /// use arhiv_domain::Document;
    ///
    /// let doc = Document::new("Popis.PDF", "", vec![]);
    /// assert_eq!(doc.extension().as_deref(), Some("pdf"));
    /// ```
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(Document::new("a.txt", "", vec![]).extension().as_deref(), Some("txt"));
        assert_eq!(Document::new("noext", "", vec![]).extension(), None);
        assert_eq!(Document::new(".hidden", "", vec![]).extension(), None);
        assert_eq!(Document::new("trailing.", "", vec![]).extension(), None);
    }
}
