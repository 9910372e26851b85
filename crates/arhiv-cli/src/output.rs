//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use arhiv_domain::{Record, StreamStatus};
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style, Width},
};

/// Fields shown in table output; exports always carry every field
const TABLE_FIELDS: [(&str, &str); 6] = [
    ("identifikator", "Identifikator"),
    ("naslov", "Naslov"),
    ("razina", "Razina"),
    ("vrijemeOd", "Od"),
    ("vrijemeDo", "Do"),
    ("kolicina", "Količina"),
];

/// Widest a table cell may grow before wrapping
const MAX_CELL_WIDTH: usize = 40;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Whether colors are applied.
    pub fn color_enabled(&self) -> bool {
        self.color_enabled
    }

    /// Format records output.
    pub fn format_records<'a, I>(&self, records: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let records: Vec<&Record> = records.into_iter().collect();
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&records)?),
            OutputFormat::Table => Ok(self.format_records_table(&records)),
            OutputFormat::Quiet => Ok(Self::format_records_quiet(&records)),
        }
    }

    /// Format records as a table.
    fn format_records_table(&self, records: &[&Record]) -> String {
        if records.is_empty() {
            return self.colorize("No records found.", "yellow");
        }

        let mut builder = Builder::default();
        let mut header = vec!["#".to_string()];
        header.extend(TABLE_FIELDS.iter().map(|(_, title)| title.to_string()));
        builder.push_record(header);

        for (i, record) in records.iter().enumerate() {
            let mut row = vec![(i + 1).to_string()];
            row.extend(
                TABLE_FIELDS
                    .iter()
                    .map(|(key, _)| record.field_or_empty(key).to_string()),
            );
            builder.push_record(row);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Width::wrap(MAX_CELL_WIDTH)))
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// Format records in quiet mode (identifiers only).
    fn format_records_quiet(records: &[&Record]) -> String {
        records
            .iter()
            .map(|r| r.field_or_empty("identifikator"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One-line summary of a finished extraction.
    pub fn summary(&self, shown: usize, total: usize) -> String {
        if shown == total {
            self.info(&format!("{} record(s)", total))
        } else {
            self.info(&format!("Found {} of {} records", shown, total))
        }
    }

    /// Describe how the stream ended.
    pub fn status(&self, status: &StreamStatus) -> String {
        match status {
            StreamStatus::Complete => self.success("Extraction complete"),
            StreamStatus::Streaming => self.info("Extraction in progress"),
            StreamStatus::Cancelled => self.warning("Extraction cancelled"),
            StreamStatus::Incomplete { reason } => self.warning(&format!(
                "Final response did not parse ({}); showing the best partial result",
                reason
            )),
            StreamStatus::Failed { message } => self.error(&format!(
                "Stream failed ({}); showing records received so far",
                message
            )),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Format an export result.
    pub fn exported(&self, count: usize, path: &str) -> String {
        self.success(&format!("Exported {} record(s) to {}", count, path))
    }

    /// Colorize text if color is enabled.
    pub(crate) fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_records() -> Vec<Record> {
        vec![
            [
                ("identifikator", "HR-DAVŽ-69"),
                ("naslov", "Obitelj Drašković"),
                ("razina", "Fond"),
            ]
            .into_iter()
            .collect(),
            [("identifikator", "HR-DAVŽ-69/1"), ("naslov", "Korespondencija")]
                .into_iter()
                .collect(),
        ]
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let records = create_test_records();
        let output = formatter.format_records(&records).unwrap();
        let parsed: Vec<Record> = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_records(&create_test_records()).unwrap();
        assert_eq!(output, "HR-DAVŽ-69\nHR-DAVŽ-69/1");
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_records(&create_test_records()).unwrap();
        assert!(output.contains("Identifikator"));
        assert!(output.contains("Količina"));
        assert!(output.contains("Obitelj Drašković"));
    }

    #[test]
    fn test_empty_records() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let records: Vec<Record> = Vec::new();
        let output = formatter.format_records(&records).unwrap();
        assert!(output.contains("No records found"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
    }

    #[test]
    fn test_status_messages() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.status(&StreamStatus::Complete), "✓ Extraction complete");
        let failed = formatter.status(&StreamStatus::Failed {
            message: "connection reset".to_string(),
        });
        assert!(failed.starts_with("✗"));
        assert!(failed.contains("connection reset"));
    }

    #[test]
    fn test_summary() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.summary(3, 3), "ℹ 3 record(s)");
        assert_eq!(formatter.summary(1, 3), "ℹ Found 1 of 3 records");
    }
}
