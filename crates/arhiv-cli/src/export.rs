//! Tab-separated record export.
//!
//! One header line of [`ARCHIVAL_FIELDS`] titles, then one line per record
//! with every cell wrapped in double quotes. Missing fields export as `""`.

use crate::error::{CliError, Result};
use arhiv_domain::{Record, ARCHIVAL_FIELDS};
use arhiv_stream::{parse_document, records_from_values};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Render records in export format.
pub fn to_tsv<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a Record>,
{
    let header = ARCHIVAL_FIELDS
        .iter()
        .map(|field| field.header)
        .collect::<Vec<_>>()
        .join("\t");

    let mut lines = vec![header];
    for record in records {
        let row = ARCHIVAL_FIELDS
            .iter()
            .map(|field| quote(record.field_or_empty(field.key)))
            .collect::<Vec<_>>()
            .join("\t");
        lines.push(row);
    }
    lines.join("\n")
}

/// Write records to `path` in export format.
pub fn write_tsv<'a, I>(path: &Path, records: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Record>,
{
    fs::write(path, to_tsv(records))?;
    Ok(())
}

/// Read a record list saved as JSON.
///
/// Accepts a bare array of records or an object carrying a `records` array,
/// which is also what the model itself produces.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    match value {
        Value::Array(items) => Ok(records_from_values(&items)),
        Value::Object(_) => Ok(parse_document(&contents)?),
        _ => Err(CliError::InvalidInput(format!(
            "{} holds neither a record array nor a records object",
            path.display()
        ))),
    }
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}
