//! Command implementations.

pub mod export;
pub mod parse;
pub mod replay;

pub use self::export::execute_export;
pub use self::parse::execute_parse;
pub use self::replay::execute_replay;

use crate::cli::ViewArgs;
use crate::error::Result;
use crate::export::write_tsv;
use crate::output::Formatter;
use arhiv_domain::record::filter_records;
use arhiv_domain::{Record, StreamStatus};

/// Print the final records, apply `--search` and write `--csv`.
///
/// Records go to stdout; status lines go to stderr so piped output stays
/// clean. The export always carries the full list, not the filtered view.
pub fn show_results(
    records: &[Record],
    status: &StreamStatus,
    view: &ViewArgs,
    formatter: &Formatter,
) -> Result<()> {
    let shown = match view.search.as_deref() {
        Some(query) => filter_records(records, query),
        None => records.iter().collect(),
    };

    println!("{}", formatter.format_records(shown.iter().copied())?);
    eprintln!("{}", formatter.status(status));
    eprintln!("{}", formatter.summary(shown.len(), records.len()));

    if let Some(path) = &view.csv {
        write_tsv(path, records)?;
        eprintln!("{}", formatter.exported(records.len(), &path.display().to_string()));
    }

    Ok(())
}
