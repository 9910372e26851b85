//! Export command implementation.

use crate::cli::ExportArgs;
use crate::error::Result;
use crate::export::{read_records, write_tsv};
use crate::output::Formatter;

/// Execute the export command.
pub fn execute_export(args: ExportArgs, formatter: &Formatter) -> Result<()> {
    let records = read_records(&args.input)?;
    write_tsv(&args.out, &records)?;
    println!("{}", formatter.exported(records.len(), &args.out.display().to_string()));
    Ok(())
}
