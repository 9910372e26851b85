//! Live progress rendering on the terminal.

use arhiv_domain::traits::RenderSink;
use arhiv_domain::{Record, StreamOutcome};
use colored::*;
use std::io::{self, Write};

/// Render sink that keeps one progress line up to date.
///
/// Each update rewrites the line in place with the current record count and
/// the title of the newest record. Write failures are ignored: progress is
/// cosmetic and the final result is printed separately.
pub struct TerminalSink<W: Write> {
    out: W,
    color: bool,
    enabled: bool,
    updates: usize,
    shown: usize,
}

impl TerminalSink<io::Stderr> {
    /// Progress on standard error.
    pub fn stderr(color: bool) -> Self {
        Self::new(io::stderr(), color)
    }
}

impl<W: Write> TerminalSink<W> {
    /// Progress on `out`.
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            enabled: true,
            updates: 0,
            shown: 0,
        }
    }

    /// Turn rendering off without changing the pipeline.
    pub fn quiet(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Number of updates received.
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Record count of the last update.
    pub fn shown(&self) -> usize {
        self.shown
    }

    /// The underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn progress_line(&self, records: &[Record]) -> String {
        let latest = records
            .last()
            .and_then(|r| r.get("naslov").or_else(|| r.get("identifikator")))
            .unwrap_or("");
        let count = format!("{} record(s)", records.len());
        let count = if self.color {
            count.cyan().to_string()
        } else {
            count
        };
        format!("⏳ Extracting... {} {}", count, truncate(latest, 48))
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn update(&mut self, records: &[Record]) {
        self.updates += 1;
        self.shown = records.len();
        if !self.enabled {
            return;
        }
        let line = self.progress_line(records);
        // \x1b[2K clears the previous, possibly longer, line
        let _ = write!(self.out, "\r\x1b[2K{}", line);
        let _ = self.out.flush();
    }

    fn finish(&mut self, outcome: &StreamOutcome) {
        if !self.enabled || self.updates == 0 {
            return;
        }
        let _ = writeln!(
            self.out,
            "\r\x1b[2K{} record(s), {}",
            outcome.records.len(),
            outcome.status
        );
        let _ = self.out.flush();
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use arhiv_domain::StreamStatus;

    fn record(title: &str) -> Record {
        [("naslov", title)].into_iter().collect()
    }

    #[test]
    fn test_progress_and_finish() {
        let mut sink = TerminalSink::new(Vec::new(), false);
        sink.update(&[record("Fond")]);
        sink.update(&[record("Fond"), record("Serija")]);
        sink.finish(&StreamOutcome {
            records: vec![record("Fond"), record("Serija")],
            status: StreamStatus::Complete,
        });

        assert_eq!(sink.updates(), 2);
        assert_eq!(sink.shown(), 2);
        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert!(written.contains("1 record(s) Fond"));
        assert!(written.contains("2 record(s) Serija"));
        assert!(written.ends_with("2 record(s), complete\n"));
    }

    #[test]
    fn test_quiet_sink_counts_but_writes_nothing() {
        let mut sink = TerminalSink::new(Vec::new(), false).quiet();
        sink.update(&[record("Fond")]);
        assert_eq!(sink.updates(), 1);
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Fond", 10), "Fond");
        assert_eq!(truncate("Korespondencija", 5), "Kore…");
    }
}
