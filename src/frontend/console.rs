//! Terminal collaborators: metadata printing, status logging and error
//! messages on stderr.

use std::io::{self, Write};

use tracing::{info, trace, warn};

use crate::import::{ErrorReporter, MetadataDisplay, MetadataTable, StatusSink};

/// Prints the metadata table as tab-separated key/value lines.
#[derive(Debug)]
pub struct PrintMetadata<W> {
    out: W,
}

impl PrintMetadata<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> PrintMetadata<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_table(&mut self, title: &str, table: &MetadataTable) -> io::Result<()> {
        writeln!(self.out, "{}", title)?;
        for (key, value) in table.entries() {
            writeln!(self.out, "{}\t{}", key, value)?;
        }
        self.out.flush()
    }
}

impl<W: Write> MetadataDisplay for PrintMetadata<W> {
    fn show_metadata(&mut self, title: &str, table: &MetadataTable) {
        if let Err(e) = self.write_table(title, table) {
            warn!(error = %e, "Failed to print metadata");
        }
    }
}

/// Forwards status text to the log.
#[derive(Debug, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn status(&mut self, text: &str) {
        if !text.is_empty() {
            info!("{}", text);
        }
    }

    fn progress(&mut self, fraction: f64) {
        trace!(fraction, "Progress");
    }
}

/// Prints user-facing errors on stderr.
#[derive(Debug, Default)]
pub struct StderrReporter;

impl ErrorReporter for StderrReporter {
    fn report(&mut self, title: &str, message: &str) {
        eprintln!("{}: {}", title, message);
    }
}
