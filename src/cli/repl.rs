use std::io::{self, BufRead, Write};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::primitives::pager::PagerStats;
use crate::storage::btree::VerifyReport;
use crate::storage::Table;
use crate::types::StoreError;

use super::meta::MetaCommand;
use super::statement::{prepare, Statement};

/// Prompt printed before every line is read.
pub const PROMPT: &str = "db > ";

/// How diagnostic reports (`.btree`, `.stats`, `.verify`) are printed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReportFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Errors that end the command loop.
#[derive(Debug, Error)]
pub enum ReplError {
    /// The table failed; pending changes are not flushed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Reading input or writing output failed.
    #[error("IO: {0}")]
    Io(#[from] io::Error),
    /// A report could not be encoded as JSON.
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Line-oriented command loop over a table.
pub struct Repl<R, W> {
    input: R,
    output: W,
    format: ReportFormat,
}

impl<R: BufRead, W: Write> Repl<R, W> {
    /// Builds a loop reading commands from `input` and writing to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            format: ReportFormat::Text,
        }
    }

    /// Selects how diagnostic reports are printed.
    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Runs until `.exit` or end of input, then closes `table`.
    ///
    /// Any engine error other than a duplicate key ends the loop and drops
    /// the table without flushing it.
    pub fn run(mut self, mut table: Table) -> Result<(), ReplError> {
        let mut line = String::new();
        loop {
            write!(self.output, "{PROMPT}")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                debug!("repl.eof");
                break;
            }
            let command = line.trim_end_matches(&['\n', '\r'][..]);

            if command.starts_with('.') {
                match MetaCommand::parse(command) {
                    Some(MetaCommand::Exit) => break,
                    Some(meta) => self.run_meta(meta, &mut table)?,
                    None => writeln!(self.output, "Unrecognized command '{command}'")?,
                }
                continue;
            }

            match prepare(command) {
                Ok(statement) => self.execute(statement, &mut table)?,
                Err(err) => writeln!(self.output, "{err}")?,
            }
        }
        table.close()?;
        info!("repl.closed");
        Ok(())
    }

    fn execute(&mut self, statement: Statement, table: &mut Table) -> Result<(), ReplError> {
        match statement {
            Statement::Insert(row) => match table.insert_row(&row) {
                Ok(()) => writeln!(self.output, "Executed.")?,
                Err(StoreError::DuplicateKey(_)) => writeln!(self.output, "Error: Duplicate key.")?,
                Err(err) => return Err(err.into()),
            },
            Statement::Select => {
                for row in table.rows()? {
                    writeln!(self.output, "{row}")?;
                }
                writeln!(self.output, "Executed.")?;
            }
        }
        Ok(())
    }

    fn run_meta(&mut self, meta: MetaCommand, table: &mut Table) -> Result<(), ReplError> {
        match meta {
            MetaCommand::Exit => {}
            MetaCommand::Btree => {
                let shape = table.tree_shape()?;
                self.emit(&shape, |out| write!(out, "Tree:\n{shape}"))?;
            }
            MetaCommand::Constants => {
                let constants = table.layout().constants();
                self.emit(&constants, |out| write!(out, "Constants:\n{constants}"))?;
            }
            MetaCommand::Stats => {
                let stats = table.pager_stats();
                self.emit(&stats, |out| print_stats_text(out, &stats))?;
            }
            MetaCommand::Verify => {
                let report = table.verify()?;
                self.emit(&report, |out| print_verify_text(out, &report))?;
            }
        }
        Ok(())
    }

    fn emit<T, F>(&mut self, value: &T, text: F) -> Result<(), ReplError>
    where
        T: Serialize,
        F: FnOnce(&mut W) -> io::Result<()>,
    {
        match self.format {
            ReportFormat::Text => text(&mut self.output)?,
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut self.output, value)?;
                writeln!(self.output)?;
            }
        }
        Ok(())
    }
}

fn print_stats_text<W: Write>(out: &mut W, stats: &PagerStats) -> io::Result<()> {
    writeln!(out, "Pager:")?;
    writeln!(out, "  page_size: {}", stats.page_size)?;
    writeln!(out, "  pages: {} / {}", stats.page_count, stats.max_pages)?;
    writeln!(out, "  resident: {}", stats.resident_pages)?;
    writeln!(out, "  hits: {}", stats.hits)?;
    writeln!(out, "  misses: {}", stats.misses)?;
    writeln!(out, "  disk_reads: {}", stats.disk_reads)?;
    writeln!(out, "  flushes: {}", stats.flushes)
}

fn print_verify_text<W: Write>(out: &mut W, report: &VerifyReport) -> io::Result<()> {
    let counts = &report.counts;
    let status = if report.success { "ok" } else { "FAILED" };
    writeln!(
        out,
        "Verify: {status} ({} rows in {} leaves, depth {})",
        counts.rows, counts.leaves, counts.depth
    )?;
    for finding in &report.findings {
        writeln!(
            out,
            "  {:?} page {}: {}",
            finding.severity, finding.page, finding.message
        )?;
    }
    Ok(())
}
