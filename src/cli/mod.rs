#![forbid(unsafe_code)]

//! The interactive command loop: statements, meta commands and their output.

/// Dot-prefixed commands.
pub mod meta;
/// `insert` / `select` parsing.
pub mod statement;

mod repl;

pub use meta::MetaCommand;
pub use repl::{Repl, ReplError, ReportFormat, PROMPT};
pub use statement::{prepare, PrepareError, Statement};
