//! Parsing of `insert` and `select` lines.

use thiserror::Error;

use crate::storage::row::{Row, COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE};

/// A parsed statement ready to run against a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// Insert one row.
    Insert(Row),
    /// Print every row in key order.
    Select,
}

/// Why a line could not be turned into a [`Statement`].
///
/// The messages are printed verbatim by the command loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrepareError {
    /// Missing fields or an id that is not a number.
    #[error("Syntax error. Could not parse statement.")]
    Syntax,
    /// The id was below zero.
    #[error("ID must be positive.")]
    NegativeId,
    /// Username or email wider than its column.
    #[error("String is too long.")]
    StringTooLong,
    /// The line starts with no known keyword.
    #[error("Unrecognized keyword at start of '{0}'.")]
    Unrecognized(String),
}

/// Parses one input line (without its trailing newline).
pub fn prepare(line: &str) -> Result<Statement, PrepareError> {
    if line.starts_with("insert") {
        return prepare_insert(line);
    }
    if line == "select" {
        return Ok(Statement::Select);
    }
    Err(PrepareError::Unrecognized(line.to_string()))
}

fn prepare_insert(line: &str) -> Result<Statement, PrepareError> {
    let mut fields = line.split(' ').filter(|field| !field.is_empty());
    let _keyword = fields.next();
    let (Some(id), Some(username), Some(email)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(PrepareError::Syntax);
    };

    let id: i64 = id.parse().map_err(|_| PrepareError::Syntax)?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    let id = u32::try_from(id).map_err(|_| PrepareError::Syntax)?;
    if username.len() > COLUMN_USERNAME_SIZE || email.len() > COLUMN_EMAIL_SIZE {
        return Err(PrepareError::StringTooLong);
    }
    let row = Row::new(id, username, email).map_err(|_| PrepareError::StringTooLong)?;
    Ok(Statement::Insert(row))
}
