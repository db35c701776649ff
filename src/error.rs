//! Error types for the database handle.

use std::fmt;

use thiserror::Error;

/// Errors returned by query operations.
///
/// Connection failures never surface here; see [`ConnectError`].
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error raised while preparing, executing, fetching or committing
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias using DatabaseError.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Why a connection attempt failed.
///
/// Produced while the handle connects and only ever written to the log.
#[derive(Error, Debug)]
pub struct ConnectError {
    kind: String,
    message: String,
}

impl ConnectError {
    /// Short name of the driver error variant, e.g. `SqliteFailure`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<rusqlite::Error> for ConnectError {
    fn from(err: rusqlite::Error) -> Self {
        Self {
            kind: error_kind(&err).to_string(),
            message: err.to_string(),
        }
    }
}

pub(crate) fn error_kind(err: &rusqlite::Error) -> &'static str {
    use rusqlite::Error::*;
    match err {
        SqliteFailure(..) => "SqliteFailure",
        SqliteSingleThreadedMode => "SqliteSingleThreadedMode",
        InvalidPath(_) => "InvalidPath",
        NulError(_) => "NulError",
        Utf8Error(_) => "Utf8Error",
        ExecuteReturnedResults => "ExecuteReturnedResults",
        QueryReturnedNoRows => "QueryReturnedNoRows",
        InvalidParameterCount(..) => "InvalidParameterCount",
        InvalidParameterName(_) => "InvalidParameterName",
        InvalidColumnIndex(_) => "InvalidColumnIndex",
        InvalidColumnName(_) => "InvalidColumnName",
        InvalidColumnType(..) => "InvalidColumnType",
        MultipleStatement => "MultipleStatement",
        _ => "Error",
    }
}
