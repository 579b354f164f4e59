//! Error types for comment-sheet-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in comment-sheet-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (rows: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (columns: {1})")]
    ColumnOutOfBounds(u16, u16),

    /// Sheet dimensions outside the supported limits
    #[error("Sheet size {rows}x{cols} exceeds limits ({max_rows}x{max_cols})")]
    SizeLimit {
        rows: u32,
        cols: u16,
        max_rows: u32,
        max_cols: u16,
    },

    /// A structural removal would leave the sheet without rows or columns
    #[error("Cannot remove the last {0} of a sheet")]
    LastLine(&'static str),

    /// Invalid color string
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
