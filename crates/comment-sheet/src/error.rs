//! Error types for the comment-sheet facade

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the editor by sheet operations
///
/// A failed operation leaves the sheet unchanged. Formula problems never
/// show up here; they become `#…` markers in the cell's display.
#[derive(Debug, Error)]
pub enum Error {
    /// Addressing, bounds or size errors from the cell store
    #[error(transparent)]
    Core(#[from] comment_sheet_core::Error),

    /// A formula could not be parsed where one was required
    #[error(transparent)]
    Formula(#[from] comment_sheet_formula::FormulaError),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File or thread I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data that parses but does not describe a valid sheet
    #[error("Invalid sheet document: {0}")]
    InvalidDocument(String),

    /// No comment table under this number in a project file
    #[error("Comment table {0} not found")]
    CommentNotFound(u32),

    /// Undo/redo requested while a macro is being recorded
    #[error("A macro is being recorded: {0}")]
    MacroOpen(String),

    /// The background worker of a batch operation died
    #[error("Batch worker failed: {0}")]
    Worker(String),

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_pass_through() {
        let err: Error = comment_sheet_core::Error::LastLine("row").into();
        assert_eq!(err.to_string(), "Cannot remove the last row of a sheet");
    }

    #[test]
    fn test_json_errors_convert() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
