//! Formula error types

use comment_sheet_core::CellError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula tokenizing, parsing or evaluation
///
/// None of these ever escape a recalc: each maps onto the in-cell marker
/// returned by [`FormulaError::cell_error`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Character the tokenizer does not understand
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Formula evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Bare identifier that names nothing
    #[error("Unknown name: {0}")]
    UnknownName(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Numeric domain error (invalid radix, out-of-range input, ...)
    #[error("Numeric error: {0}")]
    Num(String),

    /// Lookup found no match
    #[error("Value not available")]
    NotAvailable,

    /// Circular reference
    #[error("Circular reference detected")]
    CircularReference,

    /// Reference to a cell outside the sheet
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}

impl FormulaError {
    /// The in-cell marker this error displays as
    pub fn cell_error(&self) -> CellError {
        match self {
            FormulaError::UnexpectedChar { .. }
            | FormulaError::Parse(_)
            | FormulaError::Evaluation(_)
            | FormulaError::ArgumentCount { .. } => CellError::Error,
            FormulaError::UnknownFunction(_) | FormulaError::UnknownName(_) => CellError::Name,
            FormulaError::DivisionByZero => CellError::Div0,
            FormulaError::Num(_) => CellError::Num,
            FormulaError::NotAvailable => CellError::Na,
            FormulaError::CircularReference | FormulaError::InvalidReference(_) => CellError::Ref,
        }
    }

    /// An error that displays as the given marker
    pub fn from_cell_error(error: CellError) -> Self {
        match error {
            CellError::Ref => FormulaError::InvalidReference(error.to_string()),
            CellError::Name => FormulaError::UnknownName(error.to_string()),
            CellError::Num => FormulaError::Num(error.to_string()),
            CellError::Div0 => FormulaError::DivisionByZero,
            CellError::Na => FormulaError::NotAvailable,
            CellError::Error => FormulaError::Evaluation(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_error_mapping() {
        assert_eq!(FormulaError::DivisionByZero.cell_error(), CellError::Div0);
        assert_eq!(FormulaError::CircularReference.cell_error(), CellError::Ref);
        assert_eq!(
            FormulaError::UnknownName("FOO".into()).cell_error(),
            CellError::Name
        );
        assert_eq!(
            FormulaError::ArgumentCount {
                function: "NOT".into(),
                expected: "1".into(),
                actual: 2
            }
            .cell_error(),
            CellError::Error
        );
    }

    #[test]
    fn test_from_cell_error_round_trip() {
        for marker in CellError::ALL {
            assert_eq!(FormulaError::from_cell_error(marker).cell_error(), marker);
        }
    }
}
