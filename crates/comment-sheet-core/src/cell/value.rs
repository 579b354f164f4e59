//! Cell records and in-cell error markers

use crate::style::CellFormat;
use std::fmt;

/// In-cell error markers
///
/// These are what a formula cell displays when evaluation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// #REF! - Dangling or circular reference
    Ref,
    /// #NAME? - Unrecognized identifier
    Name,
    /// #NUM! - Numeric domain error
    Num,
    /// #DIV/0! - Division by zero
    Div0,
    /// #N/A - Value not available (lookup failure)
    Na,
    /// #ERROR - Catch-all evaluation failure
    Error,
}

impl CellError {
    /// All markers, in no particular order
    pub const ALL: [CellError; 6] = [
        CellError::Ref,
        CellError::Name,
        CellError::Num,
        CellError::Div0,
        CellError::Na,
        CellError::Error,
    ];

    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Div0 => "#DIV/0!",
            CellError::Na => "#N/A",
            CellError::Error => "#ERROR",
        }
    }

    /// Parse an error marker
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a raw value is a formula
pub fn is_formula(value: &str) -> bool {
    value.starts_with('=')
}

/// The persisted part of a cell: raw value plus formatting
///
/// This is also the unit of undo. Display text is derived and never stored
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellSnapshot {
    /// Raw value as entered
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: String,
    /// Formatting
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub format: CellFormat,
}

impl CellSnapshot {
    /// Create a snapshot with a raw value and no formatting
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
            format: CellFormat::default(),
        }
    }

    /// Attach formatting
    pub fn with_format(mut self, format: CellFormat) -> Self {
        self.format = format;
        self
    }

    /// True when the cell holds neither a value nor formatting
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.format.is_empty()
    }

    /// Whether the raw value is a formula
    pub fn is_formula(&self) -> bool {
        is_formula(&self.value)
    }
}

/// A cell as seen by the editor: raw value, display text and formatting
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    /// Raw value as entered (empty, literal or `=` formula)
    pub value: String,
    /// Evaluated display text
    pub display: String,
    /// Formatting
    pub format: CellFormat,
}

impl Cell {
    /// Build a cell from a snapshot
    ///
    /// Non-formula cells display their raw value. Formula cells start with
    /// `previous_display` until the next recalc replaces it.
    pub fn from_snapshot(snapshot: CellSnapshot, previous_display: String) -> Self {
        let display = if snapshot.is_formula() {
            previous_display
        } else {
            snapshot.value.clone()
        };
        Self {
            value: snapshot.value,
            display,
            format: snapshot.format,
        }
    }

    /// The persisted part of this cell
    pub fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            value: self.value.clone(),
            format: self.format,
        }
    }

    /// Whether the raw value is a formula
    pub fn is_formula(&self) -> bool {
        is_formula(&self.value)
    }

    /// The error marker shown by this cell, if any
    pub fn error(&self) -> Option<CellError> {
        if self.is_formula() {
            CellError::from_str(&self.display)
        } else {
            None
        }
    }

    /// True when the cell holds nothing worth storing
    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.display.is_empty() && self.format.is_empty()
    }
}

/// One cell write: coordinates plus the before and after snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub row: u32,
    pub col: u16,
    pub old: CellSnapshot,
    pub new: CellSnapshot,
}

impl CellChange {
    /// Create a change record
    pub fn new(row: u32, col: u16, old: CellSnapshot, new: CellSnapshot) -> Self {
        Self { row, col, old, new }
    }

    /// Whether applying this change would alter anything
    pub fn is_noop(&self) -> bool {
        self.old == self.new
    }

    /// The same change with before and after swapped
    pub fn inverted(&self) -> Self {
        Self {
            row: self.row,
            col: self.col,
            old: self.new.clone(),
            new: self.old.clone(),
        }
    }
}
