//! # comment-sheet
//!
//! Spreadsheet engine behind the comment tables of an HMI designer.
//!
//! A [`Sheet`] owns a grid of cells, evaluates formulas on every change and
//! keeps an undo log of the commands applied to it. Editor-facing pieces
//! live beside it:
//!
//! - [`BatchMutator`] for long edits (paste, fill, clear, row deletion)
//!   with progress and cancellation
//! - [`EditSession`] for the formula bar
//! - the TSV [`clipboard`] codec
//! - JSON [`persistence`] for sheets and project files
//!
//! ## Example
//!
//! ```rust
//! use comment_sheet::prelude::*;
//!
//! let mut sheet = Sheet::new(20, 5).unwrap();
//! sheet.set_value(0, 0, "2").unwrap();
//! sheet.set_value(1, 0, "3").unwrap();
//! sheet.set_value(2, 0, "=SUM(A1:A2)").unwrap();
//! assert_eq!(sheet.display(2, 0), "5");
//!
//! sheet.insert_row(0).unwrap();
//! assert_eq!(sheet.value(3, 0), "=SUM(A2:A3)");
//!
//! sheet.undo().unwrap();
//! assert_eq!(sheet.value(2, 0), "=SUM(A1:A2)");
//! ```

pub mod batch;
pub mod calculation;
pub mod clipboard;
pub mod command;
pub mod config;
pub mod editor;
pub mod error;
pub mod fill;
pub mod history;
pub mod observer;
pub mod persistence;
pub mod prelude;
pub mod sheet;

// Re-export facade types
pub use batch::{BatchMutator, BatchOutcome, CancelToken, NoProgress, ProgressSink};
pub use calculation::{CalculationOptions, CalculationStats};
pub use clipboard::{ClipboardProvider, MemoryClipboard};
pub use command::{Command, Macro, Structural};
pub use config::{BatchOptions, SheetConfig};
pub use editor::{ClickOutcome, EditSession, EditState};
pub use error::{Error, Result};
pub use fill::FillDirection;
pub use history::CommandLog;
pub use observer::{ObserverId, SheetEvent, SheetObserver};
pub use persistence::{Metadata, ProjectFile, SheetDocument};
pub use sheet::{FontAttribute, FontChange, Sheet};

// Re-export core types
pub use comment_sheet_core::{
    Cell, CellAddress, CellChange, CellError, CellFormat, CellKey, CellRange, CellSnapshot,
    CellStore, Color, FontStyle, MAX_COLS, MAX_ROWS,
};

// Re-export formula types
pub use comment_sheet_formula::{DependencyGraph, FormulaValue, StructuralChange};
