//! # comment-sheet-core
//!
//! Core data structures for the comment-table spreadsheet engine.
//!
//! This crate provides the fundamental types used throughout comment-sheet:
//! - [`CellAddress`] and [`CellRange`] - Cell addressing with `$` anchors
//! - [`Cell`] and [`CellSnapshot`] - Raw value, display text and formatting
//! - [`CellFormat`] - Font attributes and colors
//! - [`CellStore`] - The sparse grid holding every cell of a sheet
//!
//! ## Example
//!
//! ```rust
//! use comment_sheet_core::{CellSnapshot, CellStore};
//!
//! let mut store = CellStore::new(10, 5).unwrap();
//! store.set(0, 0, CellSnapshot::new("42")).unwrap();
//! store.insert_row(0).unwrap();
//!
//! assert_eq!(store.get(1, 0).value, "42");
//! assert_eq!(store.get(1, 0).display, "42");
//! ```

pub mod cell;
pub mod error;
pub mod style;

// Re-exports for convenience
pub use cell::{
    is_formula, Cell, CellAddress, CellChange, CellError, CellKey, CellRange, CellSnapshot,
    CellStore, StoreChanges,
};
pub use error::{Error, Result};
pub use style::{CellFormat, Color, FontStyle};

/// Maximum number of rows in a comment table
pub const MAX_ROWS: u32 = 1_000_000;

/// Maximum number of columns in a comment table
pub const MAX_COLS: u16 = 30;
