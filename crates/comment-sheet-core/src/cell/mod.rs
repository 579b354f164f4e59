//! Cell-related types
//!
//! - [`CellAddress`] / [`CellRange`] - A1-style locations with `$` anchors
//! - [`Cell`] / [`CellSnapshot`] - A cell with and without its display text
//! - [`CellError`] - In-cell error markers
//! - [`CellStore`] - Sparse storage for a sheet

mod address;
mod storage;
mod value;

pub use address::{CellAddress, CellKey, CellRange, CellRangeIterator};
pub use storage::{CellStore, StoreChanges};
pub use value::{is_formula, Cell, CellChange, CellError, CellSnapshot};
