//! Cell storage implementation
//!
//! Sparse row-based storage for the cells of one comment table. Only
//! non-blank cells are materialized; every in-bounds coordinate reads as a
//! blank cell otherwise.

use std::collections::{BTreeMap, BTreeSet};

use super::{Cell, CellKey, CellSnapshot};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// Changes recorded by the store since the last [`CellStore::take_changes`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreChanges {
    /// Cells whose value, display or format changed
    pub cells: BTreeSet<CellKey>,
    /// Rows or columns were inserted, removed or the sheet was resized
    pub structure: bool,
}

impl StoreChanges {
    /// True when nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && !self.structure
    }
}

/// Sparse row-based storage for a sheet's cells
///
/// Structure: `BTreeMap<row_index, BTreeMap<col_index, Cell>>`
///
/// The store never interprets cell values beyond keeping `display == value`
/// for non-formula cells. It records which cells changed so the caller can
/// notify observers; recording can be suspended for bulk mutations, in which
/// case changes accumulate until the matching resume.
#[derive(Debug, Clone)]
pub struct CellStore {
    /// Row index → column map
    rows: BTreeMap<u32, BTreeMap<u16, Cell>>,
    row_count: u32,
    col_count: u16,
    /// Nesting depth of notification suspension
    suspended: u32,
    changes: StoreChanges,
}

impl CellStore {
    /// Create an empty store with the given dimensions
    pub fn new(rows: u32, cols: u16) -> Result<Self> {
        Self::check_size(rows, cols)?;
        Ok(Self {
            rows: BTreeMap::new(),
            row_count: rows,
            col_count: cols,
            suspended: 0,
            changes: StoreChanges::default(),
        })
    }

    fn check_size(rows: u32, cols: u16) -> Result<()> {
        if rows == 0 || cols == 0 || rows > MAX_ROWS || cols > MAX_COLS {
            return Err(Error::SizeLimit {
                rows,
                cols,
                max_rows: MAX_ROWS,
                max_cols: MAX_COLS,
            });
        }
        Ok(())
    }

    /// Number of rows in the sheet
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Number of columns in the sheet
    pub fn col_count(&self) -> u16 {
        self.col_count
    }

    /// Whether (row, col) lies inside the sheet
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row < self.row_count && col < self.col_count
    }

    /// Fail unless (row, col) lies inside the sheet
    pub fn check_bounds(&self, row: u32, col: u16) -> Result<()> {
        if row >= self.row_count {
            return Err(Error::RowOutOfBounds(row, self.row_count));
        }
        if col >= self.col_count {
            return Err(Error::ColumnOutOfBounds(col, self.col_count));
        }
        Ok(())
    }

    /// Get a cell (blank when never written or out of bounds)
    pub fn get(&self, row: u32, col: u16) -> Cell {
        self.cell(row, col).cloned().unwrap_or_default()
    }

    /// Borrow a materialized cell
    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    /// Get the persisted part of a cell
    pub fn snapshot(&self, row: u32, col: u16) -> CellSnapshot {
        self.cell(row, col).map(Cell::snapshot).unwrap_or_default()
    }

    /// Write a cell's raw value and format
    ///
    /// Non-formula cells display their raw value immediately; formula cells
    /// keep their previous display until the next recalc.
    pub fn set(&mut self, row: u32, col: u16, snapshot: CellSnapshot) -> Result<()> {
        self.check_bounds(row, col)?;
        let previous = self.get(row, col);
        let cell = Cell::from_snapshot(snapshot, previous.display.clone());
        if cell != previous {
            self.put(row, col, cell);
        }
        Ok(())
    }

    /// Update the display text of a cell, returning whether it changed
    ///
    /// Non-formula cells always display their raw value, so this only
    /// affects formula cells.
    pub fn set_display(&mut self, row: u32, col: u16, display: String) -> bool {
        match self.rows.get_mut(&row).and_then(|r| r.get_mut(&col)) {
            Some(cell) if cell.is_formula() && cell.display != display => {
                cell.display = display;
                self.changes.cells.insert(CellKey::new(row, col));
                true
            }
            _ => false,
        }
    }

    /// Store a complete cell, dropping it when blank
    fn put(&mut self, row: u32, col: u16, cell: Cell) {
        self.changes.cells.insert(CellKey::new(row, col));
        if cell.is_blank() {
            if let Some(row_map) = self.rows.get_mut(&row) {
                row_map.remove(&col);
                if row_map.is_empty() {
                    self.rows.remove(&row);
                }
            }
        } else {
            self.rows.entry(row).or_default().insert(col, cell);
        }
    }

    /// Copy out a rectangular region, rows then columns
    ///
    /// The corners may be given in any order.
    pub fn snapshot_region(&self, r1: u32, c1: u16, r2: u32, c2: u16) -> Result<Vec<Vec<Cell>>> {
        let (top, bottom) = (r1.min(r2), r1.max(r2));
        let (left, right) = (c1.min(c2), c1.max(c2));
        self.check_bounds(bottom, right)?;

        Ok((top..=bottom)
            .map(|row| (left..=right).map(|col| self.get(row, col)).collect())
            .collect())
    }

    /// Change the sheet dimensions, dropping cells that fall outside
    pub fn resize(&mut self, rows: u32, cols: u16) -> Result<()> {
        Self::check_size(rows, cols)?;
        log::debug!(
            "resizing cell store from {}x{} to {}x{}",
            self.row_count,
            self.col_count,
            rows,
            cols
        );
        let _ = self.rows.split_off(&rows);
        for row_map in self.rows.values_mut() {
            let _ = row_map.split_off(&cols);
        }
        self.rows.retain(|_, r| !r.is_empty());
        self.row_count = rows;
        self.col_count = cols;
        self.changes.structure = true;
        Ok(())
    }

    /// Insert an empty row at `index`, shifting rows at or below it down
    pub fn insert_row(&mut self, index: u32) -> Result<()> {
        if index > self.row_count {
            return Err(Error::RowOutOfBounds(index, self.row_count));
        }
        if self.row_count >= MAX_ROWS {
            return Err(Error::SizeLimit {
                rows: self.row_count.saturating_add(1),
                cols: self.col_count,
                max_rows: MAX_ROWS,
                max_cols: MAX_COLS,
            });
        }

        let tail = self.rows.split_off(&index);
        self.rows
            .extend(tail.into_iter().map(|(row, cols)| (row + 1, cols)));
        self.row_count += 1;
        self.changes.structure = true;
        Ok(())
    }

    /// Insert an empty column at `index`, shifting columns at or right of it
    pub fn insert_col(&mut self, index: u16) -> Result<()> {
        if index > self.col_count {
            return Err(Error::ColumnOutOfBounds(index, self.col_count));
        }
        if self.col_count >= MAX_COLS {
            return Err(Error::SizeLimit {
                rows: self.row_count,
                cols: self.col_count.saturating_add(1),
                max_rows: MAX_ROWS,
                max_cols: MAX_COLS,
            });
        }

        for row_map in self.rows.values_mut() {
            let tail = row_map.split_off(&index);
            row_map.extend(tail.into_iter().map(|(col, cell)| (col + 1, cell)));
        }
        self.col_count += 1;
        self.changes.structure = true;
        Ok(())
    }

    /// Remove the row at `index`, returning its cells (one per column)
    pub fn remove_row(&mut self, index: u32) -> Result<Vec<Cell>> {
        if index >= self.row_count {
            return Err(Error::RowOutOfBounds(index, self.row_count));
        }
        if self.row_count == 1 {
            return Err(Error::LastLine("row"));
        }

        let mut tail = self.rows.split_off(&index);
        let mut removed = tail.remove(&index).unwrap_or_default();
        self.rows
            .extend(tail.into_iter().map(|(row, cols)| (row - 1, cols)));
        self.row_count -= 1;
        self.changes.structure = true;

        Ok((0..self.col_count)
            .map(|col| removed.remove(&col).unwrap_or_default())
            .collect())
    }

    /// Remove the column at `index`, returning its cells (one per row)
    pub fn remove_col(&mut self, index: u16) -> Result<Vec<Cell>> {
        if index >= self.col_count {
            return Err(Error::ColumnOutOfBounds(index, self.col_count));
        }
        if self.col_count == 1 {
            return Err(Error::LastLine("column"));
        }

        let mut removed = BTreeMap::new();
        for (&row, row_map) in self.rows.iter_mut() {
            let mut tail = row_map.split_off(&index);
            if let Some(cell) = tail.remove(&index) {
                removed.insert(row, cell);
            }
            row_map.extend(tail.into_iter().map(|(col, cell)| (col - 1, cell)));
        }
        self.rows.retain(|_, r| !r.is_empty());
        self.col_count -= 1;
        self.changes.structure = true;

        Ok((0..self.row_count)
            .map(|row| removed.remove(&row).unwrap_or_default())
            .collect())
    }

    /// Re-insert a row previously returned by [`remove_row`](Self::remove_row)
    pub fn restore_row(&mut self, index: u32, cells: Vec<Cell>) -> Result<()> {
        self.insert_row(index)?;
        for (col, cell) in cells.into_iter().enumerate().take(self.col_count as usize) {
            self.put(index, col as u16, cell);
        }
        Ok(())
    }

    /// Re-insert a column previously returned by [`remove_col`](Self::remove_col)
    pub fn restore_col(&mut self, index: u16, cells: Vec<Cell>) -> Result<()> {
        self.insert_col(index)?;
        for (row, cell) in cells.into_iter().enumerate().take(self.row_count as usize) {
            self.put(row as u32, index, cell);
        }
        Ok(())
    }

    /// Remove every cell, keeping the dimensions
    pub fn clear(&mut self) {
        self.rows.clear();
        self.changes.structure = true;
    }

    /// Number of materialized cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    /// Check if no cell is materialized
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over materialized cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &Cell)> {
        self.rows
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&col, cell)| (row, col, cell)))
    }

    /// Iterate over materialized cells of one row
    pub fn iter_row(&self, row: u32) -> impl Iterator<Item = (u16, &Cell)> {
        self.rows
            .get(&row)
            .into_iter()
            .flat_map(|cols| cols.iter().map(|(&col, cell)| (col, cell)))
    }

    /// Coordinates of every formula cell in row-major order
    pub fn formula_keys(&self) -> Vec<CellKey> {
        self.iter()
            .filter(|(_, _, cell)| cell.is_formula())
            .map(|(row, col, _)| CellKey::new(row, col))
            .collect()
    }

    /// Raw snapshots of the whole grid, `rows x cols`
    pub fn to_table(&self) -> Vec<Vec<CellSnapshot>> {
        (0..self.row_count)
            .map(|row| {
                (0..self.col_count)
                    .map(|col| self.snapshot(row, col))
                    .collect()
            })
            .collect()
    }

    /// Suspend change notifications; calls nest
    pub fn suspend_notifications(&mut self) {
        self.suspended += 1;
    }

    /// Undo one [`suspend_notifications`](Self::suspend_notifications)
    ///
    /// Returns true when notifications are live again.
    pub fn resume_notifications(&mut self) -> bool {
        self.suspended = self.suspended.saturating_sub(1);
        self.suspended == 0
    }

    /// Whether notifications are currently suspended
    pub fn notifications_suspended(&self) -> bool {
        self.suspended > 0
    }

    /// Drain recorded changes
    ///
    /// While suspended nothing is drained; changes keep accumulating.
    pub fn take_changes(&mut self) -> StoreChanges {
        if self.notifications_suspended() {
            return StoreChanges::default();
        }
        std::mem::take(&mut self.changes)
    }
}
