//! The [`Sheet`] facade
//!
//! A sheet owns its cell store, dependency graph and command log. Every edit
//! goes through the command log, is followed by a full recalc (unless a
//! macro is being recorded) and is reported to subscribed observers.

use crate::calculation::{self, CalculationStats};
use crate::command::{Command, Macro};
use crate::config::SheetConfig;
use crate::error::{Error, Result};
use crate::history::CommandLog;
use crate::observer::{ObserverId, Observers, SheetEvent, SheetObserver};
use comment_sheet_core::{Cell, CellFormat, CellKey, CellRange, CellSnapshot, CellStore, FontStyle};
use comment_sheet_formula::{DependencyGraph, StructuralChange};

/// A font attribute the toolbar can toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontAttribute {
    Bold,
    Italic,
    Underline,
}

impl FontAttribute {
    fn get(self, font: &FontStyle) -> bool {
        match self {
            FontAttribute::Bold => font.bold,
            FontAttribute::Italic => font.italic,
            FontAttribute::Underline => font.underline,
        }
    }
}

/// Font attributes to set on a range; `None` leaves an attribute alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontChange {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
}

impl FontChange {
    /// Set a single attribute
    pub fn set(attribute: FontAttribute, on: bool) -> Self {
        let mut change = Self::default();
        match attribute {
            FontAttribute::Bold => change.bold = Some(on),
            FontAttribute::Italic => change.italic = Some(on),
            FontAttribute::Underline => change.underline = Some(on),
        }
        change
    }

    fn apply(&self, format: &mut CellFormat) {
        let mut font = format.font_or_default();
        if let Some(bold) = self.bold {
            font.bold = bold;
        }
        if let Some(italic) = self.italic {
            font.italic = italic;
        }
        if let Some(underline) = self.underline {
            font.underline = underline;
        }
        format.font = (!font.is_plain()).then_some(font);
    }
}

/// One comment table: cells, formulas, undo history and observers
#[derive(Debug)]
pub struct Sheet {
    pub(crate) store: CellStore,
    pub(crate) graph: DependencyGraph,
    pub(crate) log: CommandLog,
    pub(crate) config: SheetConfig,
    pub(crate) observers: Observers,
    pub(crate) last_stats: CalculationStats,
    /// Metadata keys kept verbatim across load and save
    pub(crate) metadata: serde_json::Map<String, serde_json::Value>,
}

impl Sheet {
    /// Create an empty sheet of `rows` x `cols`
    ///
    /// Fails when the size is outside the supported limits.
    pub fn new(rows: u32, cols: u16) -> Result<Self> {
        let store = CellStore::new(rows, cols)?;
        Ok(Self::from_parts(store, SheetConfig::default().with_size(rows, cols)))
    }

    /// Create an empty sheet from a configuration; the size is clamped
    pub fn with_config(config: SheetConfig) -> Result<Self> {
        let (rows, cols) = config.clamped_size();
        let store = CellStore::new(rows, cols)?;
        Ok(Self::from_parts(store, config))
    }

    fn from_parts(store: CellStore, config: SheetConfig) -> Self {
        Self {
            store,
            graph: DependencyGraph::new(),
            log: CommandLog::with_limit(config.history_limit),
            config,
            observers: Observers::default(),
            last_stats: CalculationStats::default(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn row_count(&self) -> u32 {
        self.store.row_count()
    }

    pub fn col_count(&self) -> u16 {
        self.store.col_count()
    }

    /// A copy of the cell at (row, col); blank when empty or out of bounds
    pub fn cell(&self, row: u32, col: u16) -> Cell {
        self.store.get(row, col)
    }

    /// Raw value of a cell
    pub fn value(&self, row: u32, col: u16) -> &str {
        self.store.cell(row, col).map_or("", |c| c.value.as_str())
    }

    /// Evaluated display text of a cell
    pub fn display(&self, row: u32, col: u16) -> &str {
        self.store.cell(row, col).map_or("", |c| c.display.as_str())
    }

    /// Formatting of a cell
    pub fn format(&self, row: u32, col: u16) -> CellFormat {
        self.store.cell(row, col).map(|c| c.format).unwrap_or_default()
    }

    pub fn store(&self) -> &CellStore {
        &self.store
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn history(&self) -> &CommandLog {
        &self.log
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    /// Statistics of the most recent recalc
    pub fn last_stats(&self) -> &CalculationStats {
        &self.last_stats
    }

    /// Raw snapshots of every cell, `rows x cols`
    pub fn to_table(&self) -> Vec<Vec<CellSnapshot>> {
        self.store.to_table()
    }

    // === Observers ===

    /// Subscribe to change notifications
    pub fn subscribe<O: SheetObserver + 'static>(&mut self, observer: O) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Remove a subscription; false when it was not subscribed
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub(crate) fn emit(&mut self, event: SheetEvent) {
        self.observers.emit(&event);
    }

    /// Report a failed operation to observers and hand the error back
    pub(crate) fn fail(&mut self, error: Error) -> Error {
        log::warn!("sheet operation failed: {}", error);
        self.emit(SheetEvent::Error {
            message: error.to_string(),
        });
        error
    }

    /// Send out the changes the store recorded since the last flush
    fn flush(&mut self) {
        let changes = self.store.take_changes();
        if self.observers.is_empty() {
            return;
        }
        if changes.structure {
            self.emit(SheetEvent::StructureChanged {
                rows: self.store.row_count(),
                cols: self.store.col_count(),
            });
            return;
        }
        for key in changes.cells {
            let cell = self.store.get(key.row, key.col);
            self.emit(SheetEvent::CellChanged {
                row: key.row,
                col: key.col,
                display: cell.display,
                format: cell.format,
            });
        }
    }

    // === Calculation ===

    /// Re-evaluate every formula and notify observers
    pub fn recalculate(&mut self) -> CalculationStats {
        let stats =
            calculation::recalculate(&mut self.store, &mut self.graph, &self.config.calculation);
        self.last_stats = stats.clone();
        if !self.store.notifications_suspended() {
            self.flush();
            self.emit(SheetEvent::RecalcComplete {
                stats: stats.clone(),
            });
        }
        stats
    }

    /// Direct precedents of a cell as of the last recalc
    pub fn precedents(&self, row: u32, col: u16) -> Vec<CellKey> {
        self.graph.precedents_of(CellKey::new(row, col))
    }

    /// Every cell the cell at (row, col) reads, directly or indirectly
    pub fn trace_precedents(&self, row: u32, col: u16) -> Vec<CellKey> {
        self.graph.trace_precedents(CellKey::new(row, col))
    }

    /// Cells whose formulas read the cell at (row, col)
    pub fn dependents(&self, row: u32, col: u16) -> Vec<CellKey> {
        self.graph.dependents_of(CellKey::new(row, col))
    }

    // === Commands ===

    /// Apply a command, record it for undo and recalculate
    pub fn execute(&mut self, command: Command) -> Result<()> {
        if let Err(e) = self.log.push(command, &mut self.store) {
            return Err(self.fail(e));
        }
        if !self.log.is_recording() {
            self.recalculate();
        }
        Ok(())
    }

    /// Set the raw value of a cell, keeping its format
    ///
    /// Returns whether anything changed; unchanged values push no command.
    pub fn set_value<S: Into<String>>(&mut self, row: u32, col: u16, value: S) -> Result<bool> {
        let format = self.format(row, col);
        self.set_cell(row, col, CellSnapshot::new(value).with_format(format))
    }

    /// Replace a cell's value and format
    pub fn set_cell(&mut self, row: u32, col: u16, snapshot: CellSnapshot) -> Result<bool> {
        if let Err(e) = self.store.check_bounds(row, col) {
            return Err(self.fail(e.into()));
        }
        let old = self.store.snapshot(row, col);
        if old == snapshot {
            return Ok(false);
        }
        self.execute(Command::cell_write(row, col, old, snapshot))?;
        Ok(true)
    }

    /// Rewrite every cell of `range` with `update`, as one undo step
    fn update_range(
        &mut self,
        label: &str,
        range: CellRange,
        mut update: impl FnMut(&mut CellSnapshot),
    ) -> Result<()> {
        if let Err(e) = self.store.check_bounds(range.end.row, range.end.col) {
            return Err(self.fail(e.into()));
        }
        let mut commands = Vec::new();
        for key in range.cells() {
            let old = self.store.snapshot(key.row, key.col);
            let mut new = old.clone();
            update(&mut new);
            if new != old {
                commands.push(Command::cell_write(key.row, key.col, old, new));
            }
        }
        if commands.is_empty() {
            return Ok(());
        }
        self.execute(Command::Macro(Macro {
            label: label.to_string(),
            commands,
        }))
    }

    /// Replace the format of every cell in `range`
    pub fn set_format(&mut self, range: CellRange, format: CellFormat) -> Result<()> {
        self.update_range("Format cells", range, |snapshot| snapshot.format = format)
    }

    /// Set or clear font attributes on every cell in `range`
    pub fn apply_font(&mut self, range: CellRange, change: FontChange) -> Result<()> {
        self.update_range("Change font", range, |snapshot| {
            change.apply(&mut snapshot.format)
        })
    }

    /// Toggle a font attribute: set it on the whole range unless every cell
    /// already has it, in which case clear it. Returns the new state.
    pub fn toggle_font(&mut self, range: CellRange, attribute: FontAttribute) -> Result<bool> {
        let all_set = range
            .cells()
            .all(|key| attribute.get(&self.format(key.row, key.col).font_or_default()));
        self.apply_font(range, FontChange::set(attribute, !all_set))?;
        Ok(!all_set)
    }

    /// Insert an empty row at `index`
    pub fn insert_row(&mut self, index: u32) -> Result<()> {
        self.execute(Command::structural(StructuralChange::InsertRow(index)))
    }

    /// Insert an empty column at `index`
    pub fn insert_col(&mut self, index: u16) -> Result<()> {
        self.execute(Command::structural(StructuralChange::InsertCol(index)))
    }

    /// Remove the row at `index`; references to it become `#REF!`
    pub fn remove_row(&mut self, index: u32) -> Result<()> {
        self.execute(Command::structural(StructuralChange::RemoveRow(index)))
    }

    /// Remove the column at `index`; references to it become `#REF!`
    pub fn remove_col(&mut self, index: u16) -> Result<()> {
        self.execute(Command::structural(StructuralChange::RemoveCol(index)))
    }

    // === Undo ===

    /// Undo the last command; false when there is nothing to undo
    pub fn undo(&mut self) -> Result<bool> {
        match self.log.undo(&mut self.store) {
            Ok(done) => {
                if done {
                    self.recalculate();
                }
                Ok(done)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Redo the last undone command; false when there is nothing to redo
    pub fn redo(&mut self) -> Result<bool> {
        match self.log.redo(&mut self.store) {
            Ok(done) => {
                if done {
                    self.recalculate();
                }
                Ok(done)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    /// Start grouping commands into one undo step; calls nest
    ///
    /// Recalculation is held back until the outermost
    /// [`end_macro`](Self::end_macro).
    pub fn begin_macro<S: Into<String>>(&mut self, label: S) {
        self.log.begin_macro(label);
    }

    /// Close one level of grouping; recalculates when the outermost closes
    pub fn end_macro(&mut self) {
        if self.log.end_macro() {
            self.recalculate();
        }
    }

    /// Revert everything recorded since the outermost
    /// [`begin_macro`](Self::begin_macro)
    pub fn abort_macro(&mut self) -> Result<()> {
        let result = self.log.abort_macro(&mut self.store);
        self.recalculate();
        result.map_err(|e| self.fail(e))
    }

    // === Lifecycle ===

    /// Empty the sheet and its history, back to the configured size
    pub fn reset(&mut self) {
        let (rows, cols) = self.config.clamped_size();
        self.store.clear();
        if let Err(e) = self.store.resize(rows, cols) {
            log::warn!("could not resize sheet to {}x{}: {}", rows, cols, e);
        }
        self.log.clear();
        self.metadata.clear();
        self.recalculate();
    }

    /// Install a new store, dropping history
    pub(crate) fn replace_store(&mut self, mut store: CellStore) {
        // Cells written while building the store are announced as one
        // structure change instead
        let _ = store.take_changes();
        self.store = store;
        self.log.clear();
        self.emit(SheetEvent::StructureChanged {
            rows: self.store.row_count(),
            cols: self.store.col_count(),
        });
        self.recalculate();
    }
}
