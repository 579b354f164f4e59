//! Batch mutations
//!
//! A batch operation is planned as a sequence of [`Mutation`]s, one group
//! per sheet row, and applied as a single macro with store notifications
//! suspended, followed by one recalc.
//!
//! Large operations are planned on a worker thread. The worker never touches
//! the sheet: it sends chunks of planned mutations over a bounded channel
//! and the calling thread applies them, checking the progress sink for
//! cancellation between chunks. Cancelling reverts everything the operation
//! applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use crate::clipboard::{decode, ClipboardProvider};
use crate::command::Command;
use crate::config::BatchOptions;
use crate::error::{Error, Result};
use crate::fill::{FillDirection, FillPlan};
use crate::observer::SheetEvent;
use crate::sheet::Sheet;
use comment_sheet_core::{CellRange, CellSnapshot};
use comment_sheet_formula::StructuralChange;

/// Chunks buffered between the worker and the applying thread
const CHANNEL_DEPTH: usize = 4;

/// One planned edit
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mutation {
    /// New raw value; the cell keeps its format
    Value { row: u32, col: u16, value: String },
    /// New raw value and format
    Cell {
        row: u32,
        col: u16,
        snapshot: CellSnapshot,
    },
    Structural(StructuralChange),
}

type Plan = Box<dyn Iterator<Item = Vec<Mutation>> + Send>;

/// Receives progress of a batch operation and may cancel it
pub trait ProgressSink {
    /// `done` of `total` planned mutations have been applied
    fn progress(&mut self, done: usize, total: usize);

    /// Checked between chunks; returning true reverts the operation
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<F: FnMut(usize, usize)> ProgressSink for F {
    fn progress(&mut self, done: usize, total: usize) {
        self(done, total)
    }
}

/// A sink that ignores progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&mut self, _done: usize, _total: usize) {}
}

/// Cancellation flag shared between a progress dialog and the operation
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl ProgressSink for CancelToken {
    fn progress(&mut self, _done: usize, _total: usize) {}

    fn is_cancelled(&self) -> bool {
        CancelToken::is_cancelled(self)
    }
}

/// What a batch operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    /// Planned mutations
    pub total: usize,
    /// Mutations processed before finishing or cancelling
    pub done: usize,
    /// Whether planning ran on a worker thread
    pub background: bool,
    /// Whether the operation was cancelled and reverted
    pub cancelled: bool,
}

/// Runs batch operations against a sheet; see [`Sheet::batch`]
pub struct BatchMutator<'a> {
    sheet: &'a mut Sheet,
    progress: Option<&'a mut dyn ProgressSink>,
}

impl Sheet {
    /// Start a batch operation
    ///
    /// ```rust
    /// use comment_sheet::Sheet;
    ///
    /// let mut sheet = Sheet::new(10, 5).unwrap();
    /// sheet.batch().paste(0, 0, "1\t2\n3\t=A2*B1\n").unwrap();
    /// assert_eq!(sheet.display(1, 1), "6");
    ///
    /// // The whole paste is one undo step
    /// sheet.undo().unwrap();
    /// assert_eq!(sheet.value(0, 0), "");
    /// ```
    pub fn batch(&mut self) -> BatchMutator<'_> {
        BatchMutator {
            sheet: self,
            progress: None,
        }
    }

    fn apply_mutation(&mut self, mutation: Mutation) -> Result<()> {
        let command = match mutation {
            Mutation::Value { row, col, value } => {
                let old = self.store.snapshot(row, col);
                let new = CellSnapshot::new(value).with_format(old.format);
                if new == old {
                    return Ok(());
                }
                Command::cell_write(row, col, old, new)
            }
            Mutation::Cell { row, col, snapshot } => {
                let old = self.store.snapshot(row, col);
                if snapshot == old {
                    return Ok(());
                }
                Command::cell_write(row, col, old, snapshot)
            }
            Mutation::Structural(change) => Command::structural(change),
        };
        self.log.push(command, &mut self.store)
    }
}

impl<'a> BatchMutator<'a> {
    /// Report progress to (and take cancellation from) `sink`
    pub fn with_progress(mut self, sink: &'a mut dyn ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Delete rows; indices refer to the sheet before the operation
    pub fn delete_rows(self, indices: &[u32]) -> Result<BatchOutcome> {
        let mut indices = indices.to_vec();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        let total = indices.len() * self.sheet.col_count() as usize;
        let plan = indices
            .into_iter()
            .map(|i| vec![Mutation::Structural(StructuralChange::RemoveRow(i))]);
        self.run("Delete rows", total, Box::new(plan))
    }

    /// Delete columns; indices refer to the sheet before the operation
    pub fn delete_cols(self, indices: &[u16]) -> Result<BatchOutcome> {
        let mut indices = indices.to_vec();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        let total = indices.len() * self.sheet.row_count() as usize;
        let plan = indices
            .into_iter()
            .map(|i| vec![Mutation::Structural(StructuralChange::RemoveCol(i))]);
        self.run("Delete columns", total, Box::new(plan))
    }

    /// Insert `count` empty rows at `index`
    pub fn insert_rows(self, index: u32, count: u32) -> Result<BatchOutcome> {
        let total = count as usize * self.sheet.col_count() as usize;
        let plan = (0..count)
            .map(move |_| vec![Mutation::Structural(StructuralChange::InsertRow(index))]);
        self.run("Insert rows", total, Box::new(plan))
    }

    /// Insert `count` empty columns at `index`
    pub fn insert_cols(self, index: u16, count: u16) -> Result<BatchOutcome> {
        let total = count as usize * self.sheet.row_count() as usize;
        let plan = (0..count)
            .map(move |_| vec![Mutation::Structural(StructuralChange::InsertCol(index))]);
        self.run("Insert columns", total, Box::new(plan))
    }

    /// Empty every cell of a rectangle, values and formats
    pub fn clear_region(self, r1: u32, c1: u16, r2: u32, c2: u16) -> Result<BatchOutcome> {
        let range = CellRange::from_indices(r1, c1, r2, c2);
        self.clear_range("Clear", range)
    }

    fn clear_range(mut self, label: &str, range: CellRange) -> Result<BatchOutcome> {
        if let Err(e) = self.sheet.store.check_bounds(range.end.row, range.end.col) {
            return Err(self.sheet.fail(e.into()));
        }
        let total = range.cell_count() as usize;
        let CellRange { start, end } = range;
        let plan = (start.row..=end.row).map(move |row| {
            (start.col..=end.col)
                .map(|col| Mutation::Cell {
                    row,
                    col,
                    snapshot: CellSnapshot::default(),
                })
                .collect::<Vec<_>>()
        });
        self.run_mut(label, total, Box::new(plan))
    }

    /// Fill below `source` down to `end_row`
    pub fn fill_region(self, source: CellRange, end_row: u32) -> Result<BatchOutcome> {
        self.fill(source, end_row, FillDirection::Down)
    }

    /// Fill right of `source` up to `end_col`
    pub fn fill_right(self, source: CellRange, end_col: u16) -> Result<BatchOutcome> {
        self.fill(source, end_col as u32, FillDirection::Right)
    }

    /// Fill from `source` to the end row or column
    pub fn fill(
        mut self,
        source: CellRange,
        end: u32,
        direction: FillDirection,
    ) -> Result<BatchOutcome> {
        let (last_row, last_col) = match direction {
            FillDirection::Down => (end.max(source.end.row), source.end.col),
            FillDirection::Right => (
                source.end.row,
                u16::try_from(end).unwrap_or(u16::MAX).max(source.end.col),
            ),
        };
        let cells = match self
            .sheet
            .store
            .check_bounds(last_row, last_col)
            .and_then(|()| {
                self.sheet.store.snapshot_region(
                    source.start.row,
                    source.start.col,
                    source.end.row,
                    source.end.col,
                )
            }) {
            Ok(cells) => cells,
            Err(e) => return Err(self.sheet.fail(e.into())),
        };

        let plan = FillPlan {
            source,
            cells: cells
                .into_iter()
                .map(|row| row.iter().map(|cell| cell.snapshot()).collect())
                .collect(),
            direction,
            end,
        };
        let total = plan.len();
        self.run_mut("Fill", total, plan.into_rows())
    }

    /// Paste tab-separated text with its top-left cell at (row, col)
    ///
    /// Cells falling outside the sheet are dropped.
    pub fn paste(self, row: u32, col: u16, text: &str) -> Result<BatchOutcome> {
        let rows = self.sheet.row_count();
        let cols = self.sheet.col_count();
        let in_bounds = move |r: u32, c: u16| r < rows && c < cols;

        let decoded = decode(text);
        let mut total = 0;
        for (i, line) in decoded.iter().enumerate() {
            for j in 0..line.len() {
                if let Some((r, c)) = offset(row, col, i, j) {
                    if in_bounds(r, c) {
                        total += 1;
                    }
                }
            }
        }

        let plan = decoded.into_iter().enumerate().map(move |(i, line)| {
            line.into_iter()
                .enumerate()
                .filter_map(|(j, value)| {
                    let (r, c) = offset(row, col, i, j)?;
                    in_bounds(r, c).then_some(Mutation::Value { row: r, col: c, value })
                })
                .collect::<Vec<_>>()
        });
        self.run("Paste", total, Box::new(plan))
    }

    /// Paste whatever text the clipboard holds
    pub fn paste_from(
        self,
        clipboard: &mut dyn ClipboardProvider,
        row: u32,
        col: u16,
    ) -> Result<BatchOutcome> {
        match clipboard.read_text()? {
            Some(text) => self.paste(row, col, &text),
            None => Ok(BatchOutcome::default()),
        }
    }

    /// Copy `range` to the clipboard, then clear it as one undo step
    pub fn cut(
        self,
        range: CellRange,
        clipboard: &mut dyn ClipboardProvider,
    ) -> Result<BatchOutcome> {
        if let Err(e) = self.sheet.copy_to(range, clipboard) {
            return Err(self.sheet.fail(e));
        }
        self.clear_range("Cut", range)
    }

    fn run(mut self, label: &str, total: usize, plan: Plan) -> Result<BatchOutcome> {
        self.run_mut(label, total, plan)
    }

    fn run_mut(&mut self, label: &str, total: usize, plan: Plan) -> Result<BatchOutcome> {
        let options = self.sheet.config.batch.clone();
        let background = total > options.background_threshold;
        let mut no_progress = NoProgress;
        let progress: &mut dyn ProgressSink = match self.progress.as_deref_mut() {
            Some(sink) => sink,
            None => &mut no_progress,
        };

        let (chunks, worker) = match start_chunks(plan, &options, background) {
            Ok(started) => started,
            Err(e) => return Err(self.sheet.fail(e)),
        };
        log::debug!(
            "{}: {} planned mutations{}",
            label,
            total,
            if background { " (worker thread)" } else { "" }
        );

        let sheet = &mut *self.sheet;
        sheet.log.begin_macro(label);
        sheet.store.suspend_notifications();

        let mut outcome = BatchOutcome {
            total,
            background,
            ..Default::default()
        };
        let mut result = apply_chunks(sheet, chunks, progress, &options, &mut outcome);

        if let Some(handle) = worker {
            if handle.join().is_err() && result.is_ok() {
                result = Err(Error::Worker("planning thread panicked".into()));
            }
        }

        let reverted = if result.is_err() || outcome.cancelled {
            sheet.log.abort_macro(&mut sheet.store)
        } else {
            sheet.log.end_macro();
            Ok(())
        };
        sheet.store.resume_notifications();
        sheet.recalculate();

        if outcome.cancelled {
            log::debug!("{} cancelled after {} of {} mutations", label, outcome.done, total);
        }
        match result.and(reverted) {
            Ok(()) => Ok(outcome),
            Err(e) => Err(sheet.fail(e)),
        }
    }
}

/// Target of the cell at (i, j) of pasted text, if it fits the index types
fn offset(row: u32, col: u16, i: usize, j: usize) -> Option<(u32, u16)> {
    let r = u32::try_from(i).ok().and_then(|i| row.checked_add(i))?;
    let c = u16::try_from(j).ok().and_then(|j| col.checked_add(j))?;
    Some((r, c))
}

fn next_chunk<I>(plan: &mut I, rows: usize) -> Option<Vec<Mutation>>
where
    I: Iterator<Item = Vec<Mutation>>,
{
    let mut chunk = Vec::new();
    let mut any = false;
    for row in plan.by_ref().take(rows) {
        any = true;
        chunk.extend(row);
    }
    any.then_some(chunk)
}

type Chunks = Box<dyn Iterator<Item = Vec<Mutation>>>;

/// Produce the plan's chunks inline or from a worker thread
fn start_chunks(
    mut plan: Plan,
    options: &BatchOptions,
    background: bool,
) -> Result<(Chunks, Option<thread::JoinHandle<()>>)> {
    let chunk_rows = options.chunk_rows.max(1);
    if !background {
        let chunks = std::iter::from_fn(move || next_chunk(&mut plan, chunk_rows));
        return Ok((Box::new(chunks), None));
    }

    let (tx, rx) = mpsc::sync_channel(CHANNEL_DEPTH);
    let handle = thread::Builder::new()
        .name("comment-sheet-batch".into())
        .spawn(move || {
            while let Some(chunk) = next_chunk(&mut plan, chunk_rows) {
                // The receiver is gone when the operation failed or was cancelled
                if tx.send(chunk).is_err() {
                    break;
                }
            }
        })?;
    Ok((Box::new(rx.into_iter()), Some(handle)))
}

fn apply_chunks(
    sheet: &mut Sheet,
    chunks: Chunks,
    progress: &mut dyn ProgressSink,
    options: &BatchOptions,
    outcome: &mut BatchOutcome,
) -> Result<()> {
    let interval = options.progress_interval.max(1);
    for chunk in chunks {
        if progress.is_cancelled() {
            outcome.cancelled = true;
            return Ok(());
        }
        for mutation in chunk {
            sheet.apply_mutation(mutation)?;
            outcome.done += 1;
            if outcome.done % interval == 0 {
                report(sheet, progress, outcome);
            }
        }
    }
    if outcome.done % interval != 0 {
        report(sheet, progress, outcome);
    }
    Ok(())
}

fn report(sheet: &mut Sheet, progress: &mut dyn ProgressSink, outcome: &BatchOutcome) {
    progress.progress(outcome.done, outcome.total);
    sheet.emit(SheetEvent::Progress {
        done: outcome.done,
        total: outcome.total,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::config::SheetConfig;
    use pretty_assertions::assert_eq;

    fn background_sheet() -> Sheet {
        let mut config = SheetConfig::default().with_size(40, 4);
        config.batch = BatchOptions {
            background_threshold: 0,
            progress_interval: 1,
            chunk_rows: 1,
        };
        Sheet::with_config(config).unwrap()
    }

    struct CancelAfter {
        calls: usize,
        limit: usize,
    }

    impl ProgressSink for CancelAfter {
        fn progress(&mut self, _done: usize, _total: usize) {
            self.calls += 1;
        }

        fn is_cancelled(&self) -> bool {
            self.calls >= self.limit
        }
    }

    #[test]
    fn test_clear_region_is_one_undo_step() {
        let mut sheet = Sheet::new(10, 4).unwrap();
        sheet.set_value(0, 0, "a").unwrap();
        sheet.set_value(1, 1, "b").unwrap();
        sheet.set_value(5, 0, "keep").unwrap();

        let outcome = sheet.batch().clear_region(1, 1, 0, 0).unwrap();
        assert_eq!(outcome.total, 4);
        assert!(!outcome.background);
        assert_eq!(sheet.value(0, 0), "");
        assert_eq!(sheet.value(1, 1), "");
        assert_eq!(sheet.value(5, 0), "keep");

        assert_eq!(sheet.history().undo_len(), 4);
        sheet.undo().unwrap();
        assert_eq!(sheet.value(0, 0), "a");
        assert_eq!(sheet.value(1, 1), "b");
    }

    #[test]
    fn test_delete_rows_uses_original_indices() {
        let mut sheet = Sheet::new(10, 2).unwrap();
        for row in 0..5 {
            sheet.set_value(row, 0, format!("r{}", row)).unwrap();
        }
        sheet.batch().delete_rows(&[1, 3, 1]).unwrap();

        let column: Vec<&str> = (0..3).map(|row| sheet.value(row, 0)).collect();
        assert_eq!(column, vec!["r0", "r2", "r4"]);
        assert_eq!(sheet.row_count(), 8);

        sheet.undo().unwrap();
        assert_eq!(sheet.row_count(), 10);
        assert_eq!(sheet.value(3, 0), "r3");
    }

    #[test]
    fn test_failed_batch_leaves_sheet_untouched() {
        let mut sheet = Sheet::new(2, 2).unwrap();
        sheet.set_value(0, 0, "a").unwrap();
        let undo_before = sheet.history().undo_len();

        // Removing both rows would leave the sheet without rows
        assert!(sheet.batch().delete_rows(&[0, 1]).is_err());
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.value(0, 0), "a");
        assert_eq!(sheet.history().undo_len(), undo_before);
    }

    #[test]
    fn test_insert_rows_and_cols() {
        let mut sheet = Sheet::new(5, 3).unwrap();
        sheet.set_value(0, 0, "x").unwrap();
        sheet.set_value(1, 1, "=A1").unwrap();

        sheet.batch().insert_rows(0, 2).unwrap();
        sheet.batch().insert_cols(0, 1).unwrap();
        assert_eq!(sheet.value(2, 1), "x");
        assert_eq!(sheet.value(3, 2), "=B3");
        assert_eq!(sheet.display(3, 2), "x");
        assert_eq!((sheet.row_count(), sheet.col_count()), (7, 4));
    }

    #[test]
    fn test_paste_drops_cells_outside_the_sheet() {
        let mut sheet = Sheet::new(3, 3).unwrap();
        let outcome = sheet.batch().paste(2, 1, "a\tb\tc\nd\te\n").unwrap();
        assert_eq!(outcome.total, 2);
        assert_eq!(sheet.value(2, 1), "a");
        assert_eq!(sheet.value(2, 2), "b");
    }

    #[test]
    fn test_paste_keeps_target_format() {
        let mut sheet = Sheet::new(3, 3).unwrap();
        let bold = comment_sheet_core::CellFormat::new()
            .with_font(comment_sheet_core::FontStyle::new().with_bold(true));
        sheet
            .set_cell(0, 0, CellSnapshot::new("old").with_format(bold))
            .unwrap();
        sheet.batch().paste(0, 0, "new").unwrap();
        assert_eq!(sheet.value(0, 0), "new");
        assert_eq!(sheet.format(0, 0), bold);
    }

    #[test]
    fn test_cut_copies_then_clears() {
        let mut sheet = Sheet::new(5, 3).unwrap();
        sheet.set_value(0, 0, "1").unwrap();
        sheet.set_value(0, 1, "2").unwrap();
        let mut clipboard = MemoryClipboard::new();

        sheet
            .batch()
            .cut(CellRange::parse("A1:B1").unwrap(), &mut clipboard)
            .unwrap();
        assert_eq!(clipboard.text(), Some("1\t2\n"));
        assert_eq!(sheet.value(0, 0), "");

        sheet.batch().paste_from(&mut clipboard, 3, 0).unwrap();
        assert_eq!(sheet.value(3, 1), "2");

        sheet.undo().unwrap();
        sheet.undo().unwrap();
        assert_eq!(sheet.value(0, 0), "1");
        assert_eq!(sheet.value(3, 1), "");
    }

    #[test]
    fn test_fill_region_and_right() {
        let mut sheet = Sheet::new(10, 5).unwrap();
        sheet.set_value(0, 0, "10").unwrap();
        sheet.set_value(0, 1, "=A1*2").unwrap();

        sheet
            .batch()
            .fill_region(CellRange::parse("A1:B1").unwrap(), 2)
            .unwrap();
        assert_eq!(sheet.value(2, 0), "12");
        assert_eq!(sheet.value(2, 1), "=A3*2");
        assert_eq!(sheet.display(2, 1), "24");

        sheet
            .batch()
            .fill_right(CellRange::parse("B1").unwrap(), 3)
            .unwrap();
        assert_eq!(sheet.value(0, 3), "=C1*2");

        assert!(sheet
            .batch()
            .fill_region(CellRange::parse("A1").unwrap(), 10)
            .is_err());
    }

    #[test]
    fn test_background_paste_reports_progress() {
        let mut sheet = background_sheet();
        let text: String = (0..30).map(|i| format!("{}\t=A{}*2\n", i, i + 1)).collect();

        let mut ticks = Vec::new();
        let mut sink = |done: usize, total: usize| ticks.push((done, total));
        let outcome = sheet.batch().with_progress(&mut sink).paste(0, 0, &text).unwrap();

        assert!(outcome.background);
        assert!(!outcome.cancelled);
        assert_eq!(outcome.done, 60);
        assert_eq!(ticks.len(), 60);
        assert_eq!(ticks.last(), Some(&(60, 60)));
        assert_eq!(sheet.display(29, 1), "58");
        assert_eq!(sheet.history().undo_len(), 1);
    }

    #[test]
    fn test_cancel_reverts_everything() {
        let mut sheet = background_sheet();
        sheet.set_value(0, 0, "before").unwrap();
        let before = sheet.to_table();

        let text = "x\n".repeat(30);
        let mut sink = CancelAfter { calls: 0, limit: 3 };
        let outcome = sheet
            .batch()
            .with_progress(&mut sink)
            .paste(0, 0, &text)
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.done, 3);
        assert_eq!(sheet.to_table(), before);
        assert_eq!(sheet.history().undo_len(), 1);
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let mut sink = token.clone();
        let mut sheet = background_sheet();
        token.cancel();

        let outcome = sheet
            .batch()
            .with_progress(&mut sink)
            .clear_region(0, 0, 3, 3)
            .unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.done, 0);
    }
}
