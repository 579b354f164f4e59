//! Formula-bar edit session
//!
//! Tracks the text being edited for one cell. While the text is a formula,
//! clicking a cell inserts its reference at the cursor instead of moving
//! the selection. Committing pushes a cell write only when the value
//! changed; cancelling writes nothing.

use crate::error::Result;
use crate::sheet::Sheet;
use comment_sheet_core::{CellAddress, CellRange};

/// State of an [`EditSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    /// No cell is being edited
    #[default]
    Idle,
    /// Editing plain text
    Editing,
    /// Editing a formula: cell clicks insert references
    ReferenceSelect,
}

/// What a click on the grid should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Move the selection to this cell
    Select { row: u32, col: u16 },
    /// The reference text was inserted into the editor
    InsertedReference(String),
}

/// Edit state for the active cell
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
    row: u32,
    col: u16,
    buffer: String,
    /// Cursor position in characters
    cursor: usize,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// The cell being edited
    pub fn active_cell(&self) -> Option<(u32, u16)> {
        (self.state != EditState::Idle).then_some((self.row, self.col))
    }

    /// Current editor text
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Start editing the cell at (row, col) with its raw value
    pub fn begin(&mut self, sheet: &Sheet, row: u32, col: u16) {
        self.row = row;
        self.col = col;
        self.buffer = sheet.value(row, col).to_string();
        self.cursor = self.buffer.chars().count();
        self.classify();
    }

    /// Replace the editor text, as typed by the user
    ///
    /// Ignored while idle.
    pub fn set_text<S: Into<String>>(&mut self, text: S, cursor: usize) {
        if self.state == EditState::Idle {
            return;
        }
        self.buffer = text.into();
        self.cursor = cursor.min(self.buffer.chars().count());
        self.classify();
    }

    /// Insert text at the cursor
    pub fn insert(&mut self, text: &str) {
        if self.state == EditState::Idle {
            return;
        }
        let at = self.byte_offset(self.cursor);
        self.buffer.insert_str(at, text);
        self.cursor += text.chars().count();
        self.classify();
    }

    /// Move the cursor; clamped to the text
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.buffer.chars().count());
    }

    fn byte_offset(&self, cursor: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(cursor)
            .map_or(self.buffer.len(), |(i, _)| i)
    }

    fn classify(&mut self) {
        self.state = if self.buffer.starts_with('=') {
            EditState::ReferenceSelect
        } else {
            EditState::Editing
        };
    }

    /// Handle a click on the cell at (row, col)
    pub fn click_cell(&mut self, row: u32, col: u16) -> ClickOutcome {
        self.click(CellAddress::new(row, col).to_a1_string(), row, col)
    }

    /// Handle a drag selection of `range`
    pub fn select_range(&mut self, range: CellRange) -> ClickOutcome {
        self.click(range.to_a1_string(), range.start.row, range.start.col)
    }

    fn click(&mut self, reference: String, row: u32, col: u16) -> ClickOutcome {
        if self.state != EditState::ReferenceSelect {
            return ClickOutcome::Select { row, col };
        }
        self.insert(&reference);
        ClickOutcome::InsertedReference(reference)
    }

    /// Write the edited text to the sheet (Return or focus loss)
    ///
    /// Returns whether a command was pushed. On error the session keeps
    /// editing so the text is not lost.
    pub fn commit(&mut self, sheet: &mut Sheet) -> Result<bool> {
        if self.state == EditState::Idle {
            return Ok(false);
        }
        let changed = sheet.set_value(self.row, self.col, self.buffer.as_str())?;
        self.reset();
        Ok(changed)
    }

    /// Abandon the edit (Escape)
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.state = EditState::Idle;
        self.buffer.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_text_enters_reference_select() {
        let sheet = Sheet::new(5, 5).unwrap();
        let mut session = EditSession::new();
        assert_eq!(session.state(), EditState::Idle);

        session.begin(&sheet, 0, 0);
        assert_eq!(session.state(), EditState::Editing);
        session.set_text("=", 1);
        assert_eq!(session.state(), EditState::ReferenceSelect);
        session.set_text("plain", 5);
        assert_eq!(session.state(), EditState::Editing);
    }

    #[test]
    fn test_clicks_insert_references_at_cursor() {
        let sheet = Sheet::new(5, 5).unwrap();
        let mut session = EditSession::new();
        session.begin(&sheet, 4, 4);
        session.set_text("=SUM()", 5);

        let outcome = session.select_range(CellRange::from_indices(0, 0, 2, 1));
        assert_eq!(outcome, ClickOutcome::InsertedReference("A1:B3".into()));
        assert_eq!(session.text(), "=SUM(A1:B3)");

        session.set_cursor(11);
        session.insert("+");
        session.click_cell(0, 2);
        assert_eq!(session.text(), "=SUM(A1:B3)+C1");
        assert_eq!(session.active_cell(), Some((4, 4)));
    }

    #[test]
    fn test_clicks_select_while_editing_text() {
        let sheet = Sheet::new(5, 5).unwrap();
        let mut session = EditSession::new();
        assert_eq!(session.click_cell(1, 1), ClickOutcome::Select { row: 1, col: 1 });

        session.begin(&sheet, 0, 0);
        session.set_text("abc", 3);
        assert_eq!(session.click_cell(2, 3), ClickOutcome::Select { row: 2, col: 3 });
        assert_eq!(session.text(), "abc");
    }

    #[test]
    fn test_commit_writes_only_changes() {
        let mut sheet = Sheet::new(5, 5).unwrap();
        sheet.set_value(0, 0, "same").unwrap();
        let mut session = EditSession::new();

        session.begin(&sheet, 0, 0);
        assert!(!session.commit(&mut sheet).unwrap());
        assert_eq!(sheet.history().undo_len(), 1);

        session.begin(&sheet, 0, 1);
        session.set_text("=A1", 3);
        assert!(session.commit(&mut sheet).unwrap());
        assert_eq!(sheet.display(0, 1), "same");
        assert_eq!(session.state(), EditState::Idle);
    }

    #[test]
    fn test_cancel_writes_nothing() {
        let mut sheet = Sheet::new(5, 5).unwrap();
        let mut session = EditSession::new();
        session.begin(&sheet, 0, 0);
        session.set_text("draft", 5);
        session.cancel();

        assert!(!session.commit(&mut sheet).unwrap());
        assert_eq!(sheet.value(0, 0), "");
        assert!(!sheet.can_undo());
    }

    #[test]
    fn test_multibyte_cursor() {
        let sheet = Sheet::new(5, 5).unwrap();
        let mut session = EditSession::new();
        session.begin(&sheet, 0, 0);
        session.set_text("=\"é\"&", 4);
        session.insert("x");
        assert_eq!(session.text(), "=\"é\"x&");
    }
}
