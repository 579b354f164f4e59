//! Undoable commands
//!
//! A [`Command`] carries everything it needs to be applied and reverted
//! without re-reading the sheet: before and after snapshots for cell writes,
//! the removed line and the pre-rewrite formula text for structural edits.

use crate::error::Result;
use comment_sheet_core::{Cell, CellChange, CellKey, CellSnapshot, CellStore};
use comment_sheet_formula::{rewrite_references, StructuralChange};

/// A single undoable edit
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace one cell's value and format
    CellWrite(CellChange),
    /// Insert or remove a whole row or column
    Structural(Structural),
    /// Commands undone and redone as one
    Macro(Macro),
}

impl Command {
    /// A cell write from `old` to `new`
    pub fn cell_write(row: u32, col: u16, old: CellSnapshot, new: CellSnapshot) -> Self {
        Command::CellWrite(CellChange::new(row, col, old, new))
    }

    /// A structural edit
    pub fn structural(change: StructuralChange) -> Self {
        Command::Structural(Structural::new(change))
    }

    /// Apply the command to `store`
    ///
    /// On error the store is left as it was.
    pub fn apply(&mut self, store: &mut CellStore) -> Result<()> {
        match self {
            Command::CellWrite(change) => {
                store.set(change.row, change.col, change.new.clone())?;
                Ok(())
            }
            Command::Structural(structural) => structural.apply(store),
            Command::Macro(m) => m.apply(store),
        }
    }

    /// Undo a previous [`apply`](Self::apply)
    pub fn revert(&mut self, store: &mut CellStore) -> Result<()> {
        match self {
            Command::CellWrite(change) => {
                store.set(change.row, change.col, change.old.clone())?;
                Ok(())
            }
            Command::Structural(structural) => structural.revert(store),
            Command::Macro(m) => m.revert(store),
        }
    }

    /// Short description for logs and undo menus
    pub fn label(&self) -> String {
        match self {
            Command::CellWrite(change) => format!(
                "Edit {}",
                comment_sheet_core::CellAddress::new(change.row, change.col).to_a1_string()
            ),
            Command::Structural(s) => s.label().to_string(),
            Command::Macro(m) => m.label.clone(),
        }
    }
}

/// Row or column insertion/removal plus the formula rewrites it caused
#[derive(Debug, Clone, PartialEq)]
pub struct Structural {
    pub change: StructuralChange,
    /// Cells of the removed line, captured on apply
    removed: Vec<Cell>,
    /// Formulas rewritten on apply: position after the change, text before
    rewritten: Vec<(CellKey, String)>,
}

impl Structural {
    pub fn new(change: StructuralChange) -> Self {
        Self {
            change,
            removed: Vec::new(),
            rewritten: Vec::new(),
        }
    }

    fn label(&self) -> &'static str {
        match self.change {
            StructuralChange::InsertRow(_) => "Insert row",
            StructuralChange::RemoveRow(_) => "Delete row",
            StructuralChange::InsertCol(_) => "Insert column",
            StructuralChange::RemoveCol(_) => "Delete column",
        }
    }

    fn apply(&mut self, store: &mut CellStore) -> Result<()> {
        match self.change {
            StructuralChange::InsertRow(i) => store.insert_row(i)?,
            StructuralChange::InsertCol(i) => store.insert_col(i)?,
            StructuralChange::RemoveRow(i) => self.removed = store.remove_row(i)?,
            StructuralChange::RemoveCol(i) => self.removed = store.remove_col(i)?,
        }

        self.rewritten.clear();
        for key in store.formula_keys() {
            let old = store.snapshot(key.row, key.col);
            let value = rewrite_references(&old.value, self.change);
            if value != old.value {
                store.set(key.row, key.col, CellSnapshot::new(value).with_format(old.format))?;
                self.rewritten.push((key, old.value));
            }
        }
        Ok(())
    }

    fn revert(&mut self, store: &mut CellStore) -> Result<()> {
        // Rewritten keys are post-change positions, so restore them first
        for (key, value) in self.rewritten.drain(..).rev() {
            let format = store.snapshot(key.row, key.col).format;
            store.set(key.row, key.col, CellSnapshot::new(value).with_format(format))?;
        }

        match self.change {
            StructuralChange::InsertRow(i) => {
                store.remove_row(i)?;
            }
            StructuralChange::InsertCol(i) => {
                store.remove_col(i)?;
            }
            StructuralChange::RemoveRow(i) => {
                store.restore_row(i, std::mem::take(&mut self.removed))?
            }
            StructuralChange::RemoveCol(i) => {
                store.restore_col(i, std::mem::take(&mut self.removed))?
            }
        }
        Ok(())
    }
}

/// A labelled group of commands
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Macro {
    pub label: String,
    pub commands: Vec<Command>,
}

impl Macro {
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            commands: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply every command in order; all or nothing
    fn apply(&mut self, store: &mut CellStore) -> Result<()> {
        for i in 0..self.commands.len() {
            if let Err(e) = self.commands[i].apply(store) {
                for done in self.commands[..i].iter_mut().rev() {
                    done.revert(store)?;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Revert every command in reverse order
    pub(crate) fn revert(&mut self, store: &mut CellStore) -> Result<()> {
        for command in self.commands.iter_mut().rev() {
            command.revert(store)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comment_sheet_core::{CellFormat, FontStyle};
    use pretty_assertions::assert_eq;

    fn store_with(values: &[(u32, u16, &str)]) -> CellStore {
        let mut store = CellStore::new(6, 4).unwrap();
        for &(row, col, value) in values {
            store.set(row, col, CellSnapshot::new(value)).unwrap();
        }
        store
    }

    #[test]
    fn test_cell_write_round_trip() {
        let mut store = store_with(&[(0, 0, "old")]);
        let before = store.to_table();
        let bold = CellFormat::new().with_font(FontStyle::new().with_bold(true));

        let mut cmd = Command::cell_write(
            0,
            0,
            CellSnapshot::new("old"),
            CellSnapshot::new("new").with_format(bold),
        );
        cmd.apply(&mut store).unwrap();
        assert_eq!(store.get(0, 0).value, "new");
        assert_eq!(store.get(0, 0).format, bold);

        cmd.revert(&mut store).unwrap();
        assert_eq!(store.to_table(), before);
    }

    #[test]
    fn test_insert_row_rewrites_formulas() {
        let mut store = store_with(&[(0, 0, "1"), (1, 0, "2"), (2, 0, "=SUM(A1:A2)")]);
        let before = store.to_table();

        let mut cmd = Command::structural(StructuralChange::InsertRow(0));
        cmd.apply(&mut store).unwrap();
        assert_eq!(store.get(0, 0).value, "");
        assert_eq!(store.get(3, 0).value, "=SUM(A2:A3)");

        cmd.revert(&mut store).unwrap();
        assert_eq!(store.to_table(), before);
    }

    #[test]
    fn test_remove_row_restores_ref_errors_exactly() {
        let mut store = store_with(&[(0, 0, "=A2+A3"), (1, 0, "5"), (2, 0, "6"), (1, 1, "x")]);
        let before = store.to_table();

        let mut cmd = Command::structural(StructuralChange::RemoveRow(1));
        cmd.apply(&mut store).unwrap();
        assert_eq!(store.get(0, 0).value, "=#REF!+A2");
        assert_eq!(store.get(1, 0).value, "6");
        assert_eq!(store.row_count(), 5);

        cmd.revert(&mut store).unwrap();
        assert_eq!(store.row_count(), 6);
        assert_eq!(store.to_table(), before);
    }

    #[test]
    fn test_remove_col_round_trip() {
        let mut store = store_with(&[(0, 0, "=C1*2"), (0, 1, "gone"), (0, 2, "4")]);
        let before = store.to_table();

        let mut cmd = Command::structural(StructuralChange::RemoveCol(1));
        cmd.apply(&mut store).unwrap();
        assert_eq!(store.get(0, 0).value, "=B1*2");
        assert_eq!(store.get(0, 1).value, "4");

        cmd.revert(&mut store).unwrap();
        assert_eq!(store.to_table(), before);
    }

    #[test]
    fn test_failed_structural_leaves_store_untouched() {
        let mut store = CellStore::new(1, 2).unwrap();
        store.set(0, 0, CellSnapshot::new("a")).unwrap();

        let mut cmd = Command::structural(StructuralChange::RemoveRow(0));
        assert!(cmd.apply(&mut store).is_err());
        assert_eq!(store.get(0, 0).value, "a");
    }

    #[test]
    fn test_macro_is_atomic() {
        let mut store = store_with(&[]);
        let mut cmd = Command::Macro(Macro {
            label: "two writes".into(),
            commands: vec![
                Command::cell_write(0, 0, CellSnapshot::default(), CellSnapshot::new("a")),
                Command::cell_write(99, 0, CellSnapshot::default(), CellSnapshot::new("b")),
            ],
        });

        assert!(cmd.apply(&mut store).is_err());
        assert_eq!(store.get(0, 0).value, "");
        assert_eq!(cmd.label(), "two writes");
    }

    #[test]
    fn test_macro_reverts_in_reverse_order() {
        let mut store = store_with(&[]);
        let mut cmd = Command::Macro(Macro {
            label: "insert then write".into(),
            commands: vec![
                Command::cell_write(0, 0, CellSnapshot::default(), CellSnapshot::new("a")),
                Command::structural(StructuralChange::InsertRow(0)),
                Command::cell_write(0, 0, CellSnapshot::default(), CellSnapshot::new("b")),
            ],
        });

        cmd.apply(&mut store).unwrap();
        assert_eq!(store.get(0, 0).value, "b");
        assert_eq!(store.get(1, 0).value, "a");

        cmd.revert(&mut store).unwrap();
        assert_eq!(store.to_table(), store_with(&[]).to_table());
        assert_eq!(store.row_count(), 6);
    }
}
