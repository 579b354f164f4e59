//! Reference rewriting for structural edits and fill-drag
//!
//! Rewriting works on formula text, not on the AST, so that everything
//! except the affected references is preserved byte for byte. References are
//! located with [`scan_references`]; only the spans whose meaning changes are
//! replaced. Anchored (`$`) axes are never shifted and never invalidated.

use crate::lexer::{scan_references, ReferenceKind};
use comment_sheet_core::{CellAddress, CellError, CellRange};

/// A whole-row or whole-column insertion or removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralChange {
    InsertRow(u32),
    RemoveRow(u32),
    InsertCol(u16),
    RemoveCol(u16),
}

impl StructuralChange {
    /// The change that undoes this one
    pub fn inverse(self) -> Self {
        match self {
            StructuralChange::InsertRow(i) => StructuralChange::RemoveRow(i),
            StructuralChange::RemoveRow(i) => StructuralChange::InsertRow(i),
            StructuralChange::InsertCol(i) => StructuralChange::RemoveCol(i),
            StructuralChange::RemoveCol(i) => StructuralChange::InsertCol(i),
        }
    }

    /// Whether this change affects rows
    pub fn is_row(&self) -> bool {
        matches!(
            self,
            StructuralChange::InsertRow(_) | StructuralChange::RemoveRow(_)
        )
    }

    /// Whether this change inserts
    pub fn is_insert(&self) -> bool {
        matches!(
            self,
            StructuralChange::InsertRow(_) | StructuralChange::InsertCol(_)
        )
    }

    /// The row or column index the change happens at
    pub fn index(&self) -> u32 {
        match *self {
            StructuralChange::InsertRow(i) | StructuralChange::RemoveRow(i) => i,
            StructuralChange::InsertCol(i) | StructuralChange::RemoveCol(i) => i as u32,
        }
    }
}

/// Replace references for which `f` returns new text
fn replace_references(text: &str, mut f: impl FnMut(ReferenceKind) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for token in scan_references(text) {
        if let Some(replacement) = f(token.kind) {
            out.push_str(&text[last..token.span.start]);
            out.push_str(&replacement);
            last = token.span.end;
        }
    }

    out.push_str(&text[last..]);
    out
}

fn ref_error() -> String {
    CellError::Ref.as_str().to_string()
}

/// Shift one relative index; `None` when the referenced line was removed
fn shift_index(index: u32, at: u32, insert: bool) -> Option<u32> {
    if insert {
        Some(if index >= at { index.saturating_add(1) } else { index })
    } else if index == at {
        None
    } else if index > at {
        Some(index - 1)
    } else {
        Some(index)
    }
}

/// Shift the (start, end) span of a range along one axis
///
/// Losing an edge line shrinks the range; losing every line invalidates it.
fn shift_span(
    (start, start_abs): (u32, bool),
    (end, end_abs): (u32, bool),
    at: u32,
    insert: bool,
) -> Option<(u32, u32)> {
    if insert {
        let start = if !start_abs && start >= at { start.saturating_add(1) } else { start };
        let end = if !end_abs && end >= at { end.saturating_add(1) } else { end };
        return Some((start, end));
    }

    let start = if !start_abs && start > at { start - 1 } else { start };
    let end = if !end_abs && end >= at {
        end.checked_sub(1)?
    } else {
        end
    };

    if start > end {
        None
    } else {
        Some((start, end))
    }
}

fn shift_cell(addr: CellAddress, change: StructuralChange) -> Option<CellAddress> {
    let at = change.index();
    let insert = change.is_insert();
    let mut out = addr;

    if change.is_row() {
        if !addr.row_absolute {
            out.row = shift_index(addr.row, at, insert)?;
        }
    } else if !addr.col_absolute {
        out.col = u16::try_from(shift_index(addr.col as u32, at, insert)?).ok()?;
    }
    Some(out)
}

fn shift_range(range: CellRange, change: StructuralChange) -> Option<CellRange> {
    let at = change.index();
    let insert = change.is_insert();
    let (mut start, mut end) = (range.start, range.end);

    if change.is_row() {
        let (s, e) = shift_span(
            (start.row, start.row_absolute),
            (end.row, end.row_absolute),
            at,
            insert,
        )?;
        start.row = s;
        end.row = e;
    } else {
        let (s, e) = shift_span(
            (start.col as u32, start.col_absolute),
            (end.col as u32, end.col_absolute),
            at,
            insert,
        )?;
        start.col = u16::try_from(s).ok()?;
        end.col = u16::try_from(e).ok()?;
    }
    Some(CellRange { start, end })
}

/// Rewrite the references of a formula for a structural change
///
/// # Example
/// ```rust
/// use comment_sheet_formula::rewrite::{rewrite_references, StructuralChange};
///
/// let f = rewrite_references("=SUM(A1:A2)+$B$1", StructuralChange::InsertRow(0));
/// assert_eq!(f, "=SUM(A2:A3)+$B$1");
///
/// let f = rewrite_references("=A2*2", StructuralChange::RemoveRow(1));
/// assert_eq!(f, "=#REF!*2");
/// ```
pub fn rewrite_references(formula: &str, change: StructuralChange) -> String {
    replace_references(formula, |kind| match kind {
        ReferenceKind::Cell(addr) => match shift_cell(addr, change) {
            Some(new) if new == addr => None,
            Some(new) => Some(new.to_a1_string()),
            None => Some(ref_error()),
        },
        ReferenceKind::Range(a, b) => {
            let range = CellRange::new(a, b);
            match shift_range(range, change) {
                Some(new) if new == range => None,
                Some(new) => Some(new.to_a1_string()),
                None => Some(ref_error()),
            }
        }
    })
}

fn offset_axis(index: u32, delta: i64, max: i64) -> Option<u32> {
    let shifted = index as i64 + delta;
    if (0..=max).contains(&shifted) {
        Some(shifted as u32)
    } else {
        None
    }
}

fn offset_cell(addr: CellAddress, drow: i64, dcol: i64) -> Option<CellAddress> {
    let mut out = addr;
    if !addr.row_absolute {
        out.row = offset_axis(addr.row, drow, u32::MAX as i64)?;
    }
    if !addr.col_absolute {
        out.col = offset_axis(addr.col as u32, dcol, u16::MAX as i64)? as u16;
    }
    Some(out)
}

/// Move every relative reference of a formula by (drow, dcol)
///
/// References that would leave the sheet's top or left edge become `#REF!`.
///
/// # Example
/// ```rust
/// use comment_sheet_formula::rewrite::offset_references;
///
/// assert_eq!(offset_references("=A1+$A$1+A$1", 2, 1), "=B3+$A$1+B$1");
/// assert_eq!(offset_references("=A1", -1, 0), "=#REF!");
/// ```
pub fn offset_references(formula: &str, drow: i64, dcol: i64) -> String {
    replace_references(formula, |kind| {
        let replacement = match kind {
            ReferenceKind::Cell(addr) => {
                let new = offset_cell(addr, drow, dcol);
                if new == Some(addr) {
                    return None;
                }
                new.map(|a| a.to_a1_string())
            }
            ReferenceKind::Range(a, b) => {
                let range = CellRange::new(a, b);
                let new = offset_cell(range.start, drow, dcol)
                    .zip(offset_cell(range.end, drow, dcol))
                    .map(|(start, end)| CellRange { start, end });
                if new == Some(range) {
                    return None;
                }
                new.map(|r| r.to_a1_string())
            }
        };
        Some(replacement.unwrap_or_else(ref_error))
    })
}
