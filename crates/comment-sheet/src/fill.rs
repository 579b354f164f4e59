//! Fill-drag
//!
//! Extends a selected source rectangle downward or rightward. The source
//! repeats cyclically over the target; for the i-th target line:
//!
//! - formulas get their relative references moved by the distance from the
//!   source cell (anchored axes stay put),
//! - values ending in an integer get that integer increased by i,
//! - everything else is copied.
//!
//! Formatting is copied verbatim.

use crate::batch::Mutation;
use comment_sheet_core::{is_formula, CellRange, CellSnapshot};
use comment_sheet_formula::offset_references;
use lazy_regex::regex_captures;

/// Direction of a fill-drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillDirection {
    /// Extend below the source, up to an end row
    Down,
    /// Extend right of the source, up to an end column
    Right,
}

/// Raw value for the `step`-th (1-based) target of a fill from `source`
///
/// `drow`/`dcol` is the distance from the source cell to the target cell.
///
/// ```rust
/// use comment_sheet::fill::fill_value;
///
/// assert_eq!(fill_value("=A1+$B$1", 1, 1, 0), "=A2+$B$1");
/// assert_eq!(fill_value("Item 9", 2, 2, 0), "Item 11");
/// assert_eq!(fill_value("total", 3, 3, 0), "total");
/// ```
pub fn fill_value(source: &str, step: u32, drow: i64, dcol: i64) -> String {
    if is_formula(source) {
        return offset_references(source, drow, dcol);
    }
    if let Some((_, prefix, digits)) = regex_captures!(r"^(.*?)([0-9]+)$", source) {
        // Integers too long for u128 are copied
        if let Some(next) = digits
            .parse::<u128>()
            .ok()
            .and_then(|n| n.checked_add(u128::from(step)))
        {
            return format!("{}{}", prefix, next);
        }
    }
    source.to_string()
}

/// A fill from a source rectangle to an end row or column
#[derive(Debug, Clone)]
pub(crate) struct FillPlan {
    pub source: CellRange,
    /// Source snapshots, rows then columns
    pub cells: Vec<Vec<CellSnapshot>>,
    pub direction: FillDirection,
    /// Last target row (Down) or column (Right)
    pub end: u32,
}

impl FillPlan {
    fn write(&self, source_row: u32, source_col: u16, row: u32, col: u16, step: u32) -> Mutation {
        let template = &self.cells[(source_row - self.source.start.row) as usize]
            [(source_col - self.source.start.col) as usize];
        let value = fill_value(
            &template.value,
            step,
            row as i64 - source_row as i64,
            col as i64 - source_col as i64,
        );
        Mutation::Cell {
            row,
            col,
            snapshot: CellSnapshot::new(value).with_format(template.format),
        }
    }

    /// Number of cells the fill writes
    pub fn len(&self) -> usize {
        let start = &self.source.start;
        let end = &self.source.end;
        match self.direction {
            FillDirection::Down => {
                self.end.saturating_sub(end.row) as usize * self.source.col_count() as usize
            }
            FillDirection::Right => {
                self.end.saturating_sub(end.col as u32) as usize
                    * (end.row - start.row + 1) as usize
            }
        }
    }

    /// The writes, one row of the sheet per item
    pub fn into_rows(self) -> Box<dyn Iterator<Item = Vec<Mutation>> + Send> {
        let CellRange { start, end } = self.source;
        match self.direction {
            FillDirection::Down => {
                let height = end.row - start.row + 1;
                Box::new((end.row.saturating_add(1)..=self.end).map(move |row| {
                    let step = row - end.row;
                    let source_row = start.row + (step - 1) % height;
                    (start.col..=end.col)
                        .map(|col| self.write(source_row, col, row, col, step))
                        .collect::<Vec<_>>()
                }))
            }
            FillDirection::Right => {
                let width = (end.col - start.col + 1) as u32;
                let first = end.col as u32 + 1;
                Box::new((start.row..=end.row).map(move |row| {
                    (first..=self.end)
                        .map(|col| {
                            let step = col - end.col as u32;
                            let source_col = start.col + ((step - 1) % width) as u16;
                            self.write(row, source_col, row, col as u16, step)
                        })
                        .collect::<Vec<_>>()
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(plan: FillPlan) -> Vec<Vec<(u32, u16, String)>> {
        plan.into_rows()
            .map(|row| {
                row.into_iter()
                    .map(|m| match m {
                        Mutation::Cell { row, col, snapshot } => (row, col, snapshot.value),
                        other => panic!("unexpected mutation {:?}", other),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_trailing_integer() {
        assert_eq!(fill_value("7", 1, 1, 0), "8");
        assert_eq!(fill_value("row007", 1, 1, 0), "row8");
        assert_eq!(fill_value("-5", 2, 2, 0), "-7");
        assert_eq!(fill_value("1.5", 1, 1, 0), "1.6");
        assert_eq!(fill_value("", 1, 1, 0), "");
        assert_eq!(fill_value("5 apples", 1, 1, 0), "5 apples");
    }

    #[test]
    fn test_formula_offsets() {
        assert_eq!(fill_value("=A$1*2", 1, 1, 0), "=A$1*2");
        assert_eq!(fill_value("=SUM(A1:B1)", 2, 0, 2), "=SUM(C1:D1)");
        assert_eq!(fill_value("=A1", 1, -1, 0), "=#REF!");
    }

    #[test]
    fn test_fill_down_cycles_source() {
        let plan = FillPlan {
            source: CellRange::from_indices(0, 0, 1, 0),
            cells: vec![vec![CellSnapshot::new("a1")], vec![CellSnapshot::new("=B1")]],
            direction: FillDirection::Down,
            end: 4,
        };
        assert_eq!(plan.len(), 3);
        assert_eq!(
            values(plan),
            vec![
                vec![(2, 0, "a2".to_string())],
                vec![(3, 0, "=B3".to_string())],
                vec![(4, 0, "a4".to_string())],
            ]
        );
    }

    #[test]
    fn test_fill_right() {
        let plan = FillPlan {
            source: CellRange::from_indices(0, 0, 1, 0),
            cells: vec![vec![CellSnapshot::new("=A$2")], vec![CellSnapshot::new("x")]],
            direction: FillDirection::Right,
            end: 2,
        };
        assert_eq!(plan.len(), 4);
        assert_eq!(
            values(plan),
            vec![
                vec![(0, 1, "=B$2".to_string()), (0, 2, "=C$2".to_string())],
                vec![(1, 1, "x".to_string()), (1, 2, "x".to_string())],
            ]
        );
    }

    #[test]
    fn test_end_inside_source_writes_nothing() {
        let plan = FillPlan {
            source: CellRange::from_indices(0, 0, 3, 0),
            cells: vec![vec![CellSnapshot::new("1")]; 4],
            direction: FillDirection::Down,
            end: 2,
        };
        assert_eq!(plan.len(), 0);
        assert_eq!(plan.into_rows().count(), 0);
    }
}
