//! Full recalculation
//!
//! Every formula cell is re-evaluated in row-major order, its display text
//! rewritten and the dependency graph rebuilt from the reads made along the
//! way. Evaluation is recursive with a per-sweep memo, so one sweep is
//! normally enough. Reads that hit the depth cap use the stale display and
//! schedule another sweep; sweeps repeat until nothing is deferred, the
//! displays stop changing, or the sweep limit is reached.
//!
//! # Example
//!
//! ```rust
//! use comment_sheet::calculation::{recalculate, CalculationOptions};
//! use comment_sheet_core::{CellSnapshot, CellStore};
//! use comment_sheet_formula::DependencyGraph;
//!
//! let mut store = CellStore::new(10, 5).unwrap();
//! store.set(0, 0, CellSnapshot::new("10")).unwrap();
//! store.set(1, 0, CellSnapshot::new("20")).unwrap();
//! store.set(2, 0, CellSnapshot::new("=A1+A2")).unwrap();
//!
//! let mut graph = DependencyGraph::new();
//! let stats = recalculate(&mut store, &mut graph, &CalculationOptions::default());
//!
//! assert_eq!(store.get(2, 0).display, "30");
//! assert_eq!(stats.formula_count, 1);
//! assert!(stats.converged);
//! ```

use comment_sheet_core::{CellError, CellKey, CellStore};
use comment_sheet_formula::{
    DependencyGraph, Evaluator, FormulaValue, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NESTING,
};
use serde::{Deserialize, Serialize};

/// Options for recalculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationOptions {
    /// Maximum nesting of cell evaluation within one sweep (default: 256)
    pub max_depth: usize,
    /// Maximum syntactic nesting inside one formula (default: 64)
    pub max_nesting: usize,
    /// Maximum number of sweeps; `None` means `rows * cols + 2`
    pub max_sweeps: Option<usize>,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
            max_sweeps: None,
        }
    }
}

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells
    pub formula_count: usize,
    /// Number of sweeps performed
    pub sweeps: usize,
    /// Formula cells displaying an error marker
    pub errors: usize,
    /// Formula cells on a circular reference
    pub circular_references: usize,
    /// Whether the displays settled before the sweep limit
    pub converged: bool,
}

/// Re-evaluate every formula cell of `store`, rebuilding `graph`
pub fn recalculate(
    store: &mut CellStore,
    graph: &mut DependencyGraph,
    options: &CalculationOptions,
) -> CalculationStats {
    let keys = store.formula_keys();
    let mut stats = CalculationStats {
        formula_count: keys.len(),
        ..Default::default()
    };

    let max_sweeps = options
        .max_sweeps
        .unwrap_or_else(|| {
            (store.row_count() as usize)
                .saturating_mul(store.col_count() as usize)
                .saturating_add(2)
        })
        .max(1);

    loop {
        graph.clear();
        let (results, deferred) = {
            let mut evaluator = Evaluator::new(&*store, graph)
                .with_max_depth(options.max_depth)
                .with_max_nesting(options.max_nesting);
            let results: Vec<(CellKey, FormulaValue)> = keys
                .iter()
                .map(|&key| (key, evaluator.evaluate_cell(key.row, key.col)))
                .collect();
            let deferred = evaluator.deferred();
            (results, deferred)
        };
        stats.sweeps += 1;

        let mut changed = false;
        for (key, value) in &results {
            changed |= store.set_display(key.row, key.col, value.to_display());
        }

        let done = if !deferred || !changed {
            stats.converged = true;
            true
        } else if stats.sweeps >= max_sweeps {
            log::warn!(
                "recalc stopped after {} sweeps with deferred reads still changing",
                stats.sweeps
            );
            true
        } else {
            false
        };

        if done {
            tally(&results, graph, &mut stats);
            break;
        }
    }

    log::debug!(
        "recalculated {} formulas in {} sweep(s): {} errors, {} circular",
        stats.formula_count,
        stats.sweeps,
        stats.errors,
        stats.circular_references
    );
    stats
}

fn tally(
    results: &[(CellKey, FormulaValue)],
    graph: &DependencyGraph,
    stats: &mut CalculationStats,
) {
    for (key, value) in results {
        match value {
            FormulaValue::Error(CellError::Ref) => {
                stats.errors += 1;
                if graph.has_circular_reference(*key) {
                    stats.circular_references += 1;
                }
            }
            FormulaValue::Error(_) => stats.errors += 1,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comment_sheet_core::CellSnapshot;

    fn store_with(values: &[(u32, u16, &str)]) -> CellStore {
        let mut store = CellStore::new(20, 5).unwrap();
        for &(row, col, value) in values {
            store.set(row, col, CellSnapshot::new(value)).unwrap();
        }
        store
    }

    #[test]
    fn test_empty_sheet() {
        let mut store = store_with(&[]);
        let mut graph = DependencyGraph::new();
        let stats = recalculate(&mut store, &mut graph, &CalculationOptions::default());
        assert_eq!(stats.formula_count, 0);
        assert_eq!(stats.sweeps, 1);
        assert!(stats.converged);
    }

    #[test]
    fn test_graph_is_rebuilt() {
        let mut store = store_with(&[(0, 0, "=B1"), (0, 1, "5")]);
        let mut graph = DependencyGraph::new();
        graph.add_precedent(CellKey::new(9, 0), CellKey::new(9, 1));

        recalculate(&mut store, &mut graph, &CalculationOptions::default());

        assert_eq!(store.get(0, 0).display, "5");
        assert_eq!(graph.precedents_of(CellKey::new(0, 0)), vec![CellKey::new(0, 1)]);
        assert!(graph.precedents_of(CellKey::new(9, 0)).is_empty());
    }

    #[test]
    fn test_cycles_are_counted() {
        let mut store = store_with(&[(0, 0, "=B1"), (0, 1, "=A1"), (1, 0, "=1/0")]);
        let mut graph = DependencyGraph::new();
        let stats = recalculate(&mut store, &mut graph, &CalculationOptions::default());

        assert_eq!(store.get(0, 0).display, "#REF!");
        assert_eq!(store.get(0, 1).display, "#REF!");
        assert_eq!(stats.errors, 3);
        assert_eq!(stats.circular_references, 2);
    }

    #[test]
    fn test_deep_chain_settles_over_sweeps() {
        // A1 = A2 + 1, A2 = A3 + 1, ..., A10 = 1
        let mut values: Vec<(u32, u16, String)> = (0..9)
            .map(|row| (row, 0, format!("=A{}+1", row + 2)))
            .collect();
        values.push((9, 0, "1".to_string()));
        let mut store = CellStore::new(20, 5).unwrap();
        for (row, col, value) in values {
            store.set(row, col, CellSnapshot::new(value)).unwrap();
        }

        let mut graph = DependencyGraph::new();
        let options = CalculationOptions {
            max_depth: 4,
            max_sweeps: None,
            ..Default::default()
        };
        let stats = recalculate(&mut store, &mut graph, &options);

        assert_eq!(store.get(0, 0).display, "10");
        assert!(stats.sweeps > 1);
        assert!(stats.converged);
    }

    #[test]
    fn test_sweep_limit() {
        let mut values: Vec<(u32, u16, String)> = (0..9)
            .map(|row| (row, 0, format!("=A{}+1", row + 2)))
            .collect();
        values.push((9, 0, "1".to_string()));
        let mut store = CellStore::new(20, 5).unwrap();
        for (row, col, value) in values {
            store.set(row, col, CellSnapshot::new(value)).unwrap();
        }

        let mut graph = DependencyGraph::new();
        let options = CalculationOptions {
            max_depth: 2,
            max_sweeps: Some(1),
            ..Default::default()
        };
        let stats = recalculate(&mut store, &mut graph, &options);

        assert_eq!(stats.sweeps, 1);
        assert!(!stats.converged);
        assert_ne!(store.get(0, 0).display, "10");
    }
}
