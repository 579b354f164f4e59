//! Dependency tracking for formula calculation

use ahash::{AHashMap, AHashSet};
use comment_sheet_core::CellKey;
use std::collections::VecDeque;

/// Dependency graph for formula cells
///
/// Records, for every formula cell, the cells its last evaluation read.
/// Rebuilt from scratch on every full recalc.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell → Cells it depends on (precedents)
    precedents: AHashMap<CellKey, AHashSet<CellKey>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency: dependent reads precedent
    pub fn add_precedent(&mut self, dependent: CellKey, precedent: CellKey) {
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Cells the given cell reads directly, in row-major order
    pub fn precedents_of(&self, cell: CellKey) -> Vec<CellKey> {
        let mut cells: Vec<CellKey> = self
            .precedents
            .get(&cell)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        cells.sort();
        cells
    }

    /// Cells that read the given cell directly, in row-major order
    pub fn dependents_of(&self, cell: CellKey) -> Vec<CellKey> {
        let mut cells: Vec<CellKey> = self
            .precedents
            .iter()
            .filter(|(_, precs)| precs.contains(&cell))
            .map(|(dependent, _)| *dependent)
            .collect();
        cells.sort();
        cells
    }

    /// Every cell the given cell reads, directly or through other formulas
    ///
    /// Breadth-first: direct precedents come first. The start cell is only
    /// included when it sits on a cycle.
    pub fn trace_precedents(&self, cell: CellKey) -> Vec<CellKey> {
        let mut result = Vec::new();
        let mut visited = AHashSet::new();
        let mut queue = VecDeque::from([cell]);

        while let Some(current) = queue.pop_front() {
            for precedent in self.precedents_of(current) {
                if visited.insert(precedent) {
                    result.push(precedent);
                    queue.push_back(precedent);
                }
            }
        }

        result
    }

    /// Detect circular references involving a cell
    pub fn has_circular_reference(&self, cell: CellKey) -> bool {
        let mut visited = AHashSet::new();
        let mut in_stack = AHashSet::new();
        self.detect_cycle(cell, &mut visited, &mut in_stack)
    }

    fn detect_cycle(
        &self,
        cell: CellKey,
        visited: &mut AHashSet<CellKey>,
        in_stack: &mut AHashSet<CellKey>,
    ) -> bool {
        if in_stack.contains(&cell) {
            return true;
        }
        if visited.contains(&cell) {
            return false;
        }

        visited.insert(cell);
        in_stack.insert(cell);

        if let Some(precedents) = self.precedents.get(&cell) {
            for &precedent in precedents {
                if self.detect_cycle(precedent, visited, in_stack) {
                    return true;
                }
            }
        }

        in_stack.remove(&cell);
        false
    }

    /// Number of cells with recorded precedents
    pub fn len(&self) -> usize {
        self.precedents.len()
    }

    /// Whether no dependencies are recorded
    pub fn is_empty(&self) -> bool {
        self.precedents.is_empty()
    }

    /// Total number of recorded edges
    pub fn edge_count(&self) -> usize {
        self.precedents.values().map(|set| set.len()).sum()
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.precedents.clear();
    }
}
