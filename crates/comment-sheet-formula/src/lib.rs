//! # comment-sheet-formula
//!
//! Formula engine for comment tables.
//!
//! This crate provides:
//! - Tokenizing and parsing (text → AST)
//! - Evaluation against a [`CellSource`] with cycle detection
//! - The built-in function registry
//! - Dependency tracking for precedent tracing
//! - Reference rewriting for row/column edits and fill-drag
//!
//! ## Example
//!
//! ```rust
//! use comment_sheet_core::{CellSnapshot, CellStore};
//! use comment_sheet_formula::{DependencyGraph, Evaluator, FormulaValue};
//!
//! let mut store = CellStore::new(10, 5).unwrap();
//! store.set(0, 0, CellSnapshot::new("2")).unwrap();
//! store.set(1, 0, CellSnapshot::new("=A1*21")).unwrap();
//!
//! let mut graph = DependencyGraph::new();
//! let mut evaluator = Evaluator::new(&store, &mut graph);
//! assert_eq!(evaluator.evaluate_cell(1, 0), FormulaValue::Number(42.0));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod rewrite;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use dependency::DependencyGraph;
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{
    compare_values, format_number, CellSource, EvaluationContext, Evaluator, FormulaValue,
    DEFAULT_MAX_DEPTH,
};
pub use functions::{registry, FunctionRegistry};
pub use parser::{parse_formula, parse_formula_with_nesting, DEFAULT_MAX_NESTING};
pub use rewrite::{offset_references, rewrite_references, StructuralChange};
