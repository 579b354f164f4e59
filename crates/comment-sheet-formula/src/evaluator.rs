//! Formula evaluator
//!
//! Evaluates formula ASTs against a [`CellSource`], recording every cell read
//! into a [`DependencyGraph`].
//!
//! Cells are evaluated recursively on demand. Within one evaluator (one recalc
//! sweep) every formula cell is computed at most once; later reads hit the
//! memo. A set of in-progress cells guards against cycles: re-entering a cell
//! that is still being evaluated aborts that branch, and every cell on the
//! cycle displays `#REF!`. Recursion is capped; a read past the cap falls back
//! to the display computed by the previous sweep and flags the sweep as
//! deferred so the caller can run another one.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::dependency::DependencyGraph;
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{registry, ArgMode, FunctionKind, SpecialForm};
use crate::parser::{parse_formula_with_nesting, DEFAULT_MAX_NESTING};
use ahash::{AHashMap, AHashSet};
use comment_sheet_core::{is_formula, CellAddress, CellError, CellKey, CellRange, CellStore};
use std::cmp::Ordering;

/// Default cap on nested cell evaluation
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

/// Parse text as a finite decimal number
///
/// Rejects the words Rust's float parser accepts (`inf`, `NaN`).
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty()
        || !s.bytes().any(|b| b.is_ascii_digit())
        || !s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format a number for display: integers without decimals, others to 2 places
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        CellError::Num.as_str().to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{:.2}", n)
    }
}

impl FormulaValue {
    /// Interpret the raw text of a non-formula cell
    pub fn from_literal(raw: &str) -> Self {
        if raw.is_empty() {
            FormulaValue::Empty
        } else if let Some(n) = parse_number(raw) {
            FormulaValue::Number(n)
        } else {
            FormulaValue::String(raw.to_string())
        }
    }

    /// Interpret a previously computed display string
    pub fn from_display(display: &str) -> Self {
        match CellError::from_str(display) {
            Some(e) => FormulaValue::Error(e),
            None => match display {
                "TRUE" => FormulaValue::Boolean(true),
                "FALSE" => FormulaValue::Boolean(false),
                _ => Self::from_literal(display),
            },
        }
    }

    /// Convert to number, if possible
    ///
    /// Text must parse as a number; errors and multi-cell arrays do not
    /// convert.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(true) => Some(1.0),
            FormulaValue::Boolean(false) => Some(0.0),
            FormulaValue::String(s) => parse_number(s),
            FormulaValue::Empty => Some(0.0),
            FormulaValue::Array(_) => self.single().and_then(|v| v.as_number()),
            FormulaValue::Error(_) => None,
        }
    }

    /// Coerce to number for arithmetic
    ///
    /// Unparseable text and error values become 0. Only a multi-cell array
    /// fails.
    pub fn coerce_number(&self) -> FormulaResult<f64> {
        match self {
            FormulaValue::Array(rows) => match self.single() {
                Some(v) => v.coerce_number(),
                None if rows.is_empty() => Ok(0.0),
                None => Err(FormulaError::Evaluation(
                    "Cannot use a multi-cell range as a number".into(),
                )),
            },
            FormulaValue::Error(_) => Ok(0.0),
            other => Ok(other.as_number().unwrap_or(0.0)),
        }
    }

    /// Convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::Empty => Some(false),
            FormulaValue::String(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            FormulaValue::Array(_) => self.single().and_then(|v| v.as_bool()),
            FormulaValue::Error(_) => None,
        }
    }

    /// Convert to text for text functions
    pub fn as_text(&self) -> String {
        match self {
            FormulaValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => self.single().map(|v| v.as_text()).unwrap_or_default(),
        }
    }

    /// Render as a cell's display text
    pub fn to_display(&self) -> String {
        match self {
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.as_str().to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => match self.single() {
                Some(v) => v.to_display(),
                None => CellError::Error.as_str().to_string(),
            },
        }
    }

    /// The only element of a 1x1 array
    pub fn single(&self) -> Option<&FormulaValue> {
        match self {
            FormulaValue::Array(rows) if rows.len() == 1 && rows[0].len() == 1 => {
                Some(&rows[0][0])
            }
            FormulaValue::Array(_) => None,
            other => Some(other),
        }
    }

    /// Unwrap 1x1 arrays; multi-cell arrays become `#ERROR`
    pub fn into_scalar(self) -> FormulaValue {
        match self {
            FormulaValue::Array(mut rows) => {
                if rows.len() == 1 && rows[0].len() == 1 {
                    rows.remove(0).remove(0)
                } else {
                    FormulaValue::Error(CellError::Error)
                }
            }
            other => other,
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Iterate over the values of a list of arguments, flattening ranges one level
    pub fn flatten(args: &[FormulaValue]) -> impl Iterator<Item = &FormulaValue> {
        args.iter().flat_map(|arg| {
            let (rows, scalar): (&[Vec<FormulaValue>], Option<&FormulaValue>) = match arg {
                FormulaValue::Array(rows) => (rows.as_slice(), None),
                other => (&[], Some(other)),
            };
            rows.iter().flatten().chain(scalar)
        })
    }
}

/// Compare two values
///
/// Text against text compares case-insensitively. Anything else compares
/// numerically; `None` when either side does not convert.
pub fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Option<Ordering> {
    let left = left.single()?;
    let right = right.single()?;

    match (left, right) {
        (FormulaValue::String(l), FormulaValue::String(r)) => {
            Some(l.to_lowercase().cmp(&r.to_lowercase()))
        }
        (FormulaValue::Empty, FormulaValue::String(r)) => Some("".cmp(r.as_str())),
        (FormulaValue::String(l), FormulaValue::Empty) => Some(l.as_str().cmp("")),
        _ => {
            let l = left.as_number()?;
            let r = right.as_number()?;
            l.partial_cmp(&r)
        }
    }
}

/// Context handed to function implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluationContext {
    /// Row of the cell being evaluated
    pub current_row: u32,
    /// Column of the cell being evaluated
    pub current_col: u16,
}

impl EvaluationContext {
    /// Create a new evaluation context
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            current_row: row,
            current_col: col,
        }
    }
}

/// Read access to the cells a formula may reference
pub trait CellSource {
    /// Number of rows in the sheet
    fn row_count(&self) -> u32;
    /// Number of columns in the sheet
    fn col_count(&self) -> u16;
    /// Raw value of a cell (empty when blank)
    fn value(&self, row: u32, col: u16) -> &str;
    /// Display text left by the previous recalc
    fn display(&self, row: u32, col: u16) -> &str;
}

impl CellSource for CellStore {
    fn row_count(&self) -> u32 {
        CellStore::row_count(self)
    }

    fn col_count(&self) -> u16 {
        CellStore::col_count(self)
    }

    fn value(&self, row: u32, col: u16) -> &str {
        self.cell(row, col).map_or("", |c| c.value.as_str())
    }

    fn display(&self, row: u32, col: u16) -> &str {
        self.cell(row, col).map_or("", |c| c.display.as_str())
    }
}

/// Evaluates the formula cells of one sheet
pub struct Evaluator<'a, S: CellSource + ?Sized> {
    source: &'a S,
    graph: &'a mut DependencyGraph,
    max_depth: usize,
    max_nesting: usize,
    /// Per-sweep memo of computed formula cells
    results: AHashMap<CellKey, FormulaValue>,
    in_progress: AHashSet<CellKey>,
    /// Cells currently being evaluated, outermost first
    stack: Vec<CellKey>,
    /// Cells found to sit on a cycle
    cyclic: AHashSet<CellKey>,
    deferred: bool,
}

impl<'a, S: CellSource + ?Sized> Evaluator<'a, S> {
    /// Create an evaluator recording reads into `graph`
    pub fn new(source: &'a S, graph: &'a mut DependencyGraph) -> Self {
        Self {
            source,
            graph,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
            results: AHashMap::new(),
            in_progress: AHashSet::new(),
            stack: Vec::new(),
            cyclic: AHashSet::new(),
            deferred: false,
        }
    }

    /// Set the cap on nested cell evaluation (at least 1)
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Set the cap on syntactic nesting inside one formula (at least 1)
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting.max(1);
        self
    }

    /// Whether some read hit the depth cap and used a stale display
    pub fn deferred(&self) -> bool {
        self.deferred
    }

    /// Evaluate the cell at (row, col)
    ///
    /// Literal cells evaluate to their interpreted raw value.
    pub fn evaluate_cell(&mut self, row: u32, col: u16) -> FormulaValue {
        self.compute_cell(CellKey::new(row, col))
            .unwrap_or_else(|e| FormulaValue::Error(e.cell_error()))
    }

    /// Evaluate formula text as if it were stored at (row, col)
    ///
    /// Nothing is memoized for the target cell.
    pub fn evaluate_formula(&mut self, formula: &str, row: u32, col: u16) -> FormulaValue {
        let key = CellKey::new(row, col);
        if self.in_progress.contains(&key) {
            return FormulaValue::Error(CellError::Ref);
        }

        self.in_progress.insert(key);
        self.stack.push(key);
        let result = parse_formula_with_nesting(formula, self.max_nesting)
            .and_then(|expr| self.eval_expr(&expr));
        self.stack.pop();
        self.in_progress.remove(&key);

        if self.cyclic.remove(&key) {
            return FormulaValue::Error(CellError::Ref);
        }
        match result {
            Ok(v) => v.into_scalar(),
            Err(e) => FormulaValue::Error(e.cell_error()),
        }
    }

    fn compute_cell(&mut self, key: CellKey) -> FormulaResult<FormulaValue> {
        if let Some(v) = self.results.get(&key) {
            return Ok(v.clone());
        }

        let source = self.source;
        let raw = source.value(key.row, key.col);
        if !is_formula(raw) {
            return Ok(FormulaValue::from_literal(raw));
        }

        if self.in_progress.contains(&key) {
            // Everything from the re-entered cell to the top of the stack is on the cycle
            if let Some(pos) = self.stack.iter().position(|k| *k == key) {
                self.cyclic.extend(self.stack[pos..].iter().copied());
            }
            log::trace!("circular reference re-entering {}", key);
            return Err(FormulaError::CircularReference);
        }

        if self.stack.len() >= self.max_depth {
            self.deferred = true;
            return Ok(FormulaValue::from_display(source.display(key.row, key.col)));
        }

        self.in_progress.insert(key);
        self.stack.push(key);
        let result = parse_formula_with_nesting(raw, self.max_nesting)
            .and_then(|expr| self.eval_expr(&expr));
        self.stack.pop();
        self.in_progress.remove(&key);

        let value = if self.cyclic.remove(&key) {
            FormulaValue::Error(CellError::Ref)
        } else {
            match result {
                Ok(v) => v.into_scalar(),
                Err(e) => FormulaValue::Error(e.cell_error()),
            }
        };

        self.results.insert(key, value.clone());
        Ok(value)
    }

    fn context(&self) -> EvaluationContext {
        self.stack
            .last()
            .map(|k| EvaluationContext::new(k.row, k.col))
            .unwrap_or_default()
    }

    fn check_in_bounds(&self, addr: &CellAddress) -> FormulaResult<()> {
        if addr.row >= self.source.row_count() || addr.col >= self.source.col_count() {
            return Err(FormulaError::InvalidReference(addr.to_a1_string()));
        }
        Ok(())
    }

    fn read_reference(&mut self, addr: &CellAddress) -> FormulaResult<FormulaValue> {
        self.check_in_bounds(addr)?;
        let key = addr.key();
        if let Some(&current) = self.stack.last() {
            self.graph.add_precedent(current, key);
        }
        self.compute_cell(key)
    }

    fn read_range(&mut self, range: &CellRange) -> FormulaResult<FormulaValue> {
        self.check_in_bounds(&range.start)?;
        self.check_in_bounds(&range.end)?;

        let mut rows = Vec::with_capacity(range.row_count() as usize);
        for row in range.start.row..=range.end.row {
            let mut values = Vec::with_capacity(range.col_count() as usize);
            for col in range.start.col..=range.end.col {
                values.push(self.read_reference(&CellAddress::new(row, col))?);
            }
            rows.push(values);
        }
        Ok(FormulaValue::Array(rows))
    }

    /// Evaluate an expression in the context of the cell on top of the stack
    pub fn eval_expr(&mut self, expr: &FormulaExpr) -> FormulaResult<FormulaValue> {
        match expr {
            // === Literals ===
            FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
            FormulaExpr::String(s) => Ok(FormulaValue::String(s.clone())),
            // A dangling reference fails the whole formula
            FormulaExpr::Error(e) => Err(FormulaError::from_cell_error(*e)),
            FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),

            // === References ===
            FormulaExpr::CellRef(addr) => self.read_reference(addr),
            FormulaExpr::RangeRef(range) => self.read_range(range),
            FormulaExpr::Name(name) => Err(FormulaError::UnknownName(name.clone())),

            // === Operators ===
            FormulaExpr::BinaryOp { op, left, right } => self.eval_binary_op(*op, left, right),
            FormulaExpr::UnaryOp { op, operand } => {
                let n = self.eval_expr(operand)?.coerce_number()?;
                Ok(FormulaValue::Number(match op {
                    UnaryOperator::Plus => n,
                    UnaryOperator::Negate => -n,
                }))
            }

            // === Functions ===
            FormulaExpr::Function { name, args } => self.eval_function(name, args),
        }
    }

    fn eval_binary_op(
        &mut self,
        op: BinaryOperator,
        left: &FormulaExpr,
        right: &FormulaExpr,
    ) -> FormulaResult<FormulaValue> {
        let left_val = self.eval_expr(left)?;
        let right_val = self.eval_expr(right)?;

        if op.is_comparison() {
            let result = compare_values(&left_val, &right_val).map_or(false, |ord| match op {
                BinaryOperator::Equal => ord == Ordering::Equal,
                BinaryOperator::NotEqual => ord != Ordering::Equal,
                BinaryOperator::LessThan => ord == Ordering::Less,
                BinaryOperator::LessEqual => ord != Ordering::Greater,
                BinaryOperator::GreaterThan => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            });
            return Ok(FormulaValue::Boolean(result));
        }

        let l = left_val.coerce_number()?;
        let r = right_val.coerce_number()?;

        let result = match op {
            BinaryOperator::Add => l + r,
            BinaryOperator::Subtract => l - r,
            BinaryOperator::Multiply => l * r,
            BinaryOperator::Divide => {
                if r == 0.0 {
                    return Err(FormulaError::DivisionByZero);
                }
                l / r
            }
            _ => l.powf(r),
        };

        if result.is_finite() {
            Ok(FormulaValue::Number(result))
        } else {
            Err(FormulaError::Num(format!("{:?} produced {}", op, result)))
        }
    }

    fn eval_function(&mut self, name: &str, args: &[FormulaExpr]) -> FormulaResult<FormulaValue> {
        let func = registry()
            .get(name)
            .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

        // Check argument count
        if args.len() < func.min_args {
            return Err(FormulaError::ArgumentCount {
                function: name.to_string(),
                expected: format!("at least {}", func.min_args),
                actual: args.len(),
            });
        }

        if let Some(max) = func.max_args {
            if args.len() > max {
                return Err(FormulaError::ArgumentCount {
                    function: name.to_string(),
                    expected: format!("at most {}", max),
                    actual: args.len(),
                });
            }
        }

        match &func.kind {
            FunctionKind::Eager {
                mode,
                implementation,
            } => {
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    let value = self.eval_expr(arg)?;
                    evaluated.push(match (mode, value) {
                        (ArgMode::Numeric, FormulaValue::String(s)) => match parse_number(&s) {
                            Some(n) => FormulaValue::Number(n),
                            None => FormulaValue::String(s),
                        },
                        (_, value) => value,
                    });
                }
                implementation(&evaluated, &self.context())
            }
            FunctionKind::Special(form) => self.eval_special(*form, args),
        }
    }

    fn eval_special(&mut self, form: SpecialForm, args: &[FormulaExpr]) -> FormulaResult<FormulaValue> {
        match form {
            SpecialForm::If => {
                let cond = self.eval_expr(&args[0])?;
                if let FormulaValue::Error(e) = cond {
                    return Ok(FormulaValue::Error(e));
                }
                let truth = cond.as_bool().ok_or_else(|| {
                    FormulaError::Evaluation(format!("IF condition is not logical: {:?}", cond))
                })?;

                // Only the taken branch is evaluated, so the other records no dependencies
                if truth {
                    self.eval_expr(&args[1])
                } else {
                    match args.get(2) {
                        Some(else_branch) => self.eval_expr(else_branch),
                        None => Ok(FormulaValue::Boolean(false)),
                    }
                }
            }
            SpecialForm::IfError => match self.eval_expr(&args[0]) {
                Ok(FormulaValue::Error(_)) | Err(_) => self.eval_expr(&args[1]),
                Ok(value) => Ok(value),
            },
            SpecialForm::IfNa => match self.eval_expr(&args[0]) {
                Ok(FormulaValue::Error(CellError::Na)) => self.eval_expr(&args[1]),
                Err(e) if e.cell_error() == CellError::Na => self.eval_expr(&args[1]),
                other => other,
            },
            SpecialForm::Row | SpecialForm::Column => {
                let (row, col) = match args.first() {
                    None => {
                        let ctx = self.context();
                        (ctx.current_row, ctx.current_col)
                    }
                    Some(FormulaExpr::CellRef(addr)) => (addr.row, addr.col),
                    Some(FormulaExpr::RangeRef(range)) => (range.start.row, range.start.col),
                    Some(_) => {
                        return Err(FormulaError::Evaluation(
                            "ROW/COLUMN expects a reference".into(),
                        ))
                    }
                };
                let n = if form == SpecialForm::Row {
                    row as f64
                } else {
                    col as f64
                };
                Ok(FormulaValue::Number(n + 1.0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comment_sheet_core::CellSnapshot;
    use pretty_assertions::assert_eq;

    fn sheet(values: &[(&str, &str)]) -> CellStore {
        let mut store = CellStore::new(20, 10).unwrap();
        for (addr, value) in values {
            let addr = CellAddress::parse(addr).unwrap();
            store
                .set(addr.row, addr.col, CellSnapshot::new(*value))
                .unwrap();
        }
        store
    }

    fn eval_in(store: &CellStore, formula: &str) -> FormulaValue {
        let mut graph = DependencyGraph::new();
        let mut evaluator = Evaluator::new(store, &mut graph);
        evaluator.evaluate_formula(formula, 19, 9)
    }

    fn eval(formula: &str) -> FormulaValue {
        eval_in(&sheet(&[]), formula)
    }

    fn display(formula: &str) -> String {
        eval(formula).to_display()
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("=1+2"), FormulaValue::Number(3.0));
        assert_eq!(eval("=10-4*2"), FormulaValue::Number(2.0));
        assert_eq!(eval("=(1+2)*3"), FormulaValue::Number(9.0));
        assert_eq!(eval("=2^3^2"), FormulaValue::Number(512.0));
        assert_eq!(eval("=-2^2"), FormulaValue::Number(4.0));
        assert_eq!(eval("=7/2"), FormulaValue::Number(3.5));
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(display("=1+2"), "3");
        assert_eq!(display("=1/3"), "0.33");
        assert_eq!(display("=2.5*2"), "5");
        assert_eq!(display("=1=1"), "TRUE");
        assert_eq!(display("=\"text\""), "text");
        assert_eq!(display("=1/0"), "#DIV/0!");
        assert_eq!(display("=FOO"), "#NAME?");
        assert_eq!(display("=NOSUCH(1)"), "#NAME?");
        assert_eq!(display("=1 & 2"), "#ERROR");
        assert_eq!(display("=(-8)^0.5"), "#NUM!");
    }

    #[test]
    fn test_error_literals_fail_the_formula() {
        assert_eq!(display("=#REF!"), "#REF!");
        assert_eq!(display("=#REF!+1"), "#REF!");
        assert_eq!(display("=SUM(#ref!, 2)"), "#REF!");
        assert_eq!(display("=IFERROR(#REF!, 1)"), "1");
        assert_eq!(display("=#N/A"), "#N/A");
    }

    #[test]
    fn test_string_coercion_in_arithmetic() {
        assert_eq!(eval("=\"4\"+1"), FormulaValue::Number(5.0));
        assert_eq!(eval("=\"abc\"+1"), FormulaValue::Number(1.0));
        assert_eq!(eval("=TRUE+1"), FormulaValue::Number(2.0));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("=\"abc\"=\"ABC\""), FormulaValue::Boolean(true));
        assert_eq!(eval("=\"apple\"<\"Banana\""), FormulaValue::Boolean(true));
        assert_eq!(eval("=\"10\">9"), FormulaValue::Boolean(true));
        assert_eq!(eval("=2<>2"), FormulaValue::Boolean(false));
        assert_eq!(eval("=2!=3"), FormulaValue::Boolean(true));
        // Type mismatch is false, not an error
        assert_eq!(eval("=\"abc\">1"), FormulaValue::Boolean(false));
        assert_eq!(eval("=\"abc\"<>1"), FormulaValue::Boolean(false));
    }

    #[test]
    fn test_cell_references() {
        let store = sheet(&[("A1", "10"), ("A2", "=A1*2"), ("B1", "hello"), ("C1", "=1/0")]);
        assert_eq!(eval_in(&store, "=A2+1"), FormulaValue::Number(21.0));
        assert_eq!(eval_in(&store, "=B1"), FormulaValue::String("hello".into()));
        assert_eq!(eval_in(&store, "=D5"), FormulaValue::Empty);
        // A bare reference to an error cell yields the error...
        assert_eq!(eval_in(&store, "=C1"), FormulaValue::Error(CellError::Div0));
        // ...while arithmetic treats it as 0
        assert_eq!(eval_in(&store, "=C1+5"), FormulaValue::Number(5.0));
        // Outside the sheet
        assert_eq!(eval_in(&store, "=Z100"), FormulaValue::Error(CellError::Ref));
    }

    #[test]
    fn test_range_as_scalar() {
        let store = sheet(&[("A1", "3"), ("A2", "4")]);
        assert_eq!(eval_in(&store, "=A1:A1"), FormulaValue::Number(3.0));
        assert_eq!(eval_in(&store, "=A1:A2").to_display(), "#ERROR");
        assert_eq!(eval_in(&store, "=A1:A2+1").to_display(), "#ERROR");
    }

    #[test]
    fn test_dependency_recording() {
        let store = sheet(&[("A1", "=B1+SUM(C1:C2)"), ("B1", "1")]);
        let mut graph = DependencyGraph::new();
        let mut evaluator = Evaluator::new(&store, &mut graph);
        assert_eq!(evaluator.evaluate_cell(0, 0), FormulaValue::Number(1.0));

        let precedents = graph.precedents_of(CellKey::new(0, 0));
        assert_eq!(
            precedents,
            vec![CellKey::new(0, 1), CellKey::new(0, 2), CellKey::new(1, 2)]
        );
    }

    #[test]
    fn test_if_skips_untaken_branch() {
        let store = sheet(&[("A1", "=IF(1=1, B1, 1/0)"), ("B1", "7"), ("C1", "=IF(FALSE, D1)")]);
        let mut graph = DependencyGraph::new();
        let mut evaluator = Evaluator::new(&store, &mut graph);
        assert_eq!(evaluator.evaluate_cell(0, 0), FormulaValue::Number(7.0));
        assert_eq!(evaluator.evaluate_cell(0, 2), FormulaValue::Boolean(false));

        assert_eq!(graph.precedents_of(CellKey::new(0, 0)), vec![CellKey::new(0, 1)]);
        assert!(graph.precedents_of(CellKey::new(0, 2)).is_empty());
    }

    #[test]
    fn test_iferror_and_ifna() {
        let store = sheet(&[("A1", "=1/0"), ("A2", "=VLOOKUP(9, B1:C2, 2, FALSE)")]);
        assert_eq!(eval_in(&store, "=IFERROR(1/0, 5)"), FormulaValue::Number(5.0));
        assert_eq!(eval_in(&store, "=IFERROR(A1, \"x\")"), FormulaValue::String("x".into()));
        assert_eq!(eval_in(&store, "=IFERROR(3, 5)"), FormulaValue::Number(3.0));
        assert_eq!(eval_in(&store, "=IFNA(A2, 0)"), FormulaValue::Number(0.0));
        assert_eq!(eval_in(&store, "=IFNA(A1, 0)"), FormulaValue::Error(CellError::Div0));
        assert_eq!(display("=IFNA(1/0, 0)"), "#DIV/0!");
    }

    #[test]
    fn test_cycle_detection() {
        let store = sheet(&[("A1", "=B1"), ("B1", "=A1"), ("C1", "=C1+1"), ("D1", "=A1")]);
        let mut graph = DependencyGraph::new();
        let mut evaluator = Evaluator::new(&store, &mut graph);

        assert_eq!(evaluator.evaluate_cell(0, 0), FormulaValue::Error(CellError::Ref));
        assert_eq!(evaluator.evaluate_cell(0, 1), FormulaValue::Error(CellError::Ref));
        assert_eq!(evaluator.evaluate_cell(0, 2), FormulaValue::Error(CellError::Ref));
        assert_eq!(evaluator.evaluate_cell(0, 3), FormulaValue::Error(CellError::Ref));
        assert!(graph.has_circular_reference(CellKey::new(0, 0)));
    }

    #[test]
    fn test_long_cycle_marks_every_member() {
        let store = sheet(&[("A1", "=B1+1"), ("B1", "=C1+1"), ("C1", "=A1+1")]);
        let mut graph = DependencyGraph::new();
        let mut evaluator = Evaluator::new(&store, &mut graph);
        for col in 0..3 {
            assert_eq!(
                evaluator.evaluate_cell(0, col),
                FormulaValue::Error(CellError::Ref)
            );
        }
    }

    #[test]
    fn test_depth_cap_uses_previous_display() {
        let mut store = sheet(&[("A1", "1"), ("A2", "=A1+1"), ("A3", "=A2+1"), ("A4", "=A3+1")]);
        store.set_display(1, 0, "100".into());

        let mut graph = DependencyGraph::new();
        let mut evaluator = Evaluator::new(&store, &mut graph).with_max_depth(2);
        // A4 -> A3 -> A2 is past the cap, so A2's stale display is used
        assert_eq!(evaluator.evaluate_cell(3, 0), FormulaValue::Number(102.0));
        assert!(evaluator.deferred());
    }

    #[test]
    fn test_arity_errors() {
        assert_eq!(display("=NOT()"), "#ERROR");
        assert_eq!(display("=NOT(1, 2)"), "#ERROR");
        assert_eq!(display("=IF(1)"), "#ERROR");
    }

    #[test]
    fn test_row_and_column() {
        assert_eq!(eval("=ROW()"), FormulaValue::Number(20.0));
        assert_eq!(eval("=COLUMN()"), FormulaValue::Number(10.0));
        assert_eq!(eval("=ROW(C7)"), FormulaValue::Number(7.0));
        assert_eq!(eval("=COLUMN(B2:D4)"), FormulaValue::Number(2.0));
        assert_eq!(display("=ROW(1)"), "#ERROR");
    }

    #[test]
    fn test_literal_interpretation() {
        assert_eq!(FormulaValue::from_literal(""), FormulaValue::Empty);
        assert_eq!(FormulaValue::from_literal(" 42 "), FormulaValue::Number(42.0));
        assert_eq!(
            FormulaValue::from_literal("inf"),
            FormulaValue::String("inf".into())
        );
        assert_eq!(
            FormulaValue::from_display("#N/A"),
            FormulaValue::Error(CellError::Na)
        );
    }
}
