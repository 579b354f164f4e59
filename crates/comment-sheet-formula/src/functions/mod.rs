//! Built-in functions

pub mod bitwise;
pub mod convert;
pub mod date;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod text;

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Function implementation signature
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// How eager arguments are prepared before the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    /// Scalar text that parses as a number is converted to a number
    Numeric,
    /// Arguments are passed through unchanged
    Text,
}

/// Functions the evaluator implements itself because they need the AST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    /// Evaluates only the taken branch
    If,
    /// Catches any error of its first argument
    IfError,
    /// Catches `#N/A` only
    IfNa,
    /// Row number of a reference (or of the current cell)
    Row,
    /// Column number of a reference (or of the current cell)
    Column,
}

/// How a function is evaluated
#[derive(Clone, Copy)]
pub enum FunctionKind {
    /// Arguments are evaluated left to right, then `implementation` is called
    Eager {
        mode: ArgMode,
        implementation: FunctionImpl,
    },
    /// Arguments are handed to the evaluator unevaluated
    Special(SpecialForm),
}

/// Function definition
#[derive(Clone, Copy)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Evaluation strategy
    pub kind: FunctionKind,
}

impl FunctionDef {
    /// Define a function whose arguments are evaluated before the call
    pub fn eager(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        mode: ArgMode,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            kind: FunctionKind::Eager {
                mode,
                implementation,
            },
        }
    }

    /// Define a lazily evaluated function
    pub fn special(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        form: SpecialForm,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            kind: FunctionKind::Special(form),
        }
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionDef>,
}

/// The registry of built-in functions
pub fn registry() -> &'static FunctionRegistry {
    static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(FunctionRegistry::new)
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_text_functions();
        registry.register_conversion_functions();
        registry.register_bitwise_functions();
        registry.register_lookup_functions();
        registry.register_date_functions();

        registry
    }

    /// Look up a function by name (case-insensitive)
    ///
    /// The lexer uppercases call names, so parsed formulas hit the
    /// non-allocating path.
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        if name.bytes().any(|b| b.is_ascii_lowercase()) {
            self.functions.get(name.to_ascii_uppercase().as_str())
        } else {
            self.functions.get(name)
        }
    }

    /// Whether a function with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    fn register_all(&mut self, defs: &[FunctionDef]) {
        for def in defs {
            self.register(*def);
        }
    }

    fn register_math_functions(&mut self) {
        use ArgMode::Numeric;

        self.register_all(&[
            // Aggregates
            FunctionDef::eager("SUM", 1, None, Numeric, math::fn_sum),
            FunctionDef::eager("AVERAGE", 1, None, Numeric, math::fn_average),
            FunctionDef::eager("MAX", 1, None, Numeric, math::fn_max),
            FunctionDef::eager("MIN", 1, None, Numeric, math::fn_min),
            FunctionDef::eager("COUNT", 1, None, Numeric, math::fn_count),
            // Helpers
            FunctionDef::eager("INT", 1, Some(1), Numeric, math::fn_int),
            FunctionDef::eager("ABS", 1, Some(1), Numeric, math::fn_abs),
            FunctionDef::eager("ROUND", 1, Some(2), Numeric, math::fn_round),
            FunctionDef::eager("MOD", 2, Some(2), Numeric, math::fn_mod),
        ]);
    }

    fn register_logical_functions(&mut self) {
        use ArgMode::Numeric;

        self.register_all(&[
            FunctionDef::special("IF", 2, Some(3), SpecialForm::If),
            FunctionDef::special("IFERROR", 2, Some(2), SpecialForm::IfError),
            FunctionDef::special("IFNA", 2, Some(2), SpecialForm::IfNa),
            FunctionDef::eager("AND", 1, None, Numeric, logical::fn_and),
            FunctionDef::eager("OR", 1, None, Numeric, logical::fn_or),
            FunctionDef::eager("NOT", 1, Some(1), Numeric, logical::fn_not),
            FunctionDef::eager("TRUE", 0, Some(0), Numeric, logical::fn_true),
            FunctionDef::eager("FALSE", 0, Some(0), Numeric, logical::fn_false),
            // Reference information
            FunctionDef::special("ROW", 0, Some(1), SpecialForm::Row),
            FunctionDef::special("COLUMN", 0, Some(1), SpecialForm::Column),
        ]);
    }

    fn register_text_functions(&mut self) {
        use ArgMode::{Numeric, Text};

        self.register_all(&[
            FunctionDef::eager("UPPER", 1, Some(1), Text, text::fn_upper),
            FunctionDef::eager("LOWER", 1, Some(1), Text, text::fn_lower),
            FunctionDef::eager("LEN", 1, Some(1), Text, text::fn_len),
            FunctionDef::eager("TRIM", 1, Some(1), Text, text::fn_trim),
            FunctionDef::eager("LEFT", 1, Some(2), Text, text::fn_left),
            FunctionDef::eager("RIGHT", 1, Some(2), Text, text::fn_right),
            FunctionDef::eager("MID", 3, Some(3), Text, text::fn_mid),
            FunctionDef::eager("CONCAT", 1, None, Text, text::fn_concat),
            FunctionDef::eager("REPLACE", 4, Some(4), Text, text::fn_replace),
            FunctionDef::eager("SUBSTITUTE", 3, Some(4), Text, text::fn_substitute),
            FunctionDef::eager("CHAR", 1, Some(1), Numeric, text::fn_char),
            FunctionDef::eager("CODE", 1, Some(1), Text, text::fn_code),
        ]);
    }

    fn register_conversion_functions(&mut self) {
        use ArgMode::{Numeric, Text};

        self.register_all(&[
            // From decimal
            FunctionDef::eager("DEC2BIN", 1, Some(2), Numeric, convert::fn_dec2bin),
            FunctionDef::eager("DEC2OCT", 1, Some(2), Numeric, convert::fn_dec2oct),
            FunctionDef::eager("DEC2HEX", 1, Some(2), Numeric, convert::fn_dec2hex),
            // To decimal
            FunctionDef::eager("BIN2DEC", 1, Some(1), Text, convert::fn_bin2dec),
            FunctionDef::eager("OCT2DEC", 1, Some(1), Text, convert::fn_oct2dec),
            FunctionDef::eager("HEX2DEC", 1, Some(1), Text, convert::fn_hex2dec),
            // Between non-decimal bases
            FunctionDef::eager("BIN2OCT", 1, Some(2), Text, convert::fn_bin2oct),
            FunctionDef::eager("BIN2HEX", 1, Some(2), Text, convert::fn_bin2hex),
            FunctionDef::eager("OCT2BIN", 1, Some(2), Text, convert::fn_oct2bin),
            FunctionDef::eager("OCT2HEX", 1, Some(2), Text, convert::fn_oct2hex),
            FunctionDef::eager("HEX2BIN", 1, Some(2), Text, convert::fn_hex2bin),
            FunctionDef::eager("HEX2OCT", 1, Some(2), Text, convert::fn_hex2oct),
            // Arbitrary radix
            FunctionDef::eager("BASE", 2, Some(3), Numeric, convert::fn_base),
            FunctionDef::eager("DECIMAL", 2, Some(2), Text, convert::fn_decimal),
        ]);
    }

    fn register_bitwise_functions(&mut self) {
        use ArgMode::Numeric;

        self.register_all(&[
            FunctionDef::eager("BITAND", 2, Some(2), Numeric, bitwise::fn_bitand),
            FunctionDef::eager("BITOR", 2, Some(2), Numeric, bitwise::fn_bitor),
            FunctionDef::eager("BITXOR", 2, Some(2), Numeric, bitwise::fn_bitxor),
            FunctionDef::eager("BITLSHIFT", 2, Some(2), Numeric, bitwise::fn_bitlshift),
            FunctionDef::eager("BITRSHIFT", 2, Some(2), Numeric, bitwise::fn_bitrshift),
        ]);
    }

    fn register_lookup_functions(&mut self) {
        use ArgMode::Text;

        self.register_all(&[
            FunctionDef::eager("VLOOKUP", 3, Some(4), Text, lookup::fn_vlookup),
            FunctionDef::eager("HLOOKUP", 3, Some(4), Text, lookup::fn_hlookup),
        ]);
    }

    fn register_date_functions(&mut self) {
        use ArgMode::Numeric;

        self.register_all(&[
            FunctionDef::eager("DATE", 3, Some(3), Numeric, date::fn_date),
            FunctionDef::eager("YEAR", 1, Some(1), Numeric, date::fn_year),
            FunctionDef::eager("MONTH", 1, Some(1), Numeric, date::fn_month),
            FunctionDef::eager("DAY", 1, Some(1), Numeric, date::fn_day),
        ]);
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Get a required number argument
///
/// Error values propagate as `Err` carrying the same marker; text that does
/// not parse is a `#ERROR`.
pub(crate) fn number_arg(args: &[FormulaValue], index: usize) -> FormulaResult<f64> {
    use crate::error::FormulaError;

    match args.get(index) {
        None => Ok(0.0),
        Some(FormulaValue::Error(e)) => Err(FormulaError::from_cell_error(*e)),
        Some(value) => value.as_number().ok_or_else(|| {
            FormulaError::Evaluation(format!("Expected a number, got {:?}", value))
        }),
    }
}

/// Get an optional number argument with a default
pub(crate) fn optional_number_arg(
    args: &[FormulaValue],
    index: usize,
    default: f64,
) -> FormulaResult<f64> {
    match args.get(index) {
        None => Ok(default),
        Some(_) => number_arg(args, index),
    }
}

/// Get a text argument; error values propagate
pub(crate) fn text_arg(args: &[FormulaValue], index: usize) -> FormulaResult<String> {
    use crate::error::FormulaError;

    match args.get(index) {
        None => Ok(String::new()),
        Some(FormulaValue::Error(e)) => Err(FormulaError::from_cell_error(*e)),
        Some(value) => Ok(value.as_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_required_functions() {
        let reg = registry();
        for name in [
            "SUM", "AVERAGE", "MAX", "MIN", "COUNT", "IF", "AND", "OR", "NOT", "TRUE", "FALSE",
            "IFERROR", "IFNA", "UPPER", "LOWER", "LEN", "TRIM", "LEFT", "RIGHT", "MID", "CONCAT",
            "REPLACE", "SUBSTITUTE", "CHAR", "CODE", "INT", "DEC2HEX", "DEC2BIN", "DEC2OCT",
            "HEX2DEC", "HEX2BIN", "HEX2OCT", "BIN2DEC", "BIN2HEX", "BIN2OCT", "OCT2DEC",
            "OCT2BIN", "OCT2HEX", "BASE", "DECIMAL", "BITAND", "BITOR", "BITXOR", "BITLSHIFT",
            "BITRSHIFT", "VLOOKUP", "HLOOKUP",
        ] {
            assert!(reg.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let def = registry().get("sum").unwrap();
        assert_eq!(def.name, "SUM");
        assert_eq!(def.min_args, 1);
        assert_eq!(def.max_args, None);
        assert_eq!(registry().get("Dec2Hex").unwrap().name, "DEC2HEX");
        assert!(registry().get("NOPE").is_none());
        assert!(registry().get("nope").is_none());

        // Parsed call names arrive uppercased
        match crate::parse_formula("=sum(1)").unwrap() {
            crate::FormulaExpr::Function { name, .. } => assert_eq!(name, "SUM"),
            other => panic!("expected a call, got {:?}", other),
        }
    }

    #[test]
    fn test_special_forms() {
        assert!(matches!(
            registry().get("IF").unwrap().kind,
            FunctionKind::Special(SpecialForm::If)
        ));
        assert!(matches!(
            registry().get("ROW").unwrap().kind,
            FunctionKind::Special(SpecialForm::Row)
        ));
    }
}
