//! Lookup functions

use super::number_arg;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{compare_values, parse_number, EvaluationContext, FormulaValue};
use comment_sheet_core::CellError;
use std::cmp::Ordering;

fn values_equal(a: &FormulaValue, b: &FormulaValue) -> bool {
    match (a, b) {
        (FormulaValue::Number(x), FormulaValue::Number(y)) => x == y,
        (FormulaValue::Boolean(x), FormulaValue::Boolean(y)) => x == y,
        (FormulaValue::String(x), FormulaValue::String(y)) => {
            x.to_lowercase() == y.to_lowercase()
        }

        // Numeric text matches the number
        (FormulaValue::Number(x), FormulaValue::String(s))
        | (FormulaValue::String(s), FormulaValue::Number(x)) => {
            parse_number(s).map(|n| n == *x).unwrap_or(false)
        }

        (FormulaValue::Empty, FormulaValue::Empty) => true,
        (FormulaValue::Empty, FormulaValue::String(s))
        | (FormulaValue::String(s), FormulaValue::Empty) => s.is_empty(),

        _ => false,
    }
}

/// Whether two values are of a kind approximate matching can order
fn same_kind(a: &FormulaValue, b: &FormulaValue) -> bool {
    matches!(
        (a, b),
        (FormulaValue::Number(_), FormulaValue::Number(_))
            | (FormulaValue::String(_), FormulaValue::String(_))
            | (FormulaValue::Boolean(_), FormulaValue::Boolean(_))
    )
}

/// Parse the range_lookup argument: TRUE unless given as FALSE, 0 or "FALSE"
fn range_lookup_arg(args: &[FormulaValue], index: usize) -> FormulaResult<bool> {
    match args.get(index) {
        None | Some(FormulaValue::Empty) => Ok(true),
        Some(FormulaValue::Error(e)) => Err(FormulaError::from_cell_error(*e)),
        Some(value) => value.as_bool().ok_or_else(|| {
            FormulaError::Evaluation(format!("Invalid range_lookup: {:?}", value))
        }),
    }
}

/// Find the index of `lookup` among `keys`
///
/// Exact: the first equal key. Approximate: keys are assumed ascending; the
/// last key not greater than `lookup`, scanning stops at the first greater
/// key. Keys of another kind are skipped.
fn find_key<'a>(
    lookup: &FormulaValue,
    keys: impl Iterator<Item = &'a FormulaValue>,
    exact: bool,
) -> Option<usize> {
    if exact {
        return keys.enumerate().find(|(_, key)| values_equal(lookup, key)).map(|(i, _)| i);
    }

    let mut found = None;
    for (i, key) in keys.enumerate() {
        if !same_kind(lookup, key) {
            continue;
        }
        match compare_values(key, lookup) {
            Some(Ordering::Greater) => break,
            Some(_) => found = Some(i),
            None => {}
        }
    }
    found
}

/// Arguments shared by VLOOKUP and HLOOKUP
struct LookupArgs<'a> {
    lookup: &'a FormulaValue,
    table: Vec<Vec<FormulaValue>>,
    index: usize,
    exact: bool,
}

fn lookup_args(args: &[FormulaValue]) -> FormulaResult<LookupArgs<'_>> {
    let lookup = &args[0];
    if let FormulaValue::Error(e) = lookup {
        return Err(FormulaError::from_cell_error(*e));
    }

    let table = match &args[1] {
        FormulaValue::Array(rows) => rows.clone(),
        FormulaValue::Error(e) => return Err(FormulaError::from_cell_error(*e)),
        scalar => vec![vec![scalar.clone()]],
    };

    let index = number_arg(args, 2)?.trunc();
    if index < 1.0 {
        return Err(FormulaError::Evaluation(format!(
            "Lookup index must be at least 1, got {}",
            index
        )));
    }

    Ok(LookupArgs {
        lookup,
        table,
        index: index as usize - 1,
        exact: !range_lookup_arg(args, 3)?,
    })
}

/// VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
pub fn fn_vlookup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let LookupArgs {
        lookup,
        table,
        index,
        exact,
    } = lookup_args(args)?;

    let width = table.first().map_or(0, |row| row.len());
    if index >= width {
        return Ok(FormulaValue::Error(CellError::Ref));
    }

    let keys = table.iter().map(|row| &row[0]);
    match find_key(lookup, keys, exact) {
        Some(row) => Ok(table[row][index].clone()),
        None => Ok(FormulaValue::Error(CellError::Na)),
    }
}

/// HLOOKUP(lookup_value, table_array, row_index_num, [range_lookup])
pub fn fn_hlookup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let LookupArgs {
        lookup,
        table,
        index,
        exact,
    } = lookup_args(args)?;

    if index >= table.len() {
        return Ok(FormulaValue::Error(CellError::Ref));
    }

    let keys = table[0].iter();
    match find_key(lookup, keys, exact) {
        Some(col) => Ok(table[index][col].clone()),
        None => Ok(FormulaValue::Error(CellError::Na)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EvaluationContext {
        EvaluationContext::default()
    }

    fn s(v: &str) -> FormulaValue {
        FormulaValue::String(v.into())
    }

    fn n(v: f64) -> FormulaValue {
        FormulaValue::Number(v)
    }

    fn table() -> FormulaValue {
        FormulaValue::Array(vec![
            vec![s("A"), n(1.0)],
            vec![s("B"), n(2.0)],
            vec![s("C"), n(3.0)],
        ])
    }

    fn numeric_table() -> FormulaValue {
        FormulaValue::Array(vec![
            vec![n(10.0), s("low")],
            vec![n(20.0), s("mid")],
            vec![n(30.0), s("high")],
        ])
    }

    #[test]
    fn test_vlookup_exact() {
        let args = vec![s("b"), table(), n(2.0), FormulaValue::Boolean(false)];
        assert_eq!(fn_vlookup(&args, &ctx()).unwrap(), n(2.0));

        let args = vec![s("Z"), table(), n(2.0), FormulaValue::Boolean(false)];
        assert_eq!(
            fn_vlookup(&args, &ctx()).unwrap(),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_range_lookup_spellings() {
        for exact in [FormulaValue::Boolean(false), n(0.0), s("FALSE"), s("false")] {
            let args = vec![n(25.0), numeric_table(), n(2.0), exact];
            assert_eq!(
                fn_vlookup(&args, &ctx()).unwrap(),
                FormulaValue::Error(CellError::Na)
            );
        }
        for approx in [FormulaValue::Boolean(true), n(1.0), s("TRUE")] {
            let args = vec![n(25.0), numeric_table(), n(2.0), approx];
            assert_eq!(fn_vlookup(&args, &ctx()).unwrap(), s("mid"));
        }
    }

    #[test]
    fn test_vlookup_approximate() {
        let args = vec![n(30.0), numeric_table(), n(2.0)];
        assert_eq!(fn_vlookup(&args, &ctx()).unwrap(), s("high"));

        let args = vec![n(99.0), numeric_table(), n(2.0)];
        assert_eq!(fn_vlookup(&args, &ctx()).unwrap(), s("high"));

        let args = vec![n(5.0), numeric_table(), n(2.0)];
        assert_eq!(
            fn_vlookup(&args, &ctx()).unwrap(),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_vlookup_index_errors() {
        let args = vec![s("A"), table(), n(3.0), FormulaValue::Boolean(false)];
        assert_eq!(
            fn_vlookup(&args, &ctx()).unwrap(),
            FormulaValue::Error(CellError::Ref)
        );

        let args = vec![s("A"), table(), n(0.0), FormulaValue::Boolean(false)];
        assert!(fn_vlookup(&args, &ctx()).is_err());
    }

    #[test]
    fn test_hlookup() {
        let row_table = FormulaValue::Array(vec![
            vec![n(1.0), n(2.0), n(3.0)],
            vec![s("one"), s("two"), s("three")],
        ]);
        let args = vec![n(2.0), row_table.clone(), n(2.0), FormulaValue::Boolean(false)];
        assert_eq!(fn_hlookup(&args, &ctx()).unwrap(), s("two"));

        let args = vec![n(2.5), row_table.clone(), n(2.0)];
        assert_eq!(fn_hlookup(&args, &ctx()).unwrap(), s("two"));

        let args = vec![n(2.0), row_table, n(3.0)];
        assert_eq!(
            fn_hlookup(&args, &ctx()).unwrap(),
            FormulaValue::Error(CellError::Ref)
        );
    }
}
