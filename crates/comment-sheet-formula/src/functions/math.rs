//! Math functions

use super::{number_arg, optional_number_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use comment_sheet_core::CellError;

/// Collect the numeric values of an aggregate's arguments
///
/// Ranges are flattened one level. Only values coercible to a number count;
/// blank cells, text, logical values and error values are skipped.
fn collect_numbers(args: &[FormulaValue]) -> Vec<f64> {
    FormulaValue::flatten(args)
        .filter_map(|value| match value {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::String(s) => crate::evaluator::parse_number(s),
            _ => None,
        })
        .collect()
}

/// SUM function
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(collect_numbers(args).iter().sum()))
}

/// AVERAGE function
pub fn fn_average(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args);
    if numbers.is_empty() {
        Ok(FormulaValue::Error(CellError::Div0))
    } else {
        Ok(FormulaValue::Number(
            numbers.iter().sum::<f64>() / numbers.len() as f64,
        ))
    }
}

/// MIN function
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(
        collect_numbers(args).into_iter().reduce(f64::min).unwrap_or(0.0),
    ))
}

/// MAX function
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(
        collect_numbers(args).into_iter().reduce(f64::max).unwrap_or(0.0),
    ))
}

/// COUNT function
///
/// Counts numeric values; errors are not counted.
pub fn fn_count(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = FormulaValue::flatten(args)
        .filter(|v| match v {
            FormulaValue::Number(_) => true,
            FormulaValue::String(s) => crate::evaluator::parse_number(s).is_some(),
            _ => false,
        })
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// INT function - round down to the nearest integer
pub fn fn_int(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0)?;
    Ok(FormulaValue::Number(n.floor()))
}

/// ABS function
pub fn fn_abs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0)?;
    Ok(FormulaValue::Number(n.abs()))
}

/// ROUND(number, [num_digits])
///
/// Rounds half away from zero. Negative digits round to the left of the
/// decimal point.
pub fn fn_round(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0)?;
    let digits = optional_number_arg(args, 1, 0.0)?.trunc() as i32;

    let factor = 10f64.powi(digits.abs());
    let rounded = if digits >= 0 {
        (n * factor).round() / factor
    } else {
        (n / factor).round() * factor
    };
    Ok(FormulaValue::Number(rounded))
}

/// MOD(number, divisor)
///
/// The result has the sign of the divisor.
pub fn fn_mod(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0)?;
    let d = number_arg(args, 1)?;

    if d == 0.0 {
        return Err(FormulaError::DivisionByZero);
    }
    Ok(FormulaValue::Number(n - d * (n / d).floor()))
}
