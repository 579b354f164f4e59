//! Logical functions
//!
//! `IF`, `IFERROR` and `IFNA` are special forms handled by the evaluator.

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};

/// Fold the logical values of the arguments
///
/// Text that is not TRUE/FALSE and blank cells are skipped. An error value
/// is returned as-is.
fn fold_logical(
    args: &[FormulaValue],
    name: &str,
    init: bool,
    combine: fn(bool, bool) -> bool,
) -> FormulaResult<FormulaValue> {
    let mut result = init;
    let mut seen = false;

    for value in FormulaValue::flatten(args) {
        match value {
            FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
            FormulaValue::Empty => {}
            other => {
                if let Some(b) = other.as_bool() {
                    result = combine(result, b);
                    seen = true;
                }
            }
        }
    }

    if !seen {
        return Err(FormulaError::Evaluation(format!(
            "{} has no logical arguments",
            name
        )));
    }
    Ok(FormulaValue::Boolean(result))
}

/// AND function
pub fn fn_and(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    fold_logical(args, "AND", true, |acc, b| acc && b)
}

/// OR function
pub fn fn_or(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    fold_logical(args, "OR", false, |acc, b| acc || b)
}

/// NOT function
pub fn fn_not(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match &args[0] {
        FormulaValue::Error(e) => Ok(FormulaValue::Error(*e)),
        value => match value.as_bool() {
            Some(b) => Ok(FormulaValue::Boolean(!b)),
            None => Err(FormulaError::Evaluation(format!(
                "NOT expects a logical value, got {:?}",
                value
            ))),
        },
    }
}

/// TRUE function
pub fn fn_true(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

/// FALSE function
pub fn fn_false(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
}
