//! Bitwise functions
//!
//! Operands are truncated to integers and must lie in `[0, 2^48)`.

use super::number_arg;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};

/// 2^48
const BIT_LIMIT: u64 = 1 << 48;

/// Largest shift amount accepted in either direction
const MAX_SHIFT: f64 = 53.0;

fn bitwise_arg(args: &[FormulaValue], index: usize) -> FormulaResult<u64> {
    let n = number_arg(args, index)?.trunc();
    if n < 0.0 || n >= BIT_LIMIT as f64 {
        return Err(FormulaError::Num(format!(
            "Bitwise operand out of range: {}",
            n
        )));
    }
    Ok(n as u64)
}

fn shift_arg(args: &[FormulaValue], index: usize) -> FormulaResult<i32> {
    let shift = number_arg(args, index)?.trunc();
    if shift.abs() > MAX_SHIFT {
        return Err(FormulaError::Num(format!("Shift amount out of range: {}", shift)));
    }
    Ok(shift as i32)
}

fn binary(args: &[FormulaValue], op: fn(u64, u64) -> u64) -> FormulaResult<FormulaValue> {
    let a = bitwise_arg(args, 0)?;
    let b = bitwise_arg(args, 1)?;
    Ok(FormulaValue::Number(op(a, b) as f64))
}

/// Shift left by `shift` bits; negative shifts go right
fn shift_left(n: u64, shift: i32) -> FormulaResult<FormulaValue> {
    let result = if shift >= 0 {
        (n as u128) << shift
    } else {
        (n >> shift.unsigned_abs().min(63)) as u128
    };

    if result >= BIT_LIMIT as u128 {
        return Err(FormulaError::Num(format!(
            "Shift result exceeds 48 bits: {} << {}",
            n, shift
        )));
    }
    Ok(FormulaValue::Number(result as f64))
}

/// BITAND(number1, number2)
pub fn fn_bitand(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    binary(args, |a, b| a & b)
}

/// BITOR(number1, number2)
pub fn fn_bitor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    binary(args, |a, b| a | b)
}

/// BITXOR(number1, number2)
pub fn fn_bitxor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    binary(args, |a, b| a ^ b)
}

/// BITLSHIFT(number, shift_amount)
pub fn fn_bitlshift(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    shift_left(bitwise_arg(args, 0)?, shift_arg(args, 1)?)
}

/// BITRSHIFT(number, shift_amount)
pub fn fn_bitrshift(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    shift_left(bitwise_arg(args, 0)?, -shift_arg(args, 1)?)
}
