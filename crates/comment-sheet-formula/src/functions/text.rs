//! Text functions
//!
//! Positions and lengths count characters, not bytes.

use super::{number_arg, optional_number_arg, text_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};

fn take_left(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn take_right(s: &str, n: usize) -> String {
    let len = s.chars().count();
    if n >= len {
        return s.to_string();
    }
    s.chars().skip(len - n).collect()
}

fn take_mid(s: &str, start_1based: usize, n: usize) -> String {
    if start_1based == 0 {
        return String::new();
    }
    s.chars().skip(start_1based - 1).take(n).collect()
}

/// A non-negative character count argument, truncated
fn count_arg(args: &[FormulaValue], index: usize, default: f64) -> FormulaResult<usize> {
    let n = optional_number_arg(args, index, default)?.trunc();
    if n < 0.0 {
        return Err(FormulaError::Evaluation(format!(
            "Character count must not be negative, got {}",
            n
        )));
    }
    Ok(n as usize)
}

/// A 1-based position argument, truncated
fn position_arg(args: &[FormulaValue], index: usize) -> FormulaResult<usize> {
    let n = number_arg(args, index)?.trunc();
    if n < 1.0 {
        return Err(FormulaError::Evaluation(format!(
            "Position must be at least 1, got {}",
            n
        )));
    }
    Ok(n as usize)
}

/// UPPER(text)
pub fn fn_upper(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::String(text_arg(args, 0)?.to_uppercase()))
}

/// LOWER(text)
pub fn fn_lower(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::String(text_arg(args, 0)?.to_lowercase()))
}

/// LEN(text)
pub fn fn_len(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    Ok(FormulaValue::Number(s.chars().count() as f64))
}

/// TRIM(text) - strips leading/trailing spaces and collapses inner runs to one
pub fn fn_trim(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    let trimmed = s.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>();
    Ok(FormulaValue::String(trimmed.join(" ")))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    let n = count_arg(args, 1, 1.0)?;
    Ok(FormulaValue::String(take_left(&s, n)))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    let n = count_arg(args, 1, 1.0)?;
    Ok(FormulaValue::String(take_right(&s, n)))
}

/// MID(text, start_num, num_chars)
pub fn fn_mid(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    let start = position_arg(args, 1)?;
    let n = count_arg(args, 2, 0.0)?;
    Ok(FormulaValue::String(take_mid(&s, start, n)))
}

/// CONCAT(text1, ...) - ranges contribute every cell, row by row
pub fn fn_concat(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut result = String::new();
    for value in FormulaValue::flatten(args) {
        if let FormulaValue::Error(e) = value {
            return Ok(FormulaValue::Error(*e));
        }
        result.push_str(&value.as_text());
    }
    Ok(FormulaValue::String(result))
}

/// REPLACE(old_text, start_num, num_chars, new_text)
pub fn fn_replace(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    let start = position_arg(args, 1)?;
    let n = count_arg(args, 2, 0.0)?;
    let new_text = text_arg(args, 3)?;

    let mut result = take_left(&s, start - 1);
    result.push_str(&new_text);
    result.extend(s.chars().skip((start - 1).saturating_add(n)));
    Ok(FormulaValue::String(result))
}

/// SUBSTITUTE(text, old_text, new_text, [instance_num])
///
/// Without instance_num every occurrence is replaced.
pub fn fn_substitute(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let old_text = text_arg(args, 1)?;
    let new_text = text_arg(args, 2)?;
    let instance = match args.get(3) {
        None | Some(FormulaValue::Empty) => None,
        Some(_) => Some(position_arg(args, 3)?),
    };

    if old_text.is_empty() {
        return Ok(FormulaValue::String(text));
    }

    match instance {
        None => Ok(FormulaValue::String(text.replace(&old_text, &new_text))),
        Some(n) => {
            // Replace only the nth occurrence
            match text.match_indices(&old_text).nth(n - 1) {
                Some((pos, _)) => {
                    let mut result = String::with_capacity(text.len());
                    result.push_str(&text[..pos]);
                    result.push_str(&new_text);
                    result.push_str(&text[pos + old_text.len()..]);
                    Ok(FormulaValue::String(result))
                }
                None => Ok(FormulaValue::String(text)),
            }
        }
    }
}

/// CHAR(number) - the character with the given Unicode code point
pub fn fn_char(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0)?.trunc();
    if n < 1.0 || n > u32::MAX as f64 {
        return Err(FormulaError::Evaluation(format!("CHAR code out of range: {}", n)));
    }

    match char::from_u32(n as u32) {
        Some(c) => Ok(FormulaValue::String(c.to_string())),
        None => Err(FormulaError::Evaluation(format!("Invalid character code: {}", n))),
    }
}

/// CODE(text) - the code point of the first character
pub fn fn_code(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = text_arg(args, 0)?;
    match s.chars().next() {
        Some(c) => Ok(FormulaValue::Number(c as u32 as f64)),
        None => Err(FormulaError::Evaluation("CODE of empty text".into())),
    }
}
