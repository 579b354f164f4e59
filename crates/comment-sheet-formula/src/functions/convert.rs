//! Base conversion functions
//!
//! Binary, octal and hexadecimal values are at most 10 digits. Negative
//! numbers use the 10-digit two's complement form, so `DEC2BIN(-1)` is
//! `1111111111`.

use super::{number_arg, optional_number_arg, text_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};

/// Largest value BASE accepts (exclusive)
const BASE_LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

/// One of the fixed-width engineering radixes
#[derive(Debug, Clone, Copy)]
struct Radix {
    radix: u32,
    /// 2^(10 * bits per digit)
    modulus: i64,
}

const BIN: Radix = Radix {
    radix: 2,
    modulus: 1 << 10,
};
const OCT: Radix = Radix {
    radix: 8,
    modulus: 1 << 30,
};
const HEX: Radix = Radix {
    radix: 16,
    modulus: 1 << 40,
};

impl Radix {
    fn min(&self) -> i64 {
        -self.modulus / 2
    }

    fn max(&self) -> i64 {
        self.modulus / 2 - 1
    }

    /// Render `n`, padding to `places` digits when given
    fn format(&self, n: i64, places: Option<f64>) -> FormulaResult<String> {
        if n < self.min() || n > self.max() {
            return Err(FormulaError::Num(format!(
                "{} does not fit in 10 base-{} digits",
                n, self.radix
            )));
        }

        if n < 0 {
            // Two's complement always uses all 10 digits; places is ignored
            return Ok(format_radix((self.modulus + n) as u64, self.radix));
        }

        let digits = format_radix(n as u64, self.radix);
        match places {
            None => Ok(digits),
            Some(p) => pad(digits, p, 10),
        }
    }

    /// Parse up to 10 digits, reading a leading 1 bit of a full-width value as negative
    fn parse(&self, text: &str) -> FormulaResult<i64> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(0);
        }
        if text.chars().count() > 10 {
            return Err(FormulaError::Num(format!(
                "More than 10 base-{} digits: {}",
                self.radix, text
            )));
        }

        let value = parse_radix(text, self.radix)? as i64;
        if value > self.max() {
            Ok(value - self.modulus)
        } else {
            Ok(value)
        }
    }
}

fn format_radix(mut n: u64, radix: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while n > 0 {
        let digit = (n % radix as u64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        n /= radix as u64;
    }
    digits.iter().rev().collect::<String>().to_uppercase()
}

fn parse_radix(text: &str, radix: u32) -> FormulaResult<u64> {
    if !text.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FormulaError::Num(format!(
            "Invalid base-{} number: {}",
            radix, text
        )));
    }
    u64::from_str_radix(text, radix)
        .map_err(|_| FormulaError::Num(format!("Invalid base-{} number: {}", radix, text)))
}

/// Left-pad with zeros to `places` digits
fn pad(digits: String, places: f64, max_places: usize) -> FormulaResult<String> {
    let places = places.trunc();
    if places < 0.0 || places > max_places as f64 || (places as usize) < digits.len() {
        return Err(FormulaError::Num(format!(
            "Cannot fit {} into {} places",
            digits, places
        )));
    }
    Ok(format!("{:0>width$}", digits, width = places as usize))
}

fn places_arg(args: &[FormulaValue], index: usize) -> FormulaResult<Option<f64>> {
    match args.get(index) {
        None | Some(FormulaValue::Empty) => Ok(None),
        Some(_) => number_arg(args, index).map(Some),
    }
}

fn from_decimal(args: &[FormulaValue], to: Radix) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0)?.trunc() as i64;
    let places = places_arg(args, 1)?;
    Ok(FormulaValue::String(to.format(n, places)?))
}

fn to_decimal(args: &[FormulaValue], from: Radix) -> FormulaResult<FormulaValue> {
    let n = from.parse(&text_arg(args, 0)?)?;
    Ok(FormulaValue::Number(n as f64))
}

fn between(args: &[FormulaValue], from: Radix, to: Radix) -> FormulaResult<FormulaValue> {
    let n = from.parse(&text_arg(args, 0)?)?;
    let places = places_arg(args, 1)?;
    Ok(FormulaValue::String(to.format(n, places)?))
}

/// DEC2BIN(number, [places])
pub fn fn_dec2bin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    from_decimal(args, BIN)
}

/// DEC2OCT(number, [places])
pub fn fn_dec2oct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    from_decimal(args, OCT)
}

/// DEC2HEX(number, [places])
pub fn fn_dec2hex(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    from_decimal(args, HEX)
}

/// BIN2DEC(number)
pub fn fn_bin2dec(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    to_decimal(args, BIN)
}

/// OCT2DEC(number)
pub fn fn_oct2dec(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    to_decimal(args, OCT)
}

/// HEX2DEC(number)
pub fn fn_hex2dec(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    to_decimal(args, HEX)
}

/// BIN2OCT(number, [places])
pub fn fn_bin2oct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, BIN, OCT)
}

/// BIN2HEX(number, [places])
pub fn fn_bin2hex(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, BIN, HEX)
}

/// OCT2BIN(number, [places])
pub fn fn_oct2bin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, OCT, BIN)
}

/// OCT2HEX(number, [places])
pub fn fn_oct2hex(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, OCT, HEX)
}

/// HEX2BIN(number, [places])
pub fn fn_hex2bin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, HEX, BIN)
}

/// HEX2OCT(number, [places])
pub fn fn_hex2oct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, HEX, OCT)
}

fn radix_arg(args: &[FormulaValue], index: usize) -> FormulaResult<u32> {
    let radix = number_arg(args, index)?.trunc();
    if !(2.0..=36.0).contains(&radix) {
        return Err(FormulaError::Num(format!("Radix must be 2..36, got {}", radix)));
    }
    Ok(radix as u32)
}

/// BASE(number, radix, [min_length])
pub fn fn_base(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0)?.trunc();
    let radix = radix_arg(args, 1)?;
    let min_length = optional_number_arg(args, 2, 0.0)?.trunc();

    if !(0.0..BASE_LIMIT).contains(&n) {
        return Err(FormulaError::Num(format!("BASE number out of range: {}", n)));
    }
    if !(0.0..=255.0).contains(&min_length) {
        return Err(FormulaError::Num(format!(
            "BASE min_length out of range: {}",
            min_length
        )));
    }

    let digits = format_radix(n as u64, radix);
    let width = min_length as usize;
    Ok(FormulaValue::String(format!("{:0>width$}", digits, width = width)))
}

/// DECIMAL(text, radix)
pub fn fn_decimal(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let radix = radix_arg(args, 1)?;

    let text = text.trim();
    if text.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }

    let value = parse_radix(text, radix)? as f64;
    if value >= BASE_LIMIT {
        return Err(FormulaError::Num(format!("DECIMAL result too large: {}", text)));
    }
    Ok(FormulaValue::Number(value))
}
