//! Date functions over serial day numbers
//!
//! Serial 1 is 1900-01-01. There is no phantom 1900-02-29, so serials before
//! March 1900 differ by one from some other spreadsheet programs.

use super::number_arg;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use chrono::{Datelike, Duration, NaiveDate};

/// Day zero of the serial numbering
fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 31).unwrap_or(NaiveDate::MIN)
}

/// Convert a date to its serial number
pub fn date_to_serial(date: NaiveDate) -> i64 {
    (date - epoch()).num_days()
}

/// Convert a serial number to a date; fractions are dropped
pub fn serial_to_date(serial: f64) -> FormulaResult<NaiveDate> {
    let days = serial.trunc();
    if days < 1.0 || days > 2_958_465.0 {
        return Err(FormulaError::Num(format!("Invalid date serial: {}", serial)));
    }
    epoch()
        .checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| FormulaError::Num(format!("Invalid date serial: {}", serial)))
}

/// DATE(year, month, day)
///
/// Years 0-1899 are taken relative to 1900. Months and days outside their
/// usual range roll over into neighbouring months and years.
pub fn fn_date(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut year = number_arg(args, 0)?.trunc() as i64;
    let month = number_arg(args, 1)?.trunc() as i64;
    let day = number_arg(args, 2)?.trunc() as i64;

    if (0..1900).contains(&year) {
        year += 1900;
    }
    if !(1900..=9999).contains(&year) {
        return Err(FormulaError::Num(format!("DATE year out of range: {}", year)));
    }
    if month.abs() > 120_000 || day.abs() > 3_000_000 {
        return Err(FormulaError::Num("DATE month or day out of range".into()));
    }

    let total_months = year * 12 + (month - 1);
    let (year, month0) = (total_months.div_euclid(12), total_months.rem_euclid(12));

    let date = NaiveDate::from_ymd_opt(year as i32, month0 as u32 + 1, 1)
        .and_then(|first| first.checked_add_signed(Duration::try_days(day - 1)?))
        .ok_or_else(|| FormulaError::Num("DATE out of range".into()))?;

    let serial = date_to_serial(date);
    if serial < 1 {
        return Err(FormulaError::Num(format!("DATE before 1900-01-01: {}", date)));
    }
    Ok(FormulaValue::Number(serial as f64))
}

/// YEAR(serial_number)
pub fn fn_year(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let date = serial_to_date(number_arg(args, 0)?)?;
    Ok(FormulaValue::Number(date.year() as f64))
}

/// MONTH(serial_number)
pub fn fn_month(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let date = serial_to_date(number_arg(args, 0)?)?;
    Ok(FormulaValue::Number(date.month() as f64))
}

/// DAY(serial_number)
pub fn fn_day(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let date = serial_to_date(number_arg(args, 0)?)?;
    Ok(FormulaValue::Number(date.day() as f64))
}
