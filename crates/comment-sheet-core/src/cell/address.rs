//! Cell address and range types

use crate::error::{Error, Result};
use std::fmt;

/// Plain (row, col) coordinate of a cell, without anchoring information
///
/// Used as a map key by the dependency graph and the evaluator caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", CellAddress::new(self.row, self.col))
    }
}

impl From<CellAddress> for CellKey {
    fn from(addr: CellAddress) -> Self {
        Self::new(addr.row, addr.col)
    }
}

/// A cell reference as written in a formula (e.g., "A1", "$B$2")
///
/// Columns use the bijective base-26 letters (A..Z, AA..AZ, BA..) and rows are
/// 1-based decimals. The optional `$` prefix anchors the column or row so that
/// structural edits and fill-drag leave it untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ...)
    pub col: u16,
    pub row_absolute: bool,
    pub col_absolute: bool,
}

impl CellAddress {
    /// A relative address
    pub fn new(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, false, false)
    }

    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Parse an A1-style reference, letters case-insensitive
    ///
    /// Only the syntax is checked; whether the address lies inside a
    /// particular sheet is up to the caller.
    ///
    /// # Examples
    /// ```
    /// use comment_sheet_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$B$2").unwrap();
    /// assert_eq!((addr.row, addr.col), (1, 1));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// assert!(CellAddress::parse("B0").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |why: &str| Error::InvalidAddress(format!("{} in '{}'", why, s));
        let text = s.trim();

        let (col_absolute, rest) = strip_anchor(text);
        let split = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (letters, rest) = rest.split_at(split);
        let col = column_index(letters).ok_or_else(|| invalid("bad column"))?;

        let (row_absolute, digits) = strip_anchor(rest);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("bad row"));
        }
        let row = digits
            .parse::<u32>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(|| invalid("row out of range"))?;

        Ok(Self::with_absolute(row, col, row_absolute, col_absolute))
    }

    /// Format as A1-style text, keeping the `$` anchors
    pub fn to_a1_string(&self) -> String {
        let anchor = |absolute: bool| if absolute { "$" } else { "" };
        format!(
            "{}{}{}{}",
            anchor(self.col_absolute),
            column_letters(self.col),
            anchor(self.row_absolute),
            self.row as u64 + 1
        )
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.row, self.col)
    }
}

fn strip_anchor(s: &str) -> (bool, &str) {
    match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

/// 0 = A, 25 = Z, 26 = AA
fn column_letters(col: u16) -> String {
    let mut letters = Vec::new();
    let mut n = u32::from(col) + 1;
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}

fn column_index(letters: &str) -> Option<u16> {
    if letters.is_empty() {
        return None;
    }
    let n = letters.bytes().try_fold(0u32, |acc, b| {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let n = acc * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1;
        (n <= u32::from(u16::MAX)).then_some(n)
    })?;
    u16::try_from(n - 1).ok()
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

/// A rectangular range of cells, normalized so `start` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// A range spanning both corners in whatever order they are given
    ///
    /// Each corner keeps the anchors of the address it was built from.
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        Self {
            start: CellAddress {
                row: start.row.min(end.row),
                col: start.col.min(end.col),
                ..start
            },
            end: CellAddress {
                row: start.row.max(end.row),
                col: start.col.max(end.col),
                ..end
            },
        }
    }

    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse `A1:B10`, or a lone address as a single-cell range
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().split_once(':') {
            Some((start, end)) => {
                let corner = |text: &str| {
                    CellAddress::parse(text)
                        .map_err(|e| Error::InvalidRange(format!("'{}': {}", s.trim(), e)))
                };
                Ok(Self::new(corner(start)?, corner(end)?))
            }
            None => CellAddress::parse(s).map(Self::single),
        }
    }

    pub fn contains(&self, row: u32, col: u16) -> bool {
        (self.start.row..=self.end.row).contains(&row)
            && (self.start.col..=self.end.col).contains(&col)
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.row_count()) * u64::from(self.col_count())
    }

    /// Every cell key in the range, row by row
    pub fn cells(&self) -> CellRangeIterator {
        CellRangeIterator {
            range: *self,
            next: self.start.key(),
            remaining: self.cell_count(),
        }
    }

    /// `A1:B10`, or just `A1` when both corners coincide
    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start, self.end)
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

/// Row-major walk over a [`CellRange`]
pub struct CellRangeIterator {
    range: CellRange,
    next: CellKey,
    remaining: u64,
}

impl Iterator for CellRangeIterator {
    type Item = CellKey;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let key = self.next;
        if key.col == self.range.end.col {
            self.next = CellKey::new(key.row.saturating_add(1), self.range.start.col);
        } else {
            self.next.col += 1;
        }
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellRangeIterator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        let known = [
            (0, "A"),
            (25, "Z"),
            (26, "AA"),
            (29, "AD"),
            (701, "ZZ"),
            (702, "AAA"),
        ];
        for (col, letters) in known {
            assert_eq!(column_letters(col), letters);
            assert_eq!(column_index(letters), Some(col));
        }
        assert_eq!(column_index("ad"), Some(29));
        assert_eq!(column_index("ZZZZ"), None);
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_cell_address_parse() {
        let addr = CellAddress::parse("B2").unwrap();
        assert_eq!(addr, CellAddress::new(1, 1));

        let addr = CellAddress::parse("$A1").unwrap();
        assert!(addr.col_absolute && !addr.row_absolute);

        let addr = CellAddress::parse("A$1").unwrap();
        assert!(!addr.col_absolute && addr.row_absolute);

        let addr = CellAddress::parse(" ad1000000 ").unwrap();
        assert_eq!((addr.row, addr.col), (999_999, 29));

        for bad in ["", "A", "1", "A0", "A1B", "$$A1", "A$$1", "A-1", "A99999999999"] {
            assert!(CellAddress::parse(bad).is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_cell_address_display() {
        assert_eq!(CellAddress::new(99, 2).to_string(), "C100");
        assert_eq!(CellAddress::with_absolute(0, 0, true, true).to_string(), "$A$1");
        assert_eq!(CellAddress::with_absolute(4, 1, true, false).to_string(), "B$5");
    }

    #[test]
    fn test_cell_range_parse() {
        // Reversed corners are normalized
        let range = CellRange::parse("B2:A1").unwrap();
        assert_eq!(range, CellRange::from_indices(0, 0, 1, 1));
        assert_eq!(range.to_string(), "A1:B2");

        let range = CellRange::parse("$C3").unwrap();
        assert_eq!(range.cell_count(), 1);
        assert_eq!(range.to_string(), "$C3");

        assert!(CellRange::parse("A1:").is_err());
    }

    #[test]
    fn test_cell_range_iterator() {
        let range = CellRange::parse("A1:B2").unwrap();
        let cells: Vec<_> = range.cells().collect();

        assert_eq!(
            cells,
            vec![
                CellKey::new(0, 0),
                CellKey::new(0, 1),
                CellKey::new(1, 0),
                CellKey::new(1, 1),
            ]
        );
        assert_eq!(range.cells().len(), 4);
        assert!(range.contains(1, 1));
        assert!(!range.contains(2, 0));
    }
}
