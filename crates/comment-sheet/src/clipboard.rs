//! Clipboard TSV codec
//!
//! Selections travel as tab-separated raw values, one line per row, each
//! line terminated by a newline. Formatting is not transmitted.

use crate::error::Result;
use crate::sheet::Sheet;
use comment_sheet_core::CellRange;

/// Access to a text clipboard
///
/// The editor supplies the system clipboard; [`MemoryClipboard`] serves
/// tests and headless use.
pub trait ClipboardProvider {
    /// Current clipboard text, if any
    fn read_text(&mut self) -> Result<Option<String>>;
    /// Replace the clipboard contents
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// A clipboard that lives in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl ClipboardProvider for MemoryClipboard {
    fn read_text(&mut self) -> Result<Option<String>> {
        Ok(self.text.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.text = Some(text.to_string());
        Ok(())
    }
}

/// Encode rows of raw values
///
/// ```rust
/// use comment_sheet::clipboard::encode;
///
/// let rows = vec![vec!["x", "y"], vec!["z", "=A1"]];
/// assert_eq!(encode(&rows), "x\ty\nz\t=A1\n");
/// ```
pub fn encode<S: AsRef<str>>(rows: &[Vec<S>]) -> String {
    let mut out = String::new();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                out.push('\t');
            }
            out.push_str(value.as_ref());
        }
        out.push('\n');
    }
    out
}

/// Decode clipboard text into rows of raw values
///
/// One trailing newline (`\n` or `\r\n`) ends the last row rather than
/// starting an empty one.
///
/// ```rust
/// use comment_sheet::clipboard::decode;
///
/// assert_eq!(decode("x\ty\nz\tw\n"), vec![vec!["x", "y"], vec!["z", "w"]]);
/// assert_eq!(decode("single"), vec![vec!["single"]]);
/// assert!(decode("").is_empty());
/// ```
pub fn decode(text: &str) -> Vec<Vec<String>> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text
        .strip_suffix('\n')
        .map(|t| t.strip_suffix('\r').unwrap_or(t))
        .unwrap_or(text);

    body.split('\n')
        .map(|line| {
            line.strip_suffix('\r')
                .unwrap_or(line)
                .split('\t')
                .map(str::to_string)
                .collect()
        })
        .collect()
}

impl Sheet {
    /// Encode the raw values of `range` for the clipboard
    pub fn copy(&self, range: CellRange) -> Result<String> {
        let cells = self.store.snapshot_region(
            range.start.row,
            range.start.col,
            range.end.row,
            range.end.col,
        )?;
        let rows: Vec<Vec<String>> = cells
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.value).collect())
            .collect();
        Ok(encode(&rows))
    }

    /// Copy `range` onto a clipboard
    pub fn copy_to(&self, range: CellRange, clipboard: &mut dyn ClipboardProvider) -> Result<()> {
        let text = self.copy(range)?;
        clipboard.write_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_line_endings() {
        assert_eq!(decode("a\r\nb\r\n"), vec![vec!["a"], vec!["b"]]);
        assert_eq!(decode("\n"), vec![vec![""]]);
        assert_eq!(decode("a\n\n"), vec![vec!["a"], vec![""]]);
        assert_eq!(decode("a\t\tb"), vec![vec!["a", "", "b"]]);
    }

    #[test]
    fn test_trailing_empty_cells_survive() {
        let rows = vec![vec!["a", ""], vec!["", ""]];
        assert_eq!(decode(&encode(&rows)), rows);
    }

    #[test]
    fn test_copy_region() {
        let mut sheet = Sheet::new(5, 3).unwrap();
        sheet.set_value(0, 0, "1").unwrap();
        sheet.set_value(1, 1, "=A1+1").unwrap();

        let range = CellRange::parse("A1:B2").unwrap();
        assert_eq!(sheet.copy(range).unwrap(), "1\t\n\t=A1+1\n");

        let mut clipboard = MemoryClipboard::new();
        sheet.copy_to(range, &mut clipboard).unwrap();
        assert_eq!(clipboard.text(), Some("1\t\n\t=A1+1\n"));

        assert!(sheet.copy(CellRange::parse("A1:D1").unwrap()).is_err());
    }
}
