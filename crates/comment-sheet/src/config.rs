//! Sheet configuration
//!
//! Every field has a default, so an editor can deserialize a partial JSON
//! object from its own settings:
//!
//! ```rust
//! use comment_sheet::SheetConfig;
//!
//! let config = SheetConfig::from_json(r#"{"rows": 20, "batch": {"chunk_rows": 10}}"#).unwrap();
//! assert_eq!(config.rows, 20);
//! assert_eq!(config.cols, 10);
//! assert_eq!(config.batch.chunk_rows, 10);
//! assert_eq!(config.batch.background_threshold, 10_000);
//! ```

use crate::calculation::CalculationOptions;
use crate::error::Result;
use comment_sheet_core::{MAX_COLS, MAX_ROWS};
use serde::{Deserialize, Serialize};

/// Thresholds for batch operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Operations touching more cells than this run on a worker thread
    pub background_threshold: usize,
    /// Report progress every this many applied mutations
    pub progress_interval: usize,
    /// Rows handed over (and checked for cancellation) per chunk
    pub chunk_rows: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            background_threshold: 10_000,
            progress_interval: 100,
            chunk_rows: 50,
        }
    }
}

/// Configuration of a [`Sheet`](crate::Sheet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Initial number of rows
    pub rows: u32,
    /// Initial number of columns
    pub cols: u16,
    /// Batch operation thresholds
    pub batch: BatchOptions,
    /// Recalculation limits
    pub calculation: CalculationOptions,
    /// Maximum number of undo steps kept; `None` keeps everything
    pub history_limit: Option<usize>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            cols: 10,
            batch: BatchOptions::default(),
            calculation: CalculationOptions::default(),
            history_limit: None,
        }
    }
}

impl SheetConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the initial size
    pub fn with_size(mut self, rows: u32, cols: u16) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    /// Initial size clamped into the supported limits
    pub fn clamped_size(&self) -> (u32, u16) {
        (self.rows.clamp(1, MAX_ROWS), self.cols.clamp(1, MAX_COLS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = SheetConfig::default();
        assert_eq!(config.clamped_size(), (100, 10));
        assert_eq!(config.calculation.max_depth, 256);
        assert_eq!(config.calculation.max_nesting, 64);
        assert_eq!(config.calculation.max_sweeps, None);
        assert_eq!(config.history_limit, None);
    }

    #[test]
    fn test_size_is_clamped() {
        let config = SheetConfig::default().with_size(0, 99);
        assert_eq!(config.clamped_size(), (1, MAX_COLS));
        let config = SheetConfig::default().with_size(u32::MAX, 3);
        assert_eq!(config.clamped_size(), (MAX_ROWS, 3));
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(SheetConfig::from_json("{}").unwrap(), SheetConfig::default());
        assert!(SheetConfig::from_json("{\"rows\": \"many\"}").is_err());
    }
}
