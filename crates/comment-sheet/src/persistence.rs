//! JSON persistence for comment tables
//!
//! A sheet is stored as
//! `{"metadata": {...}, "table_data": [[CellSnapshot, ...], ...]}`. Only raw
//! values and formats are persisted; displays and the dependency graph are
//! rebuilt by a recalc after loading.
//!
//! Project files hold many sheets under `comments.<number>`. [`ProjectFile`]
//! edits those entries and leaves every other key of the project alone.

use crate::config::SheetConfig;
use crate::error::{Error, Result};
use crate::sheet::Sheet;
use comment_sheet_core::{CellSnapshot, CellStore, MAX_COLS, MAX_ROWS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Version written into new documents
pub const FORMAT_VERSION: u32 = 1;

/// Document metadata
///
/// Keys other than the size and version are kept as they were loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The persisted form of one sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetDocument {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub table_data: Vec<Vec<CellSnapshot>>,
}

impl SheetDocument {
    /// Parse a document from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Sheet size described by this document
    ///
    /// Missing metadata falls back to the table's extent, grown to at least
    /// the configured default size.
    pub fn size(&self, config: &SheetConfig) -> (u32, u16) {
        let (default_rows, default_cols) = config.clamped_size();
        let table_rows = u32::try_from(self.table_data.len()).unwrap_or(u32::MAX);
        let table_cols = self
            .table_data
            .iter()
            .map(|row| row.len())
            .max()
            .unwrap_or(0);
        let table_cols = u16::try_from(table_cols).unwrap_or(u16::MAX);

        let rows = self.metadata.rows.unwrap_or(table_rows.max(default_rows));
        let cols = self.metadata.cols.unwrap_or(table_cols.max(default_cols));
        (rows, cols)
    }

    /// Check the document and build the store it describes
    fn build_store(&self, config: &SheetConfig) -> Result<CellStore> {
        let (rows, cols) = self.size(config);
        if rows == 0 || cols == 0 || rows > MAX_ROWS || cols > MAX_COLS {
            return Err(Error::InvalidDocument(format!(
                "size {}x{} is outside 1..={} rows and 1..={} columns",
                rows, cols, MAX_ROWS, MAX_COLS
            )));
        }
        if self.table_data.len() > rows as usize {
            return Err(Error::InvalidDocument(format!(
                "table_data has {} rows but metadata says {}",
                self.table_data.len(),
                rows
            )));
        }

        let mut store = CellStore::new(rows, cols)?;
        for (r, cells) in self.table_data.iter().enumerate() {
            if cells.len() > cols as usize {
                return Err(Error::InvalidDocument(format!(
                    "row {} has {} cells but metadata says {} columns",
                    r,
                    cells.len(),
                    cols
                )));
            }
            for (c, snapshot) in cells.iter().enumerate() {
                if !snapshot.is_empty() {
                    store.set(r as u32, c as u16, snapshot.clone())?;
                }
            }
        }
        Ok(store)
    }
}

impl Sheet {
    /// The persisted form of this sheet
    pub fn to_document(&self) -> SheetDocument {
        SheetDocument {
            metadata: Metadata {
                rows: Some(self.row_count()),
                cols: Some(self.col_count()),
                version: Some(FORMAT_VERSION),
                extra: self.metadata.clone(),
            },
            table_data: self.to_table(),
        }
    }

    /// Replace the sheet's contents with a loaded document
    ///
    /// History is cleared. A document that does not describe a valid sheet
    /// leaves the sheet empty and is reported as an error; nothing of it is
    /// kept.
    pub fn load_document(&mut self, document: SheetDocument) -> Result<()> {
        match document.build_store(&self.config) {
            Ok(store) => {
                log::debug!(
                    "loaded sheet {}x{}",
                    store.row_count(),
                    store.col_count()
                );
                self.replace_store(store);
                self.metadata = document.metadata.extra;
                Ok(())
            }
            Err(e) => Err(self.fail_load(e)),
        }
    }

    /// Load from a JSON value, as found in a project file
    pub fn load_value(&mut self, value: Value) -> Result<()> {
        match serde_json::from_value::<SheetDocument>(value) {
            Ok(document) => self.load_document(document),
            Err(e) => Err(self.fail_load(e.into())),
        }
    }

    /// Load from JSON text
    pub fn load_json(&mut self, text: &str) -> Result<()> {
        match SheetDocument::from_json(text) {
            Ok(document) => self.load_document(document),
            Err(e) => Err(self.fail_load(e)),
        }
    }

    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String> {
        self.to_document().to_json()
    }

    fn fail_load(&mut self, error: Error) -> Error {
        log::warn!("resetting sheet after failed load");
        self.reset();
        self.fail(error)
    }
}

/// An editor project file holding comment tables under `comments.<number>`
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFile {
    root: Map<String, Value>,
}

impl Default for ProjectFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectFile {
    /// An empty project
    pub fn new() -> Self {
        Self { root: Map::new() }
    }

    /// Wrap a parsed project; the root must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(Error::InvalidDocument(format!(
                "project root must be an object, found {}",
                kind_name(&other)
            ))),
        }
    }

    /// Parse a project from JSON text
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Read a project file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    /// Write the project to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    fn comments(&self) -> Option<&Map<String, Value>> {
        self.root.get("comments").and_then(Value::as_object)
    }

    /// Numbers of the stored comment tables, ascending
    ///
    /// Keys that are not numbers are ignored.
    pub fn comment_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .comments()
            .map(|comments| comments.keys().filter_map(|k| k.parse().ok()).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// The comment table stored under `number`
    pub fn comment(&self, number: u32) -> Result<SheetDocument> {
        let value = self
            .comments()
            .and_then(|comments| comments.get(&number.to_string()))
            .ok_or(Error::CommentNotFound(number))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Store a comment table under `number`, replacing any previous one
    pub fn set_comment(&mut self, number: u32, document: &SheetDocument) -> Result<()> {
        let value = serde_json::to_value(document)?;
        let comments = self
            .root
            .entry("comments")
            .or_insert_with(|| Value::Object(Map::new()));
        match comments {
            Value::Object(map) => {
                map.insert(number.to_string(), value);
                Ok(())
            }
            other => Err(Error::InvalidDocument(format!(
                "\"comments\" must be an object, found {}",
                kind_name(other)
            ))),
        }
    }

    /// Remove the comment table under `number`; returns whether one existed
    pub fn remove_comment(&mut self, number: u32) -> bool {
        self.root
            .get_mut("comments")
            .and_then(Value::as_object_mut)
            .and_then(|comments| comments.remove(&number.to_string()))
            .is_some()
    }

    /// Open the comment table under `number` as a sheet
    pub fn open_sheet(&self, number: u32, config: SheetConfig) -> Result<Sheet> {
        let document = self.comment(number)?;
        let mut sheet = Sheet::with_config(config)?;
        sheet.load_document(document)?;
        Ok(sheet)
    }

    /// Store a sheet under `number`
    pub fn store_sheet(&mut self, number: u32, sheet: &Sheet) -> Result<()> {
        self.set_comment(number, &sheet.to_document())
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
