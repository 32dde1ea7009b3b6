//! Data loading utilities

use crate::error::{PrepError, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::num::NonZeroUsize;
use std::path::Path;

/// Data loader for CSV files and JSON records
pub struct DataLoader {
    /// Rows scanned to infer column types
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
        }
    }

    /// Set how many rows or records are scanned for type inference
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let file = File::open(path.as_ref())?;

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| PrepError::DataError(e.to_string()))
    }

    /// Load a JSON file holding one record object or an array of them
    pub fn load_json(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let json = std::fs::read_to_string(path.as_ref())?;
        self.read_json_records(&json)
    }

    /// Build a table from a single JSON record or an array of records.
    ///
    /// Column types are inferred by polars; absent keys and `null` become nulls.
    pub fn read_json_records(&self, json: &str) -> Result<DataFrame> {
        let json = json.trim();
        let records = match json.as_bytes().first() {
            Some(b'{') => format!("[{json}]"),
            Some(b'[') => json.to_string(),
            _ => {
                return Err(PrepError::DataError(
                    "expected a JSON object or an array of objects".to_string(),
                ))
            }
        };

        JsonReader::new(Cursor::new(records.into_bytes()))
            .with_json_format(JsonFormat::Json)
            .infer_schema_len(NonZeroUsize::new(self.infer_schema_length))
            .finish()
            .map_err(|e| PrepError::DataError(e.to_string()))
    }

    /// Pick the loader from the file extension; anything else is read as CSV
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let df = match ext.as_str() {
            "json" => self.load_json(path)?,
            _ => self.load_csv(path)?,
        };
        tracing::debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded data");
        Ok(df)
    }
}

/// Save a DataFrame to CSV
pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path.as_ref())?;

    CsvWriter::new(&mut file)
        .finish(df)
        .map_err(|e| PrepError::DataError(e.to_string()))
}
