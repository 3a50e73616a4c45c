use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::debug;

use crate::config::DataConfig;
use crate::error::EtlError;
use crate::loader::{filter_headers, filter_lines, run_sql, LoadParams, RecordSource};

/// Record source reading the movement tables from CSV exports.
///
/// Files are re-read on every fetch; repeated requests are absorbed by the
/// dashboard's query cache.
#[derive(Debug, Clone)]
pub struct CsvSource {
    base_path: PathBuf,
    headers_file: String,
    lines_file: String,
    rename: Option<HashMap<String, String>>,
}

impl CsvSource {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let defaults = DataConfig::default();
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            headers_file: defaults.headers_file,
            lines_file: defaults.lines_file,
            rename: None,
        }
    }

    pub fn from_config(data: &DataConfig) -> Self {
        Self {
            base_path: data.base_path.clone(),
            headers_file: data.headers_file.clone(),
            lines_file: data.lines_file.clone(),
            rename: None,
        }
    }

    pub fn with_files(mut self, headers_file: &str, lines_file: &str) -> Self {
        self.headers_file = headers_file.to_string();
        self.lines_file = lines_file.to_string();
        self
    }

    /// Rename source columns on read, e.g. lowercase exports to the ERP names.
    pub fn with_rename(mut self, rename: HashMap<String, String>) -> Self {
        self.rename = Some(rename);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Read a CSV file with all columns as String dtype.
    /// Trims whitespace from column names and applies the optional rename.
    fn read_csv_as_strings(&self, filename: &str) -> Result<DataFrame, EtlError> {
        let path = self.base_path.join(filename);
        debug!(path = %path.display(), "reading csv");
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path))?
            .finish()?;

        let trimmed: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        df.set_column_names(trimmed.as_slice())?;

        if let Some(map) = &self.rename {
            let present: Vec<(&str, &str)> = map
                .iter()
                .filter(|(old, _)| df.column(old.as_str()).is_ok())
                .map(|(old, new)| (old.as_str(), new.as_str()))
                .collect();
            if !present.is_empty() {
                let old: Vec<&str> = present.iter().map(|(o, _)| *o).collect();
                let new: Vec<&str> = present.iter().map(|(_, n)| *n).collect();
                df = df.lazy().rename(old, new, true).collect()?;
            }
        }

        Ok(df)
    }
}

impl RecordSource for CsvSource {
    fn fetch_headers(&self, params: &LoadParams) -> Result<DataFrame, EtlError> {
        let raw = self.read_csv_as_strings(&self.headers_file)?;
        filter_headers(raw, params)
    }

    fn fetch_lines(&self, params: &LoadParams) -> Result<DataFrame, EtlError> {
        let raw = self.read_csv_as_strings(&self.lines_file)?;
        filter_lines(raw, params)
    }

    /// Free-form SQL over `romaneios_dbf` and `romaneios_itens_dbf`.
    ///
    /// Tables are registered untyped, exactly as read from disk.
    fn run_query(&self, query: &str) -> Result<DataFrame, EtlError> {
        let headers = self.read_csv_as_strings(&self.headers_file)?;
        let lines = self.read_csv_as_strings(&self.lines_file)?;
        run_sql(query, headers, lines)
    }
}
