use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, WriterBuilder};
use tempfile::Builder;
use tracing::debug;

use crate::domain::{AccessionCell, AccessionId};
use crate::error::LookupError;

/// Zero-based index of the column holding accession numbers.
pub const ACCESSION_COLUMN: usize = 1;

/// A delimited text file held in memory: one header row and the data rows.
#[derive(Debug, Clone)]
pub struct Table {
    path: Utf8PathBuf,
    delimiter: u8,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn load(path: &Utf8Path, delimiter: Option<u8>) -> Result<Self, LookupError> {
        if !path.as_std_path().is_file() {
            return Err(LookupError::InputNotFound(path.to_path_buf()));
        }
        let delimiter = delimiter.unwrap_or_else(|| default_delimiter(path));

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_path(path.as_std_path())
            .map_err(|err| LookupError::InputRead {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        let headers = reader
            .headers()
            .map_err(|err| parse_error(path, err))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| parse_error(path, err))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            path: path.to_path_buf(),
            delimiter,
            headers,
            rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Accessions from the second column, trimmed, with blank cells left out.
    /// Each keeps the index of the row it came from.
    pub fn accession_cells(&self) -> Result<Vec<AccessionCell>, LookupError> {
        if self.headers.len() <= ACCESSION_COLUMN {
            return Err(LookupError::MissingAccessionColumn(self.path.clone()));
        }
        Ok(self
            .rows
            .iter()
            .enumerate()
            .filter_map(|(row_index, row)| {
                let accession = row.get(ACCESSION_COLUMN)?.parse::<AccessionId>().ok()?;
                Some(AccessionCell {
                    row_index,
                    accession,
                })
            })
            .collect())
    }

    /// Writes `values` into the column named `name`, one per row. The column is
    /// appended unless a column with that header already exists. Rows beyond
    /// `values` and `None` entries get an empty cell.
    pub fn set_column(&mut self, name: &str, values: &[Option<String>]) {
        let column = match self.headers.iter().position(|header| header == name) {
            Some(index) => index,
            None => {
                self.headers.push(name.to_string());
                self.headers.len() - 1
            }
        };
        let width = self.headers.len();
        for (index, row) in self.rows.iter_mut().enumerate() {
            if row.len() < width {
                row.resize(width, String::new());
            }
            row[column] = values
                .get(index)
                .and_then(|value| value.clone())
                .unwrap_or_default();
        }
    }

    /// Overwrites the source file. The table is written to a temp file next to
    /// it first and then moved into place.
    pub fn write(&self) -> Result<(), LookupError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };
        let temp = Builder::new()
            .prefix(".organism-lookup")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| self.write_error(err))?;

        {
            let mut writer = WriterBuilder::new()
                .delimiter(self.delimiter)
                .flexible(true)
                .from_writer(temp.as_file());
            writer
                .write_record(&self.headers)
                .map_err(|err| self.write_error(err))?;
            for row in &self.rows {
                writer
                    .write_record(row)
                    .map_err(|err| self.write_error(err))?;
            }
            writer.flush().map_err(|err| self.write_error(err))?;
        }

        // keep the original file's permissions on the replacement
        if let Ok(metadata) = fs::metadata(self.path.as_std_path()) {
            if let Err(err) = fs::set_permissions(temp.path(), metadata.permissions()) {
                debug!(path = %self.path, error = %err, "could not copy permissions to replacement file");
            }
        }
        temp.persist(self.path.as_std_path())
            .map_err(|err| self.write_error(err))?;
        Ok(())
    }

    fn write_error(&self, err: impl std::fmt::Display) -> LookupError {
        LookupError::OutputWrite {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }
}

fn default_delimiter(path: &Utf8Path) -> u8 {
    match path.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}

fn parse_error(path: &Utf8Path, err: csv::Error) -> LookupError {
    LookupError::InputParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
