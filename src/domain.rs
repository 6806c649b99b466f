use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Header of the column the resolved organism names are written to.
pub const TAXONOMY_COLUMN: &str = "taxonomy unmapped";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessionId(String);

impl AccessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-folded form used to match returned records to requests.
    pub fn key(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl fmt::Display for AccessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccessionId {
    type Err = LookupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LookupError::InvalidAccession(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// An accession together with the data row (zero-based, header excluded) it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessionCell {
    pub row_index: usize,
    pub accession: AccessionId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganismRecord {
    pub accession: String,
    pub version: Option<String>,
    /// Secondary accessions listed after the primary one on the ACCESSION line.
    pub secondary: Vec<String>,
    pub organism: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignMode {
    /// Each name goes back to the row its accession was read from.
    #[default]
    RowKey,
    /// Names are assigned by position over all rows, blank accession cells included.
    Positional,
}

impl fmt::Display for AlignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignMode::RowKey => write!(f, "rowkey"),
            AlignMode::Positional => write!(f, "positional"),
        }
    }
}
