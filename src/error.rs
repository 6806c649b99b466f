use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LookupError {
    #[error("Couldn't find file: {0}.")]
    InputNotFound(Utf8PathBuf),

    #[error("failed to read input file {path}: {message}")]
    InputRead { path: Utf8PathBuf, message: String },

    #[error("failed to parse input file {path}: {message}")]
    InputParse { path: Utf8PathBuf, message: String },

    #[error("input file {0} has no second column to read accession numbers from")]
    #[diagnostic(help("accession numbers are read from the SECOND column of the file"))]
    MissingAccessionColumn(Utf8PathBuf),

    #[error("invalid accession number: {0:?}")]
    InvalidAccession(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("Entrez request failed: {0}")]
    EntrezHttp(String),

    #[error("Entrez returned status {status}: {message}")]
    EntrezStatus { status: u16, message: String },

    #[error("malformed GenBank record: {0}")]
    GenbankParse(String),

    #[error(
        "Entrez returned {returned} records for {requested} requested accessions; missing: {}",
        .missing.join(", ")
    )]
    #[diagnostic(help("check that every accession in the second column exists in the nucleotide database"))]
    RecordCountMismatch {
        requested: usize,
        returned: usize,
        missing: Vec<String>,
    },

    #[error("failed to write output file {path}: {message}")]
    OutputWrite { path: Utf8PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read contact email: {0}")]
    Prompt(String),
}

impl LookupError {
    /// True for failures that originate on the remote side of the run.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            LookupError::EntrezHttp(_)
                | LookupError::EntrezStatus { .. }
                | LookupError::GenbankParse(_)
                | LookupError::RecordCountMismatch { .. }
        )
    }
}
