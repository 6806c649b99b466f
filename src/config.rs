use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::chunk::DEFAULT_BATCH_SIZE;
use crate::domain::{AlignMode, TAXONOMY_COLUMN};
use crate::entrez::EUTILS_BASE;
use crate::error::LookupError;

pub const CONFIG_FILE_NAME: &str = "organism-lookup.json";
pub const DEFAULT_TOOL: &str = "organism-lookup";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// On-disk config. Every key is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub column_name: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Values that come from the command line or environment and win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub email: Option<String>,
    pub api_key: Option<String>,
    pub align: Option<AlignMode>,
}

/// Everything the Entrez client needs to identify itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrezConfig {
    pub email: String,
    pub tool: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub entrez: EntrezConfig,
    pub batch_size: usize,
    pub column_name: String,
    pub delimiter: Option<u8>,
    pub align: AlignMode,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file. An explicit path must exist; otherwise
    /// `./organism-lookup.json` and then the user config dir are tried, and a
    /// missing file yields the defaults.
    pub fn load(path: Option<&Utf8Path>) -> Result<ConfigFile, LookupError> {
        let config_path = match path {
            Some(path) => {
                if !path.as_std_path().is_file() {
                    return Err(LookupError::ConfigRead(path.to_path_buf()));
                }
                path.to_path_buf()
            }
            None => match Self::discover() {
                Some(path) => path,
                None => return Ok(ConfigFile::default()),
            },
        };

        tracing::debug!(path = %config_path, "reading config");
        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| LookupError::ConfigRead(config_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<ConfigFile, LookupError> {
        serde_json::from_str(content).map_err(|err| LookupError::ConfigParse(err.to_string()))
    }

    fn discover() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(CONFIG_FILE_NAME);
        if local.as_std_path().is_file() {
            return Some(local);
        }
        ProjectDirs::from("", "", "organism-lookup")
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.config_dir().join(CONFIG_FILE_NAME)).ok())
            .filter(|path| path.as_std_path().is_file())
    }

    pub fn resolve(file: ConfigFile, overrides: Overrides) -> Result<LookupConfig, LookupError> {
        let email = overrides
            .email
            .or(file.email)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| LookupError::InvalidConfig("a contact email is required".to_string()))?;

        let api_key = overrides
            .api_key
            .or(file.api_key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let batch_size = file.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(LookupError::InvalidConfig(
                "batch_size must be greater than zero".to_string(),
            ));
        }

        let column_name = file
            .column_name
            .unwrap_or_else(|| TAXONOMY_COLUMN.to_string());
        if column_name.trim().is_empty() {
            return Err(LookupError::InvalidConfig(
                "column_name must not be empty".to_string(),
            ));
        }

        let delimiter = file.delimiter.as_deref().map(parse_delimiter).transpose()?;

        Ok(LookupConfig {
            entrez: EntrezConfig {
                email,
                tool: file.tool.unwrap_or_else(|| DEFAULT_TOOL.to_string()),
                api_key,
                base_url: file.base_url.unwrap_or_else(|| EUTILS_BASE.to_string()),
                timeout_secs: file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
            batch_size,
            column_name,
            delimiter,
            align: overrides.align.unwrap_or_default(),
        })
    }
}

fn parse_delimiter(value: &str) -> Result<u8, LookupError> {
    let value = match value {
        "\\t" | "tab" => "\t",
        other => other,
    };
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(LookupError::InvalidConfig(format!(
            "delimiter must be a single ASCII character, got {value:?}"
        ))),
    }
}
