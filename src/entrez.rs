use std::io::BufReader;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::config::EntrezConfig;
use crate::domain::{AccessionId, OrganismRecord};
use crate::error::LookupError;
use crate::genbank::GenbankRecords;

pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub trait EntrezClient: Send + Sync {
    /// Fetches the nucleotide GenBank records for `ids` in one request and
    /// returns them in the order the service sent them.
    fn fetch_records(&self, ids: &[AccessionId]) -> Result<Vec<OrganismRecord>, LookupError>;
}

#[derive(Clone)]
pub struct EntrezHttpClient {
    client: Client,
    config: EntrezConfig,
}

impl EntrezHttpClient {
    pub fn new(config: EntrezConfig) -> Result<Self, LookupError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("{}/{}", config.tool, env!("CARGO_PKG_VERSION")))
                .map_err(|err| LookupError::InvalidConfig(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| LookupError::EntrezHttp(err.to_string()))?;

        Ok(Self { client, config })
    }

    fn efetch_url(&self) -> String {
        format!("{}/efetch.fcgi", self.config.base_url.trim_end_matches('/'))
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, LookupError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 500;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        debug!(status, attempt, "efetch retrying after status");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        debug!(error = %err, attempt, "efetch retrying after transport error");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(LookupError::EntrezHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, LookupError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "efetch request failed".to_string());
        Err(LookupError::EntrezStatus { status, message })
    }
}

impl EntrezClient for EntrezHttpClient {
    fn fetch_records(&self, ids: &[AccessionId]) -> Result<Vec<OrganismRecord>, LookupError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.efetch_url();
        let params = efetch_params(ids, &self.config);
        debug!(url = %url, ids = ids.len(), "efetch");

        let response = self.send_with_retries(|| self.client.post(&url).form(&params))?;
        let response = Self::handle_status(response)?;
        GenbankRecords::new(BufReader::new(response)).collect()
    }
}

/// Form fields for one efetch call. Sent as a POST body since a full batch of
/// IDs does not fit in a URL.
pub fn efetch_params(ids: &[AccessionId], config: &EntrezConfig) -> Vec<(&'static str, String)> {
    let id_list = ids
        .iter()
        .map(AccessionId::as_str)
        .collect::<Vec<_>>()
        .join(",");
    let mut params = vec![
        ("db", "nucleotide".to_string()),
        ("id", id_list),
        ("rettype", "gb".to_string()),
        ("retmode", "text".to_string()),
        ("tool", config.tool.clone()),
        ("email", config.email.clone()),
    ];
    if let Some(api_key) = &config.api_key {
        params.push(("api_key", api_key.clone()));
    }
    params
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
