use std::collections::HashMap;

use tracing::debug;

use crate::domain::{AccessionId, OrganismRecord};
use crate::entrez::EntrezClient;
use crate::error::LookupError;

/// Most missing accessions listed in a count-mismatch error.
const MAX_MISSING_REPORTED: usize = 20;

/// Turns one batch of accessions into organism names through an Entrez client.
pub struct OrganismResolver<C: EntrezClient> {
    client: C,
}

impl<C: EntrezClient> OrganismResolver<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Returns one organism name per entry of `batch`, in the same order.
    ///
    /// Records are matched to requests by accession (with or without version,
    /// primary or secondary), not by position. Any requested accession without a matching record
    /// fails the whole batch.
    pub fn resolve(&self, batch: &[AccessionId]) -> Result<Vec<String>, LookupError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let records = self.client.fetch_records(batch)?;
        debug!(
            requested = batch.len(),
            returned = records.len(),
            "efetch batch parsed"
        );
        match_records(batch, &records)
    }
}

pub fn match_records(
    batch: &[AccessionId],
    records: &[OrganismRecord],
) -> Result<Vec<String>, LookupError> {
    let mut by_key: HashMap<String, &str> = HashMap::with_capacity(records.len() * 2);
    for record in records {
        by_key
            .entry(record.accession.to_ascii_uppercase())
            .or_insert(record.organism.as_str());
        if let Some(version) = &record.version {
            by_key
                .entry(version.to_ascii_uppercase())
                .or_insert(record.organism.as_str());
        }
    }
    // Secondary accessions only fill gaps; a primary match always wins.
    for record in records {
        for secondary in &record.secondary {
            by_key
                .entry(secondary.to_ascii_uppercase())
                .or_insert(record.organism.as_str());
        }
    }

    let mut names = Vec::with_capacity(batch.len());
    let mut missing = Vec::new();
    for id in batch {
        match by_key.get(&id.key()) {
            Some(organism) => names.push((*organism).to_string()),
            None => missing.push(id.as_str().to_string()),
        }
    }

    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        missing.truncate(MAX_MISSING_REPORTED);
        return Err(LookupError::RecordCountMismatch {
            requested: batch.len(),
            returned: records.len(),
            missing,
        });
    }
    Ok(names)
}
