use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::chunk::{batch_count, batches};
use crate::config::LookupConfig;
use crate::domain::{AccessionCell, AccessionId, AlignMode};
use crate::entrez::EntrezClient;
use crate::error::LookupError;
use crate::resolver::OrganismResolver;
use crate::table::Table;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input_path: String,
    pub rows: usize,
    pub accessions: usize,
    pub batches: usize,
    pub resolved: usize,
    pub blank_rows: usize,
    pub column: String,
    pub align: AlignMode,
    pub finished_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct LookupApp<C: EntrezClient> {
    resolver: OrganismResolver<C>,
    config: LookupConfig,
}

impl<C: EntrezClient> LookupApp<C> {
    pub fn new(client: C, config: LookupConfig) -> Self {
        Self {
            resolver: OrganismResolver::new(client),
            config,
        }
    }

    /// Loads `path`, resolves every accession in its second column and writes
    /// the organism names back into the same file.
    pub fn run(&self, path: &Utf8Path, sink: &dyn ProgressSink) -> Result<RunSummary, LookupError> {
        emit(sink, "Starting looker upper.".to_string());
        emit(sink, format!("Looking up Accession Numbers from file: {path}"));

        let mut table = Table::load(path, self.config.delimiter)?;
        let cells = table.accession_cells()?;
        let accessions: Vec<AccessionId> =
            cells.iter().map(|cell| cell.accession.clone()).collect();
        emit(
            sink,
            format!("Found this many Accession Numbers: {}", accessions.len()),
        );
        info!(
            path = %path,
            rows = table.row_count(),
            accessions = accessions.len(),
            "input loaded"
        );

        let batch_size = self.config.batch_size;
        let total_batches = batch_count(accessions.len(), batch_size);
        let mut names = Vec::with_capacity(accessions.len());
        for (index, batch) in batches(&accessions, batch_size).enumerate() {
            emit(
                sink,
                format!(
                    "Calling api with a max chunk size of {batch_size}. Current index at: {}",
                    index * batch_size
                ),
            );
            let batch_names = self.resolver.resolve(batch)?;
            emit(
                sink,
                format!("Got this many organism names on this trip: {}", batch_names.len()),
            );
            names.extend(batch_names);
            emit(
                sink,
                format!("Total organism names collected so far: {}", names.len()),
            );
            info!(
                batch = index + 1,
                of = total_batches,
                collected = names.len(),
                "batch resolved"
            );
        }
        emit(
            sink,
            format!("Got back this many organism names: {}", names.len()),
        );

        let resolved = names.len();
        let column = align_names(&cells, names, table.row_count(), self.config.align);
        let blank_rows = column.iter().filter(|value| value.is_none()).count();
        if blank_rows > 0 {
            warn!(
                blank_rows,
                align = %self.config.align,
                "some rows received no organism name"
            );
        }
        table.set_column(&self.config.column_name, &column);

        emit(sink, format!("Writing values back into file: {path}"));
        table.write()?;

        Ok(RunSummary {
            input_path: path.to_string(),
            rows: table.row_count(),
            accessions: accessions.len(),
            batches: total_batches,
            resolved,
            blank_rows,
            column: self.config.column_name.clone(),
            align: self.config.align,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Lays the resolved names out over `rows` table rows.
///
/// `names[i]` belongs to `cells[i]`. In `RowKey` mode it lands on that cell's
/// row; in `Positional` mode it lands on row `i`, whatever row the accession
/// was read from.
pub fn align_names(
    cells: &[AccessionCell],
    names: Vec<String>,
    rows: usize,
    mode: AlignMode,
) -> Vec<Option<String>> {
    let mut column = vec![None; rows];
    match mode {
        AlignMode::RowKey => {
            for (cell, name) in cells.iter().zip(names) {
                if let Some(slot) = column.get_mut(cell.row_index) {
                    *slot = Some(name);
                }
            }
        }
        AlignMode::Positional => {
            for (slot, name) in column.iter_mut().zip(names) {
                *slot = Some(name);
            }
        }
    }
    column
}

fn emit(sink: &dyn ProgressSink, message: String) {
    sink.event(ProgressEvent { message });
}
