use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use organism_lookup::app::LookupApp;
use organism_lookup::config::{ConfigFile, ConfigLoader, LookupConfig, Overrides};
use organism_lookup::domain::{AccessionId, AlignMode, OrganismRecord};
use organism_lookup::entrez::EntrezClient;
use organism_lookup::error::LookupError;
use organism_lookup::output::JsonOutput;

#[derive(Default)]
struct MockEntrez {
    organisms: HashMap<String, String>,
    batches: Mutex<Vec<usize>>,
}

impl MockEntrez {
    fn with(pairs: &[(&str, &str)]) -> Self {
        Self {
            organisms: pairs
                .iter()
                .map(|(acc, org)| (acc.to_string(), org.to_string()))
                .collect(),
            batches: Mutex::new(Vec::new()),
        }
    }
}

impl EntrezClient for MockEntrez {
    fn fetch_records(&self, ids: &[AccessionId]) -> Result<Vec<OrganismRecord>, LookupError> {
        self.batches.lock().unwrap().push(ids.len());
        // Entrez collapses repeated IDs and may reorder; mimic that.
        let mut unique: Vec<&AccessionId> = ids.iter().collect();
        unique.sort_by(|a, b| b.as_str().cmp(a.as_str()));
        unique.dedup();
        Ok(unique
            .into_iter()
            .filter_map(|id| {
                self.organisms.get(id.as_str()).map(|organism| OrganismRecord {
                    accession: id.as_str().to_string(),
                    version: Some(format!("{}.1", id.as_str())),
                    secondary: Vec::new(),
                    organism: organism.clone(),
                })
            })
            .collect())
    }
}

struct FailingEntrez;

impl EntrezClient for FailingEntrez {
    fn fetch_records(&self, _ids: &[AccessionId]) -> Result<Vec<OrganismRecord>, LookupError> {
        Err(LookupError::EntrezHttp("connection reset".to_string()))
    }
}

fn config(align: AlignMode) -> LookupConfig {
    ConfigLoader::resolve(
        ConfigFile::default(),
        Overrides {
            email: Some("me@example.org".to_string()),
            api_key: None,
            align: Some(align),
        },
    )
    .unwrap()
}

fn input(dir: &tempfile::TempDir, content: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("accessions.csv")).unwrap();
    fs::write(path.as_std_path(), content).unwrap();
    path
}

#[test]
fn writes_organism_column_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = input(&dir, "id,accession\n1,AB123456\n2,AB654321\n");
    let client = MockEntrez::with(&[("AB123456", "Homo sapiens"), ("AB654321", "Mus musculus")]);
    let app = LookupApp::new(client, config(AlignMode::RowKey));

    let summary = app.run(&path, &JsonOutput).unwrap();

    let written = fs::read_to_string(path.as_std_path()).unwrap();
    assert_eq!(
        written,
        "id,accession,taxonomy unmapped\n1,AB123456,Homo sapiens\n2,AB654321,Mus musculus\n"
    );
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.resolved, 2);
    assert_eq!(summary.batches, 1);
    assert_eq!(summary.blank_rows, 0);
}

#[test]
fn rerun_overwrites_column_instead_of_adding_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = input(&dir, "id,accession\n1,AB123456\n2,AB654321\n");
    let client = MockEntrez::with(&[("AB123456", "Homo sapiens"), ("AB654321", "Mus musculus")]);
    let app = LookupApp::new(client, config(AlignMode::RowKey));

    app.run(&path, &JsonOutput).unwrap();
    let first = fs::read_to_string(path.as_std_path()).unwrap();
    app.run(&path, &JsonOutput).unwrap();
    let second = fs::read_to_string(path.as_std_path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.lines().next(), Some("id,accession,taxonomy unmapped"));
}

#[test]
fn duplicates_and_whitespace_are_handled() {
    let dir = tempfile::tempdir().unwrap();
    let path = input(&dir, "id,accession\n1,  X1 \n2,X1\n3,X2\n");
    let client = MockEntrez::with(&[("X1", "Danio rerio"), ("X2", "Gallus gallus")]);
    let app = LookupApp::new(client, config(AlignMode::RowKey));

    app.run(&path, &JsonOutput).unwrap();

    let written = fs::read_to_string(path.as_std_path()).unwrap();
    let rows: Vec<&str> = written.lines().skip(1).collect();
    assert_eq!(
        rows,
        vec![
            "1,  X1 ,Danio rerio",
            "2,X1,Danio rerio",
            "3,X2,Gallus gallus"
        ]
    );
}

#[test]
fn blank_accession_row_stays_blank_with_row_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = input(&dir, "id,accession\n1,X1\n2,  \n3,X2\n");
    let client = MockEntrez::with(&[("X1", "Danio rerio"), ("X2", "Gallus gallus")]);
    let app = LookupApp::new(client, config(AlignMode::RowKey));

    let summary = app.run(&path, &JsonOutput).unwrap();

    let written = fs::read_to_string(path.as_std_path()).unwrap();
    let rows: Vec<&str> = written.lines().skip(1).collect();
    assert_eq!(rows, vec!["1,X1,Danio rerio", "2,  ,", "3,X2,Gallus gallus"]);
    assert_eq!(summary.accessions, 2);
    assert_eq!(summary.blank_rows, 1);
}

#[test]
fn positional_mode_keeps_legacy_shift() {
    let dir = tempfile::tempdir().unwrap();
    let path = input(&dir, "id,accession\n1,X1\n2,\n3,X2\n");
    let client = MockEntrez::with(&[("X1", "Danio rerio"), ("X2", "Gallus gallus")]);
    let app = LookupApp::new(client, config(AlignMode::Positional));

    app.run(&path, &JsonOutput).unwrap();

    let written = fs::read_to_string(path.as_std_path()).unwrap();
    let rows: Vec<&str> = written.lines().skip(1).collect();
    assert_eq!(rows, vec!["1,X1,Danio rerio", "2,,Gallus gallus", "3,X2,"]);
}

#[test]
fn batches_split_at_configured_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = String::from("id,accession\n");
    let mut pairs = Vec::new();
    for i in 0..7 {
        content.push_str(&format!("{i},ACC{i}\n"));
        pairs.push((format!("ACC{i}"), format!("Species {i}")));
    }
    let path = input(&dir, &content);
    let refs: Vec<(&str, &str)> = pairs.iter().map(|(a, o)| (a.as_str(), o.as_str())).collect();
    let client = MockEntrez::with(&refs);

    let mut config = config(AlignMode::RowKey);
    config.batch_size = 3;
    let app = LookupApp::new(client, config);
    let summary = app.run(&path, &JsonOutput).unwrap();

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.resolved, 7);
    let written = fs::read_to_string(path.as_std_path()).unwrap();
    assert!(written.lines().nth(7).unwrap().ends_with(",ACC6,Species 6"));
}

#[test]
fn missing_record_aborts_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let original = "id,accession\n1,X1\n2,X9\n";
    let path = input(&dir, original);
    let client = MockEntrez::with(&[("X1", "Danio rerio")]);
    let app = LookupApp::new(client, config(AlignMode::RowKey));

    let err = app.run(&path, &JsonOutput).unwrap_err();

    assert_matches!(err, LookupError::RecordCountMismatch { requested: 2, returned: 1, .. });
    assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), original);
}

#[test]
fn transport_error_aborts_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let original = "id,accession\n1,X1\n";
    let path = input(&dir, original);
    let app = LookupApp::new(FailingEntrez, config(AlignMode::RowKey));

    let err = app.run(&path, &JsonOutput).unwrap_err();

    assert_matches!(err, LookupError::EntrezHttp(_));
    assert!(err.is_remote());
    assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), original);
}

#[test]
fn missing_input_file_is_reported_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.csv")).unwrap();
    let app = LookupApp::new(FailingEntrez, config(AlignMode::RowKey));

    let err = app.run(&path, &JsonOutput).unwrap_err();

    assert_matches!(err, LookupError::InputNotFound(_));
    assert!(!path.as_std_path().exists());
}
