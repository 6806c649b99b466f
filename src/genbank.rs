//! Streaming reader for GenBank flat-file text as returned by
//! `efetch?db=nucleotide&rettype=gb&retmode=text`.
//!
//! Only the header fields needed for organism lookup are kept: the primary
//! accession, the versioned accession, and the organism name from the
//! `ORGANISM` sub-keyword of `SOURCE`. Everything else is skipped.

use std::io::{BufRead, Lines};

use crate::domain::OrganismRecord;
use crate::error::LookupError;

const CONTINUATION: &str = "            ";

pub struct GenbankRecords<R> {
    lines: Lines<R>,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> GenbankRecords<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            done: false,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, LookupError> {
        match self.lines.next() {
            Some(Ok(line)) => {
                self.line_no += 1;
                Ok(Some(line))
            }
            Some(Err(err)) => Err(LookupError::GenbankParse(format!(
                "read failed after line {}: {err}",
                self.line_no
            ))),
            None => Ok(None),
        }
    }

    fn read_record(&mut self) -> Result<Option<OrganismRecord>, LookupError> {
        let mut builder: Option<RecordBuilder> = None;
        while let Some(line) = self.next_line()? {
            let Some(record) = builder.as_mut() else {
                if line.trim().is_empty() {
                    continue;
                }
                match keyword(&line) {
                    Some(("LOCUS", rest)) => {
                        builder = Some(RecordBuilder::new(first_token(rest)));
                        continue;
                    }
                    _ => {
                        return Err(LookupError::GenbankParse(format!(
                            "line {}: expected LOCUS, found {:?}",
                            self.line_no,
                            preview(&line)
                        )));
                    }
                }
            };

            if line.starts_with("//") {
                record.terminated = true;
                break;
            }
            if let Some((kw, rest)) = keyword(&line) {
                if kw == "LOCUS" {
                    return Err(LookupError::GenbankParse(format!(
                        "line {}: record {} is missing its // terminator",
                        self.line_no,
                        record.label()
                    )));
                }
                record.keyword(kw, rest);
            } else if let Some(rest) = line.strip_prefix(CONTINUATION) {
                record.continuation(rest);
            } else if let Some(name) = line.trim_start().strip_prefix("ORGANISM") {
                record.organism_start(name);
            } else {
                record.section = Section::Other;
            }
        }

        match builder {
            None => Ok(None),
            Some(record) if !record.terminated => Err(LookupError::GenbankParse(format!(
                "response ended inside record {}",
                record.label()
            ))),
            Some(record) => record.finish().map(Some),
        }
    }
}

impl<R: BufRead> Iterator for GenbankRecords<R> {
    type Item = Result<OrganismRecord, LookupError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Parses a whole response body.
pub fn parse_records(text: &str) -> Result<Vec<OrganismRecord>, LookupError> {
    GenbankRecords::new(text.as_bytes()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Accession,
    Organism,
    Lineage,
    Other,
}

#[derive(Debug)]
struct RecordBuilder {
    locus: String,
    accession: Option<String>,
    version: Option<String>,
    secondary: Vec<String>,
    organism: Option<String>,
    section: Section,
    terminated: bool,
}

impl RecordBuilder {
    fn new(locus: &str) -> Self {
        Self {
            locus: locus.to_string(),
            accession: None,
            version: None,
            secondary: Vec::new(),
            organism: None,
            section: Section::Other,
            terminated: false,
        }
    }

    fn label(&self) -> &str {
        self.accession.as_deref().unwrap_or(&self.locus)
    }

    fn keyword(&mut self, kw: &str, rest: &str) {
        self.section = Section::Other;
        match kw {
            "ACCESSION" if self.accession.is_none() => {
                let mut tokens = rest.split_whitespace();
                self.accession = tokens.next().map(str::to_string);
                self.secondary.extend(tokens.map(str::to_string));
                self.section = Section::Accession;
            }
            "VERSION" if self.version.is_none() => {
                let token = first_token(rest);
                if token.contains('.') {
                    self.version = Some(token.to_string());
                }
            }
            _ => {}
        }
    }

    fn organism_start(&mut self, name: &str) {
        self.organism = Some(name.trim().to_string());
        self.section = Section::Organism;
    }

    // Continuation lines under ORGANISM extend the name until the lineage
    // starts; the lineage is the first line carrying a `;` (or a lone `.`).
    fn continuation(&mut self, rest: &str) {
        if self.section == Section::Accession {
            self.secondary
                .extend(rest.split_whitespace().map(str::to_string));
            return;
        }
        if self.section != Section::Organism {
            return;
        }
        let content = rest.trim();
        if content.contains(';') || content == "." {
            self.section = Section::Lineage;
            return;
        }
        if let Some(organism) = self.organism.as_mut() {
            if !content.is_empty() {
                organism.push(' ');
                organism.push_str(content);
            }
        }
    }

    fn finish(self) -> Result<OrganismRecord, LookupError> {
        let accession = self.accession.unwrap_or(self.locus);
        let organism = self.organism.ok_or_else(|| {
            LookupError::GenbankParse(format!("record {accession} has no ORGANISM line"))
        })?;
        Ok(OrganismRecord {
            accession,
            version: self.version,
            secondary: self.secondary,
            organism: organism.trim().to_string(),
        })
    }
}

/// Splits a top-level keyword line (`KEYWORD   value`) into its parts.
fn keyword(line: &str) -> Option<(&str, &str)> {
    if !line.starts_with(|ch: char| ch.is_ascii_uppercase()) {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((kw, rest)) => Some((kw, rest)),
        None => Some((line, "")),
    }
}

fn first_token(value: &str) -> &str {
    value.split_whitespace().next().unwrap_or("")
}

fn preview(line: &str) -> String {
    line.chars().take(60).collect()
}
