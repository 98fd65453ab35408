//! Authoritative metadata rows and the per-session lookup used to pair
//! each document with exactly one row.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use globwalk::GlobWalkerBuilder;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use thiserror::Error;

use crate::document::{chapter_label, DocType};

static EXTRA_SESSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[^0-9])(\d)(?:ES|EX)(?:[^A-Za-z]|$)").unwrap());

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to list metadata folder {path}: {message}")]
    List { path: String, message: String },
    #[error("failed to read metadata file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse metadata file {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("MissingMetadata: no metadata row for {doc_type} session {session} chapter {chapter}")]
    MissingMetadata { doc_type: DocType, session: u8, chapter: u16 },
    #[error("DuplicateMetadata: {count} metadata rows for {doc_type} session {session} chapter {chapter} ({excess} too many)")]
    DuplicateMetadata { doc_type: DocType, session: u8, chapter: u16, count: usize, excess: usize },
}

/// One spreadsheet row. `consumed` flips once a document claims it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRow {
    pub session: u8,
    pub chapter: String,
    pub measure_type: String,
    pub measure_num: String,
    pub author_name: String,
    pub author_text: String,
    pub consumed: bool,
}

impl MetadataRow {
    pub fn chapter_number(&self) -> Option<u16> {
        self.chapter.trim().parse().ok()
    }

    pub fn has_chapter(&self) -> bool {
        !self.chapter.trim().is_empty()
    }

    /// Report line for a row that no document claimed.
    pub fn missing_file_message(&self, doc_type: DocType, year: u16) -> String {
        format!("{} is missing or named incorrectly", chapter_label(doc_type, year, self.session, &self.chapter))
    }
}

/// Type and session a metadata file covers, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataSource {
    pub doc_type: DocType,
    pub session: u8,
}

impl MetadataSource {
    pub fn from_file_name(name: &str) -> Self {
        let doc_type = if name.to_lowercase().contains("resolution") { DocType::Resolution } else { DocType::Statute };
        let session = EXTRA_SESSION_RE
            .captures(name)
            .and_then(|c| c[1].parse::<u8>().ok())
            .unwrap_or(0);
        MetadataSource { doc_type, session }
    }
}

#[derive(Debug, Clone, Copy)]
enum RecordField {
    MeasureType,
    MeasureNum,
    Chapter,
    AuthorName,
    AuthorText,
}

impl RecordField {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "measuretype" => Some(RecordField::MeasureType),
            "measurenum" | "measurenumber" => Some(RecordField::MeasureNum),
            "chapternum" | "chapternumber" | "chapter" => Some(RecordField::Chapter),
            "authorname" | "author" => Some(RecordField::AuthorName),
            "authortext" => Some(RecordField::AuthorText),
            _ => None,
        }
    }

    fn assign(self, row: &mut MetadataRow, value: String) {
        match self {
            RecordField::MeasureType => row.measure_type = value,
            RecordField::MeasureNum => row.measure_num = value,
            RecordField::Chapter => row.chapter = value,
            RecordField::AuthorName => row.author_name = value,
            RecordField::AuthorText => row.author_text = value,
        }
    }
}

/// Parse a record file: root element, one child per row, one grandchild per field.
pub fn parse_records(xml: &str, session: u8) -> Result<Vec<MetadataRow>, String> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<MetadataRow> = None;
    let mut field: Option<RecordField> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                depth += 1;
                if depth == 2 {
                    current = Some(MetadataRow { session, ..MetadataRow::default() });
                } else if depth == 3 {
                    field = RecordField::from_name(&String::from_utf8_lossy(e.local_name().as_ref()));
                    text.clear();
                }
            }
            Event::Text(e) => {
                if field.is_some() {
                    text.push_str(&e.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(e) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                if depth == 3 {
                    if let (Some(f), Some(row)) = (field.take(), current.as_mut()) {
                        f.assign(row, text.clone());
                    }
                } else if depth == 2 {
                    if let Some(row) = current.take() {
                        rows.push(row);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if depth != 0 {
        return Err(format!("unexpected end of input inside {} open element(s)", depth));
    }
    Ok(rows)
}

/// All `*.xml` record files directly inside `dir`, sorted.
pub fn record_files(dir: &Path) -> Result<Vec<PathBuf>, MetadataError> {
    let list_err = |message: String| MetadataError::List { path: dir.display().to_string(), message };
    let mut paths: Vec<PathBuf> = GlobWalkerBuilder::from_patterns(dir, &["*.xml"])
        .case_insensitive(true)
        .max_depth(1)
        .build()
        .map_err(|e| list_err(e.to_string()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}

pub fn read_record_file(path: &Path) -> Result<(MetadataSource, Vec<MetadataRow>), MetadataError> {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
    let source = MetadataSource::from_file_name(name);
    let bytes = std::fs::read(path).map_err(|e| MetadataError::Read { path: path.display().to_string(), source: e })?;
    let rows = parse_records(&String::from_utf8_lossy(&bytes), source.session)
        .map_err(|message| MetadataError::Parse { path: path.display().to_string(), message })?;
    Ok((source, rows))
}

/// Rows grouped by (type, session). Each group has its own lock, so
/// claiming a row is atomic per session.
#[derive(Debug, Default)]
pub struct MetadataIndex {
    sessions: HashMap<(DocType, u8), Mutex<Vec<MetadataRow>>>,
}

impl MetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, doc_type: DocType, rows: Vec<MetadataRow>) {
        for row in rows {
            let group = self.sessions.entry((doc_type, row.session)).or_default();
            group.get_mut().unwrap_or_else(PoisonError::into_inner).push(row);
        }
    }

    pub fn row_count(&self) -> usize {
        self.sessions
            .values()
            .map(|g| g.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Claim the single unconsumed row for `chapter`. Nothing is consumed on failure.
    pub fn match_row(&self, doc_type: DocType, session: u8, chapter: u16) -> Result<MetadataRow, MatchError> {
        let missing = MatchError::MissingMetadata { doc_type, session, chapter };
        let group = self.sessions.get(&(doc_type, session)).ok_or(missing.clone())?;
        let mut rows = group.lock().unwrap_or_else(PoisonError::into_inner);
        let hits: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.consumed && r.chapter_number() == Some(chapter))
            .map(|(i, _)| i)
            .collect();
        match hits.as_slice() {
            [] => Err(missing),
            [i] => {
                let row = &mut rows[*i];
                row.consumed = true;
                Ok(row.clone())
            }
            _ => Err(MatchError::DuplicateMetadata { doc_type, session, chapter, count: hits.len(), excess: hits.len() - 1 }),
        }
    }

    /// Unconsumed rows with a non-blank chapter, ordered by session.
    pub fn unmatched_rows(&self, doc_type: DocType) -> Vec<MetadataRow> {
        let mut keys: Vec<&(DocType, u8)> = self.sessions.keys().filter(|(t, _)| *t == doc_type).collect();
        keys.sort_by_key(|(_, s)| *s);
        let mut out = Vec::new();
        for key in keys {
            if let Some(group) = self.sessions.get(key) {
                let rows = group.lock().unwrap_or_else(PoisonError::into_inner);
                out.extend(rows.iter().filter(|r| r.has_chapter() && !r.consumed).cloned());
            }
        }
        out
    }
}
