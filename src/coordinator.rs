//! Per-year orchestration: setup, metadata load, dispatch over a worker
//! pool, drain, reconcile, flush. All writes go through one writer thread
//! that lives for the whole run.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use globwalk::GlobWalkerBuilder;
use log::{debug, error, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::config::RunConfig;
use crate::document::{DocType, DocumentIdentity};
use crate::ids::IdGenerator;
use crate::inject::inject_metadata;
use crate::metadata::{read_record_file, record_files, MetadataIndex};
use crate::repair::{repair_common, repair_typed};
use crate::report::ErrorAggregator;

/// Unit of work for the writer. The writer never alters the contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedDocument {
    pub destination: PathBuf,
    pub contents: Vec<u8>,
}

#[derive(Debug)]
pub enum WriterMessage {
    Document(RepairedDocument),
    /// Sent once, after the last year's dispatch.
    Finish,
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("SetupError: {year}: required folder {path} is missing")]
    MissingFolder { year: u16, path: String },
    #[error("SetupError: {year}: cannot list {path}: {message}")]
    List { year: u16, path: String, message: String },
}

/// How far a document got through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Repaired and merged with its metadata row.
    Merged,
    /// Repaired, but injection failed; the repaired text was written.
    RepairedOnly,
    /// Original bytes copied through unchanged.
    PassedThrough,
    /// Could not even be read.
    Unreadable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriterSummary {
    pub written: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    pub documents: usize,
    pub merged: usize,
    pub repaired_only: usize,
    pub passed_through: usize,
    pub unreadable: usize,
    pub missing_files: usize,
}

impl YearSummary {
    fn count(&mut self, outcome: DocumentOutcome) {
        self.documents += 1;
        match outcome {
            DocumentOutcome::Merged => self.merged += 1,
            DocumentOutcome::RepairedOnly => self.repaired_only += 1,
            DocumentOutcome::PassedThrough => self.passed_through += 1,
            DocumentOutcome::Unreadable => self.unreadable += 1,
        }
    }

    fn absorb(&mut self, other: YearSummary) {
        self.documents += other.documents;
        self.merged += other.merged;
        self.repaired_only += other.repaired_only;
        self.passed_through += other.passed_through;
        self.unreadable += other.unreadable;
        self.missing_files += other.missing_files;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub years_processed: Vec<u16>,
    pub years_skipped: Vec<u16>,
    pub totals: YearSummary,
    pub writer: WriterSummary,
    pub setup_errors: usize,
}

/// Split `len` items into `workers` contiguous ranges; the first
/// `len % workers` ranges hold one extra item.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let base = len / workers;
    let extra = len % workers;
    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let size = base + usize::from(i < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Atomic write: temp file next to the destination, then rename.
pub fn write_document(doc: &RepairedDocument) -> std::io::Result<()> {
    if let Some(parent) = doc.destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = doc.destination.with_extension(format!("tmp.{}", std::process::id()));
    std::fs::write(&tmp, &doc.contents)?;
    std::fs::rename(&tmp, &doc.destination)
}

/// Drain the queue in arrival order until `Finish` is seen and the queue is empty.
pub fn run_writer(queue: Receiver<WriterMessage>, errors: Arc<ErrorAggregator>) -> WriterSummary {
    info!("Writer thread started.");
    let mut summary = WriterSummary::default();
    let handle = |doc: RepairedDocument, summary: &mut WriterSummary| match write_document(&doc) {
        Ok(()) => {
            summary.written += 1;
            debug!("wrote {}", doc.destination.display());
        }
        Err(e) => {
            summary.failed += 1;
            errors.record_setup(format!("WriteError: {}: {}", doc.destination.display(), e));
        }
    };
    while let Ok(message) = queue.recv() {
        match message {
            WriterMessage::Document(doc) => handle(doc, &mut summary),
            WriterMessage::Finish => {
                while let Ok(message) = queue.try_recv() {
                    if let WriterMessage::Document(doc) = message {
                        handle(doc, &mut summary);
                    }
                }
                break;
            }
        }
    }
    info!("Writer thread finished. Wrote {} documents, {} failures.", summary.written, summary.failed);
    summary
}

/// Shared, read-only context for one year's workers.
struct YearContext<'a> {
    output_dir: PathBuf,
    index: &'a MetadataIndex,
    errors: &'a ErrorAggregator,
    ids: &'a dyn IdGenerator,
    queue: &'a Sender<WriterMessage>,
}

impl YearContext<'_> {
    fn enqueue(&self, destination: PathBuf, contents: Vec<u8>) {
        let doc = RepairedDocument { destination, contents };
        if self.queue.send(WriterMessage::Document(doc)).is_err() {
            error!("writer queue closed; output dropped");
        }
    }

    /// Run one document through match, repair and injection. Whatever
    /// state it reaches is written; nothing is retried.
    fn process_document(&self, path: &Path) -> DocumentOutcome {
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        let destination = self.output_dir.join(&name);
        let category = DocType::guess_from_file_name(&name);

        let original = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.errors.record(category, format!("{}: unable to read: {}", name, e));
                return DocumentOutcome::Unreadable;
            }
        };

        let identity = match DocumentIdentity::from_file_name(&name) {
            Ok(id) => id,
            Err(e) => {
                self.errors.record(category, e.to_string());
                self.enqueue(destination, original);
                return DocumentOutcome::PassedThrough;
            }
        };
        let doc_type = identity.doc_type;

        let row = match self.index.match_row(doc_type, identity.session, identity.chapter) {
            Ok(row) => row,
            Err(e) => {
                self.errors.record(doc_type, format!("{}: {}", name, e));
                self.enqueue(destination, original);
                return DocumentOutcome::PassedThrough;
            }
        };

        let text = String::from_utf8_lossy(&original).into_owned();
        let common = match repair_common(&text) {
            Ok(t) => t,
            Err(e) => {
                self.errors.record(doc_type, format!("{}: {}", name, e));
                self.enqueue(destination, original);
                return DocumentOutcome::PassedThrough;
            }
        };
        let repaired = repair_typed(doc_type, &common, self.ids);

        match inject_metadata(&repaired, &row, doc_type) {
            Ok(merged) => {
                self.enqueue(destination, merged.into_bytes());
                DocumentOutcome::Merged
            }
            Err(e) => {
                self.errors.record(doc_type, format!("{}: {}", name, e));
                self.enqueue(destination, repaired.into_bytes());
                DocumentOutcome::RepairedOnly
            }
        }
    }
}

pub struct Coordinator {
    config: RunConfig,
    errors: Arc<ErrorAggregator>,
    ids: Arc<dyn IdGenerator>,
}

impl Coordinator {
    pub fn new(config: RunConfig, errors: Arc<ErrorAggregator>, ids: Arc<dyn IdGenerator>) -> Self {
        Coordinator { config, errors, ids }
    }

    /// Process every configured year with one writer for the whole run.
    pub fn run(&self) -> RunSummary {
        let (queue, drain) = crossbeam_channel::unbounded();
        let writer_errors = Arc::clone(&self.errors);
        let writer = thread::spawn(move || run_writer(drain, writer_errors));

        let mut summary = RunSummary::default();
        for &year in &self.config.years {
            match self.process_year(year, &queue) {
                Ok(year_summary) => {
                    summary.years_processed.push(year);
                    summary.totals.absorb(year_summary);
                }
                Err(e) => {
                    self.errors.record_setup(e.to_string());
                    summary.years_skipped.push(year);
                }
            }
        }

        if queue.send(WriterMessage::Finish).is_err() {
            error!("writer exited before the finish signal");
        }
        summary.writer = match writer.join() {
            Ok(w) => w,
            Err(e) => {
                error!("Writer thread panicked: {:?}", e);
                WriterSummary::default()
            }
        };
        summary.setup_errors = self.errors.setup_error_count();
        summary
    }

    pub fn process_year(&self, year: u16, queue: &Sender<WriterMessage>) -> Result<YearSummary, SetupError> {
        // Setup
        let documents_dir = self.config.documents_path(year);
        let metadata_dir = self.config.metadata_path(year);
        for dir in [&documents_dir, &metadata_dir] {
            if !dir.is_dir() {
                return Err(SetupError::MissingFolder { year, path: dir.display().to_string() });
            }
        }
        info!("{}: processing {}", year, documents_dir.display());

        // MetadataLoad
        let index = self.load_index(year, &metadata_dir);

        // Dispatch
        let documents = list_documents(&documents_dir)
            .map_err(|e| SetupError::List { year, path: documents_dir.display().to_string(), message: e.to_string() })?;
        let workers = self.config.worker_count();
        let ctx = YearContext {
            output_dir: self.config.output_path(year),
            index: &index,
            errors: &self.errors,
            ids: self.ids.as_ref(),
            queue,
        };
        info!("{}: {} documents across {} workers", year, documents.len(), workers);

        // Drain
        let mut summary = thread::scope(|scope| {
            let handles: Vec<_> = partition(documents.len(), workers)
                .into_iter()
                .map(|range| {
                    let slice = &documents[range];
                    let ctx = &ctx;
                    scope.spawn(move || {
                        let mut part = YearSummary::default();
                        for path in slice {
                            part.count(ctx.process_document(path));
                        }
                        part
                    })
                })
                .collect();
            let mut total = YearSummary::default();
            for handle in handles {
                match handle.join() {
                    Ok(part) => total.absorb(part),
                    Err(e) => error!("{}: worker panicked: {:?}", year, e),
                }
            }
            total
        });

        // Reconcile
        for doc_type in DocType::ALL {
            for row in index.unmatched_rows(doc_type) {
                self.errors.record(doc_type, row.missing_file_message(doc_type, year));
                summary.missing_files += 1;
            }
        }

        // Flush
        // failed report writes are already on the setup list
        if let Err(e) = self.errors.flush_year(year, &self.config.report_path()) {
            error!("{}: error reports incomplete: {}", year, e);
        }
        info!(
            "{}: {} documents, {} merged, {} repaired only, {} passed through, {} missing files",
            year, summary.documents, summary.merged, summary.repaired_only, summary.passed_through, summary.missing_files
        );
        Ok(summary)
    }

    fn load_index(&self, year: u16, metadata_dir: &Path) -> MetadataIndex {
        let mut index = MetadataIndex::new();
        let files = match record_files(metadata_dir) {
            Ok(files) => files,
            Err(e) => {
                self.errors.record_setup(format!("{}: {}", year, e));
                return index;
            }
        };
        if files.is_empty() {
            warn!("{}: no metadata files in {}", year, metadata_dir.display());
        }
        for file in files {
            match read_record_file(&file) {
                Ok((source, rows)) => {
                    debug!("{}: {} rows for {} session {}", file.display(), rows.len(), source.doc_type, source.session);
                    index.load(source.doc_type, rows);
                }
                Err(e) => self.errors.record_setup(format!("{}: {}", year, e)),
            }
        }
        info!("{}: loaded {} metadata rows", year, index.row_count());
        index
    }
}

/// Regular files directly inside `dir`, sorted by name.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, globwalk::GlobError> {
    let mut paths: Vec<PathBuf> = GlobWalkerBuilder::from_patterns(dir, &["*"])
        .max_depth(1)
        .build()?
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}
