use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::{error, warn};

use crate::document::DocType;

/// Per-category error logs plus the run-wide setup error list. One
/// instance per run, shared by reference with every worker and the writer.
#[derive(Debug, Default)]
pub struct ErrorAggregator {
    resolutions: Mutex<Vec<String>>,
    statutes: Mutex<Vec<String>>,
    setup: Mutex<Vec<String>>,
}

fn timestamped(message: &str) -> String {
    format!("[{}] {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"), message)
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn log_for(&self, doc_type: DocType) -> &Mutex<Vec<String>> {
        match doc_type {
            DocType::Resolution => &self.resolutions,
            DocType::Statute => &self.statutes,
        }
    }

    pub fn record(&self, doc_type: DocType, message: impl AsRef<str>) {
        let message = message.as_ref();
        warn!("{}: {}", doc_type, message);
        self.log_for(doc_type).lock().unwrap_or_else(PoisonError::into_inner).push(timestamped(message));
    }

    pub fn record_setup(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        error!("setup: {}", message);
        self.setup.lock().unwrap_or_else(PoisonError::into_inner).push(timestamped(message));
    }

    /// Snapshot of the pending (not yet flushed) lines for `doc_type`.
    pub fn entries(&self, doc_type: DocType) -> Vec<String> {
        self.log_for(doc_type).lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn setup_errors(&self) -> Vec<String> {
        self.setup.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn setup_error_count(&self) -> usize {
        self.setup.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Write and clear both category logs for `year`. An empty log is
    /// written as a single sentinel line.
    ///
    /// Both logs are emptied before any I/O, so nothing carries over into
    /// the next year. Lines whose report cannot be written move to the
    /// setup list; the first write error is returned after both attempts.
    pub fn flush_year(&self, year: u16, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let pending: Vec<(DocType, Vec<String>)> = DocType::ALL
            .into_iter()
            .map(|t| (t, std::mem::take(&mut *self.log_for(t).lock().unwrap_or_else(PoisonError::into_inner))))
            .collect();

        let mut written = Vec::new();
        let mut failure = None;
        for (doc_type, lines) in pending {
            let path = report_path(dir, year, doc_type);
            match write_report(&path, doc_type, &lines) {
                Ok(()) => written.push(path),
                Err(e) => {
                    self.record_setup(format!(
                        "{}: cannot write {} ({} unwritten lines follow): {}",
                        year,
                        path.display(),
                        lines.len(),
                        e
                    ));
                    self.setup.lock().unwrap_or_else(PoisonError::into_inner).extend(lines);
                    failure.get_or_insert(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}

fn write_report(path: &Path, doc_type: DocType, lines: &[String]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = if lines.is_empty() {
        format!("{}\n", no_errors_line(doc_type))
    } else {
        let mut body = lines.join("\n");
        body.push('\n');
        body
    };
    std::fs::write(path, body)
}

pub fn no_errors_line(doc_type: DocType) -> String {
    format!("No errors found in {} for this year.", doc_type.plural())
}

pub fn report_path(dir: &Path, year: u16, doc_type: DocType) -> PathBuf {
    dir.join(format!("{}_{}_errors.txt", year, doc_type.to_string().to_lowercase()))
}
