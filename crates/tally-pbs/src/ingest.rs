//! Read PBS accounting files into job records.

use crate::accounting::decode_line;
use crate::builder::build_job;
use crate::types::JobRecord;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::ops::AddAssign;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to list accounting directory {path}: {source}")]
    ListDir {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read accounting file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    #[error("Ingest worker for {path} failed: {error}")]
    Worker { path: Utf8PathBuf, error: String },
}

/// Per-file line and record counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Lines read
    pub lines: usize,
    /// Job-end records decoded
    pub end_records: usize,
    /// End records missing a required field or with an unparseable one
    pub malformed: usize,
    /// Built jobs with a non-zero exit status
    pub failed_jobs: usize,
    /// Kept jobs whose CPU time or walltime was not reported
    pub defaulted_usage: usize,
}

impl AddAssign for IngestStats {
    fn add_assign(&mut self, other: Self) {
        self.lines += other.lines;
        self.end_records += other.end_records;
        self.malformed += other.malformed;
        self.failed_jobs += other.failed_jobs;
        self.defaulted_usage += other.defaulted_usage;
    }
}

/// Successful jobs parsed from one file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub jobs: Vec<JobRecord>,
    pub stats: IngestStats,
}

/// A file left out of the batch.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: Utf8PathBuf,
    pub reason: String,
}

/// Everything read from an accounting directory.
#[derive(Debug, Clone, Default)]
pub struct AccountingBatch {
    /// Successful jobs, in file order then line order
    pub jobs: Vec<JobRecord>,
    pub stats: IngestStats,
    pub files_read: Vec<Utf8PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

impl AccountingBatch {
    fn absorb(&mut self, path: Utf8PathBuf, parsed: ParsedFile) {
        self.jobs.extend(parsed.jobs);
        self.stats += parsed.stats;
        self.files_read.push(path);
    }
}

/// Parse accounting log content.
///
/// Non-`E` and non-accounting lines are skipped silently. Malformed end
/// records are counted and skipped. Only jobs with exit status 0 are kept.
pub fn parse_accounting_str(content: &str) -> ParsedFile {
    let mut parsed = ParsedFile::default();

    for line in content.lines() {
        parsed.stats.lines += 1;
        let Some(record) = decode_line(line) else {
            continue;
        };
        parsed.stats.end_records += 1;

        match build_job(&record) {
            Ok(job) if job.is_successful() => {
                if !job.cpu_time.is_reported() || !job.wall_time.is_reported() {
                    parsed.stats.defaulted_usage += 1;
                }
                parsed.jobs.push(job);
            }
            Ok(_) => parsed.stats.failed_jobs += 1,
            Err(e) => {
                parsed.stats.malformed += 1;
                tracing::debug!("Skipping job {}: {}", record.full_id, e);
            }
        }
    }

    parsed
}

/// Read and parse a single accounting file.
///
/// Invalid UTF-8 is replaced rather than rejected so one bad byte does not
/// drop a whole day of records.
pub fn read_accounting_file(path: &Utf8Path) -> Result<ParsedFile, IngestError> {
    let bytes = fs::read(path).map_err(|source| IngestError::Read {
        path: path.to_owned(),
        source,
    })?;
    Ok(parse_accounting_str(&String::from_utf8_lossy(&bytes)))
}

/// List the accounting files of a directory, sorted by name.
///
/// Subdirectories, hidden files and non-UTF-8 names are skipped.
pub fn list_accounting_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, IngestError> {
    let list_err = |source| IngestError::ListDir {
        path: dir.to_owned(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let path = match Utf8PathBuf::try_from(entry.path()) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Skipping non UTF-8 path: {}", e);
                continue;
            }
        };

        if !path.is_file() {
            continue;
        }
        if path
            .file_name()
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}

/// Read every accounting file in `dir`.
///
/// Only a failure to list the directory itself is an error. Unreadable files
/// are handled as in [`ingest_files`].
pub async fn ingest_dir(dir: &Utf8Path) -> Result<AccountingBatch, IngestError> {
    let files = list_accounting_files(dir)?;
    tracing::info!(
        "Found {} files in the following directory: {}",
        files.len(),
        dir
    );
    Ok(ingest_files(files).await)
}

/// Parse `files` concurrently on blocking workers.
///
/// Results are joined back in the given order, so the job list matches a
/// sequential scan. A file that cannot be read is recorded in `skipped` and
/// the batch continues.
pub async fn ingest_files(files: Vec<Utf8PathBuf>) -> AccountingBatch {
    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let worker_path = path.clone();
            let handle = tokio::task::spawn_blocking(move || read_accounting_file(&worker_path));
            (path, handle)
        })
        .collect();

    let mut batch = AccountingBatch::default();
    for (path, handle) in handles {
        let result = handle.await.unwrap_or_else(|e| {
            Err(IngestError::Worker {
                path: path.clone(),
                error: e.to_string(),
            })
        });

        match result {
            Ok(parsed) => batch.absorb(path, parsed),
            Err(e) => {
                tracing::warn!("{}", e);
                batch.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Imported {} successful jobs from {} files ({} malformed, {} failed, {} skipped files)",
        batch.jobs.len(),
        batch.files_read.len(),
        batch.stats.malformed,
        batch.stats.failed_jobs,
        batch.skipped.len()
    );

    batch
}

/// Jobs that can be aggregated: successful and with a resolved core count.
pub fn usable_jobs(jobs: &[JobRecord]) -> Vec<JobRecord> {
    jobs.iter().filter(|j| j.is_usable()).cloned().collect()
}
