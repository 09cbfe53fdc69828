//! PBS/Torque integration for tally.
//!
//! Decode accounting logs and rebuild completed jobs from their `E` records.

pub mod accounting;
pub mod builder;
pub mod ingest;
pub mod types;

pub use accounting::{AccountingRecord, JOB_END, decode_line};
pub use builder::{RecordError, build_job};
pub use ingest::{
    AccountingBatch, IngestError, IngestStats, ParsedFile, SkippedFile, ingest_dir, ingest_files,
    list_accounting_files, parse_accounting_str, read_accounting_file, usable_jobs,
};
pub use types::{JobRecord, REQUESTED_NODES_SENTINEL, UsageTime};
