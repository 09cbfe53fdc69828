//! Shared parsing utilities for scheduler accounting records.
//!
//! This crate provides the small, stateless decoders used by
//! tally-pbs when reconstructing jobs from accounting logs.

pub mod hosts;
pub mod memory;
pub mod time;

pub use hosts::{CoreAllocation, resolve_exec_host};
pub use memory::parse_memory_mb;
pub use time::{format_epoch, parse_epoch, parse_hms_secs, secs_to_hours};

/// Filter helper for optional string fields.
/// Returns None if the string is empty or a placeholder value.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed == "N/A" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split a `key=value` token at the first `=`.
///
/// Values may themselves contain `=` (e.g. `Resource_List.nodes=1:ppn=4`).
/// Tokens without `=` return None.
pub fn split_key_value(token: &str) -> Option<(&str, &str)> {
    token.split_once('=')
}
