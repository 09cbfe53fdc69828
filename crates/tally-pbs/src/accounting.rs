//! Decode PBS accounting log lines.
//!
//! Each line has the form
//! `<timestamp>;<record_type>;<full_job_id>;<key=value key=value ...>`.

use std::collections::HashMap;
use tally_parsers::split_key_value;

/// Record type written when a job terminates.
pub const JOB_END: &str = "E";

/// One job-end line split into its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountingRecord {
    /// Timestamp field, verbatim (e.g. "04/15/2014 10:23:45")
    pub logged_at: String,

    /// Record type ("E")
    pub record_type: String,

    /// Full job ID (e.g. "12345.mgmt01")
    pub full_id: String,

    /// `key=value` attributes; a repeated key keeps its last value
    pub fields: HashMap<String, String>,
}

impl AccountingRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Job ID up to the first `.`.
    pub fn job_id(&self) -> &str {
        self.full_id.split('.').next().unwrap_or(&self.full_id)
    }
}

/// Decode one accounting line.
///
/// Returns None for lines that are not `;`-delimited accounting records (a
/// leading `;` does not count) and for records other than job ends. Tokens of
/// the attribute field without `=` are ignored.
pub fn decode_line(line: &str) -> Option<AccountingRecord> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !matches!(line.find(';'), Some(pos) if pos > 0) {
        return None;
    }

    let mut parts = line.split(';');
    let logged_at = parts.next()?;
    let record_type = parts.next()?;
    let full_id = parts.next()?;
    let attributes = parts.next()?;

    if record_type != JOB_END {
        return None;
    }

    let fields = attributes
        .split_whitespace()
        .filter_map(split_key_value)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Some(AccountingRecord {
        logged_at: logged_at.to_string(),
        record_type: record_type.to_string(),
        full_id: full_id.to_string(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_end_record() {
        let line = "04/15/2014 10:23:45;E;12345.mgmt01;user=alice group=chem Resource_List.nodes=1:ppn=4 junk Exit_status=0\n";
        let record = decode_line(line).unwrap();
        assert_eq!(record.logged_at, "04/15/2014 10:23:45");
        assert_eq!(record.record_type, "E");
        assert_eq!(record.full_id, "12345.mgmt01");
        assert_eq!(record.job_id(), "12345");
        assert_eq!(record.get("user"), Some("alice"));
        assert_eq!(record.get("Resource_List.nodes"), Some("1:ppn=4"));
        assert_eq!(record.get("Exit_status"), Some("0"));
        assert_eq!(record.fields.len(), 4);
    }

    #[test]
    fn test_skip_other_record_types() {
        assert!(
            decode_line("04/15/2014 10:20:00;Q;12345.mgmt01;queue=batch").is_none()
        );
        assert!(
            decode_line("04/15/2014 10:21:00;S;12345.mgmt01;user=alice").is_none()
        );
    }

    #[test]
    fn test_skip_non_accounting_lines() {
        assert!(decode_line("").is_none());
        assert!(decode_line("no delimiters here").is_none());
        assert!(decode_line(";E;12345.mgmt01;user=alice").is_none());
        assert!(decode_line("04/15/2014 10:23:45;E;12345.mgmt01").is_none());
    }

    #[test]
    fn test_repeated_key_keeps_last() {
        let record = decode_line("t;E;1.srv;user=alice user=bob").unwrap();
        assert_eq!(record.get("user"), Some("bob"));
    }

    #[test]
    fn test_job_id_without_server() {
        let record = decode_line("t;E;777;user=alice").unwrap();
        assert_eq!(record.job_id(), "777");
    }
}
