//! Build `JobRecord`s from decoded accounting records.

use crate::accounting::AccountingRecord;
use crate::types::{JobRecord, UsageTime};
use tally_parsers::{
    CoreAllocation, non_empty_string, parse_epoch, parse_hms_secs, resolve_exec_host,
};
use thiserror::Error;

/// Why an `E` record could not become a job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Missing required field {0}")]
    MissingField(&'static str),
    #[error("Invalid value for {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

fn required<'a>(
    record: &'a AccountingRecord,
    key: &'static str,
) -> Result<&'a str, RecordError> {
    record.get(key).ok_or(RecordError::MissingField(key))
}

fn required_epoch(record: &AccountingRecord, key: &'static str) -> Result<i64, RecordError> {
    let value = required(record, key)?;
    parse_epoch(value).ok_or_else(|| RecordError::InvalidField {
        field: key,
        value: value.to_string(),
    })
}

fn optional(record: &AccountingRecord, key: &str) -> Option<String> {
    record.get(key).and_then(non_empty_string)
}

fn optional_count(record: &AccountingRecord, key: &str) -> Option<u32> {
    record.get(key).and_then(|v| v.trim().parse().ok())
}

fn usage_time(record: &AccountingRecord, key: &str) -> UsageTime {
    match record.get(key) {
        Some(value) => match parse_hms_secs(value) {
            Some(secs) => UsageTime::Reported(secs),
            None => {
                tracing::debug!(
                    "Unparseable {} {:?} for job {}",
                    key,
                    value,
                    record.job_id()
                );
                UsageTime::Defaulted
            }
        },
        None => UsageTime::Defaulted,
    }
}

/// Extract `gpus=N` from a colon-delimited `Resource_List.nodes` value
/// such as "1:ppn=4:gpus=2".
fn parse_gpu_count(nodes: &str) -> Option<u32> {
    if !nodes.contains("gpus") {
        return None;
    }
    nodes
        .split(':')
        .filter(|piece| piece.contains("gpus"))
        .filter_map(|piece| {
            piece
                .split_once('=')
                .and_then(|(_, n)| n.trim().parse().ok())
        })
        .last()
}

/// Build a job from one `E` record.
///
/// Derived fields are filled in a fixed order: the start time is clamped to
/// the eligible time, then run/wait/hold are computed from the clamped
/// value, then success- or failure-specific host and node defaults apply.
/// Missing or malformed usage times (`cput`, `walltime`) become
/// `UsageTime::Defaulted` on any job.
pub fn build_job(record: &AccountingRecord) -> Result<JobRecord, RecordError> {
    if record.full_id.is_empty() {
        return Err(RecordError::MissingField("ID"));
    }
    if record.record_type.is_empty() {
        return Err(RecordError::MissingField("jobstate"));
    }

    let user = required(record, "user")?.to_string();
    let group = required(record, "group")?.to_string();
    let job_name = required(record, "jobname")?.to_string();
    let queue = required(record, "queue")?.to_string();
    let create_time = required_epoch(record, "ctime")?;
    let queue_time = required_epoch(record, "qtime")?;
    let eligible_time = required_epoch(record, "etime")?;
    let start_time = required_epoch(record, "start")?;
    let end_time = required_epoch(record, "end")?;

    let exit_raw = required(record, "Exit_status")?;
    let exit_status = exit_raw
        .trim()
        .parse::<i32>()
        .map_err(|_| RecordError::InvalidField {
            field: "Exit_status",
            value: exit_raw.to_string(),
        })?;

    let exec_host = optional(record, "exec_host");
    let allocation = exec_host.as_deref().map(resolve_exec_host);

    let mut job = JobRecord {
        job_id: record.job_id().to_string(),
        full_id: record.full_id.clone(),
        logged_at: record.logged_at.clone(),
        job_state: record.record_type.clone(),
        user,
        group,
        queue,
        job_name,
        owner: optional(record, "owner"),
        create_time,
        queue_time,
        eligible_time,
        start_time,
        end_time,
        run_time: 0,
        wait_time: 0,
        hold_time: 0,
        exec_host,
        host_label: String::new(),
        core_count: allocation.map(|a| a.cores),
        unique_node_count: 1,
        is_multi_node: allocation.is_some_and(|a| a.multi_node),
        gpu_count: record.get("Resource_List.nodes").and_then(parse_gpu_count),
        execution_slots: optional_count(record, "total_execution_slots"),
        cpu_time: usage_time(record, "resources_used.cput"),
        wall_time: usage_time(record, "resources_used.walltime"),
        exit_status,
        requested_nodes: optional(record, "Resource_List.neednodes"),
        requested_disk: optional(record, "Resource_List.ddisk"),
        requested_memory: optional(record, "Resource_List.pmem"),
        requested_walltime: optional(record, "Resource_List.walltime"),
        physical_mem_used: optional(record, "resources_used.mem"),
        virtual_mem_used: optional(record, "resources_used.vmem"),
        session_id: optional(record, "session"),
    };

    clamp_start(&mut job);
    derive_durations(&mut job);
    apply_exit_defaults(
        &mut job,
        optional_count(record, "unique_node_count"),
        allocation,
    );

    Ok(job)
}

/// Some logs record `start=0`; never start before becoming eligible.
fn clamp_start(job: &mut JobRecord) {
    job.start_time = job.start_time.max(job.eligible_time);
}

fn floor_diff(later: i64, earlier: i64) -> u64 {
    u64::try_from(later.saturating_sub(earlier)).unwrap_or(0)
}

fn derive_durations(job: &mut JobRecord) {
    job.run_time = floor_diff(job.end_time, job.start_time);
    job.wait_time = floor_diff(job.start_time, job.eligible_time);
    job.hold_time = floor_diff(job.eligible_time, job.queue_time);
}

fn apply_exit_defaults(
    job: &mut JobRecord,
    reported_nodes: Option<u32>,
    allocation: Option<CoreAllocation>,
) {
    let fallback_label = if job.is_successful() { "unknown" } else { "failed" };
    job.host_label = job
        .exec_host
        .clone()
        .unwrap_or_else(|| fallback_label.to_string());

    job.unique_node_count = reported_nodes
        .filter(|n| *n > 0)
        .or(allocation.map(|a| a.segments))
        .unwrap_or(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::decode_line;
    use crate::types::REQUESTED_NODES_SENTINEL;

    const FULL_LINE: &str = "04/15/2014 10:23:45;E;12345.mgmt01;user=alice group=chem jobname=run1 queue=batch ctime=1397570000 qtime=1397570005 etime=1397570010 start=1397570100 owner=alice@login01 exec_host=n001/0-3+n002/0-3 Resource_List.neednodes=2:ppn=4 Resource_List.nodes=2:ppn=4:gpus=2 Resource_List.pmem=2gb Resource_List.walltime=01:00:00 Resource_List.ddisk=10gb session=4242 total_execution_slots=8 unique_node_count=2 end=1397570400 Exit_status=0 resources_used.cput=00:19:00 resources_used.mem=2097152kb resources_used.vmem=4194304kb resources_used.walltime=00:05:00";

    fn record(line: &str) -> AccountingRecord {
        decode_line(line).unwrap()
    }

    fn minimal(extra: &str) -> String {
        format!(
            "t;E;9.srv;user=bob group=phys jobname=sim queue=short ctime=100 qtime=110 etime=120 start=150 end=200 {}",
            extra
        )
    }

    #[test]
    fn test_build_full_record() {
        let job = build_job(&record(FULL_LINE)).unwrap();
        assert_eq!(job.job_id, "12345");
        assert_eq!(job.full_id, "12345.mgmt01");
        assert_eq!(job.job_state, "E");
        assert_eq!(job.user, "alice");
        assert_eq!(job.group, "chem");
        assert_eq!(job.queue, "batch");
        assert_eq!(job.job_name, "run1");
        assert_eq!(job.owner.as_deref(), Some("alice@login01"));

        // Durations re-derived by hand from the raw timestamps.
        assert_eq!(job.run_time, 1397570400 - 1397570100);
        assert_eq!(job.wait_time, 1397570100 - 1397570010);
        assert_eq!(job.hold_time, 1397570010 - 1397570005);
        assert_eq!(job.turnaround(), 390);

        assert_eq!(job.core_count, Some(8));
        assert!(job.is_multi_node);
        assert_eq!(job.unique_node_count, 2);
        assert_eq!(job.gpu_count, Some(2));
        assert_eq!(job.execution_slots, Some(8));
        assert_eq!(job.cpu_time, UsageTime::Reported(1140));
        assert_eq!(job.wall_time, UsageTime::Reported(300));
        assert_eq!(job.requested_nodes_or_sentinel(), "2:ppn=4");
        assert_eq!(job.requested_memory_mb(), Some(2048));
        assert_eq!(job.physical_mem_mb(), Some(2048));
        assert_eq!(job.virtual_mem_mb(), Some(4096));
        assert_eq!(job.session_id.as_deref(), Some("4242"));
        assert_eq!(job.host_label, "n001/0-3+n002/0-3");
        assert!(job.is_usable());
    }

    #[test]
    fn test_missing_required_field() {
        let line = "t;E;9.srv;user=bob jobname=sim queue=short ctime=100 qtime=110 etime=120 start=150 end=200 Exit_status=0";
        assert_eq!(
            build_job(&record(line)),
            Err(RecordError::MissingField("group"))
        );

        let no_exit = minimal("");
        assert_eq!(
            build_job(&record(&no_exit)),
            Err(RecordError::MissingField("Exit_status"))
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        let line = "t;E;9.srv;user=bob group=phys jobname=sim queue=short ctime=soon qtime=110 etime=120 start=150 end=200 Exit_status=0";
        assert!(matches!(
            build_job(&record(line)),
            Err(RecordError::InvalidField { field: "ctime", .. })
        ));
    }

    #[test]
    fn test_start_clamped_to_eligible() {
        let line = "t;E;9.srv;user=bob group=phys jobname=sim queue=short ctime=100 qtime=110 etime=120 start=0 end=200 Exit_status=0";
        let job = build_job(&record(line)).unwrap();
        assert_eq!(job.start_time, 120);
        assert_eq!(job.wait_time, 0);
        assert_eq!(job.run_time, 80);
    }

    #[test]
    fn test_durations_never_negative() {
        // end before start, eligible before queue
        let line = "t;E;9.srv;user=bob group=phys jobname=sim queue=short ctime=100 qtime=500 etime=120 start=300 end=200 Exit_status=0";
        let job = build_job(&record(line)).unwrap();
        assert_eq!(job.run_time, 0);
        assert_eq!(job.hold_time, 0);
        assert_eq!(job.wait_time, 180);
    }

    #[test]
    fn test_failed_job_defaults() {
        let line = minimal("Exit_status=271 resources_used.walltime=garbage");
        let job = build_job(&record(&line)).unwrap();
        assert_eq!(job.exit_status, 271);
        assert_eq!(job.wall_time, UsageTime::Defaulted);
        assert_eq!(job.wall_time.seconds(), 0);
        assert_eq!(job.cpu_time, UsageTime::Defaulted);
        assert_eq!(job.host_label, "failed");
        assert_eq!(job.core_count, None);
        assert!(!job.is_usable());
    }

    #[test]
    fn test_overflowing_usage_time_defaults() {
        let line = minimal(
            "Exit_status=1 resources_used.walltime=9999999999999999:00:00 \
             resources_used.cput=00:01:00",
        );
        let job = build_job(&record(&line)).unwrap();
        assert_eq!(job.wall_time, UsageTime::Defaulted);
        assert_eq!(job.cpu_time, UsageTime::Reported(60));
        assert!(!job.is_successful());
    }

    #[test]
    fn test_success_without_exec_host() {
        let job = build_job(&record(&minimal("Exit_status=0"))).unwrap();
        assert_eq!(job.host_label, "unknown");
        assert_eq!(job.unique_node_count, 1);
        assert!(!job.is_multi_node);
        assert_eq!(job.core_count, None);
        assert!(!job.is_usable());
    }

    #[test]
    fn test_unique_nodes_default_from_segments() {
        let line = minimal("Exit_status=0 exec_host=a/0-1+b/0-1+c/0-1");
        let job = build_job(&record(&line)).unwrap();
        assert_eq!(job.unique_node_count, 3);
        assert_eq!(job.core_count, Some(6));
    }

    #[test]
    fn test_requested_nodes_sentinel() {
        let job = build_job(&record(&minimal("Exit_status=0"))).unwrap();
        assert!(job.requested_nodes.is_none());
        assert_eq!(
            job.requested_nodes_or_sentinel(),
            REQUESTED_NODES_SENTINEL.to_string()
        );
    }

    #[test]
    fn test_gpu_count() {
        assert_eq!(parse_gpu_count("1:ppn=4:gpus=2"), Some(2));
        assert_eq!(parse_gpu_count("1:ppn=4"), None);
        assert_eq!(parse_gpu_count("1:gpus=x"), None);

        let line = minimal("Exit_status=0 Resource_List.nodes=1:ppn=1");
        let job = build_job(&record(&line)).unwrap();
        assert!(!job.has_gpus());
    }
}
