//! PBS job types.

use tally_parsers::parse_memory_mb;

/// Value reported for `requested_nodes` when the record carried none.
pub const REQUESTED_NODES_SENTINEL: i64 = -999;

/// A `resources_used` time field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageTime {
    /// Parsed from an `HH:MM:SS` value
    Reported(u64),
    /// Absent or unparseable; counts as zero seconds
    Defaulted,
}

impl UsageTime {
    pub fn seconds(&self) -> u64 {
        match self {
            Self::Reported(secs) => *secs,
            Self::Defaulted => 0,
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Reported(_))
    }
}

/// A completed job reconstructed from one `E` accounting record.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    /// Numeric job ID (full ID up to the first `.`)
    pub job_id: String,

    /// Full job ID as logged (e.g. "12345.mgmt01")
    pub full_id: String,

    /// Log timestamp field, verbatim
    pub logged_at: String,

    /// Record type of the source line ("E")
    pub job_state: String,

    pub user: String,
    pub group: String,
    pub queue: String,
    pub job_name: String,

    /// Submitter address (`owner`)
    pub owner: Option<String>,

    /// Create time (epoch seconds)
    pub create_time: i64,

    /// Time the job entered the queue
    pub queue_time: i64,

    /// Time the job became eligible to run
    pub eligible_time: i64,

    /// Start time, never earlier than `eligible_time`
    pub start_time: i64,

    /// End time
    pub end_time: i64,

    /// `end - start`, floored at zero
    pub run_time: u64,

    /// `start - eligible`, floored at zero
    pub wait_time: u64,

    /// `eligible - queue`, floored at zero
    pub hold_time: u64,

    /// Raw `exec_host` value
    pub exec_host: Option<String>,

    /// Printable host list: `exec_host`, or "unknown"/"failed" without one
    pub host_label: String,

    /// Cores resolved from `exec_host`; None when the record had no hosts
    pub core_count: Option<u32>,

    /// Distinct hosts used
    pub unique_node_count: u32,

    /// `exec_host` lists more than one host segment
    pub is_multi_node: bool,

    /// GPUs requested via `Resource_List.nodes`
    pub gpu_count: Option<u32>,

    /// `total_execution_slots`
    pub execution_slots: Option<u32>,

    pub cpu_time: UsageTime,
    pub wall_time: UsageTime,

    pub exit_status: i32,

    /// `Resource_List.neednodes`
    pub requested_nodes: Option<String>,
    /// `Resource_List.ddisk`
    pub requested_disk: Option<String>,
    /// `Resource_List.pmem`
    pub requested_memory: Option<String>,
    /// `Resource_List.walltime`
    pub requested_walltime: Option<String>,
    /// `resources_used.mem`
    pub physical_mem_used: Option<String>,
    /// `resources_used.vmem`
    pub virtual_mem_used: Option<String>,
    /// `session`
    pub session_id: Option<String>,
}

impl JobRecord {
    /// Wait time plus run time.
    pub fn turnaround(&self) -> u64 {
        self.wait_time + self.run_time
    }

    pub fn is_successful(&self) -> bool {
        self.exit_status == 0
    }

    /// Successful and with a resolved core count.
    pub fn is_usable(&self) -> bool {
        self.is_successful() && self.core_count.is_some()
    }

    pub fn has_gpus(&self) -> bool {
        self.gpu_count.is_some()
    }

    /// Requested node spec, or the `-999` sentinel when none was requested.
    pub fn requested_nodes_or_sentinel(&self) -> String {
        match &self.requested_nodes {
            Some(nodes) => nodes.clone(),
            None => REQUESTED_NODES_SENTINEL.to_string(),
        }
    }

    pub fn physical_mem_mb(&self) -> Option<u64> {
        self.physical_mem_used.as_deref().and_then(parse_memory_mb)
    }

    pub fn virtual_mem_mb(&self) -> Option<u64> {
        self.virtual_mem_used.as_deref().and_then(parse_memory_mb)
    }

    pub fn requested_memory_mb(&self) -> Option<u64> {
        self.requested_memory.as_deref().and_then(parse_memory_mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_time() {
        assert_eq!(UsageTime::Reported(42).seconds(), 42);
        assert_eq!(UsageTime::Defaulted.seconds(), 0);
        assert!(UsageTime::Reported(0).is_reported());
        assert!(!UsageTime::Defaulted.is_reported());
    }
}
