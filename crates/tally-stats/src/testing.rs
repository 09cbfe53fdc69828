//! Job fixtures for unit tests.

use tally_pbs::{JobRecord, UsageTime};

pub struct JobSpec {
    pub user: &'static str,
    pub group: &'static str,
    pub queue: &'static str,
    pub create: i64,
    pub wait: u64,
    pub run: u64,
    pub cores: u32,
    pub nodes: u32,
    pub cpu: u64,
    pub multi_node: bool,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self {
            user: "alice",
            group: "chem",
            queue: "batch",
            create: 1000,
            wait: 0,
            run: 0,
            cores: 1,
            nodes: 1,
            cpu: 0,
            multi_node: false,
        }
    }
}

/// A successful job whose timestamps produce the requested wait and run.
pub fn job(spec: JobSpec) -> JobRecord {
    let eligible = spec.create;
    let start = eligible + spec.wait as i64;
    let end = start + spec.run as i64;
    JobRecord {
        job_id: "1".to_string(),
        full_id: "1.srv".to_string(),
        logged_at: String::new(),
        job_state: "E".to_string(),
        user: spec.user.to_string(),
        group: spec.group.to_string(),
        queue: spec.queue.to_string(),
        job_name: "job".to_string(),
        owner: None,
        create_time: spec.create,
        queue_time: spec.create,
        eligible_time: eligible,
        start_time: start,
        end_time: end,
        run_time: spec.run,
        wait_time: spec.wait,
        hold_time: 0,
        exec_host: Some("n1/0".to_string()),
        host_label: "n1/0".to_string(),
        core_count: Some(spec.cores),
        unique_node_count: spec.nodes,
        is_multi_node: spec.multi_node,
        gpu_count: None,
        execution_slots: None,
        cpu_time: UsageTime::Reported(spec.cpu),
        wall_time: UsageTime::Reported(spec.run),
        exit_status: 0,
        requested_nodes: None,
        requested_disk: None,
        requested_memory: None,
        requested_walltime: None,
        physical_mem_used: None,
        virtual_mem_used: None,
        session_id: None,
    }
}
