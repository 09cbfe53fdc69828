//! Running statistics for one population over one window.

use crate::window::Window;
use serde::Serialize;
use std::collections::HashMap;
use tally_pbs::JobRecord;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("Cannot merge window {found:?} into {expected:?}")]
    WindowMismatch { expected: String, found: String },
    #[error("Cannot merge population {found:?} into {expected:?}")]
    PopulationMismatch { expected: String, found: String },
}

/// Per-job quantities tracked by every aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Seconds between eligible and start
    Wait,
    /// Seconds between start and end
    Run,
    /// Wait plus run
    Turnaround,
    Cores,
    Nodes,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Wait,
        Metric::Run,
        Metric::Turnaround,
        Metric::Cores,
        Metric::Nodes,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// The metric's value for a job; None without a resolved core count.
    pub fn value(self, job: &JobRecord) -> Option<u64> {
        match self {
            Metric::Wait => Some(job.wait_time),
            Metric::Run => Some(job.run_time),
            Metric::Turnaround => Some(job.turnaround()),
            Metric::Cores => job.core_count.map(u64::from),
            Metric::Nodes => Some(u64::from(job.unique_node_count)),
        }
    }
}

/// Count, exact sum, min and max of a stream of integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningStat {
    count: u64,
    sum: u128,
    min: u64,
    max: u64,
}

impl RunningStat {
    pub fn observe(&mut self, value: u64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += u128::from(value);
    }

    pub fn merge(&mut self, other: &RunningStat) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count += other.count;
        self.sum += other.sum;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> u128 {
        self.sum
    }

    pub fn min(&self) -> Option<u64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<u64> {
        (self.count > 0).then_some(self.max)
    }

    /// `sum / count`, from the exact sum.
    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }

    pub fn summary(&self) -> Option<MetricSummary> {
        Some(MetricSummary {
            min: self.min()?,
            max: self.max()?,
            avg: self.avg()?,
        })
    }
}

/// `(min, max, avg)` of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub min: u64,
    pub max: u64,
    pub avg: f64,
}

/// Job count and CPU time for one user, group or queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupTotals {
    pub jobs: u64,
    pub cpu_time_secs: u64,
}

/// One row of a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRow {
    pub label: String,
    pub jobs: u64,
    pub cpu_time_secs: u64,
}

/// Breakdown dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grouping {
    User,
    Group,
    Queue,
}

/// Running statistics for one population over one window.
///
/// Only jobs whose create time falls inside the window count. The average of
/// each metric is always derived from the exact integer sum.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowAggregator {
    population: String,
    window: Window,
    count: u64,
    stats: [RunningStat; 5],
    by_user: HashMap<String, GroupTotals>,
    by_group: HashMap<String, GroupTotals>,
    by_queue: HashMap<String, GroupTotals>,
}

impl WindowAggregator {
    pub fn new(population: impl Into<String>, window: Window) -> Self {
        Self {
            population: population.into(),
            window,
            count: 0,
            stats: [RunningStat::default(); 5],
            by_user: HashMap::new(),
            by_group: HashMap::new(),
            by_queue: HashMap::new(),
        }
    }

    pub fn population(&self) -> &str {
        &self.population
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn stat(&self, metric: Metric) -> &RunningStat {
        &self.stats[metric.index()]
    }

    /// `(min, max, avg)` of a metric; None while empty.
    pub fn summary(&self, metric: Metric) -> Option<MetricSummary> {
        self.stat(metric).summary()
    }

    pub fn jobs_per_day(&self) -> f64 {
        self.count as f64 / self.window.days().max(1) as f64
    }

    /// Fold one job in.
    ///
    /// Returns false, leaving every field untouched, when the job was created
    /// outside the window or is not usable (failed, or no core count).
    pub fn update(&mut self, job: &JobRecord) -> bool {
        if !self.window.contains(job.create_time) || !job.is_usable() {
            return false;
        }

        for metric in Metric::ALL {
            if let Some(value) = metric.value(job) {
                self.stats[metric.index()].observe(value);
            }
        }
        self.count += 1;

        let cpu = job.cpu_time.seconds();
        for (map, label) in [
            (&mut self.by_user, &job.user),
            (&mut self.by_group, &job.group),
            (&mut self.by_queue, &job.queue),
        ] {
            let entry = map.entry(label.clone()).or_default();
            entry.jobs += 1;
            entry.cpu_time_secs = entry.cpu_time_secs.saturating_add(cpu);
        }

        true
    }

    /// Combine with an aggregator of the same population and window.
    pub fn merge(&mut self, other: &WindowAggregator) -> Result<(), StatsError> {
        if self.window != other.window {
            return Err(StatsError::WindowMismatch {
                expected: self.window.label.clone(),
                found: other.window.label.clone(),
            });
        }
        if self.population != other.population {
            return Err(StatsError::PopulationMismatch {
                expected: self.population.clone(),
                found: other.population.clone(),
            });
        }

        self.count += other.count;
        for (mine, theirs) in self.stats.iter_mut().zip(other.stats.iter()) {
            mine.merge(theirs);
        }
        for (mine, theirs) in [
            (&mut self.by_user, &other.by_user),
            (&mut self.by_group, &other.by_group),
            (&mut self.by_queue, &other.by_queue),
        ] {
            for (label, totals) in theirs {
                let entry = mine.entry(label.clone()).or_default();
                entry.jobs += totals.jobs;
                entry.cpu_time_secs = entry.cpu_time_secs.saturating_add(totals.cpu_time_secs);
            }
        }
        Ok(())
    }

    fn totals(&self, grouping: Grouping) -> &HashMap<String, GroupTotals> {
        match grouping {
            Grouping::User => &self.by_user,
            Grouping::Group => &self.by_group,
            Grouping::Queue => &self.by_queue,
        }
    }

    /// Totals for one label of a breakdown.
    pub fn group_totals(&self, grouping: Grouping, label: &str) -> Option<GroupTotals> {
        self.totals(grouping).get(label).copied()
    }

    /// A breakdown as rows ordered by label.
    pub fn breakdown(&self, grouping: Grouping) -> Vec<GroupRow> {
        let mut rows: Vec<GroupRow> = self
            .totals(grouping)
            .iter()
            .map(|(label, totals)| GroupRow {
                label: label.clone(),
                jobs: totals.jobs,
                cpu_time_secs: totals.cpu_time_secs,
            })
            .collect();
        rows.sort_by(|a, b| a.label.cmp(&b.label));
        rows
    }

    pub fn by_user(&self) -> Vec<GroupRow> {
        self.breakdown(Grouping::User)
    }

    pub fn by_group(&self) -> Vec<GroupRow> {
        self.breakdown(Grouping::Group)
    }

    pub fn by_queue(&self) -> Vec<GroupRow> {
        self.breakdown(Grouping::Queue)
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            population: self.population.clone(),
            window: self.window.clone(),
            count: self.count,
            jobs_per_day: self.jobs_per_day(),
            wait: self.summary(Metric::Wait),
            run: self.summary(Metric::Run),
            turnaround: self.summary(Metric::Turnaround),
            cores: self.summary(Metric::Cores),
            nodes: self.summary(Metric::Nodes),
            by_user: self.by_user(),
            by_group: self.by_group(),
            by_queue: self.by_queue(),
        }
    }
}

/// Serializable read-only view of an aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub population: String,
    pub window: Window,
    pub count: u64,
    pub jobs_per_day: f64,
    pub wait: Option<MetricSummary>,
    pub run: Option<MetricSummary>,
    pub turnaround: Option<MetricSummary>,
    pub cores: Option<MetricSummary>,
    pub nodes: Option<MetricSummary>,
    pub by_user: Vec<GroupRow>,
    pub by_group: Vec<GroupRow>,
    pub by_queue: Vec<GroupRow>,
}
