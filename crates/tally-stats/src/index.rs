//! Fan jobs out to every population's window aggregators.

use crate::aggregator::{AggregateSnapshot, StatsError, WindowAggregator};
use crate::window::Window;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tally_pbs::JobRecord;

/// The subset of jobs a set of aggregators covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum Population {
    All,
    User(String),
    Group(String),
    Queue(String),
    SingleNode,
    MultiNode,
}

impl Population {
    /// Owner label shown in reports.
    pub fn label(&self) -> &str {
        match self {
            Self::All | Self::SingleNode | Self::MultiNode => "all",
            Self::User(name) | Self::Group(name) | Self::Queue(name) => name,
        }
    }

    pub fn includes(&self, job: &JobRecord) -> bool {
        match self {
            Self::All => true,
            Self::User(name) => job.user == *name,
            Self::Group(name) => job.group == *name,
            Self::Queue(name) => job.queue == *name,
            Self::SingleNode => !job.is_multi_node,
            Self::MultiNode => job.is_multi_node,
        }
    }
}

/// Distinct users, groups and queues seen in a job list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationLabels {
    pub users: BTreeSet<String>,
    pub groups: BTreeSet<String>,
    pub queues: BTreeSet<String>,
}

impl PopulationLabels {
    pub fn discover(jobs: &[JobRecord]) -> Self {
        let mut labels = Self::default();
        for job in jobs {
            labels.users.insert(job.user.clone());
            labels.groups.insert(job.group.clone());
            labels.queues.insert(job.queue.clone());
        }
        labels
    }
}

/// One aggregator per window for a single population.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    population: Population,
    aggregators: Vec<WindowAggregator>,
}

impl WindowSet {
    pub fn new(population: Population, windows: &[Window]) -> Self {
        let aggregators = windows
            .iter()
            .map(|w| WindowAggregator::new(population.label(), w.clone()))
            .collect();
        Self {
            population,
            aggregators,
        }
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Aggregators in window order.
    pub fn aggregators(&self) -> &[WindowAggregator] {
        &self.aggregators
    }

    /// Number of windows that accepted the job. Jobs outside the population
    /// are never counted.
    fn update(&mut self, job: &JobRecord) -> usize {
        if !self.population.includes(job) {
            return 0;
        }
        self.aggregators
            .iter_mut()
            .map(|agg| agg.update(job))
            .filter(|accepted| *accepted)
            .count()
    }

    fn merge(&mut self, other: &WindowSet) -> Result<(), StatsError> {
        for (mine, theirs) in self.aggregators.iter_mut().zip(&other.aggregators) {
            mine.merge(theirs)?;
        }
        Ok(())
    }
}

/// Every aggregator a job stream feeds: global, per node class, and one set
/// per discovered user, group and queue.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationIndex {
    windows: Vec<Window>,
    global: WindowSet,
    single_node: WindowSet,
    multi_node: WindowSet,
    users: BTreeMap<String, WindowSet>,
    groups: BTreeMap<String, WindowSet>,
    queues: BTreeMap<String, WindowSet>,
    routed: u64,
}

fn label_sets(
    labels: &BTreeSet<String>,
    windows: &[Window],
    population: fn(String) -> Population,
) -> BTreeMap<String, WindowSet> {
    labels
        .iter()
        .map(|label| {
            (
                label.clone(),
                WindowSet::new(population(label.clone()), windows),
            )
        })
        .collect()
}

impl AggregationIndex {
    pub fn new(windows: Vec<Window>, labels: &PopulationLabels) -> Self {
        Self {
            global: WindowSet::new(Population::All, &windows),
            single_node: WindowSet::new(Population::SingleNode, &windows),
            multi_node: WindowSet::new(Population::MultiNode, &windows),
            users: label_sets(&labels.users, &windows, Population::User),
            groups: label_sets(&labels.groups, &windows, Population::Group),
            queues: label_sets(&labels.queues, &windows, Population::Queue),
            windows,
            routed: 0,
        }
    }

    /// Discover labels from `jobs` and route every job in one pass.
    pub fn build(windows: Vec<Window>, jobs: &[JobRecord]) -> Self {
        let labels = PopulationLabels::discover(jobs);
        let mut index = Self::new(windows, &labels);
        for job in jobs {
            index.route(job);
        }
        tracing::debug!(
            "Routed {} of {} jobs into {} populations",
            index.routed,
            jobs.len(),
            3 + index.users.len() + index.groups.len() + index.queues.len()
        );
        index
    }

    /// Forward a job to every population it belongs to.
    ///
    /// Exactly one of the single-node and multi-node sets sees the job.
    /// Returns the number of aggregators that accepted it.
    pub fn route(&mut self, job: &JobRecord) -> usize {
        let mut accepted = self.global.update(job);

        let node_class = if Population::MultiNode.includes(job) {
            &mut self.multi_node
        } else {
            &mut self.single_node
        };
        accepted += node_class.update(job);

        for (sets, label, kind) in [
            (&mut self.users, &job.user, "user"),
            (&mut self.groups, &job.group, "group"),
            (&mut self.queues, &job.queue, "queue"),
        ] {
            match sets.get_mut(label) {
                Some(set) => accepted += set.update(job),
                None => tracing::debug!("No {} set for {:?} (job {})", kind, label, job.job_id),
            }
        }

        if accepted > 0 {
            self.routed += 1;
        }
        accepted
    }

    /// Combine with an index built over the same windows.
    ///
    /// Label sets missing on either side are taken as they are.
    pub fn merge(&mut self, other: &AggregationIndex) -> Result<(), StatsError> {
        if self.windows != other.windows {
            return Err(StatsError::WindowMismatch {
                expected: window_labels(&self.windows),
                found: window_labels(&other.windows),
            });
        }

        self.global.merge(&other.global)?;
        self.single_node.merge(&other.single_node)?;
        self.multi_node.merge(&other.multi_node)?;
        for (mine, theirs) in [
            (&mut self.users, &other.users),
            (&mut self.groups, &other.groups),
            (&mut self.queues, &other.queues),
        ] {
            for (label, set) in theirs {
                match mine.get_mut(label) {
                    Some(existing) => existing.merge(set)?,
                    None => {
                        mine.insert(label.clone(), set.clone());
                    }
                }
            }
        }
        self.routed += other.routed;
        Ok(())
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Jobs accepted by at least one aggregator.
    pub fn routed(&self) -> u64 {
        self.routed
    }

    pub fn global(&self) -> &WindowSet {
        &self.global
    }

    pub fn single_node(&self) -> &WindowSet {
        &self.single_node
    }

    pub fn multi_node(&self) -> &WindowSet {
        &self.multi_node
    }

    /// User sets ordered by name.
    pub fn users(&self) -> impl Iterator<Item = &WindowSet> {
        self.users.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &WindowSet> {
        self.groups.values()
    }

    pub fn queues(&self) -> impl Iterator<Item = &WindowSet> {
        self.queues.values()
    }

    pub fn user(&self, name: &str) -> Option<&WindowSet> {
        self.users.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&WindowSet> {
        self.groups.get(name)
    }

    pub fn queue(&self, name: &str) -> Option<&WindowSet> {
        self.queues.get(name)
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            windows: self.windows.clone(),
            global: SetSnapshot::from(&self.global),
            users: self.users().map(SetSnapshot::from).collect(),
            groups: self.groups().map(SetSnapshot::from).collect(),
            queues: self.queues().map(SetSnapshot::from).collect(),
            single_node: SetSnapshot::from(&self.single_node),
            multi_node: SetSnapshot::from(&self.multi_node),
        }
    }
}

fn window_labels(windows: &[Window]) -> String {
    windows
        .iter()
        .map(|w| w.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Serializable view of one population's aggregators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetSnapshot {
    pub population: Population,
    pub windows: Vec<AggregateSnapshot>,
}

impl From<&WindowSet> for SetSnapshot {
    fn from(set: &WindowSet) -> Self {
        Self {
            population: set.population.clone(),
            windows: set.aggregators.iter().map(WindowAggregator::snapshot).collect(),
        }
    }
}

/// Serializable view of a whole index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSnapshot {
    pub windows: Vec<Window>,
    pub global: SetSnapshot,
    pub users: Vec<SetSnapshot>,
    pub groups: Vec<SetSnapshot>,
    pub queues: Vec<SetSnapshot>,
    pub single_node: SetSnapshot,
    pub multi_node: SetSnapshot,
}
