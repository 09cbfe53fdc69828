//! Usage statistics for tally.
//!
//! Streams completed jobs into per-window, per-population aggregators.

pub mod aggregator;
pub mod index;
pub mod window;

#[cfg(test)]
mod testing;

pub use aggregator::{
    AggregateSnapshot, GroupRow, GroupTotals, Grouping, Metric, MetricSummary, RunningStat,
    StatsError, WindowAggregator,
};
pub use index::{
    AggregationIndex, IndexSnapshot, Population, PopulationLabels, SetSnapshot, WindowSet,
};
pub use window::{SECS_PER_DAY, Window};
