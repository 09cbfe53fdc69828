//! Text and JSON rendering of an aggregation run.

use std::fmt::{self, Write};

use serde_json::json;
use tally_parsers::{format_epoch, secs_to_hours};
use tally_pbs::AccountingBatch;
use tally_stats::{
    AggregationIndex, GroupRow, Metric, MetricSummary, WindowAggregator, WindowSet,
};

const BANNER_WIDTH: usize = 80;
const TABLE_WIDTH: usize = 74;

/// Which breakdowns a table lists under each window row.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detail {
    pub users: bool,
    pub groups: bool,
    pub queues: bool,
}

impl Detail {
    pub const ALL: Detail = Detail {
        users: true,
        groups: true,
        queues: true,
    };
}

#[derive(Debug, Clone, Copy)]
enum Unit {
    Hours,
    Count,
}

fn banner(out: &mut impl Write, title: &str) -> fmt::Result {
    let rule = "*".repeat(BANNER_WIDTH);
    writeln!(out, "{}", rule)?;
    writeln!(out, "{:^width$}", title, width = BANNER_WIDTH)?;
    writeln!(out, "{}", rule)?;
    writeln!(out)
}

fn write_metric(
    out: &mut impl Write,
    name: &str,
    summary: Option<MetricSummary>,
    unit: Unit,
) -> fmt::Result {
    match (summary, unit) {
        (None, _) => writeln!(out, "  {:<22}: {:>8}, {:>8}, {:>8}", name, "-", "-", "-"),
        (Some(s), Unit::Hours) => writeln!(
            out,
            "  {:<22}: {:>8.2}, {:>8.2}, {:>8.2}",
            name,
            secs_to_hours(s.min as f64),
            secs_to_hours(s.max as f64),
            secs_to_hours(s.avg)
        ),
        (Some(s), Unit::Count) => writeln!(
            out,
            "  {:<22}: {:>8}, {:>8}, {:>8.1}",
            name,
            s.min,
            s.max,
            s.avg
        ),
    }
}

/// Summary block for one aggregator: window bounds, job counts and the
/// min, max and average of every metric.
pub fn write_summary(out: &mut impl Write, agg: &WindowAggregator) -> fmt::Result {
    let window = agg.window();
    writeln!(out, "Summary statistics for {}", window.label)?;
    writeln!(out, "  {:<22}: {}", "From", format_epoch(window.start))?;
    // Last second inside the window
    writeln!(
        out,
        "  {:<22}: {} ({} days total)",
        "To",
        format_epoch(window.end.saturating_sub(1)),
        window.days()
    )?;
    writeln!(out, "  {:<22}: {}", "Owner", agg.population())?;
    writeln!(out, "  {:<22}: {:>8}", "Number of jobs", agg.count())?;
    writeln!(out, "  {:<22}: {:>8.1}", "Jobs/day", agg.jobs_per_day())?;
    for (name, metric, unit) in [
        ("Wait times (hours)", Metric::Wait, Unit::Hours),
        ("Run times (hours)", Metric::Run, Unit::Hours),
        ("Job turnaround (hours)", Metric::Turnaround, Unit::Hours),
        ("Cores per job", Metric::Cores, Unit::Count),
    ] {
        write_metric(out, name, agg.summary(metric), unit)?;
    }
    if agg.stat(Metric::Nodes).max().is_some_and(|max| max > 1) {
        let nodes = agg.summary(Metric::Nodes);
        write_metric(out, "Nodes per job", nodes, Unit::Count)?;
    }
    writeln!(out)
}

fn avg_cell(agg: &WindowAggregator, metric: Metric, width: usize, hours: bool) -> String {
    match agg.stat(metric).avg() {
        Some(avg) if hours => format!("{:>width$.2}", secs_to_hours(avg), width = width),
        Some(avg) => format!("{:>width$.1}", avg, width = width),
        None => format!("{:>width$}", "-", width = width),
    }
}

fn write_rows(out: &mut impl Write, title: &str, rows: &[GroupRow]) -> fmt::Result {
    if rows.is_empty() {
        return Ok(());
    }
    writeln!(out, "  {:<18}{:>14}{:>10}", title, "CPU hours", "Jobs")?;
    for row in rows {
        writeln!(
            out,
            "    {:<16}{:>14.2}{:>10}",
            row.label,
            secs_to_hours(row.cpu_time_secs as f64),
            row.jobs
        )?;
    }
    Ok(())
}

/// Users by CPU time, heaviest first.
fn users_by_cpu(agg: &WindowAggregator) -> Vec<GroupRow> {
    let mut rows = agg.by_user();
    rows.sort_by(|a, b| b.cpu_time_secs.cmp(&a.cpu_time_secs));
    rows
}

/// Queues by job count, busiest first.
fn queues_by_jobs(agg: &WindowAggregator) -> Vec<GroupRow> {
    let mut rows = agg.by_queue();
    rows.sort_by(|a, b| b.jobs.cmp(&a.jobs));
    rows
}

/// One row of average times per window, optionally followed by breakdowns.
pub fn write_table(
    out: &mut impl Write,
    heading: &str,
    set: &WindowSet,
    detail: Detail,
) -> fmt::Result {
    writeln!(
        out,
        "{:<16}{:^36}{:>12}",
        heading, "Average times (h)", "Cores per"
    )?;
    writeln!(
        out,
        "{:<16}{:>10}{:>10}{:>16}{:>12}{:>10}",
        set.population().label(),
        "Wait",
        "Run",
        "Turnaround",
        "job",
        "Jobs"
    )?;
    writeln!(out, "{}", "-".repeat(TABLE_WIDTH))?;

    for agg in set.aggregators() {
        writeln!(
            out,
            "{:<16}{}{}{}{}{:>10}",
            agg.window().label,
            avg_cell(agg, Metric::Wait, 10, true),
            avg_cell(agg, Metric::Run, 10, true),
            avg_cell(agg, Metric::Turnaround, 16, true),
            avg_cell(agg, Metric::Cores, 12, false),
            agg.count()
        )?;
        if detail.users {
            write_rows(out, "Users", &users_by_cpu(agg))?;
        }
        if detail.groups {
            write_rows(out, "Groups", &agg.by_group())?;
        }
        if detail.queues {
            write_rows(out, "Queues", &queues_by_jobs(agg))?;
        }
    }
    writeln!(out)
}

fn write_ingest(
    out: &mut impl Write,
    batch: &AccountingBatch,
    index: &AggregationIndex,
) -> fmt::Result {
    let stats = &batch.stats;
    writeln!(
        out,
        "Read {} accounting files: {} lines, {} job-end records ({} malformed, {} failed jobs)",
        batch.files_read.len(),
        stats.lines,
        stats.end_records,
        stats.malformed,
        stats.failed_jobs
    )?;
    writeln!(
        out,
        "Aggregated {} of {} successful jobs ({} without reported usage times)",
        index.routed(),
        batch.jobs.len(),
        stats.defaulted_usage
    )?;
    for skipped in &batch.skipped {
        writeln!(out, "Skipped {}: {}", skipped.path, skipped.reason)?;
    }
    writeln!(out)
}

fn write_node_class(out: &mut impl Write, title: &str, set: &WindowSet) -> fmt::Result {
    banner(out, title)?;
    for agg in set.aggregators() {
        write_summary(out, agg)?;
    }
    write_table(out, title, set, Detail::ALL)
}

/// The full text report: overall summaries, then tables per user, group,
/// queue and node class.
pub fn render_report(
    batch: &AccountingBatch,
    index: &AggregationIndex,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_ingest(&mut out, batch, index)?;

    banner(&mut out, "Summary for all jobs")?;
    for agg in index.global().aggregators() {
        write_summary(&mut out, agg)?;
    }

    banner(&mut out, "Summary by user")?;
    for set in index.users() {
        write_table(
            &mut out,
            "User",
            set,
            Detail {
                queues: true,
                ..Detail::default()
            },
        )?;
    }

    banner(&mut out, "Summary by group")?;
    for set in index.groups() {
        write_table(
            &mut out,
            "Group",
            set,
            Detail {
                users: true,
                queues: true,
                ..Detail::default()
            },
        )?;
    }

    banner(&mut out, "Summary by queue")?;
    for set in index.queues() {
        write_table(
            &mut out,
            "Queue",
            set,
            Detail {
                users: true,
                groups: true,
                ..Detail::default()
            },
        )?;
    }

    write_node_class(&mut out, "Single-node jobs", index.single_node())?;
    write_node_class(&mut out, "Multi-node jobs", index.multi_node())?;
    Ok(out)
}

/// Ingest counters and every aggregate snapshot as pretty-printed JSON.
pub fn render_json(
    batch: &AccountingBatch,
    index: &AggregationIndex,
) -> serde_json::Result<String> {
    let skipped: Vec<_> = batch
        .skipped
        .iter()
        .map(|s| json!({ "path": s.path, "reason": s.reason }))
        .collect();
    let doc = json!({
        "ingest": {
            "files_read": batch.files_read,
            "lines": batch.stats.lines,
            "end_records": batch.stats.end_records,
            "malformed": batch.stats.malformed,
            "failed_jobs": batch.stats.failed_jobs,
            "defaulted_usage": batch.stats.defaulted_usage,
            "successful_jobs": batch.jobs.len(),
            "routed": index.routed(),
            "skipped": skipped,
        },
        "aggregates": index.snapshot(),
    });
    serde_json::to_string_pretty(&doc)
}
