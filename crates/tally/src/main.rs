//! tally - usage reports from PBS/Torque accounting logs.

mod config;
mod logging;
mod report;
mod windows;

use clap::Parser;
use config::ReportConfig;
use miette::{IntoDiagnostic, Result};
use tally_cli::Args;
use tally_pbs::{ingest_dir, usable_jobs};
use tally_stats::AggregationIndex;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = ReportConfig::from_args(&args)?;
    tracing::info!(
        "Reporting on {} over {} windows",
        config.data_dir,
        config.windows.len()
    );

    let batch = ingest_dir(&config.data_dir).await.into_diagnostic()?;
    for skipped in &batch.skipped {
        tracing::warn!("Skipped {}: {}", skipped.path, skipped.reason);
    }

    let jobs = usable_jobs(&batch.jobs);
    if jobs.len() < batch.jobs.len() {
        tracing::info!(
            "Dropped {} jobs without a resolved core count",
            batch.jobs.len() - jobs.len()
        );
    }
    let index = AggregationIndex::build(config.windows.clone(), &jobs);

    let output = if config.json {
        report::render_json(&batch, &index).into_diagnostic()?
    } else {
        report::render_report(&batch, &index).into_diagnostic()?
    };
    println!("{}", output);

    Ok(())
}
