//! Run configuration derived from command-line arguments.

use crate::windows::{default_years, standard_windows};
use camino::Utf8PathBuf;
use chrono::Utc;
use miette::{Result, miette};
use tally_cli::Args;
use tally_stats::Window;

/// Configuration for one reporting run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Directory of accounting files
    pub data_dir: Utf8PathBuf,
    /// Windows every population is aggregated over
    pub windows: Vec<Window>,
    /// Emit JSON snapshots instead of text
    pub json: bool,
}

impl ReportConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let now = args.now.unwrap_or_else(|| Utc::now().timestamp());
        let years = if args.years.is_empty() {
            default_years(now)
        } else {
            args.years.clone()
        };
        let windows = standard_windows(now, &years)
            .ok_or_else(|| miette!("Cannot build calendar windows for years {:?}", years))?;

        Ok(Self {
            data_dir: args.dir.clone(),
            windows,
            json: args.json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_years_and_dir() {
        let args = Args::parse_from(["tally", "--now", "1404172800"]);
        let config = ReportConfig::from_args(&args).unwrap();
        assert_eq!(config.data_dir, "./Data");
        let labels: Vec<&str> = config.windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(&labels[3..], ["2014", "2013", "2012"]);
        assert!(!config.json);
    }

    #[test]
    fn test_from_args() {
        let args = Args::parse_from([
            "tally",
            "logs",
            "--years",
            "2015,2014,2013",
            "--now",
            "1420070400",
        ]);
        let config = ReportConfig::from_args(&args).unwrap();
        assert_eq!(config.data_dir, "logs");
        let labels: Vec<&str> = config.windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Past 30 days",
                "Past 60 days",
                "Past 90 days",
                "2015",
                "2014",
                "2013",
            ]
        );
        assert_eq!(config.windows[0].end, 1_420_070_400);
    }

    #[test]
    fn test_invalid_year() {
        let args = Args::parse_from(["tally", "--years", "300000"]);
        assert!(ReportConfig::from_args(&args).is_err());
    }
}
