//! CLI argument parsing for tally.

use camino::Utf8PathBuf;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Summarize PBS/Torque accounting logs by window, user, group and queue")]
pub struct Args {
    /// Directory of accounting log files
    #[arg(default_value = "./Data")]
    pub dir: Utf8PathBuf,

    /// Calendar years to report (default: this year and the two before)
    #[arg(long, value_delimiter = ',')]
    pub years: Vec<i32>,

    /// End of the rolling windows as epoch seconds (default: now)
    #[arg(long)]
    pub now: Option<i64>,

    /// Print aggregate snapshots as JSON instead of text tables
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["tally"]);
        assert_eq!(args.dir, "./Data");
        assert!(args.years.is_empty());
        assert!(args.now.is_none());
        assert!(!args.json);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_years_and_flags() {
        let args = Args::parse_from([
            "tally",
            "/var/spool/torque/server_priv/accounting",
            "--years",
            "2015,2014,2013",
            "--now",
            "1420070400",
            "--json",
            "-vv",
        ]);
        assert_eq!(args.dir, "/var/spool/torque/server_priv/accounting");
        assert_eq!(args.years, vec![2015, 2014, 2013]);
        assert_eq!(args.now, Some(1_420_070_400));
        assert!(args.json);
        assert_eq!(args.verbose, 2);
    }
}
