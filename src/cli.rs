//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::report::DEFAULT_TITLE;

/// Customer segmentation CLI using RFM quantile scores
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose (debug) logging; RFM_LOG overrides the filter
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// One subcommand per pipeline stage, plus the whole chain.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate a transaction CSV into per-customer metrics
    Metrics(StageIo),
    /// Score a metrics snapshot into 1-5 R/F/M scores
    Score(StageIo),
    /// Assign segments to a scores snapshot
    Segment(StageIo),
    /// Summarise a segments snapshot per segment
    Summarize {
        #[command(flatten)]
        io: StageIo,
        #[command(flatten)]
        report: ReportOptions,
    },
    /// Run every stage from a transaction CSV and print the summary
    Run {
        /// Path to the transaction CSV file
        #[arg(short, long)]
        input: PathBuf,
        /// Directory to write each stage's snapshot into
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
        #[command(flatten)]
        report: ReportOptions,
    },
}

/// Input and output paths of a single stage.
#[derive(ClapArgs, Debug, Clone)]
pub struct StageIo {
    /// Upstream file (CSV for `metrics`, JSON snapshot otherwise)
    #[arg(short, long)]
    pub input: PathBuf,
    /// Snapshot file to write
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Where and how to render the summary.
#[derive(ClapArgs, Debug, Clone)]
pub struct ReportOptions {
    /// Also write the summary as an HTML page
    #[arg(long, env = "RFM_REPORT_HTML")]
    pub html: Option<PathBuf>,
    /// Report heading
    #[arg(long, env = "RFM_REPORT_TITLE", default_value = DEFAULT_TITLE)]
    pub title: String,
}

impl Args {
    /// Default log filter when RFM_LOG is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stage_command() {
        let args = Args::try_parse_from([
            "rfmforge", "score", "--input", "metrics.json", "--output", "scores.json",
        ])
        .unwrap();

        match &args.command {
            Command::Score(io) => {
                assert_eq!(io.input, PathBuf::from("metrics.json"));
                assert_eq!(io.output, PathBuf::from("scores.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(args.default_log_filter(), "info");
    }

    #[test]
    fn test_parse_run_command() {
        let args = Args::try_parse_from([
            "rfmforge",
            "run",
            "-i",
            "sales.csv",
            "--snapshot-dir",
            "out",
            "--title",
            "Weekly",
            "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        assert_eq!(args.default_log_filter(), "debug");
        match args.command {
            Command::Run {
                input,
                snapshot_dir,
                report,
            } => {
                assert_eq!(input, PathBuf::from("sales.csv"));
                assert_eq!(snapshot_dir, Some(PathBuf::from("out")));
                assert_eq!(report.title, "Weekly");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_stage_requires_output() {
        let result = Args::try_parse_from(["rfmforge", "metrics", "--input", "tx.csv"]);
        assert!(result.is_err());
    }
}
