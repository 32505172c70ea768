//! RfmForge: customer segmentation CLI built on RFM scoring
//!
//! Each stage can run on its own from the previous stage's snapshot, or the
//! whole chain can run from a transaction CSV.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rfmforge::cli::{Command, ReportOptions, StageIo};
use rfmforge::snapshot::{read_snapshot, stage, write_snapshot};
use rfmforge::{
    compute_metrics, load_transactions, run_pipeline, score_customers, segment_customers,
    summarize_segments, Args, ConsoleSink, CustomerMetrics, CustomerScore, HtmlFileSink,
    ReportSink, SegmentSummary,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter.
const LOG_ENV_VAR: &str = "RFM_LOG";

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.default_log_filter());

    let start_time = Instant::now();
    match args.command {
        Command::Metrics(io) => run_metrics_stage(&io)?,
        Command::Score(io) => run_score_stage(&io)?,
        Command::Segment(io) => run_segment_stage(&io)?,
        Command::Summarize { io, report } => run_summary_stage(&io, &report)?,
        Command::Run {
            input,
            snapshot_dir,
            report,
        } => run_full_pipeline(&input, snapshot_dir.as_deref(), &report)?,
    }

    info!(elapsed_secs = start_time.elapsed().as_secs_f64(), "done");
    Ok(())
}

/// Initialize tracing from RFM_LOG, falling back to `default_filter`.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_metrics_stage(io: &StageIo) -> Result<()> {
    let transactions = load_transactions(&io.input)
        .with_context(|| format!("loading transactions from {}", io.input.display()))?;
    let outcome = compute_metrics(&transactions)?;
    write_stage(&io.output, stage::METRICS, &outcome.metrics)
}

fn run_score_stage(io: &StageIo) -> Result<()> {
    let metrics: Vec<CustomerMetrics> = read_stage(&io.input, stage::METRICS)?;
    let scores = score_customers(&metrics)?;
    write_stage(&io.output, stage::SCORES, &scores)
}

fn run_segment_stage(io: &StageIo) -> Result<()> {
    let scores: Vec<CustomerScore> = read_stage(&io.input, stage::SCORES)?;
    let segmented = segment_customers(scores)?;
    write_stage(&io.output, stage::SEGMENTS, &segmented)
}

fn run_summary_stage(io: &StageIo, report: &ReportOptions) -> Result<()> {
    let segmented: Vec<CustomerScore> = read_stage(&io.input, stage::SEGMENTS)?;
    let summary = summarize_segments(&segmented)?;
    write_stage(&io.output, stage::SUMMARY, &summary)?;
    deliver_report(&summary, report)
}

/// Run every stage, optionally keeping each snapshot on disk.
fn run_full_pipeline(input: &Path, snapshot_dir: Option<&Path>, report: &ReportOptions) -> Result<()> {
    let transactions = load_transactions(input)
        .with_context(|| format!("loading transactions from {}", input.display()))?;
    info!(records = transactions.len(), "loaded transactions");

    let output = run_pipeline(&transactions)?;

    if let Some(dir) = snapshot_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating snapshot directory {}", dir.display()))?;
        write_stage(&dir.join("metrics.json"), stage::METRICS, &output.metrics)?;
        write_stage(&dir.join("scores.json"), stage::SCORES, &output.scores)?;
        write_stage(&dir.join("segments.json"), stage::SEGMENTS, &output.segmented)?;
        write_stage(&dir.join("summary.json"), stage::SUMMARY, &output.summary)?;
    }

    if output.skipped_records > 0 {
        info!(
            skipped_records = output.skipped_records,
            "some transactions had no customer identifier"
        );
    }
    deliver_report(&output.summary, report)
}

fn deliver_report(summary: &[SegmentSummary], report: &ReportOptions) -> Result<()> {
    ConsoleSink.deliver(&report.title, summary)?;
    if let Some(path) = &report.html {
        HtmlFileSink::new(path)
            .deliver(&report.title, summary)
            .with_context(|| format!("writing HTML report to {}", path.display()))?;
    }
    Ok(())
}

fn read_stage<T: serde::de::DeserializeOwned>(path: &Path, expected: &str) -> Result<Vec<T>> {
    read_snapshot(path, expected).with_context(|| format!("reading snapshot {}", path.display()))
}

fn write_stage<T: serde::Serialize>(path: &Path, stage: &str, records: &[T]) -> Result<()> {
    write_snapshot(path, stage, records)
        .with_context(|| format!("writing {} snapshot to {}", stage, path.display()))?;
    info!(stage, records = records.len(), path = %path.display(), "stage output saved");
    Ok(())
}
