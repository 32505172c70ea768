//! Linear chaining of the four scoring stages

use tracing::info;

use crate::data::TransactionRecord;
use crate::metrics::{compute_metrics, CustomerMetrics};
use crate::score::{score_customers, CustomerScore};
use crate::segment::segment_customers;
use crate::summary::{summarize_segments, SegmentSummary};

/// Every stage's output from one full run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub metrics: Vec<CustomerMetrics>,
    pub scores: Vec<CustomerScore>,
    pub segmented: Vec<CustomerScore>,
    pub summary: Vec<SegmentSummary>,
    pub skipped_records: usize,
}

/// Run metrics, scoring, segmentation and aggregation in order.
///
/// Each stage receives its own copy of the previous output. Any error aborts
/// the run before a summary exists.
pub fn run_pipeline(transactions: &[TransactionRecord]) -> crate::Result<PipelineOutput> {
    let outcome = compute_metrics(transactions)?;
    let scores = score_customers(&outcome.metrics)?;
    let segmented = segment_customers(scores.clone())?;
    let summary = summarize_segments(&segmented)?;

    info!(
        transactions = transactions.len(),
        customers = outcome.metrics.len(),
        segments = summary.len(),
        "pipeline complete"
    );

    Ok(PipelineOutput {
        metrics: outcome.metrics,
        scores,
        segmented,
        summary,
        skipped_records: outcome.skipped_records,
    })
}
