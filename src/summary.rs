//! Per-segment descriptive statistics

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RfmError;
use crate::score::CustomerScore;
use crate::segment::Segment;

/// Aggregate statistics for one non-empty segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customer_count: usize,
    pub avg_recency: f64,
    pub avg_frequency: f64,
    pub avg_monetary_value: f64,
    /// Share of all scored customers, in percent
    pub percentage: f64,
}

#[derive(Default)]
struct Totals {
    count: usize,
    recency: f64,
    frequency: f64,
    monetary: f64,
}

/// Summarise segmented customers, one row per populated segment in rule order.
///
/// Averages are rounded to two decimals and percentages to one.
pub fn summarize_segments(rows: &[CustomerScore]) -> crate::Result<Vec<SegmentSummary>> {
    if rows.is_empty() {
        return Err(RfmError::EmptyInput { stage: "summary" });
    }

    let mut groups: BTreeMap<Segment, Totals> = BTreeMap::new();
    for row in rows {
        let segment = row
            .segment
            .ok_or_else(|| RfmError::Unsegmented(row.customer_id().to_string()))?;
        let totals = groups.entry(segment).or_default();
        totals.count += 1;
        totals.recency += row.metrics.recency_days as f64;
        totals.frequency += row.metrics.frequency_count as f64;
        totals.monetary += row.metrics.monetary_total;
    }

    let total_customers = rows.len() as f64;
    let summary: Vec<SegmentSummary> = groups
        .into_iter()
        .map(|(segment, totals)| {
            let count = totals.count as f64;
            SegmentSummary {
                segment,
                customer_count: totals.count,
                avg_recency: round_to(totals.recency / count, 2),
                avg_frequency: round_to(totals.frequency / count, 2),
                avg_monetary_value: round_to(totals.monetary / count, 2),
                percentage: round_to(count / total_customers * 100.0, 1),
            }
        })
        .collect();

    info!(
        segments = summary.len(),
        customers = rows.len(),
        "summarised segments"
    );
    Ok(summary)
}

/// Round to `decimals` places, halves to even.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
