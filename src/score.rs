//! Quantile scoring of RFM metrics into ordinal 1-5 scores
//!
//! Each metric is binned independently. Binning tries a strict quantile
//! partition first, then a partition with duplicate quantile edges collapsed,
//! and finally an equal-width partition of the value range. All three tiers
//! are pure functions of the input values.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RfmError;
use crate::metrics::{validate_metrics, CustomerMetrics};
use crate::segment::Segment;

/// Number of ordinal bins per metric.
pub const SCORE_BINS: usize = 5;

/// How raw values map onto scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Lowest value scores 1, highest scores 5
    Ascending,
    /// Lowest value scores 5, highest scores 1
    Descending,
}

impl Direction {
    fn label(self, bin: usize) -> u8 {
        let bin = bin.clamp(1, SCORE_BINS) as u8;
        match self {
            Self::Ascending => bin,
            Self::Descending => SCORE_BINS as u8 + 1 - bin,
        }
    }
}

/// Which partition produced a set of scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinningTier {
    Quantile,
    DeduplicatedQuantile,
    EqualWidth,
}

/// Scores for one metric plus the tier that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Binned {
    pub scores: Vec<u8>,
    pub tier: BinningTier,
}

/// A customer's metrics enriched with scores and, once classified, a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerScore {
    #[serde(flatten)]
    pub metrics: CustomerMetrics,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    pub rfm_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<Segment>,
}

impl CustomerScore {
    pub fn new(metrics: CustomerMetrics, r_score: u8, f_score: u8, m_score: u8) -> Self {
        Self {
            metrics,
            r_score,
            f_score,
            m_score,
            rfm_code: rfm_code(r_score, f_score, m_score),
            segment: None,
        }
    }

    pub fn customer_id(&self) -> &str {
        &self.metrics.customer_id
    }

    /// Reject rows whose scores fall outside 1..=5.
    pub fn validate(&self) -> crate::Result<()> {
        for score in [self.r_score, self.f_score, self.m_score] {
            if !(1..=SCORE_BINS as u8).contains(&score) {
                return Err(RfmError::InvalidScore {
                    customer_id: self.metrics.customer_id.clone(),
                    score,
                });
            }
        }
        Ok(())
    }
}

/// Concatenate the three scores into a compact label, e.g. `5,4,3` -> `"543"`.
pub fn rfm_code(r_score: u8, f_score: u8, m_score: u8) -> String {
    format!("{}{}{}", r_score, f_score, m_score)
}

/// Score every customer on recency (inverse), frequency and monetary value.
///
/// Frequency is ranked first, ties broken by row order, so equal counts
/// spread across bins instead of piling onto one boundary.
pub fn score_customers(metrics: &[CustomerMetrics]) -> crate::Result<Vec<CustomerScore>> {
    if metrics.is_empty() {
        return Err(RfmError::EmptyInput { stage: "scores" });
    }
    validate_metrics(metrics)?;

    let recency: Vec<f64> = metrics.iter().map(|m| m.recency_days as f64).collect();
    let frequency: Vec<f64> = metrics.iter().map(|m| m.frequency_count as f64).collect();
    let monetary: Vec<f64> = metrics.iter().map(|m| m.monetary_total).collect();

    let r = score_values(&recency, Direction::Descending);
    let f = bin_with_fallback(&first_seen_ranks(&frequency), &frequency, Direction::Ascending);
    let m = score_values(&monetary, Direction::Ascending);

    for (metric, binned) in [("recency", &r), ("frequency", &f), ("monetary", &m)] {
        if binned.tier != BinningTier::Quantile {
            warn!(
                metric,
                tier = ?binned.tier,
                "too few distinct values for quantile bins, fell back"
            );
        }
    }

    let scores: Vec<CustomerScore> = metrics
        .iter()
        .zip(r.scores)
        .zip(f.scores)
        .zip(m.scores)
        .map(|(((row, r), f), m)| CustomerScore::new(row.clone(), r, f, m))
        .collect();

    debug!(customers = scores.len(), "scored customers");
    Ok(scores)
}

/// Bin `values` into scores 1..=5, falling back through the tiers as needed.
pub fn score_values(values: &[f64], direction: Direction) -> Binned {
    bin_with_fallback(values, values, direction)
}

/// Quantile-bin `ranked`; if that fails, bin `raw` by equal width instead.
fn bin_with_fallback(ranked: &[f64], raw: &[f64], direction: Direction) -> Binned {
    let (bins, tier) = if let Some(bins) = strict_quantile_bins(ranked) {
        (bins, BinningTier::Quantile)
    } else if let Some(bins) = deduplicated_quantile_bins(ranked) {
        (bins, BinningTier::DeduplicatedQuantile)
    } else {
        (equal_width_bins(raw), BinningTier::EqualWidth)
    };

    Binned {
        scores: bins.into_iter().map(|bin| direction.label(bin)).collect(),
        tier,
    }
}

/// Quantile bins when all six edges are distinct.
///
/// Returns 1-based bin numbers, or `None` if any two edges coincide.
pub fn strict_quantile_bins(values: &[f64]) -> Option<Vec<usize>> {
    let edges = quantile_edges(values)?;
    if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
        return None;
    }
    Some(assign_bins(values, &edges))
}

/// Quantile bins with coinciding edges collapsed into one boundary.
///
/// Empty bins are skipped, so a value keeps the number of the first bin
/// whose upper edge reaches it. Returns `None` when fewer than two distinct
/// edges remain (every value identical).
pub fn deduplicated_quantile_bins(values: &[f64]) -> Option<Vec<usize>> {
    let edges = quantile_edges(values)?;
    if edges[0] >= edges[SCORE_BINS] {
        return None;
    }
    Some(assign_bins(values, &edges))
}

/// Equal-width bins over `[min, max]`, right-closed, lowest edge included.
///
/// A zero-width range places every value in bin 1. Some bins may be empty.
pub fn equal_width_bins(values: &[f64]) -> Vec<usize> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / SCORE_BINS as f64;

    values
        .iter()
        .map(|&value| {
            if width <= 0.0 {
                return 1;
            }
            let position = ((value - min) / width).ceil();
            (position as usize).clamp(1, SCORE_BINS)
        })
        .collect()
}

/// Rank values 1..=n; equal values are ranked by their position in the slice.
pub fn first_seen_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (rank, index) in order.into_iter().enumerate() {
        ranks[index] = (rank + 1) as f64;
    }
    ranks
}

/// The 0%, 20%, ..., 100% quantiles, linearly interpolated.
fn quantile_edges(values: &[f64]) -> Option<[f64; SCORE_BINS + 1]> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut edges = [0.0; SCORE_BINS + 1];
    for (i, edge) in edges.iter_mut().enumerate() {
        *edge = percentile(&sorted, i as f64 / SCORE_BINS as f64);
    }
    Some(edges)
}

fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    let last = sorted.len() - 1;
    let rank = fraction * last as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(last);
    let frac = rank - lower as f64;

    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (sorted[upper] - sorted[lower]) * frac
    }
}

/// Place each value in the first bin whose upper edge is at or above it.
fn assign_bins(values: &[f64], edges: &[f64; SCORE_BINS + 1]) -> Vec<usize> {
    values
        .iter()
        .map(|&value| {
            edges[1..]
                .iter()
                .position(|&edge| value <= edge)
                .map_or(SCORE_BINS, |i| i + 1)
        })
        .collect()
}
