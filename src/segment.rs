//! Rule-based segmentation of RFM score triples

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RfmError;
use crate::score::CustomerScore;

/// Behavioural segment. Variant order is rule precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    Champions,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "New Customers")]
    NewCustomers,
    #[serde(rename = "At Risk")]
    AtRisk,
    Lost,
    #[serde(rename = "Potential Loyalists")]
    PotentialLoyalists,
}

impl Segment {
    pub const ALL: [Segment; 6] = [
        Segment::Champions,
        Segment::LoyalCustomers,
        Segment::NewCustomers,
        Segment::AtRisk,
        Segment::Lost,
        Segment::PotentialLoyalists,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Champions => "Champions",
            Self::LoyalCustomers => "Loyal Customers",
            Self::NewCustomers => "New Customers",
            Self::AtRisk => "At Risk",
            Self::Lost => "Lost",
            Self::PotentialLoyalists => "Potential Loyalists",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

type Rule = (fn(u8, u8, u8) -> bool, Segment);

/// Evaluated top to bottom; the first matching predicate wins.
const RULES: [Rule; 5] = [
    (|r, f, m| r >= 4 && f >= 4 && m >= 4, Segment::Champions),
    (|r, f, m| r >= 3 && f >= 3 && m >= 3, Segment::LoyalCustomers),
    (|r, f, _| r >= 4 && f <= 2, Segment::NewCustomers),
    (|r, f, m| r <= 2 && f >= 3 && m >= 3, Segment::AtRisk),
    (|r, f, _| r <= 2 && f <= 2, Segment::Lost),
];

/// Classify a score triple. Total over all inputs: anything no rule
/// matches is a potential loyalist.
pub fn classify(r_score: u8, f_score: u8, m_score: u8) -> Segment {
    RULES
        .iter()
        .find(|(matches, _)| matches(r_score, f_score, m_score))
        .map_or(Segment::PotentialLoyalists, |&(_, segment)| segment)
}

/// Assign a segment to every scored customer.
///
/// Rows are validated first so a hand-edited snapshot with out-of-range
/// scores is rejected rather than silently classified.
pub fn segment_customers(scores: Vec<CustomerScore>) -> crate::Result<Vec<CustomerScore>> {
    if scores.is_empty() {
        return Err(RfmError::EmptyInput { stage: "segments" });
    }

    let segmented = scores
        .into_iter()
        .map(|mut row| {
            row.validate()?;
            row.segment = Some(classify(row.r_score, row.f_score, row.m_score));
            Ok(row)
        })
        .collect::<crate::Result<Vec<_>>>()?;

    debug!(customers = segmented.len(), "segmented customers");
    Ok(segmented)
}
