//! Per-customer recency, frequency and monetary aggregation

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::data::TransactionRecord;
use crate::error::RfmError;

/// Raw RFM metrics for one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetrics {
    pub customer_id: String,
    /// Days between the batch reference date and the customer's last purchase
    pub recency_days: i64,
    pub frequency_count: u64,
    pub monetary_total: f64,
}

impl CustomerMetrics {
    /// Reject rows that aggregation could never have produced.
    pub fn validate(&self) -> crate::Result<()> {
        let reason = if self.recency_days < 0 {
            "negative recency"
        } else if self.frequency_count == 0 {
            "zero frequency"
        } else if !(self.monetary_total.is_finite() && self.monetary_total >= 0.0) {
            "negative or non-finite monetary total"
        } else {
            return Ok(());
        };
        Err(RfmError::InvalidMetrics {
            customer_id: self.customer_id.clone(),
            reason,
        })
    }
}

/// Validate every row and require customer ids to be unique.
pub fn validate_metrics(metrics: &[CustomerMetrics]) -> crate::Result<()> {
    let mut seen = HashSet::with_capacity(metrics.len());
    for row in metrics {
        row.validate()?;
        if !seen.insert(row.customer_id.as_str()) {
            return Err(RfmError::DuplicateCustomer(row.customer_id.clone()));
        }
    }
    Ok(())
}

/// Output of the aggregation stage.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsOutcome {
    /// One row per distinct customer, ordered by customer id
    pub metrics: Vec<CustomerMetrics>,
    /// Latest transaction date across the whole batch
    pub reference_date: NaiveDate,
    /// Rows dropped because they carried no customer identifier
    pub skipped_records: usize,
}

#[derive(Default)]
struct Accumulator {
    last_purchase: Option<NaiveDate>,
    count: u64,
    total: f64,
}

/// Group transactions by customer and compute RFM metrics.
///
/// The reference date is the maximum date over every record, including rows
/// that are later skipped for lacking an identifier. Input order does not
/// affect the result.
pub fn compute_metrics(transactions: &[TransactionRecord]) -> crate::Result<MetricsOutcome> {
    let reference_date = transactions
        .iter()
        .map(|tx| tx.occurred_on)
        .max()
        .ok_or(RfmError::EmptyInput { stage: "metrics" })?;

    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let mut skipped_records = 0;

    for tx in transactions {
        let Some(customer_id) = tx.customer_id.as_deref() else {
            skipped_records += 1;
            continue;
        };
        let acc = groups.entry(customer_id).or_default();
        acc.last_purchase = acc.last_purchase.max(Some(tx.occurred_on));
        acc.count += 1;
        acc.total += tx.amount;
    }

    if groups.is_empty() {
        return Err(RfmError::MissingCustomerIds {
            skipped: skipped_records,
        });
    }

    let metrics: Vec<CustomerMetrics> = groups
        .into_iter()
        .map(|(customer_id, acc)| {
            let last_purchase = acc.last_purchase.unwrap_or(reference_date);
            CustomerMetrics {
                customer_id: customer_id.to_string(),
                recency_days: (reference_date - last_purchase).num_days(),
                frequency_count: acc.count,
                monetary_total: acc.total,
            }
        })
        .collect();

    if skipped_records > 0 {
        warn!(skipped_records, "dropped transactions without customer identifier");
    }
    info!(
        customers = metrics.len(),
        skipped_records,
        %reference_date,
        "computed customer metrics"
    );

    Ok(MetricsOutcome {
        metrics,
        reference_date,
        skipped_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn tx(id: &str, day: u32, amount: f64, customer: Option<&str>) -> TransactionRecord {
        TransactionRecord::new(id, date(day), amount, customer)
    }

    #[test]
    fn test_compute_metrics() {
        let transactions = vec![
            tx("1", 1, 100.0, Some("alice")),
            tx("2", 11, 50.0, Some("alice")),
            tx("3", 21, 30.0, Some("bob")),
            tx("4", 31, 10.0, None),
        ];

        let outcome = compute_metrics(&transactions).unwrap();

        assert_eq!(outcome.reference_date, date(31));
        assert_eq!(outcome.skipped_records, 1);
        assert_eq!(outcome.metrics.len(), 2);

        let alice = &outcome.metrics[0];
        assert_eq!(alice.customer_id, "alice");
        assert_eq!(alice.recency_days, 20);
        assert_eq!(alice.frequency_count, 2);
        assert_eq!(alice.monetary_total, 150.0);

        let bob = &outcome.metrics[1];
        assert_eq!(bob.recency_days, 10);
        assert_eq!(bob.frequency_count, 1);
    }

    #[test]
    fn test_latest_purchase_defines_recency() {
        let transactions = vec![
            tx("1", 20, 1.0, Some("c")),
            tx("2", 5, 1.0, Some("c")),
            tx("3", 25, 1.0, Some("d")),
        ];

        let outcome = compute_metrics(&transactions).unwrap();
        assert_eq!(outcome.metrics[0].recency_days, 5);
        assert_eq!(outcome.metrics[1].recency_days, 0);
    }

    #[test]
    fn test_input_order_is_irrelevant() {
        let mut transactions = vec![
            tx("1", 3, 10.0, Some("x")),
            tx("2", 9, 20.0, Some("y")),
            tx("3", 6, 30.0, Some("x")),
            tx("4", 1, 40.0, Some("z")),
        ];
        let forward = compute_metrics(&transactions).unwrap();
        transactions.reverse();
        let backward = compute_metrics(&transactions).unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_validate_metrics() {
        let outcome = compute_metrics(&[tx("1", 1, 5.0, Some("a"))]).unwrap();
        assert!(validate_metrics(&outcome.metrics).is_ok());

        let row = |id: &str, recency, frequency, monetary| CustomerMetrics {
            customer_id: id.to_string(),
            recency_days: recency,
            frequency_count: frequency,
            monetary_total: monetary,
        };

        assert!(matches!(
            row("a", -3, 1, 1.0).validate(),
            Err(RfmError::InvalidMetrics { reason: "negative recency", .. })
        ));
        assert!(matches!(
            row("a", 0, 0, 1.0).validate(),
            Err(RfmError::InvalidMetrics { reason: "zero frequency", .. })
        ));
        assert!(row("a", 0, 1, -5.0).validate().is_err());
        assert!(row("a", 0, 1, f64::NAN).validate().is_err());

        let duplicated = vec![row("a", 1, 1, 1.0), row("b", 1, 1, 1.0), row("a", 2, 1, 1.0)];
        assert!(matches!(
            validate_metrics(&duplicated),
            Err(RfmError::DuplicateCustomer(id)) if id == "a"
        ));
    }

    #[test]
    fn test_empty_input() {
        let result = compute_metrics(&[]);
        assert!(matches!(result, Err(RfmError::EmptyInput { .. })));
    }

    #[test]
    fn test_all_identifiers_missing() {
        let transactions = vec![tx("1", 1, 10.0, None), tx("2", 2, 10.0, None)];

        let result = compute_metrics(&transactions);
        assert!(matches!(
            result,
            Err(RfmError::MissingCustomerIds { skipped: 2 })
        ));
    }
}
