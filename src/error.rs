//! Error taxonomy for the scoring pipeline

/// Errors raised by the pipeline stages and the file adapters around them.
///
/// Every variant is fatal for the run: no partial summary is produced.
/// Degenerate binning and skipped records are not errors; they are logged.
#[derive(Debug, thiserror::Error)]
pub enum RfmError {
    #[error("{stage}: input collection is empty")]
    EmptyInput { stage: &'static str },

    #[error("no transaction carries a customer identifier ({skipped} records skipped)")]
    MissingCustomerIds { skipped: usize },

    #[error("transaction '{transaction_id}': unparsable date '{value}'")]
    InvalidDate {
        transaction_id: String,
        value: String,
    },

    #[error("transaction '{transaction_id}': invalid amount '{value}'")]
    InvalidAmount {
        transaction_id: String,
        value: String,
    },

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("customer '{0}' has no segment assigned")]
    Unsegmented(String),

    #[error("customer '{customer_id}': score {score} outside 1..=5")]
    InvalidScore { customer_id: String, score: u8 },

    #[error("customer '{customer_id}': {reason}")]
    InvalidMetrics {
        customer_id: String,
        reason: &'static str,
    },

    #[error("customer '{0}' appears more than once")]
    DuplicateCustomer(String),

    #[error("'{stage}' snapshot declares {declared} records but holds {actual}")]
    SnapshotCount {
        stage: String,
        declared: usize,
        actual: usize,
    },

    #[error("expected a '{expected}' snapshot, found '{found}'")]
    SnapshotStage { expected: String, found: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

impl RfmError {
    /// Whether the error comes from bad input data rather than the environment.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::Json(_) | Self::Polars(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_classification() {
        assert!(RfmError::EmptyInput { stage: "metrics" }.is_input_error());
        assert!(RfmError::MissingCustomerIds { skipped: 3 }.is_input_error());

        let io = RfmError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(!io.is_input_error());
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = RfmError::InvalidAmount {
            transaction_id: "42".to_string(),
            value: "-3".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("42"));
        assert!(message.contains("-3"));
    }
}
