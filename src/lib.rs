//! RfmForge: customer segmentation from transaction history using RFM analysis
//!
//! Transactions are aggregated into per-customer Recency/Frequency/Monetary
//! metrics, quantile-scored 1-5 on each axis, classified into named segments
//! by ordered rules, and summarised per segment.

pub mod cli;
pub mod data;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod score;
pub mod segment;
pub mod snapshot;
pub mod summary;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_transactions, TransactionRecord};
pub use error::RfmError;
pub use metrics::{compute_metrics, CustomerMetrics, MetricsOutcome};
pub use pipeline::{run_pipeline, PipelineOutput};
pub use report::{ConsoleSink, HtmlFileSink, ReportSink};
pub use score::{score_customers, score_values, CustomerScore, Direction};
pub use segment::{classify, segment_customers, Segment};
pub use summary::{summarize_segments, SegmentSummary};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, RfmError>;
