//! # reviewtrend
//!
//! Client-side streaming pipeline for place review histories: ingest a
//! newline-delimited JSON review stream, keep a sorted working set, bucket
//! ratings over the filtered time span, and fit a least-squares trend line.
//!
//! ## Quick Start
//!
//! ```rust
//! use reviewtrend::{Aggregator, RecencyWindow, ReviewItem};
//!
//! let mut agg = Aggregator::new(RecencyWindow::AllTime, 10);
//! agg.append(vec![
//!     ReviewItem { timestamp: 2000.0, author: "b".into(), content: "y".into(), rating: 3.0 },
//!     ReviewItem { timestamp: 1000.0, author: "a".into(), content: "x".into(), rating: 5.0 },
//! ]);
//!
//! let summary = agg.summary();
//! assert_eq!(summary.averages.len(), 2);
//! assert!(summary.fit.slope < 0.0); // rating is declining
//! ```
//!
//! ## Pipeline
//!
//! 1. **Query Controller** opens one streaming request at a time; a new
//!    `start` supersedes (cancels) the previous query via a generation
//!    counter, so stale records can never reach the aggregator.
//! 2. **Stream Decoder** turns arbitrary byte chunks into complete NDJSON
//!    records: review batches or the terminal error sentinel.
//! 3. **Aggregator** keeps the working set sorted, filters it by a recency
//!    window, buckets it into equal-width time windows and averages each.
//! 4. **Least-Squares Fitter** solves the 2x2 normal equations over the
//!    bucket averages for the displayed trend line.

pub mod aggregate;
pub mod api;
pub mod error;
pub mod export;
pub mod fit;
pub mod ndjson;
pub mod query;
pub mod settings;
pub mod types;

// Re-export commonly used types for convenience
pub use aggregate::{Aggregator, DEFAULT_BUCKETS, RecencyWindow, TrendSummary, bucket};
pub use api::{ApiClient, ByteStream, DEFAULT_ACCURACY, ReviewSource, ReviewTarget};
pub use error::QueryError;
pub use export::{to_csv_string, write_csv};
pub use fit::fit_line;
pub use ndjson::{NdjsonDecoder, Record};
pub use query::{QueryController, QueryEvent, QueryEvents, QueryState};
pub use settings::Settings;
pub use types::{GeoLocation, LinearFit, PlaceHit, ReviewAverage, ReviewItem};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!NAME.is_empty());
        assert!(!DESCRIPTION.is_empty());
    }

    #[test]
    fn test_types_export() {
        let fit = fit_line(&[], &[]);
        assert_eq!(fit.bias, 2.5);
    }
}
