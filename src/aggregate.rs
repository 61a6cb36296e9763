//! Working-set aggregation: sorting, recency filtering, time bucketing and
//! the fitted rating trend.
//!
//! The aggregator owns the accumulated reviews of the current query. Every
//! mutation (append, reset, window or bucket-count change) synchronously
//! recomputes the bucketed averages and the least-squares fit, so readers
//! always observe a summary consistent with the working set.

use chrono::Utc;
use serde::Deserialize;

use crate::fit::{NEUTRAL_BIAS, fit_line};
use crate::types::{LinearFit, ReviewAverage, ReviewItem};

/// Default number of time buckets when nothing else is configured.
pub const DEFAULT_BUCKETS: usize = 10;

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Recency filter applied to the working set before bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum RecencyWindow {
    #[default]
    #[serde(rename = "all")]
    AllTime,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "6m")]
    SixMonths,
}

impl RecencyWindow {
    /// Minimum admitted timestamp, resolved against `now` (unix seconds).
    pub fn min_timestamp(self, now: f64) -> f64 {
        match self {
            RecencyWindow::AllTime => f64::NEG_INFINITY,
            RecencyWindow::FiveYears => now - 5.0 * SECONDS_PER_YEAR,
            RecencyWindow::OneYear => now - SECONDS_PER_YEAR,
            RecencyWindow::SixMonths => now - 0.5 * SECONDS_PER_YEAR,
        }
    }
}

impl std::str::FromStr for RecencyWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" | "all-time" => Ok(RecencyWindow::AllTime),
            "5y" => Ok(RecencyWindow::FiveYears),
            "1y" => Ok(RecencyWindow::OneYear),
            "6m" => Ok(RecencyWindow::SixMonths),
            other => Err(format!(
                "unknown recency window '{}' (expected all, 5y, 1y or 6m)",
                other
            )),
        }
    }
}

/// Current aggregation result: bucketed averages plus the fitted trend.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSummary {
    /// One average per non-empty bucket, in ascending timestamp order.
    pub averages: Vec<ReviewAverage>,
    /// Least-squares fit over the averages, on normalized x.
    pub fit: LinearFit,
}

impl TrendSummary {
    fn empty() -> Self {
        TrendSummary {
            averages: Vec::new(),
            fit: LinearFit {
                slope: 0.0,
                bias: NEUTRAL_BIAS,
            },
        }
    }
}

/// Owner of the working set for one place's review history.
#[derive(Debug)]
pub struct Aggregator {
    /// Sorted ascending by timestamp, ties in arrival order.
    items: Vec<ReviewItem>,
    window: RecencyWindow,
    bucket_count: usize,
    summary: TrendSummary,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(RecencyWindow::default(), DEFAULT_BUCKETS)
    }
}

impl Aggregator {
    pub fn new(window: RecencyWindow, bucket_count: usize) -> Self {
        Self {
            items: Vec::new(),
            window,
            bucket_count: bucket_count.max(1),
            summary: TrendSummary::empty(),
        }
    }

    /// The working set, sorted ascending by timestamp.
    pub fn items(&self) -> &[ReviewItem] {
        &self.items
    }

    /// The cached aggregation result for the current window and bucket count.
    pub fn summary(&self) -> &TrendSummary {
        &self.summary
    }

    /// Empty the working set.
    pub fn reset(&mut self) {
        self.items.clear();
        self.recompute();
    }

    /// Append a batch and restore timestamp order.
    ///
    /// Batches arrive out of temporal order relative to each other, so the
    /// whole set is re-sorted rather than merged. Batch sizes are small
    /// relative to typical review counts; simplicity wins over a merge.
    pub fn append(&mut self, items: Vec<ReviewItem>) {
        self.items.extend(items);
        self.items
            .sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        self.recompute();
    }

    pub fn window(&self) -> RecencyWindow {
        self.window
    }

    pub fn set_window(&mut self, window: RecencyWindow) {
        self.window = window;
        self.recompute();
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn set_bucket_count(&mut self, bucket_count: usize) {
        self.bucket_count = bucket_count.max(1);
        self.recompute();
    }

    /// Subsequence of the working set with `timestamp >= min_timestamp`,
    /// in order. The set is sorted, so this is a suffix.
    pub fn filtered(&self, min_timestamp: f64) -> &[ReviewItem] {
        let start = self
            .items
            .partition_point(|item| item.timestamp < min_timestamp);
        &self.items[start..]
    }

    fn recompute(&mut self) {
        let min_timestamp = self.window.min_timestamp(Utc::now().timestamp() as f64);
        let summary = bucket(self.filtered(min_timestamp), self.bucket_count);
        self.summary = summary;
    }
}

/// Bucket sorted `items` into up to `window_count` equal-width time windows
/// and fit a trend line over the per-window averages.
///
/// With fewer than two items, or a zero span, the items pass through
/// unbucketed with the neutral default fit. Empty windows are dropped, so
/// the output holds between 1 and `window_count` averages (0 for no input).
pub fn bucket(items: &[ReviewItem], window_count: usize) -> TrendSummary {
    let window_count = window_count.max(1);
    if items.is_empty() {
        return TrendSummary::empty();
    }

    let min = items[0].timestamp;
    let max = items[items.len() - 1].timestamp;
    let span = max - min;
    if items.len() < 2 || span == 0.0 {
        let averages = items
            .iter()
            .map(|item| ReviewAverage {
                timestamp: item.timestamp,
                rating: item.rating,
            })
            .collect();
        return TrendSummary {
            averages,
            fit: LinearFit {
                slope: 0.0,
                bias: NEUTRAL_BIAS,
            },
        };
    }

    let width = span / window_count as f64;
    let mut sums = vec![(0.0f64, 0.0f64, 0usize); window_count];
    for item in items {
        // Clamp guards the boundary item at t == max.
        let index = (((item.timestamp - min) / width) as usize).min(window_count - 1);
        let slot = &mut sums[index];
        slot.0 += item.timestamp;
        slot.1 += item.rating;
        slot.2 += 1;
    }

    let averages: Vec<ReviewAverage> = sums
        .iter()
        .filter(|slot| slot.2 > 0)
        .map(|slot| ReviewAverage {
            timestamp: slot.0 / slot.2 as f64,
            rating: slot.1 / slot.2 as f64,
        })
        .collect();

    let norm = span.max(f64::EPSILON);
    let xs: Vec<f64> = averages
        .iter()
        .map(|avg| (avg.timestamp - min) / norm)
        .collect();
    let ys: Vec<f64> = averages.iter().map(|avg| avg.rating).collect();

    TrendSummary {
        fit: fit_line(&xs, &ys),
        averages,
    }
}
