//! Core data types shared across the review pipeline.

use serde::{Deserialize, Serialize};

/// A single raw review as delivered by the review stream.
///
/// Immutable once received; the aggregation layer only ever re-orders and
/// averages these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Unix timestamp in seconds.
    pub timestamp: f64,
    pub author: String,
    pub content: String,
    /// Star rating. Expected in [1, 5] but not validated by this layer.
    pub rating: f64,
}

/// Mean timestamp and rating of one non-empty time bucket.
///
/// Derived on every aggregation pass, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReviewAverage {
    pub timestamp: f64,
    pub rating: f64,
}

/// Two-parameter linear model `rating ≈ bias + slope * x`, with `x` the
/// timestamp normalized to [0, 1] over the filtered dataset's span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub bias: f64,
}

/// Geographic origin for search and review queries.
///
/// Always passed explicitly; there is no ambient location state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: f64,
}

/// One place returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceHit {
    pub name: String,
    /// Place URL, usable as the target of a review query.
    pub url: String,
    /// Auxiliary description lines, possibly empty.
    #[serde(default)]
    pub extra: Vec<String>,
}
