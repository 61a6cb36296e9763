//! HTTP client for the review service, and the transport seam the query
//! controller is driven through.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures_util::TryStreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::error::QueryError;
use crate::types::{GeoLocation, PlaceHit};

/// Accuracy radius (meters) used when the server supplies an origin
/// without one.
pub const DEFAULT_ACCURACY: f64 = 10.0;

/// Byte-chunk stream of one review response body.
pub type ByteStream = BoxStream<'static, Result<Bytes, QueryError>>;

/// A place whose reviews are being streamed, plus the origin to stream from.
#[derive(Debug, Clone)]
pub struct ReviewTarget {
    /// Place URL as returned by search.
    pub url: String,
    pub location: GeoLocation,
}

/// Seam between the query controller and the transport.
///
/// Production opens an HTTP response body via [`ApiClient`]; tests drive
/// the controller with scripted chunk streams.
pub trait ReviewSource {
    fn open<'a>(
        &'a self,
        target: &'a ReviewTarget,
    ) -> Pin<Box<dyn Future<Output = Result<ByteStream, QueryError>> + Send + 'a>>;
}

/// JSON replies that may carry the `{error}` sentinel instead of a body.
#[derive(Deserialize)]
#[serde(untagged)]
enum ApiReply<T> {
    Ok(T),
    Err { error: String },
}

/// Typed client for the review service API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for the service at `base_url`.
    ///
    /// The timeout bounds connection establishment only; review streams
    /// stay open as long as the server keeps sending.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, QueryError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Search for places matching `query` around `location`.
    ///
    /// An empty result means the place was not found.
    pub async fn search(
        &self,
        query: &str,
        location: &GeoLocation,
    ) -> Result<Vec<PlaceHit>, QueryError> {
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();
        let accuracy = location.accuracy.to_string();
        let body = self
            .http
            .get(format!("{}/api/search", self.base_url))
            .query(&[
                ("query", query),
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("accuracy", accuracy.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        match serde_json::from_str::<ApiReply<Vec<PlaceHit>>>(&body)? {
            ApiReply::Ok(hits) => {
                debug!(query, hits = hits.len(), "search complete");
                Ok(hits)
            }
            ApiReply::Err { error } => Err(QueryError::server(error)),
        }
    }

    /// Origin the server derives for this client, if it can provide one.
    ///
    /// Callers that already hold an origin should prefer it; this is only
    /// a fallback for prefilling, never ambient state.
    pub async fn origin(&self) -> Result<Option<GeoLocation>, QueryError> {
        let body = self
            .http
            .get(format!("{}/api/location", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let reply: Option<(f64, f64)> = serde_json::from_str(&body)?;
        Ok(reply.map(|(latitude, longitude)| GeoLocation {
            latitude,
            longitude,
            accuracy: DEFAULT_ACCURACY,
        }))
    }
}

impl ReviewSource for ApiClient {
    fn open<'a>(
        &'a self,
        target: &'a ReviewTarget,
    ) -> Pin<Box<dyn Future<Output = Result<ByteStream, QueryError>> + Send + 'a>> {
        Box::pin(async move {
            let latitude = target.location.latitude.to_string();
            let longitude = target.location.longitude.to_string();
            let accuracy = target.location.accuracy.to_string();
            let response = self
                .http
                .get(format!("{}/api/reviews", self.base_url))
                .query(&[
                    ("url", target.url.as_str()),
                    ("latitude", latitude.as_str()),
                    ("longitude", longitude.as_str()),
                    ("accuracy", accuracy.as_str()),
                ])
                .send()
                .await?
                .error_for_status()?;
            debug!(url = %target.url, "review stream opened");
            let stream: ByteStream = Box::pin(response.bytes_stream().map_err(QueryError::from));
            Ok(stream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_search_reply_shapes() {
        let hits: ApiReply<Vec<PlaceHit>> =
            serde_json::from_str(r#"[{"name":"Cafe","url":"https://x/place","extra":["open"]}]"#)
                .unwrap();
        assert!(matches!(hits, ApiReply::Ok(ref v) if v.len() == 1));

        let err: ApiReply<Vec<PlaceHit>> =
            serde_json::from_str(r#"{"error":"driver pool exhausted"}"#).unwrap();
        assert!(matches!(err, ApiReply::Err { .. }));
    }

    #[test]
    fn test_origin_reply_shapes() {
        let some: Option<(f64, f64)> = serde_json::from_str("[37.63,-122.44]").unwrap();
        assert_eq!(some, Some((37.63, -122.44)));
        let none: Option<(f64, f64)> = serde_json::from_str("null").unwrap();
        assert_eq!(none, None);
    }
}
