//! Layered runtime configuration.
//!
//! Defaults, then an optional `reviewtrend.toml` next to the working
//! directory, then `REVIEWTREND_*` environment variables (double
//! underscore as the section separator, e.g.
//! `REVIEWTREND_SERVER__BASE_URL`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::aggregate::RecencyWindow;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub trend: TrendSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Base URL of the review service.
    pub base_url: String,
    /// Connection timeout in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendSettings {
    /// Number of time buckets for the rating averages.
    pub buckets: usize,
    /// Default recency window.
    pub window: RecencyWindow,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("server.timeout_secs", 30i64)?
            .set_default("trend.buckets", 10i64)?
            .set_default("trend.window", "all")?
            .add_source(File::with_name("reviewtrend").required(false))
            .add_source(Environment::with_prefix("REVIEWTREND").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load().unwrap();
        assert_eq!(settings.server.base_url, "http://localhost:8080");
        assert_eq!(settings.server.timeout_secs, 30);
        assert_eq!(settings.trend.buckets, 10);
        assert_eq!(settings.trend.window, RecencyWindow::AllTime);
    }

    #[test]
    fn test_window_names_deserialize() {
        for (name, expected) in [
            ("all", RecencyWindow::AllTime),
            ("5y", RecencyWindow::FiveYears),
            ("1y", RecencyWindow::OneYear),
            ("6m", RecencyWindow::SixMonths),
        ] {
            let window: RecencyWindow = serde_json::from_str(&format!("\"{}\"", name)).unwrap();
            assert_eq!(window, expected);
        }
    }
}
