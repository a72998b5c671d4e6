//! Client configuration.
//!
//! Everything that would otherwise be a process-wide constant (server base
//! URL, sample cap, target timezone) is carried here and passed to
//! [`crate::PiClient::new`].

use chrono_tz::Tz;
use serde::Deserialize;

use crate::transport::HttpOptions;

/// Default cap on samples per interpolated request.
///
/// The server's documented hard limit is 150000, but requests near it have
/// been observed to fail transiently.
pub const DEFAULT_MAX_SAMPLES: u64 = 50_000;

/// Default target timezone (the plant's local time).
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Stockholm;

/// Default start of a request (`-1d`).
pub const DEFAULT_START: &str = "-1d";
/// Default end of a request (`*`, i.e. now).
pub const DEFAULT_END: &str = "*";
/// Default sampling interval.
pub const DEFAULT_INTERVAL: &str = "1h";

/// Configuration for a [`crate::PiClient`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// PI Web API root, e.g. `https://pi.example.com/piwebapi`.
    pub base_url: String,
    /// Maximum samples per leaf request before a range is split.
    pub max_samples: u64,
    /// Timezone all returned timestamps are converted into.
    pub timezone: Tz,
    /// Options for the bundled HTTP transport.
    pub http: HttpOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            max_samples: DEFAULT_MAX_SAMPLES,
            timezone: DEFAULT_TIMEZONE,
            http: HttpOptions::default(),
        }
    }
}

impl ClientConfig {
    /// Config for `base_url` with every other field at its default.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Override the sample cap.
    pub fn with_max_samples(mut self, max_samples: u64) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Override the target timezone.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ClientConfig::new("https://pi/piwebapi");
        assert_eq!(cfg.max_samples, 50_000);
        assert_eq!(cfg.timezone.name(), "Europe/Stockholm");
        assert_eq!(cfg.http.timeout_secs, 60);
    }

    #[test]
    fn deserializes_partial_config() {
        let cfg: ClientConfig = serde_json::from_str(
            r#"{"base_url": "https://pi/piwebapi", "timezone": "UTC", "http": {"accept_invalid_certs": true}}"#,
        )
        .unwrap();
        assert_eq!(cfg.base_url, "https://pi/piwebapi");
        assert_eq!(cfg.timezone, chrono_tz::UTC);
        assert_eq!(cfg.max_samples, DEFAULT_MAX_SAMPLES);
        assert!(cfg.http.accept_invalid_certs);
    }
}
