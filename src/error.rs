// src/error.rs
// =============================================================================
// Typed errors for the crawl engine and the sitemap pipeline.
//
// Each stage has its own error enum so callers can react to the stage that
// failed:
// - NormalizationError: a link could not be turned into a crawlable URL
//   (the worker drops the link and keeps going)
// - FetchError: the renderer could not produce the page
//   (the page is recorded as failed and left out of the sitemap)
// - SerializationError: the sitemap could not be emitted
// - ConfigError: the run cannot start at all
//
// The binary (main.rs) wraps these in anyhow::Error with extra context.
//
// Rust concepts:
// - thiserror: derive macro that implements std::error::Error and Display
// - #[from]: automatic conversion so `?` works across error types
// =============================================================================

use std::time::Duration;

use thiserror::Error;

/// A raw link could not be normalized into an absolute http(s) URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    /// The link text was empty or only whitespace
    #[error("empty link")]
    Empty,

    /// A relative reference was found but there is no base URL to resolve it against
    #[error("relative link '{0}' has no base URL")]
    MissingBase(String),

    /// The reference is not a valid URI reference
    #[error("invalid link '{link}': {reason}")]
    Invalid { link: String, reason: String },

    /// The resolved URL uses a scheme we never crawl (mailto:, javascript:, ...)
    #[error("unsupported scheme '{scheme}' in '{link}'")]
    UnsupportedScheme { link: String, scheme: String },

    /// The resolved URL has no host (e.g. "http:///path")
    #[error("link '{0}' has no host")]
    MissingHost(String),
}

impl NormalizationError {
    pub fn invalid(link: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Invalid {
            link: link.into(),
            reason: reason.to_string(),
        }
    }
}

/// The renderer could not produce a page.
///
/// Serialized into the JSON run report, hence the serde derive.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    /// The request did not finish within the per-request timeout
    #[error("timed out after {}ms", .after.as_millis())]
    Timeout {
        #[serde(with = "duration_ms")]
        after: Duration,
    },

    /// DNS, TCP or TLS failure before a response arrived
    #[error("connection failed: {message}")]
    Connect { message: String },

    /// The server answered with a status outside 2xx/3xx
    #[error("HTTP {status}")]
    Status { status: u16 },

    /// Anything else (body decoding, redirect loops, ...)
    #[error("{message}")]
    Other { message: String },
}

impl FetchError {
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Transient errors are the only ones the retry policy retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connect { .. })
    }
}

/// The sitemap could not be emitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    #[error("sitemap is {size} bytes, over the {max} byte limit")]
    TooLarge { size: usize, max: usize },
}

/// Configuration problems that stop a run before it starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("{field} must be at least {min}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        value: u64,
    },

    #[error("priority must be between 0.0 and 1.0, got {0}")]
    Priority(f32),

    #[error("invalid exclusion pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown {field} '{value}'")]
    UnknownValue { field: &'static str, value: String },

    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl ConfigError {
    pub fn invalid_seed(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidSeed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(FetchError::Timeout {
            after: Duration::from_secs(1)
        }
        .is_transient());
        assert!(FetchError::connect("refused").is_transient());
        assert!(!FetchError::Status { status: 404 }.is_transient());
        assert!(!FetchError::other("bad body").is_transient());
    }

    #[test]
    fn test_fetch_error_json() {
        let json = serde_json::to_value(FetchError::Timeout {
            after: Duration::from_millis(1500),
        })
        .unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["after"], 1500);

        let json = serde_json::to_value(FetchError::Status { status: 503 }).unwrap();
        assert_eq!(json["kind"], "status");
        assert_eq!(json["status"], 503);
    }

    #[test]
    fn test_display_includes_context() {
        let err = NormalizationError::UnsupportedScheme {
            link: "mailto:a@b.c".to_string(),
            scheme: "mailto".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported scheme 'mailto' in 'mailto:a@b.c'");
        assert_eq!(FetchError::Status { status: 404 }.to_string(), "HTTP 404");
    }
}
