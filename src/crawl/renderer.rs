// src/crawl/renderer.rs
// =============================================================================
// The Renderer is whatever turns a URL into HTML.
//
// The crawl engine only needs the contract:
//   fetch(url, timeout) -> (html, status, last_modified, final_url) or FetchError
//
// `final_url` is where the page ended up after redirects. Relative links on
// the page resolve against it, not against the URL that was requested.
//
// This file also provides HttpRenderer, a plain reqwest implementation.
// A headless browser, a cache, or a test double can implement the same trait.
//
// Status handling:
// - 200-299: success
// - 300-399: success (the client follows redirects, so we only see a 3xx
//   when the redirect chain ends in one)
// - everything else: FetchError::Status
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::LAST_MODIFIED;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::error::{ConfigError, FetchError};

/// A page as produced by a Renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    pub status: u16,
    pub last_modified: Option<DateTime<Utc>>,
    /// URL after redirects, when it differs from the requested one
    pub final_url: Option<Url>,
}

impl RenderedPage {
    pub fn new(html: impl Into<String>, status: u16) -> Self {
        Self {
            html: html.into(),
            status,
            last_modified: None,
            final_url: None,
        }
    }

    pub fn redirected_to(mut self, url: Url) -> Self {
        self.final_url = Some(url);
        self
    }

    // The URL relative links on this page resolve against
    pub fn base_url<'a>(&'a self, requested: &'a Url) -> &'a Url {
        self.final_url.as_ref().unwrap_or(requested)
    }
}

/// Anything that can turn a URL into rendered HTML.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, FetchError>;
}

// Returns true for the statuses the crawler treats as a usable page
pub fn is_success_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Renderer backed by a plain HTTP client (no JavaScript execution).
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    // Builds a client that follows up to 5 redirects and sends our user agent
    pub fn new(user_agent: &str) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| categorize_error(e, timeout))?;

        let status = response.status();
        if !is_success_status(status.as_u16()) {
            return Err(status_error(status));
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date);

        let final_url = Some(response.url().clone()).filter(|landed| landed != url);

        let html = response
            .text()
            .await
            .map_err(|e| categorize_error(e, timeout))?;

        Ok(RenderedPage {
            html,
            status: status.as_u16(),
            last_modified,
            final_url,
        })
    }
}

fn status_error(status: StatusCode) -> FetchError {
    FetchError::Status {
        status: status.as_u16(),
    }
}

// Parses an HTTP date header ("Wed, 21 Oct 2015 07:28:00 GMT")
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

// Categorizes reqwest errors into the crawler's FetchError kinds
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
fn categorize_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout { after: timeout }
    } else if error.is_connect() {
        FetchError::connect(error.to_string())
    } else if error.is_redirect() {
        FetchError::other("too many redirects")
    } else if let Some(status) = error.status() {
        status_error(status)
    } else {
        FetchError::other(error.to_string())
    }
}
