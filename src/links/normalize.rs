// src/links/normalize.rs
// =============================================================================
// This module turns raw href values into canonical absolute URLs.
//
// Two URLs are "the same page" for the crawler if and only if their
// normalized strings are byte-equal, so everything that goes into the
// frontier passes through `normalize` first.
//
// What normalization does:
// - Resolves relative references against the page URL ("../docs" etc.)
// - Lower-cases scheme and host (the `url` crate does this while parsing)
// - Drops default ports (:80 for http, :443 for https)
// - Removes "." and ".." path segments
// - Strips the #fragment
// - Keeps the query string exactly as written (no sorting, no filtering)
//
// Rust concepts:
// - Result<T, E>: normalization can fail, callers decide what to do
// - Borrowing: we take &str and Option<&Url> and return an owned Url
// =============================================================================

use url::Url;

use crate::error::NormalizationError;

// Normalizes a raw link, resolving it against `base` when it is relative.
//
// Parameters:
//   raw: the href value as written in the page
//   base: the URL of the page (None for the seed URL)
//
// Returns: the canonical absolute URL, or why it could not be produced
//
// Examples:
//   raw = "/docs/../about#team", base = "https://Example.com:443/x"
//     -> "https://example.com/about"
//   raw = "mailto:someone@example.com" -> Err(UnsupportedScheme)
pub fn normalize(raw: &str, base: Option<&Url>) -> Result<Url, NormalizationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NormalizationError::Empty);
    }

    // Absolute references parse on their own; relative ones need the base.
    // Url::join also applies RFC 3986 dot-segment removal.
    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base
                .join(trimmed)
                .map_err(|e| NormalizationError::invalid(trimmed, e))?,
            None => return Err(NormalizationError::MissingBase(trimmed.to_string())),
        },
        Err(e) => return Err(NormalizationError::invalid(trimmed, e)),
    };

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(NormalizationError::UnsupportedScheme {
                link: trimmed.to_string(),
                scheme: other.to_string(),
            })
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(NormalizationError::MissingHost(trimmed.to_string()));
    }

    url.set_fragment(None);

    // The parser already drops ports that match the scheme default, this only
    // covers URLs built by hand.
    if url.port() == default_port(url.scheme()) {
        // set_port only fails for cannot-be-a-base URLs, which http(s) never are
        let _ = url.set_port(None);
    }

    // "https://example.com" and "https://example.com/" are the same page
    if url.path().is_empty() {
        url.set_path("/");
    }

    // A bare "?" carries no query; "page?" and "page" are the same page
    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}
