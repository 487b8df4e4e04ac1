// src/sitemap/validate.rs
// =============================================================================
// Checks a sitemap against the protocol rules before (or after) it is written.
//
// `validate` works on an in-memory SitemapDocument:
// - at least one entry
// - entry count within the cap
// - every <loc> is an absolute http/https URL of at most 2,048 characters
// - no <loc> appears twice
// - <priority> within [0.0, 1.0]
// (<changefreq> is an enum in the document model, so it is always valid)
//
// `validate_xml` works on sitemap text read back from disk. The text must be
// well-formed XML with <urlset> as its root. On top of the checks above it
// reports values that do not parse.
//
// Validation never fails: it returns a report, and the caller decides
// whether a document with violations is still worth writing.
// =============================================================================

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::entry::{
    ChangeFreq, SitemapDocument, SitemapEntry, SitemapLimits, MAX_LOC_LENGTH, SITEMAP_NAMESPACE,
};
use super::reader::parse_sitemap;

/// One rule the sitemap breaks.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("{count} entries, over the limit of {max}")]
    TooManyEntries { count: usize, max: usize },

    #[error("<loc> is {length} characters, over the limit of 2048: {loc}")]
    LocTooLong { loc: String, length: usize },

    #[error("<loc> is not an absolute http(s) URL: {loc}")]
    LocNotAbsolute { loc: String },

    #[error("<loc> appears more than once: {loc}")]
    DuplicateLoc { loc: String },

    #[error("priority {priority} out of range [0.0, 1.0] for {loc}")]
    PriorityOutOfRange { loc: String, priority: f32 },

    #[error("document is {size} bytes, over the limit of {max}")]
    TooLarge { size: usize, max: usize },

    #[error("not well-formed XML: {message}")]
    Malformed { message: String },

    #[error("root element is not <urlset>")]
    MissingUrlset,

    #[error("<urlset> namespace is {found:?}, expected http://www.sitemaps.org/schemas/sitemap/0.9")]
    WrongNamespace { found: Option<String> },

    #[error("sitemap contains no <url> entries")]
    NoEntries,

    #[error("<url> #{index} has no <loc>")]
    MissingLoc { index: usize },

    #[error("unknown changefreq '{value}' for {loc}")]
    UnknownChangefreq { loc: String, value: String },

    #[error("priority '{value}' is not a number for {loc}")]
    InvalidPriority { loc: String, value: String },

    #[error("lastmod '{value}' is not a W3C date for {loc}")]
    InvalidLastmod { loc: String, value: String },
}

/// Result of a validation pass. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }
}

// Validates an in-memory document
pub fn validate(doc: &SitemapDocument, limits: &SitemapLimits) -> ValidationReport {
    let mut report = ValidationReport::default();

    if doc.is_empty() {
        report.push(Violation::NoEntries);
    }

    if doc.len() > limits.max_entries {
        report.push(Violation::TooManyEntries {
            count: doc.len(),
            max: limits.max_entries,
        });
    }

    let mut seen = HashSet::new();
    for entry in doc.entries() {
        check_entry(entry, &mut seen, &mut report);
    }

    report
}

fn check_entry<'a>(
    entry: &'a SitemapEntry,
    seen: &mut HashSet<&'a str>,
    report: &mut ValidationReport,
) {
    let loc = entry.loc.as_str();

    let length = loc.chars().count();
    if length > MAX_LOC_LENGTH {
        report.push(Violation::LocTooLong {
            loc: loc.to_string(),
            length,
        });
    }

    let absolute = Url::parse(loc)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false);
    if !absolute {
        report.push(Violation::LocNotAbsolute {
            loc: loc.to_string(),
        });
    }

    if !seen.insert(loc) {
        report.push(Violation::DuplicateLoc {
            loc: loc.to_string(),
        });
    }

    if let Some(priority) = entry.priority {
        if !(0.0..=1.0).contains(&priority) {
            report.push(Violation::PriorityOutOfRange {
                loc: loc.to_string(),
                priority,
            });
        }
    }
}

// Validates sitemap text, e.g. a file that was written earlier
//
// Returns: the report, plus the entries that could be recovered
pub fn validate_xml(xml: &str, limits: &SitemapLimits) -> (ValidationReport, SitemapDocument) {
    let parsed = parse_sitemap(xml);
    let mut report = ValidationReport::default();

    if xml.len() > limits.max_bytes {
        report.push(Violation::TooLarge {
            size: xml.len(),
            max: limits.max_bytes,
        });
    }

    if let Some(message) = parsed.error.clone() {
        report.push(Violation::Malformed { message });
        return (report, SitemapDocument::default());
    }

    if !parsed.has_urlset() {
        report.push(Violation::MissingUrlset);
        return (report, SitemapDocument::default());
    }

    if parsed.namespace.as_deref() != Some(SITEMAP_NAMESPACE) {
        report.push(Violation::WrongNamespace {
            found: parsed.namespace.clone(),
        });
    }

    let mut entries = Vec::with_capacity(parsed.urls.len());
    for (index, raw) in parsed.urls.into_iter().enumerate() {
        let Some(loc) = raw.loc.filter(|loc| !loc.is_empty()) else {
            report.push(Violation::MissingLoc { index: index + 1 });
            continue;
        };

        let mut entry = SitemapEntry::new(loc.as_str());

        if let Some(value) = raw.lastmod {
            match parse_w3c_date(&value) {
                Some(date) => entry.lastmod = Some(date),
                None => report.push(Violation::InvalidLastmod {
                    loc: loc.clone(),
                    value,
                }),
            }
        }

        if let Some(value) = raw.changefreq {
            match value.parse::<ChangeFreq>() {
                Ok(freq) => entry.changefreq = Some(freq),
                Err(value) => report.push(Violation::UnknownChangefreq {
                    loc: loc.clone(),
                    value,
                }),
            }
        }

        if let Some(value) = raw.priority {
            match value.parse::<f32>() {
                Ok(priority) if priority.is_finite() => entry.priority = Some(priority),
                _ => report.push(Violation::InvalidPriority {
                    loc: loc.clone(),
                    value,
                }),
            }
        }

        entries.push(entry);
    }

    let doc = SitemapDocument::new(entries);
    report.violations.extend(validate(&doc, limits).violations);
    (report, doc)
}

// Parses a W3C Datetime and keeps the date part
//
// Accepted forms:
//   YYYY
//   YYYY-MM
//   YYYY-MM-DD
//   YYYY-MM-DDThh:mmTZD
//   YYYY-MM-DDThh:mm:ss[.s]TZD   (TZD is "Z" or +hh:mm / -hh:mm)
fn parse_w3c_date(value: &str) -> Option<NaiveDate> {
    match value.len() {
        4 if value.bytes().all(|b| b.is_ascii_digit()) => {
            return NaiveDate::from_ymd_opt(value.parse().ok()?, 1, 1);
        }
        7 => return NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok(),
        10 => return NaiveDate::parse_from_str(value, "%Y-%m-%d").ok(),
        _ => {}
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.date_naive());
    }

    // No seconds: chrono wants a numeric offset here
    let numeric = match value.strip_suffix('Z') {
        Some(rest) => format!("{rest}+00:00"),
        None => value.to_string(),
    };
    DateTime::parse_from_str(&numeric, "%Y-%m-%dT%H:%M%:z")
        .ok()
        .map(|date| date.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sitemap::writer::serialize;
    use crate::sitemap::{EntryDefaults, SitemapBuilder};
    use crate::crawl::{FetchedPage, PageResult};
    use chrono::{TimeZone, Utc};

    fn entry(loc: &str) -> SitemapEntry {
        SitemapEntry::new(loc)
    }

    fn limits(max_entries: usize) -> SitemapLimits {
        SitemapLimits {
            max_entries,
            ..SitemapLimits::default()
        }
    }

    #[test]
    fn test_valid_document() {
        let doc = SitemapDocument::new(vec![
            entry("https://example.com/"),
            entry("http://example.com/about?x=1"),
        ]);
        assert!(validate(&doc, &SitemapLimits::default()).is_valid());
    }

    #[test]
    fn test_empty_document_is_invalid() {
        let report = validate(&SitemapDocument::default(), &SitemapLimits::default());
        assert_eq!(report.violations, vec![Violation::NoEntries]);
    }

    #[test]
    fn test_too_many_entries() {
        let doc = SitemapDocument::new(vec![
            entry("https://example.com/a"),
            entry("https://example.com/b"),
            entry("https://example.com/c"),
        ]);
        let report = validate(&doc, &limits(2));
        assert_eq!(
            report.violations,
            vec![Violation::TooManyEntries { count: 3, max: 2 }]
        );
    }

    #[test]
    fn test_loc_rules() {
        let long = format!("https://example.com/{}", "a".repeat(2100));
        let doc = SitemapDocument::new(vec![
            entry("/relative"),
            entry("ftp://example.com/file"),
            entry(&long),
            entry("https://example.com/dup"),
            entry("https://example.com/dup"),
        ]);
        let report = validate(&doc, &SitemapLimits::default());

        assert!(report.iter().any(|v| matches!(v, Violation::LocNotAbsolute { loc } if loc == "/relative")));
        assert!(report.iter().any(|v| matches!(v, Violation::LocNotAbsolute { loc } if loc.starts_with("ftp"))));
        assert!(report.iter().any(|v| matches!(v, Violation::LocTooLong { length, .. } if *length == long.len())));
        assert!(report.iter().any(|v| matches!(v, Violation::DuplicateLoc { .. })));
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn test_loc_exactly_at_limit_is_valid() {
        let prefix = "https://example.com/";
        let loc = format!("{prefix}{}", "a".repeat(MAX_LOC_LENGTH - prefix.len()));
        assert_eq!(loc.len(), MAX_LOC_LENGTH);
        let doc = SitemapDocument::new(vec![entry(&loc)]);
        assert!(validate(&doc, &SitemapLimits::default()).is_valid());
    }

    #[test]
    fn test_priority_range() {
        let mut high = entry("https://example.com/");
        high.priority = Some(1.2);
        let mut edge = entry("https://example.com/edge");
        edge.priority = Some(1.0);
        let report = validate(&SitemapDocument::new(vec![high, edge]), &SitemapLimits::default());
        assert_eq!(report.len(), 1);
        assert!(matches!(
            report.violations[0],
            Violation::PriorityOutOfRange { .. }
        ));
    }

    #[test]
    fn test_builder_cap_yields_valid_document() {
        let mut builder = SitemapBuilder::new(2, EntryDefaults::default());
        for path in ["/a", "/b", "/c"] {
            builder.add(&PageResult::Success(FetchedPage {
                url: Url::parse(&format!("https://example.com{path}")).unwrap(),
                depth: 1,
                links: Vec::new(),
                last_modified: None,
            }));
        }
        let doc = builder.finalize(Utc::now());
        assert_eq!(doc.len(), 2);
        assert!(validate(&doc, &limits(2)).is_valid());
    }

    #[test]
    fn test_serialized_document_round_trips() {
        let defaults = EntryDefaults {
            changefreq: Some(ChangeFreq::Weekly),
            priority: Some(0.8),
        };
        let mut builder = SitemapBuilder::new(100, defaults);
        for path in ["/", "/search?q=a&b=c", "/it's", "/%3Cscript%3E", "/caf%C3%A9"] {
            builder.add(&PageResult::Success(FetchedPage {
                url: Url::parse(&format!("https://example.com{path}")).unwrap(),
                depth: 0,
                links: Vec::new(),
                last_modified: None,
            }));
        }
        let doc = builder.finalize(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap());
        let limits = SitemapLimits::default();
        assert!(validate(&doc, &limits).is_valid());

        let bytes = serialize(&doc, &limits).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        let (report, reparsed) = validate_xml(&xml, &limits);

        assert!(report.is_valid(), "violations: {:?}", report.violations);
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_two_decimal_priority_round_trips() {
        let defaults = EntryDefaults {
            changefreq: None,
            priority: Some(0.25),
        };
        let mut builder = SitemapBuilder::new(10, defaults);
        builder.add(&PageResult::Success(FetchedPage {
            url: Url::parse("https://example.com/").unwrap(),
            depth: 0,
            links: Vec::new(),
            last_modified: None,
        }));
        let doc = builder.finalize(Utc::now());
        let limits = SitemapLimits::default();

        let xml = String::from_utf8(serialize(&doc, &limits).unwrap()).unwrap();
        let (report, reparsed) = validate_xml(&xml, &limits);

        assert!(report.is_valid());
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_validate_xml_structure() {
        let limits = SitemapLimits::default();

        let (report, _) = validate_xml("<html><body>nope</body></html>", &limits);
        assert_eq!(report.violations, vec![Violation::MissingUrlset]);

        let (report, _) = validate_xml(
            r#"<urlset xmlns="http://example.com/wrong"></urlset>"#,
            &limits,
        );
        assert!(report.iter().any(|v| matches!(v, Violation::WrongNamespace { .. })));
        assert!(report.iter().any(|v| matches!(v, Violation::NoEntries)));
    }

    #[test]
    fn test_validate_xml_rejects_malformed_text() {
        let limits = SitemapLimits::default();
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/?a=1&b=2</loc></url>
  <url><loc>https://example.com/x</url>"#;

        let (report, doc) = validate_xml(xml, &limits);
        assert!(!report.is_valid());
        assert!(matches!(report.violations[..], [Violation::Malformed { .. }]));
        assert!(doc.is_empty());

        let nested = r#"<foo><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://example.com/</loc></url></urlset></foo>"#;
        let (report, _) = validate_xml(nested, &limits);
        assert_eq!(report.violations, vec![Violation::MissingUrlset]);
    }

    #[test]
    fn test_validate_xml_field_values() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><changefreq>daily</changefreq></url>
  <url>
    <loc>https://example.com/</loc>
    <lastmod>last tuesday</lastmod>
    <changefreq>sometimes</changefreq>
    <priority>high</priority>
  </url>
  <url>
    <loc>https://example.com/ok</loc>
    <lastmod>2024-01-02T10:00:00+02:00</lastmod>
    <priority>1.5</priority>
  </url>
</urlset>"#;
        let (report, doc) = validate_xml(xml, &SitemapLimits::default());

        assert!(report.iter().any(|v| matches!(v, Violation::MissingLoc { index: 1 })));
        assert!(report.iter().any(|v| matches!(v, Violation::InvalidLastmod { .. })));
        assert!(report.iter().any(|v| matches!(v, Violation::UnknownChangefreq { value, .. } if value == "sometimes")));
        assert!(report.iter().any(|v| matches!(v, Violation::InvalidPriority { .. })));
        assert!(report.iter().any(|v| matches!(v, Violation::PriorityOutOfRange { .. })));
        assert_eq!(report.len(), 5);

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.entries()[1].lastmod, NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn test_validate_xml_byte_limit() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://example.com/</loc></url></urlset>"#;
        let limits = SitemapLimits {
            max_entries: 10,
            max_bytes: 20,
        };
        let (report, doc) = validate_xml(xml, &limits);
        assert_eq!(
            report.violations,
            vec![Violation::TooLarge {
                size: xml.len(),
                max: 20
            }]
        );
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_w3c_datetime_forms() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 6);
        assert_eq!(parse_w3c_date("2024"), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(parse_w3c_date("2024-05"), NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(parse_w3c_date("2024-05-06"), day);
        assert_eq!(parse_w3c_date("2024-05-06T10:30Z"), day);
        assert_eq!(parse_w3c_date("2024-05-06T10:30+02:00"), day);
        assert_eq!(parse_w3c_date("2024-05-06T10:30:15Z"), day);
        assert_eq!(parse_w3c_date("2024-05-06T10:30:15.5-05:00"), day);

        assert_eq!(parse_w3c_date("24"), None);
        assert_eq!(parse_w3c_date("2024-13"), None);
        assert_eq!(parse_w3c_date("2024-05-06T10Z"), None);
        assert_eq!(parse_w3c_date("May 6, 2024"), None);
    }

    #[test]
    fn test_violation_messages() {
        assert_eq!(
            Violation::TooManyEntries { count: 3, max: 2 }.to_string(),
            "3 entries, over the limit of 2"
        );
        assert_eq!(
            Violation::MissingLoc { index: 4 }.to_string(),
            "<url> #4 has no <loc>"
        );
    }
}
