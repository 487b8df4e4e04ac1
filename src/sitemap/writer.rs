// src/sitemap/writer.rs
// =============================================================================
// Serializes a SitemapDocument into sitemaps.org 0.9 XML.
//
// Output shape:
//
//   <?xml version="1.0" encoding="UTF-8"?>
//   <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" ...>
//     <url>
//       <loc>https://example.com/</loc>
//       <lastmod>2024-03-09</lastmod>
//       <changefreq>monthly</changefreq>
//       <priority>0.5</priority>
//     </url>
//   </urlset>
// =============================================================================

use super::entry::{SitemapDocument, SitemapEntry, SitemapLimits, SITEMAP_NAMESPACE};
use crate::error::SerializationError;

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

// Renders the document, failing if it exceeds the byte cap
//
// Returns: UTF-8 bytes ready to be written to disk
pub fn serialize(doc: &SitemapDocument, limits: &SitemapLimits) -> Result<Vec<u8>, SerializationError> {
    let mut out = String::with_capacity(128 + doc.len() * 160);

    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<urlset xmlns=\"");
    out.push_str(SITEMAP_NAMESPACE);
    out.push_str("\" xmlns:xsi=\"");
    out.push_str(XSI_NAMESPACE);
    out.push_str("\" xsi:schemaLocation=\"");
    out.push_str(SITEMAP_NAMESPACE);
    out.push(' ');
    out.push_str(SITEMAP_NAMESPACE);
    out.push_str("/sitemap.xsd\">\n");

    for entry in doc.entries() {
        write_entry(&mut out, entry);
    }

    out.push_str("</urlset>\n");

    if out.len() > limits.max_bytes {
        return Err(SerializationError::TooLarge {
            size: out.len(),
            max: limits.max_bytes,
        });
    }

    Ok(out.into_bytes())
}

fn write_entry(out: &mut String, entry: &SitemapEntry) {
    out.push_str("  <url>\n");
    write_element(out, "loc", &escape_xml(&entry.loc));
    if let Some(lastmod) = entry.lastmod {
        write_element(out, "lastmod", &lastmod.format("%Y-%m-%d").to_string());
    }
    if let Some(changefreq) = entry.changefreq {
        write_element(out, "changefreq", changefreq.as_str());
    }
    if let Some(priority) = entry.priority {
        write_element(out, "priority", &format!("{priority:.1}"));
    }
    out.push_str("  </url>\n");
}

fn write_element(out: &mut String, name: &str, text: &str) {
    out.push_str("    <");
    out.push_str(name);
    out.push('>');
    out.push_str(text);
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

// Escapes the five XML special characters
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
