// src/sitemap/reader.rs
// =============================================================================
// Reads a sitemap document back, for after-the-fact validation.
//
// Parsing is done with `quick-xml`, a streaming XML reader. The document
// must be well formed: mismatched or unclosed tags, bad entity references
// (a bare `&`), a second root element or stray text outside the root all
// stop the read and are reported in `ParsedSitemap::error`.
//
// Structure:
//   <urlset>                 root (depth 1)
//     <url>                  entry (depth 2)
//       <loc>, <lastmod>,    fields (depth 3)
//       <changefreq>, <priority>
//
// Elements are matched on their local name, so other namespaces (image,
// video, news extensions) are skipped. Field values are returned as raw,
// trimmed text with XML entities already decoded; nothing is interpreted
// here. Judging the content is the validator's job.
// =============================================================================

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One <url> element as found in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawUrl {
    pub loc: Option<String>,
    pub lastmod: Option<String>,
    pub changefreq: Option<String>,
    pub priority: Option<String>,
}

/// Everything the reader could recover from a sitemap file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSitemap {
    /// Local name of the document's root element
    pub root: Option<String>,
    /// The xmlns attribute of <urlset>
    pub namespace: Option<String>,
    pub urls: Vec<RawUrl>,
    /// Why the document is not well-formed XML, if it is not
    pub error: Option<String>,
}

impl ParsedSitemap {
    /// True if the root element is <urlset>
    pub fn has_urlset(&self) -> bool {
        self.root.as_deref() == Some("urlset")
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Loc,
    Lastmod,
    Changefreq,
    Priority,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"loc" => Some(Field::Loc),
            b"lastmod" => Some(Field::Lastmod),
            b"changefreq" => Some(Field::Changefreq),
            b"priority" => Some(Field::Priority),
            _ => None,
        }
    }

    fn slot(self, url: &mut RawUrl) -> &mut Option<String> {
        match self {
            Field::Loc => &mut url.loc,
            Field::Lastmod => &mut url.lastmod,
            Field::Changefreq => &mut url.changefreq,
            Field::Priority => &mut url.priority,
        }
    }
}

// Where the reader is in the element tree
#[derive(Default)]
struct ReadState {
    parsed: ParsedSitemap,
    depth: usize,
    current: Option<RawUrl>,
    field: Option<Field>,
    text: String,
}

impl ReadState {
    fn open(&mut self, element: &BytesStart<'_>) -> Result<(), String> {
        let local = element.local_name();
        let name = local.as_ref();

        match self.depth {
            0 => {
                if self.parsed.root.is_some() {
                    return Err("more than one root element".to_string());
                }
                self.parsed.root = Some(String::from_utf8_lossy(name).into_owned());
                if name == b"urlset" {
                    self.parsed.namespace = xmlns_of(element)?;
                }
            }
            1 if self.parsed.has_urlset() && name == b"url" => {
                self.current = Some(RawUrl::default());
            }
            2 if self.current.is_some() => {
                self.field = Field::from_name(name);
                self.text.clear();
            }
            _ => {}
        }

        self.depth += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);

        match self.depth {
            2 => {
                if let (Some(field), Some(url)) = (self.field.take(), self.current.as_mut()) {
                    *field.slot(url) = Some(self.text.trim().to_string());
                }
            }
            1 => {
                if let Some(url) = self.current.take() {
                    self.parsed.urls.push(url);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) -> Result<(), String> {
        if self.depth == 0 && !text.trim().is_empty() {
            return Err("text outside the root element".to_string());
        }
        if self.field.is_some() {
            self.text.push_str(text);
        }
        Ok(())
    }
}

fn xmlns_of(element: &BytesStart<'_>) -> Result<Option<String>, String> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        if attribute.key.as_ref() == b"xmlns" {
            let value = attribute.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

// Parses sitemap XML text
//
// Never fails: a malformed document yields whatever was read before the
// error, with `error` set.
pub fn parse_sitemap(xml: &str) -> ParsedSitemap {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut state = ReadState::default();

    loop {
        let step = match reader.read_event() {
            Ok(Event::Eof) => {
                if state.depth > 0 {
                    state.parsed.error =
                        Some("unexpected end of document, elements left open".to_string());
                }
                break;
            }
            Ok(Event::Start(element)) => state.open(&element),
            Ok(Event::Empty(element)) => state.open(&element).map(|()| state.close()),
            Ok(Event::End(_)) => {
                state.close();
                Ok(())
            }
            Ok(Event::Text(text)) => match text.unescape() {
                Ok(text) => state.text(&text),
                Err(e) => Err(e.to_string()),
            },
            Ok(Event::CData(data)) => state.text(&String::from_utf8_lossy(&data.into_inner())),
            Ok(_) => Ok(()),
            Err(e) => Err(e.to_string()),
        };

        if let Err(message) = step {
            state.parsed.error = Some(format!("{message} (at byte {})", reader.buffer_position()));
            break;
        }
    }

    state.parsed
}
