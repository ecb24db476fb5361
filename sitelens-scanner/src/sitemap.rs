//! Parser for the sitemaps.org XML protocol.
//!
//! Both document shapes are handled by one pass: a `sitemapindex` lists
//! `<sitemap><loc>` entries and a `urlset` lists `<url><loc>` entries.
//! Elements are matched by local name so any namespace prefix is accepted.

use crate::error::{Result, ScanError};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SitemapKind {
    /// `<sitemapindex>`: entries are further sitemaps
    Index,
    /// `<urlset>`: entries are page URLs
    UrlSet,
    /// Well-formed XML with some other root element
    Unknown,
}

impl SitemapKind {
    fn from_root(local_name: &[u8]) -> Self {
        match local_name {
            b"sitemapindex" => SitemapKind::Index,
            b"urlset" => SitemapKind::UrlSet,
            _ => SitemapKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapDocument {
    pub kind: SitemapKind,
    /// `<loc>` values in document order
    pub locs: Vec<String>,
}

fn is_entry(local_name: Option<&Vec<u8>>) -> bool {
    matches!(local_name.map(Vec::as_slice), Some(b"url") | Some(b"sitemap"))
}

fn set_root(kind: &mut Option<SitemapKind>, local_name: &[u8]) -> Result<()> {
    if kind.is_some() {
        return Err(ScanError::ParseError("multiple root elements".to_string()));
    }
    *kind = Some(SitemapKind::from_root(local_name));
    Ok(())
}

fn push_loc(locs: &mut Vec<String>, raw: &str) {
    let loc = raw.trim();
    if loc.is_empty() {
        return;
    }
    match Url::parse(loc) {
        Ok(_) => locs.push(loc.to_string()),
        Err(e) => debug!("Dropping malformed <loc> {:?}: {}", loc, e),
    }
}

/// Parse a sitemap or sitemap index.
///
/// Malformed XML is an error; an unrecognised root element is not, it just
/// yields no locations.
pub fn parse_sitemap(xml: &[u8]) -> Result<SitemapDocument> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut kind: Option<SitemapKind> = None;
    let mut locs = Vec::new();
    let mut current_loc: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if open.is_empty() {
                    set_root(&mut kind, &name)?;
                } else if name == b"loc" && is_entry(open.last()) {
                    current_loc = Some(String::new());
                }
                open.push(name);
            }
            Event::Empty(e) => {
                // `<urlset/>` is a valid, empty document; `<loc/>` is skipped
                if open.is_empty() {
                    set_root(&mut kind, e.local_name().as_ref())?;
                }
            }
            Event::Text(e) => {
                if open.is_empty() {
                    return Err(ScanError::ParseError(
                        "text outside of the root element".to_string(),
                    ));
                }
                if let Some(loc) = current_loc.as_mut() {
                    loc.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(loc) = current_loc.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(e) => {
                open.pop();
                if e.local_name().as_ref() == b"loc"
                    && let Some(loc) = current_loc.take()
                {
                    push_loc(&mut locs, &loc);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(name) = open.last() {
        return Err(ScanError::ParseError(format!(
            "unclosed element <{}>",
            String::from_utf8_lossy(name)
        )));
    }

    let kind = kind.ok_or_else(|| ScanError::ParseError("no root element".to_string()))?;
    if kind == SitemapKind::Unknown {
        debug!("Unknown sitemap format, ignoring {} locations", locs.len());
        locs.clear();
    }

    Ok(SitemapDocument { kind, locs })
}
