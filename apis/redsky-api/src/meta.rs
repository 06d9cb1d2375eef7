// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Hypermedia metadata carried in response headers.
//!
//! The Red Sky protocol never puts links in response bodies. Instead a
//! response describes where related resources live through three headers:
//!
//! - `Location`: the resource that was just created or dispensed
//! - `Last-Modified`: an HTTP date
//! - `Link`: one or more `<uri>; rel="relation"` entries (RFC 8288)
//!
//! [`extract`] reads those headers into any [`Meta`] implementation. Each
//! resource type embeds a small metadata value and decides for itself which
//! of these it cares about; everything else is dropped silently. Extraction
//! never fails: a malformed date or link entry is skipped and the rest of
//! the headers are still processed.
//!
//! Extraction must run before the response body is consumed, since reading
//! the body hands ownership of the response away.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use http::HeaderMap;
use http::header::{LAST_MODIFIED, LINK, LOCATION};

/// Receives metadata extracted from response headers.
///
/// All methods default to ignoring their input, so an implementation only
/// overrides what its resource understands.
pub trait Meta {
    fn set_location(&mut self, _location: &str) {}

    fn set_last_modified(&mut self, _last_modified: DateTime<Utc>) {}

    /// Called once per relation type found in a `Link` header.
    fn set_link(&mut self, _rel: &str, _link: &str) {}
}

/// Populate `meta` from the `Location`, `Last-Modified` and `Link` headers.
pub fn extract<M: Meta + ?Sized>(headers: &HeaderMap, meta: &mut M) {
    if let Some(location) = headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        meta.set_location(location);
    }

    if let Some(last_modified) = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date)
    {
        meta.set_last_modified(last_modified);
    }

    for value in headers.get_all(LINK) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for link in parse_link_header(value) {
            for rel in link.relations() {
                meta.set_link(rel, &link.uri);
            }
        }
    }
}

/// Find the slot a resource assigns to `rel` in its relation table.
///
/// Relation types compare case-insensitively (RFC 8288 §2.1.1).
pub(crate) fn lookup_relation<T: Copy>(table: &[(&str, T)], rel: &str) -> Option<T> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(rel))
        .map(|(_, slot)| *slot)
}

// ============================================================================
// Link Header
// ============================================================================

/// A single `Link` header entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Target URI, as written between the angle brackets.
    pub uri: String,
    /// Value of the `rel` parameter with quotes removed. May hold several
    /// space separated relation types.
    pub rel: String,
}

impl Link {
    pub fn new(uri: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            rel: rel.into(),
        }
    }

    /// The individual relation types named by this entry.
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.rel.split_ascii_whitespace()
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>; rel=\"{}\"", self.uri, self.rel)
    }
}

/// Parse a `Link` header value into its entries.
///
/// Entries without a `<uri>` segment or without a `rel` parameter are skipped
/// without affecting their neighbours.
pub fn parse_link_header(value: &str) -> Vec<Link> {
    split_outside(value, ',')
        .into_iter()
        .filter_map(parse_link_entry)
        .collect()
}

fn parse_link_entry(entry: &str) -> Option<Link> {
    let mut uri = None;
    let mut rel = None;

    for segment in split_outside(entry, ';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            uri.get_or_insert_with(|| inner.trim().to_string());
            continue;
        }

        // Only the first rel parameter counts
        if let Some((name, value)) = segment.split_once('=') {
            if name.trim().eq_ignore_ascii_case("rel") && rel.is_none() {
                rel = Some(value.trim().trim_matches('"').trim().to_string());
            }
        }
    }

    match (uri, rel) {
        (Some(uri), Some(rel)) if !uri.is_empty() && !rel.is_empty() => Some(Link { uri, rel }),
        _ => None,
    }
}

/// Split on `delim`, ignoring delimiters inside `<...>` or `"..."`.
///
/// An unclosed `<` or quote would swallow everything after it, so an
/// unbalanced value is split on every `delim` instead. The broken entry then
/// fails on its own and its neighbours survive.
fn split_outside(s: &str, delim: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_uri = false;
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            // `<` is not allowed inside a URI reference
            '<' if in_uri => return s.split(delim).collect(),
            '<' if !in_quotes => in_uri = true,
            '>' if !in_quotes => in_uri = false,
            '"' if !in_uri => in_quotes = !in_quotes,
            c if c == delim && !in_uri && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if in_uri || in_quotes {
        return s.split(delim).collect();
    }
    parts.push(&s[start..]);
    parts
}

// ============================================================================
// HTTP Dates
// ============================================================================

/// RFC 850 and ANSI C `asctime()` layouts, still accepted by HTTP/1.1.
const OBSOLETE_DATE_FORMATS: &[&str] = &["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

/// Parse an HTTP date in any of the three formats allowed by RFC 9110.
pub fn parse_http_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    OBSOLETE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|date| date.and_utc())
}

/// Format a timestamp as an IMF-fixdate, the preferred HTTP date format.
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http::HeaderValue;
    use pretty_assertions::assert_eq;

    #[derive(Default, Debug)]
    struct Recorder {
        location: Option<String>,
        last_modified: Option<DateTime<Utc>>,
        links: Vec<(String, String)>,
    }

    impl Meta for Recorder {
        fn set_location(&mut self, location: &str) {
            self.location = Some(location.to_string());
        }

        fn set_last_modified(&mut self, last_modified: DateTime<Utc>) {
            self.last_modified = Some(last_modified);
        }

        fn set_link(&mut self, rel: &str, link: &str) {
            self.links.push((rel.to_string(), link.to_string()));
        }
    }

    fn headers(pairs: &[(http::HeaderName, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(name.clone(), HeaderValue::from_static(value));
        }
        headers
    }

    fn links(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(r, l)| (r.to_string(), l.to_string()))
            .collect()
    }

    #[test]
    fn test_next_and_prev() {
        let mut meta = Recorder::default();
        extract(&headers(&[(LINK, r#"</x>; rel="next", </y>; rel="prev""#)]), &mut meta);
        assert_eq!(meta.links, links(&[("next", "/x"), ("prev", "/y")]));
    }

    #[test]
    fn test_entry_without_rel_is_dropped() {
        let mut meta = Recorder::default();
        extract(
            &headers(&[(LINK, r#"</z>; foo="bar", </x>; rel="next""#)]),
            &mut meta,
        );
        assert_eq!(meta.links, links(&[("next", "/x")]));

        let mut meta = Recorder::default();
        extract(&headers(&[(LINK, r#"</z>; foo="bar""#)]), &mut meta);
        assert!(meta.links.is_empty());
    }

    #[test]
    fn test_entry_without_uri_is_dropped() {
        let mut meta = Recorder::default();
        extract(&headers(&[(LINK, r#"/x; rel="next", </y>; rel="self""#)]), &mut meta);
        assert_eq!(meta.links, links(&[("self", "/y")]));
    }

    #[test]
    fn test_rel_name_is_case_insensitive_and_unquoted() {
        let mut meta = Recorder::default();
        extract(&headers(&[(LINK, "</a>; REL=self, </b> ;Rel = next")]), &mut meta);
        assert_eq!(meta.links, links(&[("self", "/a"), ("next", "/b")]));
    }

    #[test]
    fn test_commas_inside_uri_and_quotes_do_not_split() {
        let mut meta = Recorder::default();
        extract(
            &headers(&[(
                LINK,
                r#"</a?x=1,2>; title="a, b"; rel="next", </c>; rel="prev""#,
            )]),
            &mut meta,
        );
        assert_eq!(meta.links, links(&[("next", "/a?x=1,2"), ("prev", "/c")]));
    }

    #[test]
    fn test_unclosed_uri_does_not_swallow_next_entry() {
        assert_eq!(
            parse_link_header(r#"</a; rel="next", </b>; rel="prev""#),
            vec![Link::new("/b", "prev")]
        );
    }

    #[test]
    fn test_unbalanced_quote_does_not_swallow_next_entry() {
        assert_eq!(
            parse_link_header(r#"</a>; title="oops, </b>; rel="next""#),
            vec![Link::new("/b", "next")]
        );

        let mut meta = Recorder::default();
        extract(
            &headers(&[(LINK, r#"</a>; title="oops, </b>; rel="next", </c>; rel="prev""#)]),
            &mut meta,
        );
        assert_eq!(meta.links, links(&[("next", "/b"), ("prev", "/c")]));
    }

    #[test]
    fn test_multiple_relation_types_in_one_entry() {
        let mut meta = Recorder::default();
        extract(&headers(&[(LINK, r#"</a>; rel="self next""#)]), &mut meta);
        assert_eq!(meta.links, links(&[("self", "/a"), ("next", "/a")]));
    }

    #[test]
    fn test_multiple_link_header_fields() {
        let mut meta = Recorder::default();
        extract(
            &headers(&[(LINK, r#"</a>; rel="self""#), (LINK, r#"</b>; rel="next""#)]),
            &mut meta,
        );
        assert_eq!(meta.links, links(&[("self", "/a"), ("next", "/b")]));
    }

    #[test]
    fn test_location_only_when_non_empty() {
        let mut meta = Recorder::default();
        extract(&headers(&[(LOCATION, "/experiments/foo")]), &mut meta);
        assert_eq!(meta.location.as_deref(), Some("/experiments/foo"));

        let mut meta = Recorder::default();
        extract(&headers(&[(LOCATION, "")]), &mut meta);
        assert_eq!(meta.location, None);
    }

    #[test]
    fn test_last_modified() {
        let expected = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();

        let mut meta = Recorder::default();
        extract(
            &headers(&[(LAST_MODIFIED, "Sun, 06 Nov 1994 08:49:37 GMT")]),
            &mut meta,
        );
        assert_eq!(meta.last_modified, Some(expected));

        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(expected));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Some(expected));
    }

    #[test]
    fn test_bad_last_modified_is_ignored() {
        let mut meta = Recorder::default();
        extract(
            &headers(&[(LAST_MODIFIED, "yesterday"), (LINK, r#"</a>; rel="self""#)]),
            &mut meta,
        );
        assert_eq!(meta.last_modified, None);
        assert_eq!(meta.links, links(&[("self", "/a")]));
    }

    #[test]
    fn test_link_display_parses_back() {
        let link = Link::new("/experiments?offset=10", "next");
        assert_eq!(link.to_string(), r#"</experiments?offset=10>; rel="next""#);
        assert_eq!(parse_link_header(&link.to_string()), vec![link]);
    }

    #[test]
    fn test_format_http_date() {
        let date = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(format_http_date(&date), "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date(&format_http_date(&date)), Some(date));
    }
}
