//! Weather feed parser.
//!
//! Reads an RSS 2.0 or Atom document, checks it is well-formed and turns one
//! item/entry into a [`Report`].

use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::datetime::parse_feed_timestamp;
use crate::weather::types::{RawFeed, Report, UNKNOWN_CONDITION};
use crate::{Result, WeatherError};

/// A number followed by a degree sign and an optional C/F unit.
///
/// The unit must stand alone, so "5° Cloudy" carries no unit.
static TEMPERATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([-+\x{2212}]?\d+(?:[.,]\d+)?)\s*[°º](?:\s*([CcFf])\b)?")
        .expect("temperature pattern is valid")
});

/// Environment Canada summaries carry a `Condition: <text>` line.
static CONDITION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^condition\s*:\s*(.+)$").expect("condition pattern is valid")
});

/// Tags that start a new line when flattening embedded HTML.
const BLOCK_TAGS: &[&str] = &[
    "br", "p", "div", "li", "ul", "ol", "tr", "td", "table", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Parser turning feed bytes into a weather report.
#[derive(Debug, Clone)]
pub struct FeedParser {
    fallback_link: Url,
}

impl FeedParser {
    /// Create a parser that falls back to `fallback_link` when an entry has no link.
    pub fn new(fallback_link: Url) -> Self {
        Self { fallback_link }
    }

    /// The link used when the feed omits one.
    pub fn fallback_link(&self) -> &Url {
        &self.fallback_link
    }

    /// Parse a fetched feed into a report.
    ///
    /// # Errors
    ///
    /// - `MalformedFeed` if the bytes are not a well-formed XML document
    /// - `EmptyFeed` if the document has no `item` or `entry`
    ///
    /// Environment Canada feeds list warnings before current conditions, so an
    /// entry categorised or titled "Current Conditions" wins over the first one.
    pub fn parse(&self, raw: &RawFeed) -> Result<Report> {
        let entry = select_entry(scan_entries(&raw.bytes)?).ok_or(WeatherError::EmptyFeed)?;
        let report = self.build_report(entry);
        debug!(
            "Parsed report: condition={:?} temperature={:?} observed_at={:?}",
            report.condition, report.temperature_celsius, report.observed_at
        );
        Ok(report)
    }

    fn build_report(&self, entry: EntryFields) -> Report {
        let title = entry.title.as_deref().map(strip_html).unwrap_or_default();
        let summary_lines = entry
            .summary
            .as_deref()
            .map(html_to_lines)
            .unwrap_or_default();
        let summary = summary_lines.join(" ");

        let title_temp = find_temperature(&title);
        let temperature = title_temp
            .as_ref()
            .map(|t| t.celsius)
            .or_else(|| find_temperature(&summary).map(|t| t.celsius));

        let condition = labelled_condition(&summary_lines)
            .or_else(|| condition_from_text(&title, title_temp.as_ref()))
            .or_else(|| {
                let summary_temp = find_temperature(&summary);
                condition_from_text(&summary, summary_temp.as_ref())
            })
            .unwrap_or_else(|| UNKNOWN_CONDITION.to_string());

        let observed_at = entry
            .published
            .as_deref()
            .and_then(parse_feed_timestamp)
            .or_else(|| entry.updated.as_deref().and_then(parse_feed_timestamp));

        let source_link = entry
            .link
            .as_deref()
            .and_then(|link| resolve_link(&self.fallback_link, link))
            .unwrap_or_else(|| self.fallback_link.clone());

        Report {
            condition,
            temperature_celsius: temperature,
            observed_at,
            source_link,
        }
    }
}

/// Current-conditions marker used by Environment Canada.
const CURRENT_CONDITIONS: &str = "Current Conditions";

/// Raw text collected from one entry.
#[derive(Debug, Default)]
struct EntryFields {
    title: Option<String>,
    summary: Option<String>,
    link: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    category: Option<String>,
}

impl EntryFields {
    fn is_current_conditions(&self) -> bool {
        let category_matches = self
            .category
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(CURRENT_CONDITIONS));
        let title_matches = self
            .title
            .as_deref()
            .is_some_and(|t| t.trim_start().starts_with(CURRENT_CONDITIONS));
        category_matches || title_matches
    }

    /// Atom carries links and categories in attributes rather than text.
    fn set_from_attributes(&mut self, field: Field, element: &BytesStart) {
        match field {
            Field::Link => {
                if let Some(href) = link_href(element) {
                    self.set(Field::Link, href);
                }
            }
            Field::Category => {
                if let Some(term) = attribute(element, b"term") {
                    self.set(Field::Category, term);
                }
            }
            _ => {}
        }
    }

    fn set(&mut self, field: Field, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Summary => &mut self.summary,
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::Category => &mut self.category,
        };
        if slot.is_none() {
            *slot = Some(text);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Summary,
    Link,
    Published,
    Updated,
    Category,
}

fn field_for(local_name: &[u8]) -> Option<Field> {
    match local_name {
        b"title" => Some(Field::Title),
        b"description" | b"summary" | b"content" | b"encoded" => Some(Field::Summary),
        b"link" => Some(Field::Link),
        b"pubDate" | b"published" | b"date" | b"issued" => Some(Field::Published),
        b"updated" | b"modified" => Some(Field::Updated),
        b"category" => Some(Field::Category),
        _ => None,
    }
}

fn is_entry(local_name: &[u8]) -> bool {
    local_name == b"item" || local_name == b"entry"
}

fn attribute(element: &BytesStart, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .and_then(|attr| {
            attr.unescape_value_with(resolve_html_entity)
                .ok()
                .map(|v| v.into_owned())
        })
}

/// HTML entities feeds use without declaring them. Anything else undeclared
/// is an error.
fn resolve_html_entity(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some(" "),
        "deg" => Some("°"),
        _ => None,
    }
}

/// Every attribute must be well-formed, unique and carry a resolvable value.
fn check_attributes(reader: &Reader<&[u8]>, element: &BytesStart) -> Result<()> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| malformed(reader, format!("bad attribute: {e}")))?;
        attr.unescape_value_with(resolve_html_entity)
            .map_err(|e| malformed(reader, format!("bad attribute value: {e}")))?;
    }
    Ok(())
}

/// Atom links carry the target in `href`; only `alternate` (or unlabelled) links count.
fn link_href(element: &BytesStart) -> Option<String> {
    match attribute(element, b"rel").as_deref() {
        None | Some("alternate") => attribute(element, b"href"),
        Some(_) => None,
    }
}

fn malformed(reader: &Reader<&[u8]>, message: impl std::fmt::Display) -> WeatherError {
    WeatherError::MalformedFeed(format!(
        "{message} at byte {}",
        reader.buffer_position()
    ))
}

/// Walk the whole document, checking well-formedness, and collect every entry.
///
/// Returns an empty list for a well-formed document without entries.
fn scan_entries(bytes: &[u8]) -> Result<Vec<EntryFields>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut saw_root = false;
    let mut root_closed = false;

    let mut entries = Vec::new();
    // (depth of the entry element, fields collected so far)
    let mut current: Option<(usize, EntryFields)> = None;
    let mut field: Option<(Field, String)> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| malformed(&reader, format!("XML parse error: {e}")))?;

        match event {
            Event::Start(e) => {
                check_attributes(&reader, &e)?;
                if depth == 0 {
                    if root_closed {
                        return Err(malformed(&reader, "multiple root elements"));
                    }
                    saw_root = true;
                }
                depth += 1;

                let local = e.local_name();
                match current.as_mut() {
                    Some((entry_depth, fields)) if depth == *entry_depth + 1 => {
                        if let Some(f) = field_for(local.as_ref()) {
                            fields.set_from_attributes(f, &e);
                            field = Some((f, String::new()));
                        }
                    }
                    Some(_) => {}
                    None => {
                        if is_entry(local.as_ref()) {
                            current = Some((depth, EntryFields::default()));
                        }
                    }
                }
            }
            Event::Empty(e) => {
                check_attributes(&reader, &e)?;
                if depth == 0 {
                    if root_closed {
                        return Err(malformed(&reader, "multiple root elements"));
                    }
                    saw_root = true;
                    root_closed = true;
                } else {
                    let local = e.local_name();
                    match current.as_mut() {
                        Some((entry_depth, fields)) if depth == *entry_depth => {
                            if let Some(f) = field_for(local.as_ref()) {
                                fields.set_from_attributes(f, &e);
                            }
                        }
                        Some(_) => {}
                        None => {
                            if is_entry(local.as_ref()) {
                                entries.push(EntryFields::default());
                            }
                        }
                    }
                }
            }
            Event::End(_) => {
                if depth == 0 {
                    return Err(malformed(&reader, "unexpected closing tag"));
                }

                if let Some(entry_depth) = current.as_ref().map(|(d, _)| *d) {
                    if depth == entry_depth + 1 {
                        if let (Some((f, text)), Some((_, fields))) =
                            (field.take(), current.as_mut())
                        {
                            fields.set(f, text);
                        }
                    } else if depth == entry_depth {
                        if let Some((_, fields)) = current.take() {
                            entries.push(fields);
                        }
                    }
                }

                depth -= 1;
                if depth == 0 {
                    root_closed = true;
                }
            }
            Event::Text(e) => {
                let text = e
                    .unescape_with(resolve_html_entity)
                    .map_err(|err| malformed(&reader, format!("bad character data: {err}")))?;
                if depth == 0 {
                    if !text.trim().is_empty() {
                        return Err(malformed(&reader, "text outside the root element"));
                    }
                } else if let Some((_, collected)) = field.as_mut() {
                    push_text(collected, &text);
                }
            }
            Event::CData(e) => {
                if depth == 0 {
                    return Err(malformed(&reader, "CDATA outside the root element"));
                }
                let inner = e.into_inner();
                let text = std::str::from_utf8(&inner)
                    .map_err(|err| malformed(&reader, format!("CDATA is not UTF-8: {err}")))?;
                if let Some((_, collected)) = field.as_mut() {
                    push_text(collected, text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(WeatherError::MalformedFeed(
            "document has no root element".to_string(),
        ));
    }
    if depth != 0 {
        return Err(WeatherError::MalformedFeed(
            "unexpected end of document".to_string(),
        ));
    }

    Ok(entries)
}

/// The current-conditions entry if the feed has one, otherwise the first entry.
fn select_entry(mut entries: Vec<EntryFields>) -> Option<EntryFields> {
    if entries.is_empty() {
        return None;
    }
    let index = entries
        .iter()
        .position(EntryFields::is_current_conditions)
        .unwrap_or(0);
    Some(entries.swap_remove(index))
}

fn push_text(collected: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !collected.is_empty() {
        collected.push(' ');
    }
    collected.push_str(text);
}

/// Temperature found in free text.
#[derive(Debug, Clone, PartialEq)]
struct TemperatureMatch {
    celsius: f64,
    start: usize,
    end: usize,
}

fn find_temperature(text: &str) -> Option<TemperatureMatch> {
    let caps = TEMPERATURE_RE.captures(text)?;
    let whole = caps.get(0)?;
    let number = caps
        .get(1)?
        .as_str()
        .replace('\u{2212}', "-")
        .replace(',', ".");
    let value: f64 = number.parse().ok()?;

    let celsius = match caps.get(2).map(|m| m.as_str()) {
        Some("F") | Some("f") => (value - 32.0) * 5.0 / 9.0,
        _ => value,
    };

    Some(TemperatureMatch {
        celsius,
        start: whole.start(),
        end: whole.end(),
    })
}

fn labelled_condition(lines: &[String]) -> Option<String> {
    lines.iter().find_map(|line| {
        CONDITION_LABEL_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|c| !c.is_empty())
    })
}

/// The text with the temperature cut out and separators trimmed.
fn condition_from_text(text: &str, temperature: Option<&TemperatureMatch>) -> Option<String> {
    let remainder = match temperature {
        Some(t) => format!("{} {}", &text[..t.start], &text[t.end..]),
        None => text.to_string(),
    };
    let is_separator = |c: char| c.is_whitespace() || matches!(c, ',' | ':' | ';' | '-');
    let condition = remainder
        .trim_matches(is_separator)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if condition.is_empty() {
        None
    } else {
        Some(condition)
    }
}

/// Absolute http(s) links are kept; relative links resolve against `base`.
fn resolve_link(base: &Url, link: &str) -> Option<Url> {
    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(link).ok()?,
        Err(_) => return None,
    };
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Flatten embedded HTML to a single line of text.
fn strip_html(html: &str) -> String {
    html_to_lines(html).join(" ")
}

/// Flatten embedded HTML to text lines, breaking at block-level tags.
fn html_to_lines(html: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut tag = String::new();
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' if !in_tag => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                if is_block_tag(&tag) {
                    lines.push(std::mem::take(&mut line));
                }
            }
            _ if in_tag => tag.push(ch),
            _ => line.push(ch),
        }
    }
    lines.push(line);

    lines
        .into_iter()
        .map(|l| {
            decode_entities(&l)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|l| !l.is_empty())
        .collect()
}

fn is_block_tag(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    BLOCK_TAGS.contains(&name.as_str())
}

/// Decode the HTML entities that survive XML unescaping.
fn decode_entities(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&semi| semi > 0 && semi <= 8)
            .and_then(|semi| decode_entity(&after[..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                result.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                result.push('&');
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "deg" => Some('°'),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
