use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::util::decode_entities;

/// Errors that make a feed document unusable.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Not well-formed XML (syntax, mismatched tags, bad UTF-8, unknown entity).
    #[error("XML parse error: {0}")]
    Xml(String),

    /// The document is XML but lacks an element every feed must carry.
    #[error("Feed has no <{0}> element")]
    MissingElement(&'static str),
}

/// One `<talk>` entry as it appears in the feed, entity-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTalkRecord {
    /// Name of the list the talk belongs to (differs for cross-posted talks).
    pub series: String,
    pub title: String,
    /// Speaker name, usually followed by the institution in parentheses.
    pub speaker: String,
    /// Permalink to the talk page.
    pub url: String,
    /// e.g. `Fri, 16 Oct 2026 14:00:00 +0100`
    pub start_time: String,
    pub end_time: String,
    /// Free-text box; may hold conferencing details ahead of the abstract.
    pub abstract_text: String,
}

/// A parsed feed: the list's own name and its talks in feed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    pub series_name: String,
    pub talks: Vec<RawTalkRecord>,
}

/// Where the text currently being collected ends up.
#[derive(Debug, Clone, Copy)]
enum Slot {
    SeriesName,
    Series,
    Title,
    Speaker,
    Url,
    StartTime,
    EndTime,
    Abstract,
}

impl Slot {
    fn for_talk_child(name: &[u8]) -> Option<Self> {
        match name {
            b"series" => Some(Slot::Series),
            b"title" => Some(Slot::Title),
            b"speaker" => Some(Slot::Speaker),
            b"url" => Some(Slot::Url),
            b"start_time" => Some(Slot::StartTime),
            b"end_time" => Some(Slot::EndTime),
            b"abstract" => Some(Slot::Abstract),
            _ => None,
        }
    }
}

const ROOT_DEPTH: usize = 1;
const ROOT_CHILD_DEPTH: usize = 2;
const TALK_CHILD_DEPTH: usize = 3;

/// Parses a talks feed into its series name and talk records.
///
/// The whole document is read before anything is returned, so a feed that is
/// malformed anywhere is rejected even if its first talk is intact. Unknown
/// elements are skipped, and only direct text of the known fields is kept.
///
/// # Errors
///
/// - [`ParseError::Xml`] - The document is not well-formed
/// - [`ParseError::MissingElement`] - The root has no `<name>` child
pub fn parse_feed(bytes: &[u8]) -> Result<FeedDocument, ParseError> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| ParseError::Xml(format!("feed is not valid UTF-8: {}", e)))?;

    // SEC-002: quick-xml (0.37) never expands <!ENTITY> declarations, so a
    // hostile DOCTYPE cannot pull in external content. Abstract whitespace is
    // significant, hence no trim_text.
    let mut reader = Reader::from_str(content);

    let mut series_name: Option<String> = None;
    let mut talks = Vec::new();
    let mut current: Option<RawTalkRecord> = None;
    let mut capture: Option<(usize, Slot)> = None;
    let mut text = String::new();
    let mut depth: usize = 0;
    let mut root_seen = false;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ParseError::Xml(format!("{} at byte {}", e, reader.buffer_position())))?;

        match event {
            Event::Start(e) => {
                depth += 1;
                open_element(&e, depth, &mut root_seen, &mut current, &mut capture)?;
                if capture.is_some_and(|(d, _)| d == depth) {
                    text.clear();
                }
            }
            Event::Empty(e) => {
                // Self-closing element: open and close in one step
                let depth = depth + 1;
                open_element(&e, depth, &mut root_seen, &mut current, &mut capture)?;
                if let Some((_, slot)) = capture.take_if(|(d, _)| *d == depth) {
                    store(slot, String::new(), &mut series_name, current.as_mut());
                }
                if depth == ROOT_CHILD_DEPTH && e.name().as_ref() == b"talk" {
                    if let Some(talk) = current.take() {
                        talks.push(talk);
                    }
                }
            }
            Event::Text(e) => {
                let unescaped = e
                    .unescape()
                    .map_err(|err| ParseError::Xml(format!("{} at byte {}", err, reader.buffer_position())))?;
                if depth == 0 && !unescaped.trim().is_empty() {
                    return Err(ParseError::Xml("text outside the root element".to_string()));
                }
                if capture.is_some_and(|(d, _)| d == depth) {
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if capture.is_some_and(|(d, _)| d == depth) {
                    let raw = std::str::from_utf8(e.as_ref())
                        .map_err(|err| ParseError::Xml(format!("CDATA is not valid UTF-8: {}", err)))?;
                    text.push_str(raw);
                }
            }
            Event::End(e) => {
                if let Some((_, slot)) = capture.take_if(|(d, _)| *d == depth) {
                    store(slot, std::mem::take(&mut text), &mut series_name, current.as_mut());
                }
                if depth == ROOT_CHILD_DEPTH && e.name().as_ref() == b"talk" {
                    if let Some(talk) = current.take() {
                        talks.push(talk);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(ParseError::Xml(format!(
            "document ended with {} unclosed element(s)",
            depth
        )));
    }
    if !root_seen {
        return Err(ParseError::Xml("document has no root element".to_string()));
    }

    let series_name = series_name.ok_or(ParseError::MissingElement("name"))?;
    tracing::debug!(series = %series_name, talks = talks.len(), "Parsed talks feed");

    Ok(FeedDocument { series_name, talks })
}

/// Updates parser state for an opening tag at `depth`.
fn open_element(
    e: &BytesStart<'_>,
    depth: usize,
    root_seen: &mut bool,
    current: &mut Option<RawTalkRecord>,
    capture: &mut Option<(usize, Slot)>,
) -> Result<(), ParseError> {
    let name = e.name();
    match depth {
        ROOT_DEPTH => {
            if *root_seen {
                return Err(ParseError::Xml("multiple root elements".to_string()));
            }
            *root_seen = true;
        }
        ROOT_CHILD_DEPTH => match name.as_ref() {
            b"name" => *capture = Some((depth, Slot::SeriesName)),
            b"talk" => *current = Some(RawTalkRecord::default()),
            _ => {}
        },
        TALK_CHILD_DEPTH if current.is_some() => {
            if let Some(slot) = Slot::for_talk_child(name.as_ref()) {
                *capture = Some((depth, slot));
            }
        }
        _ => {}
    }
    Ok(())
}

fn store(
    slot: Slot,
    raw: String,
    series_name: &mut Option<String>,
    current: Option<&mut RawTalkRecord>,
) {
    let value = decode_entities(&raw).into_owned();
    if let Slot::SeriesName = slot {
        // First <name> wins; later duplicates are ignored
        series_name.get_or_insert(value);
        return;
    }
    let Some(talk) = current else {
        return;
    };
    let field = match slot {
        Slot::Series => &mut talk.series,
        Slot::Title => &mut talk.title,
        Slot::Speaker => &mut talk.speaker,
        Slot::Url => &mut talk.url,
        Slot::StartTime => &mut talk.start_time,
        Slot::EndTime => &mut talk.end_time,
        Slot::Abstract => &mut talk.abstract_text,
        Slot::SeriesName => return,
    };
    *field = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<list>
  <id>1234</id>
  <name>Theory Seminar</name>
  <url>http://talks.bham.ac.uk/show/index/1234</url>
  <talk>
    <id>5678</id>
    <title>Graphs &amp;amp; Games</title>
    <abstract>Zoom: https://zoom.us/j/1

*Abstract*

Line one.
Line two.</abstract>
    <speaker>Jane Doe (University of X)</speaker>
    <venue>LG34</venue>
    <url>http://talks.bham.ac.uk/talk/index/5678</url>
    <start_time>Fri, 23 Oct 2026 14:00:00 +0100</start_time>
    <end_time>Fri, 23 Oct 2026 15:00:00 +0100</end_time>
    <series>Theory Seminar</series>
  </talk>
  <talk>
    <title>Second</title>
    <series>Other List</series>
  </talk>
</list>"#;

    #[test]
    fn test_parse_feed() {
        let doc = parse_feed(FEED.as_bytes()).expect("Failed to parse feed");
        assert_eq!(doc.series_name, "Theory Seminar");
        assert_eq!(doc.talks.len(), 2);

        let talk = &doc.talks[0];
        assert_eq!(talk.series, "Theory Seminar");
        assert_eq!(talk.title, "Graphs & Games");
        assert_eq!(talk.speaker, "Jane Doe (University of X)");
        assert_eq!(talk.url, "http://talks.bham.ac.uk/talk/index/5678");
        assert_eq!(talk.start_time, "Fri, 23 Oct 2026 14:00:00 +0100");
        assert_eq!(talk.end_time, "Fri, 23 Oct 2026 15:00:00 +0100");
        assert_eq!(
            talk.abstract_text,
            "Zoom: https://zoom.us/j/1\n\n*Abstract*\n\nLine one.\nLine two."
        );

        assert_eq!(doc.talks[1].title, "Second");
        assert_eq!(doc.talks[1].series, "Other List");
        assert_eq!(doc.talks[1].speaker, "");
    }

    #[test]
    fn test_root_url_not_confused_with_talk_url() {
        let doc = parse_feed(FEED.as_bytes()).unwrap();
        assert_eq!(doc.talks[0].url, "http://talks.bham.ac.uk/talk/index/5678");
    }

    #[test]
    fn test_no_talks() {
        let doc = parse_feed(b"<list><name>Theory</name></list>").unwrap();
        assert_eq!(doc.series_name, "Theory");
        assert!(doc.talks.is_empty());
    }

    #[test]
    fn test_self_closing_elements() {
        let doc = parse_feed(
            b"<list><name>Theory</name><talk><series>Theory</series><abstract/></talk><talk/></list>",
        )
        .unwrap();
        assert_eq!(doc.talks.len(), 2);
        assert_eq!(doc.talks[0].abstract_text, "");
        assert_eq!(doc.talks[1], RawTalkRecord::default());
    }

    #[test]
    fn test_cdata_text() {
        let doc =
            parse_feed(b"<list><name><![CDATA[P & NP]]></name></list>").unwrap();
        assert_eq!(doc.series_name, "P & NP");
    }

    #[test]
    fn test_nested_markup_in_field_ignored() {
        let doc = parse_feed(
            b"<list><name>T</name><talk><title>Before<b>bold</b> after</title></talk></list>",
        )
        .unwrap();
        assert_eq!(doc.talks[0].title, "Before after");
    }

    #[test]
    fn test_html_entities_decoded() {
        let doc = parse_feed(
            b"<list><name>T</name><talk><speaker>Paul Erd&amp;#337;s (R&#233;nyi)</speaker></talk></list>",
        )
        .unwrap();
        assert_eq!(doc.talks[0].speaker, "Paul Erdős (Rényi)");
    }

    #[test]
    fn test_missing_name() {
        let result = parse_feed(b"<list><talk><title>x</title></talk></list>");
        assert!(matches!(result, Err(ParseError::MissingElement("name"))));
    }

    #[test]
    fn test_malformed_xml_error() {
        assert!(matches!(
            parse_feed(b"<not valid xml"),
            Err(ParseError::Xml(_))
        ));
    }

    #[test]
    fn test_mismatched_tags() {
        assert!(matches!(
            parse_feed(b"<list><name>T</title></list>"),
            Err(ParseError::Xml(_))
        ));
    }

    #[test]
    fn test_unclosed_root() {
        assert!(matches!(
            parse_feed(b"<list><name>T</name>"),
            Err(ParseError::Xml(_))
        ));
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(parse_feed(b""), Err(ParseError::Xml(_))));
    }

    #[test]
    fn test_html_page_instead_of_feed() {
        assert!(parse_feed(b"Service temporarily unavailable").is_err());
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            parse_feed(b"<list><name>\xff</name></list>"),
            Err(ParseError::Xml(_))
        ));
    }

    #[test]
    fn test_xxe_entity_not_expanded() {
        // SEC-002: Custom entities are rejected rather than expanded
        let feed = br#"<?xml version="1.0"?>
<!DOCTYPE list [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<list><name>&xxe;</name></list>"#;
        assert!(matches!(parse_feed(feed), Err(ParseError::Xml(_))));
    }
}
