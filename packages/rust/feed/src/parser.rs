//! RSS 2.0 / RDF and Atom parsing on top of `quick-xml`.
//!
//! The parser is deliberately forgiving: unknown elements are ignored, and
//! markup nested inside content fields (Atom `type="xhtml"`) is re-serialized
//! so the text normalizer can process it.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use sourcepack_shared::{Result, SourcePackError};

/// Syndication dialect of a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rss,
    Atom,
}

/// Channel-level data plus every item, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    pub kind: FeedKind,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub items: Vec<FeedItem>,
}

/// Raw fields of one `<item>` / `<entry>`; bodies are still markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    /// `content:encoded`
    pub content_encoded: Option<String>,
    /// Atom `content`
    pub content: Option<String>,
    /// `description` / `summary`
    pub summary: Option<String>,
}

impl FeedItem {
    /// Best permalink: explicit link, then a URL-shaped guid.
    pub fn permalink(&self) -> Option<&str> {
        non_blank(self.link.as_deref()).or_else(|| {
            non_blank(self.guid.as_deref()).filter(|g| g.starts_with("http"))
        })
    }

    /// Publication time, falling back to the last-updated time.
    pub fn timestamp(&self) -> Option<&str> {
        non_blank(self.published.as_deref()).or_else(|| non_blank(self.updated.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Guid,
    Published,
    Updated,
    ContentEncoded,
    Content,
    Summary,
    Description,
}

/// Text being collected for a field, with the stack depth it started at.
struct Capture {
    field: Field,
    depth: usize,
    buf: String,
}

/// Parse an RSS or Atom document.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut kind: Option<FeedKind> = None;
    let mut stack: Vec<String> = Vec::new();
    let mut capture: Option<Capture> = None;
    let mut item: Option<FeedItem> = None;
    let mut feed = ParsedFeed {
        kind: FeedKind::Rss,
        title: None,
        description: None,
        link: None,
        items: Vec::new(),
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = qualified_name(&e);

                if let Some(cap) = capture.as_mut() {
                    cap.buf.push('<');
                    cap.buf.push_str(&String::from_utf8_lossy(&e));
                    cap.buf.push('>');
                    stack.push(name);
                } else {
                    if kind.is_none() {
                        kind = Some(detect_kind(&name)?);
                    }

                    if name == "item" || name == "entry" {
                        item = Some(FeedItem::default());
                    } else if name == "link" {
                        record_link(&e, item.as_mut(), &mut feed, &stack);
                    }

                    let field = if item.is_some() {
                        is_item_child(&stack).then(|| item_field(&name)).flatten()
                    } else if is_channel_child(&stack) {
                        channel_field(&name)
                    } else {
                        None
                    };

                    stack.push(name);
                    if let Some(field) = field {
                        capture = Some(Capture {
                            field,
                            depth: stack.len(),
                            buf: String::new(),
                        });
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(cap) = capture.as_mut() {
                    cap.buf.push('<');
                    cap.buf.push_str(&String::from_utf8_lossy(&e));
                    cap.buf.push_str("/>");
                } else {
                    let name = qualified_name(&e);
                    if kind.is_none() {
                        kind = Some(detect_kind(&name)?);
                    }
                    if name == "link" {
                        record_link(&e, item.as_mut(), &mut feed, &stack);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();

                let finished = capture
                    .as_ref()
                    .is_some_and(|cap| cap.depth == stack.len());
                if finished {
                    if let Some(cap) = capture.take() {
                        match item.as_mut() {
                            Some(current) => assign_item_field(current, cap.field, cap.buf),
                            None => assign_channel_field(&mut feed, cap.field, cap.buf),
                        }
                    }
                } else if let Some(cap) = capture.as_mut() {
                    cap.buf.push_str("</");
                    cap.buf.push_str(&name);
                    cap.buf.push('>');
                }

                stack.pop();

                if capture.is_none() && (name == "item" || name == "entry") {
                    if let Some(done) = item.take() {
                        feed.items.push(done);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(cap) = capture.as_mut() {
                    match e.unescape() {
                        Ok(text) => cap.buf.push_str(&text),
                        // Unknown HTML entities (`&nbsp;`) are left for the normalizer.
                        Err(_) => cap.buf.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(cap) = capture.as_mut() {
                    cap.buf.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourcePackError::parse(
                    "feed",
                    format!("malformed XML at byte {}: {e}", reader.buffer_position()),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    feed.kind = kind.ok_or_else(|| SourcePackError::parse("feed", "document is empty"))?;
    Ok(feed)
}

/// Record an Atom-style `<link href>` on the current item or the feed.
fn record_link(e: &BytesStart<'_>, item: Option<&mut FeedItem>, feed: &mut ParsedFeed, stack: &[String]) {
    let Some(href) = alternate_href(e) else {
        return;
    };
    match item {
        Some(current) if is_item_child(stack) => {
            current.link.get_or_insert(href);
        }
        Some(_) => {}
        None if is_channel_child(stack) => {
            feed.link.get_or_insert(href);
        }
        None => {}
    }
}

fn qualified_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

fn detect_kind(root: &str) -> Result<FeedKind> {
    match root {
        "rss" | "rdf:rdf" => Ok(FeedKind::Rss),
        "feed" => Ok(FeedKind::Atom),
        other => Err(SourcePackError::parse(
            "feed",
            format!("expected an RSS or Atom document, found <{other}>"),
        )),
    }
}

/// True when the innermost open element is the channel (RSS) or feed (Atom).
fn is_channel_child(stack: &[String]) -> bool {
    matches!(stack.last().map(String::as_str), Some("channel" | "feed"))
}

/// True when the innermost open element is an RSS item or Atom entry, so
/// nested blocks such as `atom:source` never feed item fields.
fn is_item_child(stack: &[String]) -> bool {
    matches!(stack.last().map(String::as_str), Some("item" | "entry"))
}

fn item_field(name: &str) -> Option<Field> {
    match name {
        "title" => Some(Field::Title),
        "link" => Some(Field::Link),
        "guid" | "id" => Some(Field::Guid),
        "pubdate" | "published" | "dc:date" | "issued" => Some(Field::Published),
        "updated" | "modified" => Some(Field::Updated),
        "content:encoded" => Some(Field::ContentEncoded),
        "content" => Some(Field::Content),
        "description" | "summary" => Some(Field::Summary),
        _ => None,
    }
}

fn channel_field(name: &str) -> Option<Field> {
    match name {
        "title" => Some(Field::Title),
        "link" => Some(Field::Link),
        "description" | "subtitle" | "tagline" => Some(Field::Description),
        _ => None,
    }
}

fn assign_item_field(item: &mut FeedItem, field: Field, value: String) {
    let slot = match field {
        Field::Title => &mut item.title,
        Field::Link => &mut item.link,
        Field::Guid => &mut item.guid,
        Field::Published => &mut item.published,
        Field::Updated => &mut item.updated,
        Field::ContentEncoded => &mut item.content_encoded,
        Field::Content => &mut item.content,
        Field::Summary | Field::Description => &mut item.summary,
    };
    set_if_empty(slot, value);
}

fn assign_channel_field(feed: &mut ParsedFeed, field: Field, value: String) {
    let slot = match field {
        Field::Title => &mut feed.title,
        Field::Link => &mut feed.link,
        Field::Description | Field::Summary => &mut feed.description,
        _ => return,
    };
    set_if_empty(slot, value);
}

fn set_if_empty(slot: &mut Option<String>, value: String) {
    let value = value.trim();
    if slot.as_deref().is_none_or(str::is_empty) && !value.is_empty() {
        *slot = Some(value.to_string());
    }
}

/// `href` of an Atom link with `rel="alternate"` or no `rel` at all.
fn alternate_href(e: &BytesStart<'_>) -> Option<String> {
    let rel = attribute(e, b"rel");
    if rel.as_deref().is_some_and(|r| r != "alternate") {
        return None;
    }
    attribute(e, b"href").filter(|h| !h.trim().is_empty())
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/feeds")
            .join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    #[test]
    fn parses_rss_channel_and_items() {
        let feed = parse_feed(&load_fixture("rss.xml")).unwrap();

        assert_eq!(feed.kind, FeedKind::Rss);
        assert_eq!(feed.title.as_deref(), Some("Systems Notes"));
        assert_eq!(
            feed.description.as_deref(),
            Some("Essays on storage engines & networking.")
        );
        assert_eq!(feed.link.as_deref(), Some("https://blog.example.com/"));
        assert_eq!(feed.items.len(), 3);

        let first = &feed.items[0];
        assert_eq!(first.title.as_deref(), Some("Designing a Write-Ahead Log"));
        assert_eq!(first.permalink(), Some("https://blog.example.com/posts/wal"));
        assert_eq!(first.timestamp(), Some("Tue, 05 Mar 2024 09:30:00 GMT"));
        assert!(first.content_encoded.as_deref().unwrap().contains("<em>before</em>"));
        assert_eq!(first.summary.as_deref(), Some("A short teaser about logs."));
    }

    #[test]
    fn rss_guid_and_dc_date_fallbacks() {
        let feed = parse_feed(&load_fixture("rss.xml")).unwrap();
        let second = &feed.items[1];

        assert!(second.title.is_none());
        assert_eq!(second.permalink(), Some("https://blog.example.com/posts/untitled"));
        assert_eq!(second.timestamp(), Some("2024-02-20T18:00:00+01:00"));
        assert!(second.summary.as_deref().unwrap().starts_with("<p>Summary only"));
    }

    #[test]
    fn parses_atom_entries() {
        let feed = parse_feed(&load_fixture("atom.xml")).unwrap();

        assert_eq!(feed.kind, FeedKind::Atom);
        assert_eq!(feed.title.as_deref(), Some("Release Radar"));
        assert_eq!(
            feed.description.as_deref(),
            Some("Changelogs from the compiler team")
        );
        assert_eq!(feed.link.as_deref(), Some("https://releases.example.org/"));
        assert_eq!(feed.items.len(), 2);

        let first = &feed.items[0];
        assert_eq!(first.permalink(), Some("https://releases.example.org/1.78"));
        assert_eq!(first.timestamp(), Some("2024-03-21T10:00:00Z"));
        let content = first.content.as_deref().unwrap();
        assert!(content.contains("<p>Diagnostics now point at the <code>?</code> operator.</p>"));
        assert!(content.contains("<li>Faster builds</li>"));

        let second = &feed.items[1];
        assert_eq!(second.permalink(), Some("https://releases.example.org/1.77"));
        assert_eq!(second.timestamp(), Some("2024-02-08T12:00:00Z"));
    }

    #[test]
    fn atom_source_block_does_not_leak_into_entry() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
            <title>Aggregator</title>
            <entry>
                <source>
                    <title>Upstream Feed</title>
                    <id>urn:upstream</id>
                    <link href="https://upstream.example.net/"/>
                    <updated>2020-01-01T00:00:00Z</updated>
                </source>
                <title>Real Title</title>
                <id>urn:entry:1</id>
                <link href="https://aggregator.example.org/posts/1"/>
                <updated>2024-04-01T08:00:00Z</updated>
            </entry>
        </feed>"#;

        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Aggregator"));

        let entry = &feed.items[0];
        assert_eq!(entry.title.as_deref(), Some("Real Title"));
        assert_eq!(entry.guid.as_deref(), Some("urn:entry:1"));
        assert_eq!(entry.permalink(), Some("https://aggregator.example.org/posts/1"));
        assert_eq!(entry.timestamp(), Some("2024-04-01T08:00:00Z"));
    }

    #[test]
    fn rejects_non_feed_documents() {
        let err = parse_feed("<html><body>nope</body></html>").unwrap_err();
        assert_eq!(err.status_code(), 422);

        let err = parse_feed("").unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = parse_feed("<rss><channel><title>x</wrong></channel></rss>").unwrap_err();
        assert!(matches!(err, SourcePackError::Parse { .. }));
    }

    #[test]
    fn feed_without_items_parses_empty() {
        let feed = parse_feed("<rss><channel><title>Quiet</title></channel></rss>").unwrap();
        assert!(feed.items.is_empty());
        assert_eq!(feed.title.as_deref(), Some("Quiet"));
    }
}
