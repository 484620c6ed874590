// src/ingest/parser.rs
//! Streaming RSS 2.0 / RSS 1.0 (RDF) / Atom parser.
//!
//! Elements are resolved against their namespace, so `content:encoded`,
//! `dc:date` and the Atom vocabulary work whatever prefix a feed declares,
//! while Media RSS and other extension elements that reuse a core local name
//! (`media:title`, `media:description`, `media:content`) never overwrite the
//! item's own fields. Text is entity-decoded leniently: HTML entities that are
//! not valid XML (`&nbsp;`, `&mdash;`) are decoded instead of failing the feed.

use anyhow::{anyhow, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::ingest::dates::normalize_date;
use crate::ingest::normalize::plain_text;
use crate::ingest::types::RawFeedItem;

/// Namespaces whose elements carry the item fields we read.
const CORE_NAMESPACES: &[&[u8]] = &[
    b"http://www.w3.org/2005/Atom",
    b"http://purl.org/atom/ns#",
    b"http://purl.org/rss/1.0/",
    b"http://purl.org/rss/1.0/modules/content/",
    b"http://purl.org/dc/elements/1.1/",
    b"http://purl.org/dc/terms/",
    b"http://www.w3.org/1999/02/22-rdf-syntax-ns#",
    b"http://backend.userland.com/rss2",
    b"http://my.netscape.com/rdf/simple/0.9/",
];

const MEDIA_NAMESPACES: &[&[u8]] = &[
    b"http://search.yahoo.com/mrss/",
    b"http://search.yahoo.com/mrss",
];

/// Which vocabulary an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vocab {
    Core,
    Media,
    Other,
}

impl Vocab {
    fn of(ns: &ResolveResult<'_>) -> Self {
        match ns {
            ResolveResult::Unbound => Vocab::Core,
            ResolveResult::Bound(ns) => {
                let uri = ns.as_ref();
                if CORE_NAMESPACES.contains(&uri) {
                    Vocab::Core
                } else if MEDIA_NAMESPACES.contains(&uri) {
                    Vocab::Media
                } else {
                    Vocab::Other
                }
            }
            // Undeclared prefix: fall back to the conventional ones.
            ResolveResult::Unknown(prefix) => match prefix.as_slice() {
                b"content" | b"dc" | b"atom" | b"rdf" => Vocab::Core,
                b"media" => Vocab::Media,
                _ => Vocab::Other,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct Open {
    name: String,
    vocab: Vocab,
}

impl Open {
    fn is_core(&self, names: &[&str]) -> bool {
        self.vocab == Vocab::Core && names.contains(&self.name.as_str())
    }
}

/// Channel-level title plus every item, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub items: Vec<RawFeedItem>,
}

#[derive(Debug, Default)]
struct ItemBuilder {
    /// Local name of the element that opened this item ("item" / "entry").
    tag: String,
    /// Stack depth of the item element.
    depth: usize,
    title: Option<String>,
    link: Option<String>,
    atom_link: Option<String>,
    guid: Option<String>,
    summary: Option<String>,
    full_content: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
    dc_date: Option<String>,
    updated: Option<String>,
    enclosure: Option<String>,
    media_content: Option<String>,
    media_thumbnail: Option<String>,
}

impl ItemBuilder {
    fn finish(self) -> RawFeedItem {
        let link = self
            .link
            .or(self.atom_link)
            .or_else(|| self.guid.filter(|g| is_http_url(g)));

        let content = self.summary.or(self.full_content);
        let content_snippet = content
            .as_deref()
            .map(plain_text)
            .filter(|s| !s.is_empty());

        let pub_date = self
            .pub_date
            .or(self.published)
            .or(self.dc_date)
            .or(self.updated);
        let iso_date = pub_date.as_deref().and_then(normalize_date);

        RawFeedItem {
            title: self.title.map(|t| plain_text(&t)),
            content,
            content_snippet,
            link,
            pub_date,
            iso_date,
            enclosure_url: self
                .enclosure
                .or(self.media_content)
                .or(self.media_thumbnail),
        }
    }

    fn set_field(&mut self, name: &str, text: String) {
        let slot = match name {
            "title" => &mut self.title,
            "link" => &mut self.link,
            "guid" | "id" => &mut self.guid,
            "description" | "summary" => &mut self.summary,
            "encoded" | "content" => &mut self.full_content,
            "pubDate" => &mut self.pub_date,
            "published" | "issued" => &mut self.published,
            "date" => &mut self.dc_date,
            "updated" | "modified" => &mut self.updated,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(text);
        }
    }

    /// Attribute-carrying elements: Atom links, enclosures and Media RSS.
    fn take_attrs(&mut self, el: &Open, e: &BytesStart<'_>, direct_child: bool) {
        match (el.vocab, el.name.as_str()) {
            (Vocab::Core, "link") if direct_child => {
                let rel = attr(e, "rel");
                if matches!(rel.as_deref(), None | Some("alternate")) && self.atom_link.is_none() {
                    self.atom_link = attr(e, "href").filter(|h| !h.is_empty());
                }
            }
            (Vocab::Core, "enclosure") if self.enclosure.is_none() => {
                self.enclosure = attr(e, "url").filter(|u| !u.is_empty());
            }
            (Vocab::Media, "content") if self.media_content.is_none() => {
                self.media_content = attr(e, "url").filter(|u| !u.is_empty());
            }
            (Vocab::Media, "thumbnail") if self.media_thumbnail.is_none() => {
                self.media_thumbnail = attr(e, "url").filter(|u| !u.is_empty());
            }
            _ => {}
        }
    }
}

/// Parse one feed document. Fails on XML syntax errors and on documents
/// that contain no RSS/RDF/Atom root.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed> {
    let mut reader = NsReader::from_str(xml);

    let mut feed = ParsedFeed::default();
    let mut saw_root = false;
    let mut stack: Vec<Open> = Vec::new();
    let mut text = String::new();
    let mut item: Option<ItemBuilder> = None;

    loop {
        let ev = reader
            .read_event()
            .with_context(|| format!("xml error at byte {}", reader.buffer_position()))?;

        match ev {
            Event::Start(e) => {
                let el = resolve(&reader, &e);
                if el.is_core(&["rss", "RDF", "feed", "channel"]) {
                    saw_root = true;
                }
                on_open(&el, &e, &stack, &mut item, &mut text);
                let starts_item = saw_root && item.is_none() && el.is_core(&["item", "entry"]);
                let tag = el.name.clone();
                stack.push(el);
                if starts_item {
                    item = Some(ItemBuilder {
                        tag,
                        depth: stack.len(),
                        ..Default::default()
                    });
                }
            }
            Event::Empty(e) => {
                let el = resolve(&reader, &e);
                on_open(&el, &e, &stack, &mut item, &mut text);
            }
            Event::Text(t) => {
                let raw = String::from_utf8_lossy(&t);
                text.push_str(&html_escape::decode_html_entities(&raw));
            }
            Event::CData(c) => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(_) => {
                let Some(el) = stack.pop() else {
                    continue;
                };
                let depth = stack.len();

                if let Some(b) = item.as_mut() {
                    if depth + 1 == b.depth && el.is_core(&[b.tag.as_str()]) {
                        if let Some(done) = item.take() {
                            feed.items.push(done.finish());
                        }
                    } else if depth == b.depth && el.vocab == Vocab::Core {
                        let value = text.trim();
                        if !value.is_empty() {
                            b.set_field(&el.name, value.to_string());
                        }
                    }
                } else if el.is_core(&["title"]) && feed.title.is_none() {
                    if stack.last().is_some_and(|p| p.is_core(&["channel", "feed"])) {
                        let t = plain_text(&text);
                        if !t.is_empty() {
                            feed.title = Some(t);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(anyhow!("document has no rss, rdf or atom root element"));
    }
    Ok(feed)
}

fn on_open(
    el: &Open,
    e: &BytesStart<'_>,
    stack: &[Open],
    item: &mut Option<ItemBuilder>,
    text: &mut String,
) {
    match item.as_mut() {
        Some(b) => {
            let direct_child = stack.len() == b.depth;
            if direct_child {
                text.clear();
            }
            b.take_attrs(el, e, direct_child);
        }
        None => {
            if el.is_core(&["title"]) {
                text.clear();
            }
        }
    }
}

fn resolve(reader: &NsReader<&[u8]>, e: &BytesStart<'_>) -> Open {
    let (ns, local) = reader.resolve_element(e.name());
    Open {
        name: String::from_utf8_lossy(local.as_ref()).into_owned(),
        vocab: Vocab::of(&ns),
    }
}

fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if a.key.local_name().as_ref() == key.as_bytes() {
            let raw = String::from_utf8_lossy(&a.value);
            Some(html_escape::decode_html_entities(&raw).trim().to_string())
        } else {
            None
        }
    })
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Chain Daily</title>
    <link>https://chain.example</link>
    <item>
      <title><![CDATA[Bitcoin &amp; friends rally]]></title>
      <link>https://chain.example/a</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
      <description><![CDATA[<p>Prices <b>surge</b>&nbsp;again</p>]]></description>
      <content:encoded><![CDATA[<p>Long body</p>]]></content:encoded>
      <media:content url="https://img.example/a.jpg" medium="image"/>
    </item>
    <item>
      <title>No date &mdash; here</title>
      <guid isPermaLink="true">https://chain.example/b</guid>
      <enclosure url="https://img.example/b.png" type="image/png" length="1"/>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_rss_items_and_channel_title() {
        let feed = parse_feed(RSS).expect("rss parses");
        assert_eq!(feed.title.as_deref(), Some("Chain Daily"));
        assert_eq!(feed.items.len(), 2);

        let a = &feed.items[0];
        assert_eq!(a.title.as_deref(), Some("Bitcoin & friends rally"));
        assert_eq!(a.link.as_deref(), Some("https://chain.example/a"));
        assert_eq!(a.iso_date.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(a.content_snippet.as_deref(), Some("Prices surge again"));
        assert_eq!(a.enclosure_url.as_deref(), Some("https://img.example/a.jpg"));

        let b = &feed.items[1];
        assert_eq!(b.title.as_deref(), Some("No date \u{2014} here"));
        assert_eq!(b.link.as_deref(), Some("https://chain.example/b"));
        assert!(b.pub_date.is_none() && b.iso_date.is_none());
        assert_eq!(b.enclosure_url.as_deref(), Some("https://img.example/b.png"));
    }

    #[test]
    fn parses_atom_entries() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="text">Atom Markets</title>
  <link rel="self" href="https://atom.example/feed"/>
  <entry>
    <title>ETH upgrade ships</title>
    <link rel="alternate" href="https://atom.example/1"/>
    <id>urn:uuid:1</id>
    <updated>2024-02-01T10:00:00Z</updated>
    <published>2024-02-01T09:00:00+01:00</published>
    <summary>Short &lt;i&gt;summary&lt;/i&gt;</summary>
    <content type="html">&lt;p&gt;Full&lt;/p&gt;</content>
  </entry>
</feed>"#;
        let feed = parse_feed(xml).expect("atom parses");
        assert_eq!(feed.title.as_deref(), Some("Atom Markets"));
        assert_eq!(feed.items.len(), 1);
        let e = &feed.items[0];
        assert_eq!(e.link.as_deref(), Some("https://atom.example/1"));
        assert_eq!(e.pub_date.as_deref(), Some("2024-02-01T09:00:00+01:00"));
        assert_eq!(e.iso_date.as_deref(), Some("2024-02-01T08:00:00.000Z"));
        assert_eq!(e.content_snippet.as_deref(), Some("Short summary"));
    }

    #[test]
    fn media_rss_elements_do_not_shadow_item_fields() {
        let xml = r#"<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <media:title>Channel artwork</media:title>
    <title>Wire</title>
    <item>
      <media:title>Photo caption</media:title>
      <title>Real headline</title>
      <media:description>Photo by a staff photographer</media:description>
      <media:content url="https://img.example/hero.jpg" medium="image">
        <media:credit>Staff</media:credit>
      </media:content>
      <link>https://wire.example/1</link>
      <pubDate>Tue, 02 Jan 2024 09:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;
        let feed = parse_feed(xml).expect("media rss parses");
        assert_eq!(feed.title.as_deref(), Some("Wire"));
        let it = &feed.items[0];
        assert_eq!(it.title.as_deref(), Some("Real headline"));
        assert!(it.content.is_none(), "media text is not item content: {:?}", it.content);
        assert!(it.content_snippet.is_none());
        assert_eq!(it.enclosure_url.as_deref(), Some("https://img.example/hero.jpg"));
    }

    #[test]
    fn foreign_namespace_reusing_core_names_is_ignored() {
        let xml = r#"<rss xmlns:x="urn:example:ext"><channel><title>T</title>
  <item>
    <x:link>https://ext.example/wrong</x:link>
    <x:title>wrong</x:title>
    <link>https://right.example/1</link>
    <title>right</title>
    <dc:date xmlns:dc="http://purl.org/dc/elements/1.1/">2024-01-01</dc:date>
  </item>
</channel></rss>"#;
        let feed = parse_feed(xml).expect("parses");
        let it = &feed.items[0];
        assert_eq!(it.link.as_deref(), Some("https://right.example/1"));
        assert_eq!(it.title.as_deref(), Some("right"));
        assert_eq!(it.iso_date.as_deref(), Some("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn non_feed_documents_are_rejected() {
        assert!(parse_feed("<html><body>nope</body></html>").is_err());
        assert!(parse_feed("").is_err());
    }

    #[test]
    fn broken_markup_is_an_error() {
        let xml = "<rss><channel><title>x</title><item><title>a</item></channel></rss>";
        assert!(parse_feed(xml).is_err());
    }
}
