//! Atom (RFC 4287) documents.
//!
//! Only the fields a post needs are decoded: `id`, `title`, the entry link,
//! and `published` (RFC 3339).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::parser::{ParseError, Text};
use super::PostUid;
use crate::storage::{Feed, NewPost};

#[derive(Debug, Deserialize)]
struct AtomDocument {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<Text>,
    title: Option<Text>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<Text>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    /// The entry's alternate link: first `rel="alternate"` or rel-less link,
    /// otherwise whatever link comes first.
    fn alternate_link(&self) -> String {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .map(|l| l.href.trim().to_string())
            .unwrap_or_default()
    }
}

/// Decode an Atom document into posts, in document order.
///
/// Entries whose `published` value is not RFC 3339 are logged and skipped.
pub fn parse(bytes: &[u8], feed: &Feed) -> Result<Vec<NewPost>, ParseError> {
    let document: AtomDocument = quick_xml::de::from_reader(bytes)?;

    let mut posts = Vec::with_capacity(document.entries.len());
    for entry in document.entries {
        let url = entry.alternate_link();
        let native_id = match Text::trimmed(entry.id) {
            id if id.is_empty() => url.clone(),
            id => id,
        };
        let published = Text::trimmed(entry.published);

        let date = match DateTime::parse_from_rfc3339(&published) {
            Ok(date) => date.with_timezone(&Utc),
            Err(source) => {
                let err = ParseError::EntryDate {
                    entry: native_id,
                    value: published,
                    source,
                };
                tracing::warn!(feed = %feed.url, error = %err, "Skipping Atom entry");
                continue;
            }
        };

        posts.push(NewPost {
            title: Text::trimmed(entry.title),
            url,
            date,
            feed_id: feed.id,
            uid: PostUid::new(feed.id, &native_id),
        });
    }

    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_feed() -> Feed {
        Feed {
            id: 4,
            url: "https://blog.example.com/atom.xml".to_string(),
            last_checked: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    const TWO_ENTRIES: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Blog</title>
  <id>urn:example:blog</id>
  <updated>2024-01-02T10:00:00Z</updated>
  <link href="https://blog.example.com/"/>
  <entry>
    <title>Second post</title>
    <link href="https://blog.example.com/2"/>
    <id>urn:example:2</id>
    <published>2024-01-02T10:00:00Z</published>
    <updated>2024-01-02T11:00:00Z</updated>
  </entry>
  <entry>
    <title type="html">First &amp; oldest</title>
    <link href="https://blog.example.com/1"/>
    <id>urn:example:1</id>
    <published>2024-01-01T10:00:00+02:00</published>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_entries_in_document_order() {
        let posts = parse(TWO_ENTRIES.as_bytes(), &test_feed()).unwrap();
        assert_eq!(posts.len(), 2);

        assert_eq!(posts[0].title, "Second post");
        assert_eq!(posts[0].url, "https://blog.example.com/2");
        assert_eq!(posts[0].uid.as_str(), "4,urn:example:2");
        assert_eq!(posts[0].feed_id, 4);
        assert_eq!(
            posts[0].date,
            Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()
        );

        assert_eq!(posts[1].title, "First & oldest");
        // Offset normalized to UTC
        assert_eq!(
            posts[1].date,
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_bad_date_skips_only_that_entry() {
        let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><id>a</id><title>A</title><link href="https://x/a"/><published>2024-01-03T10:00:00Z</published></entry>
  <entry><id>b</id><title>B</title><link href="https://x/b"/><published>Jan 2nd, 2024</published></entry>
  <entry><id>c</id><title>C</title><link href="https://x/c"/></entry>
  <entry><id>d</id><title>D</title><link href="https://x/d"/><published>2024-01-01T10:00:00Z</published></entry>
</feed>"#;
        let posts = parse(doc.as_bytes(), &test_feed()).unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(ids, vec!["4,a", "4,d"]);
    }

    #[test]
    fn test_rfc2822_date_rejected_in_atom() {
        let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><id>a</id><title>A</title><link href="https://x/a"/><published>Tue, 02 Jan 2024 10:00:00 GMT</published></entry>
</feed>"#;
        assert!(parse(doc.as_bytes(), &test_feed()).unwrap().is_empty());
    }

    #[test]
    fn test_prefers_alternate_link() {
        let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <link rel="replies" href="https://x/a/comments"/>
    <id>a</id>
    <link rel="alternate" href="https://x/a"/>
    <title>A</title>
    <published>2024-01-03T10:00:00Z</published>
  </entry>
</feed>"#;
        let posts = parse(doc.as_bytes(), &test_feed()).unwrap();
        assert_eq!(posts[0].url, "https://x/a");
    }

    #[test]
    fn test_missing_id_falls_back_to_link() {
        let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><title>A</title><link href="https://x/a"/><published>2024-01-03T10:00:00Z</published></entry>
</feed>"#;
        let posts = parse(doc.as_bytes(), &test_feed()).unwrap();
        assert_eq!(posts[0].uid.as_str(), "4,https://x/a");
    }

    #[test]
    fn test_feed_without_entries() {
        let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>Empty</title></feed>"#;
        assert!(parse(doc.as_bytes(), &test_feed()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><id>a</entry></feed>"#;
        assert!(matches!(
            parse(doc.as_bytes(), &test_feed()),
            Err(ParseError::Xml(_))
        ));
    }
}
