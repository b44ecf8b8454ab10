//! RSS 2.0 documents.
//!
//! Items carry `pubDate` in the RFC 2822 (email) date grammar, unlike
//! Atom's RFC 3339.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::parser::{ParseError, Text};
use super::PostUid;
use crate::storage::{Feed, NewPost};

#[derive(Debug, Deserialize)]
struct RssDocument {
    #[serde(default)]
    channel: RssChannel,
}

#[derive(Debug, Default, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<Text>,
    link: Option<Text>,
    guid: Option<Text>,
    #[serde(rename = "pubDate")]
    pub_date: Option<Text>,
}

/// Decode an RSS document into posts, in document order.
///
/// Items whose `pubDate` is not RFC 2822 are logged and skipped. An item
/// without a `guid` is identified by its link.
pub fn parse(bytes: &[u8], feed: &Feed) -> Result<Vec<NewPost>, ParseError> {
    let document: RssDocument = quick_xml::de::from_reader(bytes)?;

    let mut posts = Vec::with_capacity(document.channel.items.len());
    for item in document.channel.items {
        let url = Text::trimmed(item.link);
        let native_id = match Text::trimmed(item.guid) {
            guid if guid.is_empty() => url.clone(),
            guid => guid,
        };
        let pub_date = Text::trimmed(item.pub_date);

        let date = match DateTime::parse_from_rfc2822(&pub_date) {
            Ok(date) => date.with_timezone(&Utc),
            Err(source) => {
                let err = ParseError::EntryDate {
                    entry: native_id,
                    value: pub_date,
                    source,
                };
                tracing::warn!(feed = %feed.url, error = %err, "Skipping RSS item");
                continue;
            }
        };

        posts.push(NewPost {
            title: Text::trimmed(item.title),
            url,
            date,
            feed_id: feed.id,
            uid: PostUid::new(feed.id, &native_id),
        });
    }

    Ok(posts)
}
