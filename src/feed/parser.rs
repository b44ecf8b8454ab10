use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use thiserror::Error;

use super::{atom, rss};
use crate::storage::{Feed, NewPost};

/// Errors produced while turning feed bytes into posts.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bytes are not well-formed XML, or do not match the dialect's shape
    #[error("XML parse error: {0}")]
    Xml(String),

    /// The document contains no root element at all
    #[error("Document has no root element")]
    MissingRoot,

    /// The root element is neither Atom `<feed>` nor RSS `<rss>`
    #[error("Unsupported feed format: root element <{0}>")]
    UnsupportedFormat(String),

    /// A single entry carried a date its dialect's grammar rejects.
    /// Never returned from [`parse_feed`]; the entry is logged and skipped.
    #[error("Unparseable date '{value}' on entry '{entry}': {source}")]
    EntryDate {
        entry: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl From<quick_xml::de::DeError> for ParseError {
    fn from(err: quick_xml::de::DeError) -> Self {
        ParseError::Xml(err.to_string())
    }
}

/// The XML dialect of a feed document, chosen by its root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Atom,
    Rss,
}

/// Element text content, tolerant of attributes (`type="html"`,
/// `isPermaLink="false"`) and CDATA sections.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Text {
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl Text {
    pub(crate) fn trimmed(text: Option<Text>) -> String {
        text.map(|t| t.value.trim().to_string()).unwrap_or_default()
    }
}

/// Identify the dialect from the name of the first element in the document.
///
/// Only the prolog and the root start tag are read; the rest of the
/// document is not validated here.
pub fn detect_format(bytes: &[u8]) -> Result<FeedFormat, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.local_name().as_ref() {
                    b"feed" => Ok(FeedFormat::Atom),
                    b"rss" => Ok(FeedFormat::Rss),
                    other => Err(ParseError::UnsupportedFormat(
                        String::from_utf8_lossy(other).into_owned(),
                    )),
                };
            }
            Ok(Event::Text(text)) if !is_blank(&text) => {
                return Err(ParseError::Xml("text before root element".to_string()));
            }
            Ok(Event::Eof) => return Err(ParseError::MissingRoot),
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            // Declaration, comments, doctype, processing instructions, whitespace
            Ok(_) => {}
        }
        buf.clear();
    }
}

/// Whitespace, or a byte order mark the reader passed through
fn is_blank(text: &[u8]) -> bool {
    text.strip_prefix(b"\xEF\xBB\xBF")
        .unwrap_or(text)
        .iter()
        .all(u8::is_ascii_whitespace)
}

/// Detect the dialect and decode every entry into a post, in document order.
pub fn parse_feed(bytes: &[u8], feed: &Feed) -> Result<Vec<NewPost>, ParseError> {
    match detect_format(bytes)? {
        FeedFormat::Atom => atom::parse(bytes, feed),
        FeedFormat::Rss => rss::parse(bytes, feed),
    }
}
