use serde::Serialize;
use std::fmt;

/// Stable identity of a post: the owning feed plus the item's feed-native id.
///
/// Rendered as `"{feed_id},{native_id}"`. The feed id never contains a comma,
/// so the first comma always splits the two halves and distinct pairs never
/// render to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PostUid(String);

impl PostUid {
    pub fn new(feed_id: i64, native_id: &str) -> Self {
        Self(format!("{},{}", feed_id, native_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
