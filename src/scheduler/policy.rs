use serde::Deserialize;

use crate::storage::NewPost;

/// Which of a poll's parsed posts get persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Only the first post in document order. Feeds conventionally list
    /// their newest item first; anything else published since the previous
    /// poll is not stored.
    #[default]
    First,
    /// Every parsed post; the store drops uids it already holds.
    AllUnseen,
}

impl SelectionPolicy {
    pub fn select<'a>(&self, posts: &'a [NewPost]) -> &'a [NewPost] {
        match self {
            SelectionPolicy::First => &posts[..posts.len().min(1)],
            SelectionPolicy::AllUnseen => posts,
        }
    }
}
