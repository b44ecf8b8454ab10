use chrono::{DateTime, Utc};
use std::future::Future;

use crate::storage::{Database, DatabaseError, Feed, NewPost};

/// What the scheduler needs from persistence: a feed snapshot, a
/// checkpoint writer, and a post writer.
pub trait FeedStore: Send + Sync {
    /// Every registered feed with its current checkpoint, in polling order
    fn list_feeds(&self) -> impl Future<Output = Result<Vec<Feed>, DatabaseError>> + Send;

    /// Overwrite a feed's checkpoint. Must be safe to repeat.
    fn set_last_checked(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send;

    /// Store one post; `Ok(None)` if its uid is already stored
    fn insert_post(
        &self,
        post: &NewPost,
    ) -> impl Future<Output = Result<Option<i64>, DatabaseError>> + Send;
}

impl FeedStore for Database {
    fn list_feeds(&self) -> impl Future<Output = Result<Vec<Feed>, DatabaseError>> + Send {
        Database::list_feeds(self)
    }

    fn set_last_checked(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send {
        Database::set_last_checked(self, feed_id, at)
    }

    fn insert_post(
        &self,
        post: &NewPost,
    ) -> impl Future<Output = Result<Option<i64>, DatabaseError>> + Send {
        Database::insert_post(self, post)
    }
}

impl<S: FeedStore> FeedStore for std::sync::Arc<S> {
    fn list_feeds(&self) -> impl Future<Output = Result<Vec<Feed>, DatabaseError>> + Send {
        (**self).list_feeds()
    }

    fn set_last_checked(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send {
        (**self).set_last_checked(feed_id, at)
    }

    fn insert_post(
        &self,
        post: &NewPost,
    ) -> impl Future<Output = Result<Option<i64>, DatabaseError>> + Send {
        (**self).insert_post(post)
    }
}
