use chrono::{DateTime, Utc};

use super::schema::Database;
use super::types::{format_db_time, DatabaseError, Feed, FeedDbRow};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a feed with an empty checkpoint, returning its store-assigned id.
    ///
    /// Returns [`DatabaseError::DuplicateFeed`] if the URL is already registered.
    pub async fn insert_feed(&self, url: &str) -> Result<i64, DatabaseError> {
        let result = sqlx::query("INSERT INTO feeds (url) VALUES (?)")
            .bind(url)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(DatabaseError::DuplicateFeed(url.to_string()))
            }
            Err(e) => Err(DatabaseError::from_sqlx(e)),
        }
    }

    /// Snapshot of every registered feed with its current checkpoint, in id order.
    pub async fn list_feeds(&self) -> Result<Vec<Feed>, DatabaseError> {
        let rows = sqlx::query_as::<_, FeedDbRow>(
            "SELECT id, url, last_checked, created_at FROM feeds ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FeedDbRow::into_feed).collect()
    }

    /// Look up a single feed by id
    pub async fn get_feed(&self, feed_id: i64) -> Result<Option<Feed>, DatabaseError> {
        let row = sqlx::query_as::<_, FeedDbRow>(
            "SELECT id, url, last_checked, created_at FROM feeds WHERE id = ?",
        )
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FeedDbRow::into_feed).transpose()
    }

    /// Write the checkpoint for a feed.
    ///
    /// A single-statement overwrite; repeating it with the same arguments
    /// leaves the row unchanged.
    pub async fn set_last_checked(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE feeds SET last_checked = ? WHERE id = ?")
            .bind(format_db_time(at))
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
