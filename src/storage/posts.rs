use super::schema::Database;
use super::types::{format_db_time, DatabaseError, NewPost, Post, PostDbRow};

/// Upper bound on a single page (OOM protection)
const MAX_PAGE_SIZE: i64 = 500;

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Store a parsed post, returning the store-assigned id.
    ///
    /// Returns `Ok(None)` when a post with the same uid is already stored;
    /// the existing row is left untouched.
    pub async fn insert_post(&self, post: &NewPost) -> Result<Option<i64>, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO posts (title, url, feed_id, uid, date)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(uid) DO NOTHING
            RETURNING id
        "#,
        )
        .bind(&post.title)
        .bind(&post.url)
        .bind(post.feed_id)
        .bind(post.uid.as_str())
        .bind(format_db_time(post.date))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    /// One page of stored posts, newest publication date first.
    ///
    /// `limit` is clamped to `1..=500`; a negative offset is treated as 0.
    pub async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, DatabaseError> {
        let rows = sqlx::query_as::<_, PostDbRow>(
            r#"
            SELECT id, title, url, feed_id, uid, date, created_at
            FROM posts
            ORDER BY date DESC, id DESC
            LIMIT ? OFFSET ?
        "#,
        )
        .bind(limit.clamp(1, MAX_PAGE_SIZE))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PostDbRow::into_post).collect()
    }

    /// Every stored post of one feed, newest publication date first
    pub async fn list_posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let rows = sqlx::query_as::<_, PostDbRow>(
            r#"
            SELECT id, title, url, feed_id, uid, date, created_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY date DESC, id DESC
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PostDbRow::into_post).collect()
    }
}
