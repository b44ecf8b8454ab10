use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::feed::PostUid;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("Database is locked by another process. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A stored timestamp did not match `YYYY-MM-DD HH:MM:SS`
    #[error("Invalid stored timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A feed with the same URL is already registered
    #[error("Feed already registered: {0}")]
    DuplicateFeed(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Timestamp Encoding
// ============================================================================

/// Text layout of every timestamp column (always UTC).
pub const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a UTC instant in the column layout, truncating sub-second precision.
pub fn format_db_time(at: DateTime<Utc>) -> String {
    at.format(DB_TIME_FORMAT).to_string()
}

/// Parse a column value written by [`format_db_time`] or SQLite's `datetime('now')`.
pub fn parse_db_time(value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    NaiveDateTime::parse_from_str(value, DB_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| DatabaseError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for feed queries (used by sqlx FromRow)
/// Converts to Feed via into_feed() once timestamps are decoded
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedDbRow {
    pub id: i64,
    pub url: String,
    pub last_checked: Option<String>,
    pub created_at: String,
}

impl FeedDbRow {
    pub(crate) fn into_feed(self) -> Result<Feed, DatabaseError> {
        Ok(Feed {
            id: self.id,
            url: self.url,
            last_checked: self.last_checked.as_deref().map(parse_db_time).transpose()?,
            created_at: parse_db_time(&self.created_at)?,
        })
    }
}

/// Internal row type for post queries
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostDbRow {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub feed_id: i64,
    pub uid: String,
    pub date: String,
    pub created_at: String,
}

impl PostDbRow {
    pub(crate) fn into_post(self) -> Result<Post, DatabaseError> {
        Ok(Post {
            id: self.id,
            title: self.title,
            url: self.url,
            feed_id: self.feed_id,
            uid: self.uid,
            date: parse_db_time(&self.date)?,
            created_at: parse_db_time(&self.created_at)?,
        })
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A polling target.
///
/// `last_checked` is the checkpoint: `None` until the first poll attempt,
/// afterwards the instant of the latest attempt that was not rate limited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub last_checked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A post produced by a parser, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub url: String,
    pub date: DateTime<Utc>,
    pub feed_id: i64,
    pub uid: PostUid,
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub feed_id: i64,
    pub uid: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_db_time_roundtrip_truncates_subseconds() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        let text = format_db_time(at);
        assert_eq!(text, "2024-01-02 10:00:00");
        assert_eq!(
            parse_db_time(&text).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_db_time_rejects_rfc3339() {
        let err = parse_db_time("2024-01-02T10:00:00Z").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidTimestamp { .. }));
    }
}
