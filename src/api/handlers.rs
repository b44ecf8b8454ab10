use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::storage::{Feed, Post};
use crate::util::validate_url;

#[derive(Debug, Deserialize)]
pub struct CreateFeed {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: i64,
}

/// Raw query string values; parsed by hand so bad input is a JSON 400
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
}

/// `limit` and `offset` derived from a [`PageQuery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl PageQuery {
    pub fn resolve(&self, default_limit: u32) -> ApiResult<Page> {
        let limit = parse_positive("limit", self.limit.as_deref())?
            .unwrap_or_else(|| i64::from(default_limit.max(1)));
        let page = parse_positive("page", self.page.as_deref())?.unwrap_or(1);

        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| ApiError::bad_request("page out of range"))?;

        Ok(Page { limit, offset })
    }
}

fn parse_positive(name: &str, raw: Option<&str>) -> ApiResult<Option<i64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ApiError::bad_request(format!(
            "{} must be a positive integer",
            name
        ))),
    }
}

/// GET /feeds
pub async fn list_feeds(State(state): State<AppState>) -> ApiResult<Json<Vec<Feed>>> {
    Ok(Json(state.db.list_feeds().await?))
}

/// POST /feeds
pub async fn create_feed(
    State(state): State<AppState>,
    payload: Result<Json<CreateFeed>, JsonRejection>,
) -> ApiResult<Json<Created>> {
    let Json(payload) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let url = validate_url(&payload.url)?;

    let id = state.db.insert_feed(url.as_str()).await?;
    tracing::info!(feed_id = id, url = %url, "Registered feed");

    Ok(Json(Created { id }))
}

/// GET /posts?limit=&page=
pub async fn list_posts(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Post>>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let page = query.resolve(state.page_size)?;
    Ok(Json(state.db.list_posts(page.limit, page.offset).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<&str>, page: Option<&str>) -> PageQuery {
        PageQuery {
            limit: limit.map(String::from),
            page: page.map(String::from),
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            query(None, None).resolve(10).unwrap(),
            Page {
                limit: 10,
                offset: 0
            }
        );
    }

    #[test]
    fn test_offset_from_page() {
        assert_eq!(
            query(Some("5"), Some("3")).resolve(10).unwrap(),
            Page {
                limit: 5,
                offset: 10
            }
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (limit, page) in [
            (Some("abc"), None),
            (Some("0"), None),
            (Some("-1"), None),
            (None, Some("0")),
            (None, Some("two")),
            (Some(""), None),
        ] {
            assert!(
                matches!(
                    query(limit, page).resolve(10),
                    Err(ApiError::BadRequest(_))
                ),
                "limit={:?} page={:?} should be rejected",
                limit,
                page
            );
        }
    }

    #[test]
    fn test_overflowing_page_rejected() {
        let q = query(Some("1000"), Some(&i64::MAX.to_string()));
        assert!(matches!(q.resolve(10), Err(ApiError::BadRequest(_))));
    }
}
