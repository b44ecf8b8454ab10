//! Read/register HTTP surface over the store.
//!
//! | Route | |
//! |---|---|
//! | `GET /feeds` | every registered feed with its checkpoint |
//! | `POST /feeds` | register `{"url": ...}`, returns `{"id": n}` |
//! | `GET /posts?limit=&page=` | stored posts, newest first |

mod error;
mod handlers;

pub use error::{ApiError, ApiResult};
pub use handlers::{Page, PageQuery};

use axum::{routing::get, Router};
use tokio::net::TcpListener;

use crate::storage::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Default `limit` for `GET /posts`
    pub page_size: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/feeds",
            get(handlers::list_feeds).post(handlers::create_feed),
        )
        .route("/posts", get(handlers::list_posts))
        .with_state(state)
}

/// Serve the API on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "API listening");
    }
    axum::serve(listener, router(state).into_make_service()).await
}
