mod feeds;
mod posts;
mod schema;
mod types;

pub use schema::Database;
pub use types::{
    format_db_time, parse_db_time, DatabaseError, Feed, NewPost, Post, DB_TIME_FORMAT,
};
