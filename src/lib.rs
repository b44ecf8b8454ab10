//! Feed poller: keeps a list of Atom/RSS subscriptions, polls each one on
//! a fixed interval, stores the newest post per poll, and serves feeds and
//! posts over a small JSON API.

pub mod api;
pub mod config;
pub mod feed;
pub mod scheduler;
pub mod storage;
pub mod util;
