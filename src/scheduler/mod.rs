//! The polling loop.
//!
//! One task walks the feed list forever, strictly sequentially:
//!
//! ```text
//! list_feeds ─► for each feed ─► due? ─► fetch ─► detect ─► parse ─► checkpoint ─► persist
//!                                  │        │
//!                                  │        └─ 429: checkpoint untouched, cooldown gate
//!                                  └─ not due: skip
//! ```
//!
//! Waiting is never done inline. [`Scheduler::poll_feed`] returns a
//! [`FeedOutcome`], the outcome names its [`Gate`]s, and the pass applies
//! them through a [`Clock`], so a [`VirtualClock`] can stand in during tests.

mod clock;
mod policy;
mod store;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use policy::SelectionPolicy;
pub use store::FeedStore;

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::feed::{parse_feed, FetchError, Fetcher, ParseError};
use crate::storage::{DatabaseError, Feed};

/// Why a due feed produced no posts this poll.
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl PollError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, PollError::Fetch(e) if e.is_rate_limited())
    }
}

/// Timing policy for the loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// A feed is due again once this long has passed since its checkpoint
    pub min_interval: Duration,
    /// Wait after every fetch attempt
    pub pacing: Duration,
    /// Extra loop-wide wait after a 429
    pub rate_limit_cooldown: Duration,
    /// Wait after a pass that fetched nothing
    pub idle_pause: Duration,
    /// Apply `pacing` to feeds skipped as not due as well
    pub pace_skipped: bool,
    pub selection: SelectionPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(15 * 60),
            pacing: Duration::from_secs(60),
            rate_limit_cooldown: Duration::from_secs(60),
            idle_pause: Duration::from_secs(1),
            pace_skipped: false,
            selection: SelectionPolicy::First,
        }
    }
}

/// A timed wait the loop must honor before moving on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Per-feed throughput bound
    Pacing(Duration),
    /// Loop-wide pause after a rate limit
    Cooldown(Duration),
}

impl Gate {
    pub fn duration(&self) -> Duration {
        match self {
            Gate::Pacing(d) | Gate::Cooldown(d) => *d,
        }
    }
}

/// Posts written during one successful poll.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// Posts the parser produced
    pub parsed: usize,
    /// Store ids of newly written posts
    pub saved: Vec<i64>,
    /// Selected posts whose uid was already stored
    pub already_stored: usize,
    /// Selected posts the store refused
    pub failed: usize,
}

/// Result of evaluating one feed.
#[derive(Debug)]
pub enum FeedOutcome {
    /// Checkpoint is younger than the minimum interval; nothing fetched
    NotDue,
    /// Server answered 429; checkpoint untouched
    RateLimited,
    /// Fetch, detection or parsing failed; checkpoint advanced
    Failed(PollError),
    /// Document parsed but held no usable entries; checkpoint advanced
    Empty,
    /// Checkpoint advanced and selected posts handed to the store
    Polled(PollReport),
}

impl FeedOutcome {
    /// Waits owed after this outcome, in order.
    pub fn gates(&self, config: &SchedulerConfig) -> Vec<Gate> {
        match self {
            FeedOutcome::NotDue if config.pace_skipped => vec![Gate::Pacing(config.pacing)],
            FeedOutcome::NotDue => Vec::new(),
            FeedOutcome::RateLimited => vec![
                Gate::Cooldown(config.rate_limit_cooldown),
                Gate::Pacing(config.pacing),
            ],
            _ => vec![Gate::Pacing(config.pacing)],
        }
    }
}

/// Tally of one pass over the feed list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub feeds: usize,
    pub not_due: usize,
    pub rate_limited: usize,
    pub failed: usize,
    pub empty: usize,
    pub polled: usize,
    pub saved: usize,
}

impl PassSummary {
    fn record(&mut self, outcome: &FeedOutcome) {
        self.feeds += 1;
        match outcome {
            FeedOutcome::NotDue => self.not_due += 1,
            FeedOutcome::RateLimited => self.rate_limited += 1,
            FeedOutcome::Failed(_) => self.failed += 1,
            FeedOutcome::Empty => self.empty += 1,
            FeedOutcome::Polled(report) => {
                self.polled += 1;
                self.saved += report.saved.len();
            }
        }
    }

    /// True when no feed was fetched during the pass
    pub fn idle(&self) -> bool {
        self.feeds == self.not_due
    }
}

/// `true` if the feed was never polled, or its checkpoint is at least
/// `min_interval` old. A checkpoint in the future is never due.
pub fn is_due(feed: &Feed, now: DateTime<Utc>, min_interval: Duration) -> bool {
    match feed.last_checked {
        None => true,
        Some(checked) => match (now - checked).to_std() {
            Ok(elapsed) => elapsed >= min_interval,
            Err(_) => false,
        },
    }
}

pub struct Scheduler<S, C> {
    store: S,
    fetcher: Fetcher,
    clock: C,
    config: SchedulerConfig,
}

impl<S: FeedStore, C: Clock> Scheduler<S, C> {
    pub fn new(store: S, fetcher: Fetcher, clock: C, config: SchedulerConfig) -> Self {
        Self {
            store,
            fetcher,
            clock,
            config,
        }
    }

    /// Evaluate one feed: gate on its checkpoint, fetch, parse, advance the
    /// checkpoint, and persist the posts chosen by the selection policy.
    ///
    /// Never waits on a gate itself and never returns an error; every
    /// failure is logged and folded into the outcome.
    pub async fn poll_feed(&self, feed: &Feed) -> FeedOutcome {
        if !is_due(feed, self.clock.now(), self.config.min_interval) {
            tracing::debug!(feed_id = feed.id, url = %feed.url, "Feed not due yet");
            return FeedOutcome::NotDue;
        }

        let posts = match self.fetch_and_parse(feed).await {
            Ok(posts) => posts,
            Err(error) if error.is_rate_limited() => {
                tracing::warn!(
                    feed_id = feed.id,
                    url = %feed.url,
                    cooldown_secs = self.config.rate_limit_cooldown.as_secs(),
                    "Rate limited, pausing loop"
                );
                return FeedOutcome::RateLimited;
            }
            Err(error) => {
                tracing::warn!(
                    feed_id = feed.id,
                    url = %feed.url,
                    error = %error,
                    "Failed to poll feed"
                );
                self.advance_checkpoint(feed).await;
                return FeedOutcome::Failed(error);
            }
        };

        self.advance_checkpoint(feed).await;

        if posts.is_empty() {
            tracing::debug!(feed_id = feed.id, url = %feed.url, "Feed has no entries");
            return FeedOutcome::Empty;
        }

        let mut report = PollReport {
            parsed: posts.len(),
            ..PollReport::default()
        };

        for post in self.config.selection.select(&posts) {
            match self.store.insert_post(post).await {
                Ok(Some(id)) => {
                    tracing::info!(feed_id = feed.id, post_id = id, uid = %post.uid, "Saved post");
                    report.saved.push(id);
                }
                Ok(None) => {
                    tracing::debug!(feed_id = feed.id, uid = %post.uid, "Post already stored");
                    report.already_stored += 1;
                }
                Err(e) => {
                    tracing::error!(
                        feed_id = feed.id,
                        uid = %post.uid,
                        error = %e,
                        "Failed to save post"
                    );
                    report.failed += 1;
                }
            }
        }

        FeedOutcome::Polled(report)
    }

    async fn fetch_and_parse(&self, feed: &Feed) -> Result<Vec<crate::storage::NewPost>, PollError> {
        let bytes = self.fetcher.fetch(&feed.url).await?;
        Ok(parse_feed(&bytes, feed)?)
    }

    async fn advance_checkpoint(&self, feed: &Feed) {
        if let Err(e) = self.store.set_last_checked(feed.id, self.clock.now()).await {
            tracing::error!(feed_id = feed.id, error = %e, "Failed to update checkpoint");
        }
    }

    /// One pass over a fresh feed snapshot, honoring every gate.
    ///
    /// # Errors
    ///
    /// Returns the store error if the feed list could not be loaded; no
    /// feed is evaluated in that case.
    pub async fn run_pass(&self) -> Result<PassSummary, DatabaseError> {
        let feeds = self.store.list_feeds().await?;
        let mut summary = PassSummary::default();

        for feed in &feeds {
            let outcome = self.poll_feed(feed).await;
            summary.record(&outcome);
            for gate in outcome.gates(&self.config) {
                self.clock.sleep(gate.duration()).await;
            }
        }

        // Skipped feeds already paced this pass when `pace_skipped` is on
        let paced = self.config.pace_skipped && summary.feeds > 0;
        if summary.idle() && !paced {
            self.clock.sleep(self.config.idle_pause).await;
        }

        Ok(summary)
    }

    /// Poll forever. There is no stop signal; the loop lives as long as the
    /// process.
    pub async fn run(self) {
        tracing::info!(
            min_interval_secs = self.config.min_interval.as_secs(),
            pacing_secs = self.config.pacing.as_secs(),
            cooldown_secs = self.config.rate_limit_cooldown.as_secs(),
            selection = ?self.config.selection,
            "Scheduler started"
        );

        loop {
            match self.run_pass().await {
                Ok(summary) if !summary.idle() => {
                    tracing::info!(
                        feeds = summary.feeds,
                        polled = summary.polled,
                        saved = summary.saved,
                        failed = summary.failed,
                        rate_limited = summary.rate_limited,
                        "Pass complete"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    // No backoff: the next pass starts right away
                    tracing::error!(error = %e, "Feed list unavailable, skipping pass");
                }
            }
            tokio::task::yield_now().await;
        }
    }
}

/// Run the scheduler on its own task for the life of the process.
pub fn spawn<S, C>(scheduler: Scheduler<S, C>) -> JoinHandle<()>
where
    S: FeedStore + 'static,
    C: Clock + 'static,
{
    tokio::spawn(scheduler.run())
}
