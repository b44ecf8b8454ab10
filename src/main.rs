use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedpoll::api::{self, AppState};
use feedpoll::config::Config;
use feedpoll::feed::Fetcher;
use feedpoll::scheduler::{self, Scheduler, SystemClock};
use feedpoll::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(
    name = "feedpoll",
    version,
    about = "Polls Atom/RSS feeds and serves the stored posts as JSON"
)]
struct Args {
    /// Config file (missing file means defaults)
    #[arg(long, value_name = "FILE", default_value = "./feedpoll.toml")]
    config: PathBuf,

    /// SQLite database path, overrides `database_path`
    #[arg(long, value_name = "FILE")]
    database: Option<String>,

    /// Bind address for the API, overrides `listen_addr`
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Run the poller without the HTTP API
    #[arg(long)]
    no_api: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config.display()))?;
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    let db = match Database::open(&config.database_path).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            anyhow::bail!(
                "Database '{}' is locked by another process",
                config.database_path
            );
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Failed to open database '{}'", config.database_path)
            });
        }
    };
    tracing::info!(path = %config.database_path, "Database ready");

    let fetcher =
        Fetcher::new(config.poll.request_timeout()).context("Failed to build HTTP client")?;
    let poller = scheduler::spawn(Scheduler::new(
        db.clone(),
        fetcher,
        SystemClock,
        config.poll.scheduler_config(),
    ));

    if args.no_api {
        poller.await.context("Scheduler task ended unexpectedly")?;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    let state = AppState {
        db,
        page_size: config.page_size,
    };
    api::serve(listener, state)
        .await
        .context("API server failed")?;

    Ok(())
}
