#![forbid(unsafe_code)]

//! The plenum search service.
//!
//! Startup sequence: load configuration and the collection model, connect to
//! the source database, rebuild the text index with a full fill, then serve
//! searches over HTTP while periodically applying change-log updates. On
//! shutdown the index directory is removed; nothing but the source database
//! survives a restart.

mod config;
mod runner;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing_subscriber::filter::LevelFilter;

use plenum_core::CollectionModel;
use plenum_fts::{Indexer, TextIndex};
use plenum_sync::ChangeSynchronizer;

use crate::config::Config;

/// Full-text search over an assembly database.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        })
        .init();

    let cfg = Config::load(args.config.as_deref())?;

    let model = CollectionModel::from_path(&cfg.models.search)
        .with_context(|| format!("loading collection model from {:?}", cfg.models.search))?;
    info!("collection model declares {} collections", model.len());
    let model = Arc::new(model);

    let pool = connect(&cfg).await.context("connecting to the database")?;

    let index = TextIndex::create(&cfg.index.file, &model)
        .with_context(|| format!("creating index at {:?}", cfg.index.file))?;
    let mut indexer = Indexer::new(index, Arc::clone(&model), cfg.index.batch);
    let mut sync = ChangeSynchronizer::new(Duration::from_secs(cfg.index.age));

    runner::run_fill(&mut sync, &pool, &mut indexer)
        .await
        .context("initial fill")?;

    let app = plenum_api::create_router(Arc::new(indexer.searcher()));
    let listener = tokio::net::TcpListener::bind(&cfg.http.listen)
        .await
        .with_context(|| format!("binding {:?}", cfg.http.listen))?;
    info!("listening on {}", cfg.http.listen);
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.index.age.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = runner::run_update(&mut sync, &pool, &mut indexer).await {
                    error!("update cycle failed, retrying the same window next tick: {err:#}");
                }
            }
            _ = shutdown_signal() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    server.abort();
    indexer.close().context("tearing down the index")?;
    info!("index removed, shutting down");
    Ok(())
}

async fn connect(cfg: &Config) -> Result<PgPool> {
    // The statement cache is disabled for compatibility with
    // transaction-pooling proxies in front of the database.
    let options = PgConnectOptions::from_str(&cfg.database_url())?.statement_cache_capacity(0);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
