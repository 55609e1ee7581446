//! Cycle driver.
//!
//! Fill and update cycles run producer and consumer on one task: the
//! synchronizer pushes events into a bounded channel while the indexer
//! drains it into batched index mutations. Only when both sides finish —
//! the stream is exhausted *and* the final flush committed — does the
//! synchronizer state advance. An error on either side aborts the cycle
//! with the state untouched; partially committed batches stay in the index
//! and are re-discovered by the next cycle over the same window.

use std::time::Instant;

use anyhow::Result;
use log::{debug, info};
use plenum_core::Event;
use plenum_fts::Indexer;
use plenum_sync::ChangeSynchronizer;
use sqlx::PgPool;
use tokio::sync::mpsc;

/// Events buffered between synchronizer and indexer.
const EVENT_CHANNEL_SIZE: usize = 256;

/// Run the initial fill and make its result visible.
pub async fn run_fill(
    sync: &mut ChangeSynchronizer,
    pool: &PgPool,
    indexer: &mut Indexer,
) -> Result<()> {
    let started = Instant::now();

    let (events_tx, events_rx) = mpsc::channel::<Event>(EVENT_CHANNEL_SIZE);
    let producer = async { sync.fill(pool, events_tx).await.map_err(anyhow::Error::from) };
    let (token, ()) = tokio::try_join!(producer, drain(events_rx, indexer))?;

    sync.commit_cycle(token);
    info!("building initial text index took {:?}", started.elapsed());
    Ok(())
}

/// Run one incremental update cycle. A cycle younger than the configured
/// minimum age is skipped silently.
pub async fn run_update(
    sync: &mut ChangeSynchronizer,
    pool: &PgPool,
    indexer: &mut Indexer,
) -> Result<()> {
    let started = Instant::now();

    let (events_tx, events_rx) = mpsc::channel::<Event>(EVENT_CHANNEL_SIZE);
    let producer = async {
        sync.update(pool, events_tx)
            .await
            .map_err(anyhow::Error::from)
    };
    let (token, ()) = tokio::try_join!(producer, drain(events_rx, indexer))?;

    if let Some(token) = token {
        let generation = token.generation();
        sync.commit_cycle(token);
        debug!(
            "update cycle committed as generation {generation}, took {:?}",
            started.elapsed()
        );
    }
    Ok(())
}

/// Drain the event stream into the indexer and flush the remainder.
async fn drain(mut events: mpsc::Receiver<Event>, indexer: &mut Indexer) -> Result<()> {
    while let Some(event) = events.recv().await {
        indexer.apply(event)?;
    }
    indexer.flush()?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
