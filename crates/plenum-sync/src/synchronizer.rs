//! Fill and update cycles over the source store.

use chrono::{DateTime, Duration, Utc};
use futures::TryStreamExt;
use log::{debug, info, warn};
use sqlx::{Column, PgPool, Row};
use tokio::sync::mpsc;

use plenum_core::{fqid, Event};

use crate::error::{Error, Result};
use crate::row;

/// Suffix carried by source tables; stripped to obtain the collection name.
const TABLE_SUFFIX: &str = "_t";

const SELECT_TABLE_NAMES: &str = "\
SELECT
    tablename
FROM
    pg_tables
WHERE
    schemaname = 'public'";

const SELECT_LATEST_CHANGES: &str = "\
SELECT DISTINCT ON (fqid)
    fqid,
    operation
FROM
    notify_log_t
WHERE
    timestamp >= $1
ORDER BY fqid, timestamp DESC";

/// Receipt for a cycle that ran to the end of its event stream.
///
/// The driver hands it back via [`ChangeSynchronizer::commit_cycle`] once the
/// indexer has flushed; only then do `last` and `generation` advance. A token
/// that is dropped instead leaves the state untouched and the next cycle
/// retries the same window.
#[derive(Debug)]
pub struct CycleToken {
    start: DateTime<Utc>,
    generation: u16,
}

impl CycleToken {
    /// Start time of the cycle; becomes the next high-water mark.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Generation the cycle ran as.
    pub fn generation(&self) -> u16 {
        self.generation
    }
}

/// Walks the change-log and the source tables, emitting index events.
#[derive(Debug)]
pub struct ChangeSynchronizer {
    last: Option<DateTime<Utc>>,
    generation: u16,
    min_age: Duration,
}

impl ChangeSynchronizer {
    /// Create a synchronizer with the given minimum age between update
    /// cycles.
    pub fn new(min_age: std::time::Duration) -> Self {
        Self {
            last: None,
            generation: 0,
            min_age: Duration::from_std(min_age).unwrap_or_else(|_| Duration::zero()),
        }
    }

    /// High-water mark of the last successful cycle.
    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.last
    }

    /// Generation of the last successful update cycle.
    pub fn generation(&self) -> u16 {
        self.generation
    }

    /// Advance the cycle state. Call only after the emitted events were
    /// flushed to the index.
    pub fn commit_cycle(&mut self, token: CycleToken) {
        self.last = Some(token.start);
        self.generation = token.generation;
    }

    /// Stream every row of every source table as `Added` events.
    ///
    /// Tables without an integer `id` column are skipped with a warning.
    /// Tables whose name does not resolve to a model collection still
    /// stream; the indexer drops their events.
    pub async fn fill(&self, pool: &PgPool, events: mpsc::Sender<Event>) -> Result<CycleToken> {
        let start = Utc::now();

        let tables: Vec<String> = sqlx::query_scalar(SELECT_TABLE_NAMES).fetch_all(pool).await?;
        let mut total = 0usize;

        for table in &tables {
            let collection = table.strip_suffix(TABLE_SUFFIX).unwrap_or(table);
            let sql = format!("SELECT * FROM {table}");
            let mut rows = sqlx::query(&sql).fetch(pool);

            while let Some(db_row) = rows.try_next().await? {
                if !db_row.columns().iter().any(|c| c.name() == "id") {
                    warn!("table {table} skipped, no id column found");
                    break;
                }
                let id: i32 = match db_row.try_get("id") {
                    Ok(id) => id,
                    Err(err) => {
                        warn!("table {table} skipped, id column is not an integer: {err}");
                        break;
                    }
                };

                send(
                    &events,
                    Event::Added {
                        collection: collection.to_string(),
                        id,
                        row: row::to_row_map(&db_row),
                    },
                )
                .await?;
                total += 1;
            }
        }

        info!("initial fill emitted {total} rows from {} tables", tables.len());

        Ok(CycleToken {
            start,
            generation: self.generation,
        })
    }

    /// Emit events for the change-log window since the last cycle.
    ///
    /// Returns `Ok(None)` without touching the database when the last cycle
    /// is younger than the configured minimum age.
    pub async fn update(
        &self,
        pool: &PgPool,
        events: mpsc::Sender<Event>,
    ) -> Result<Option<CycleToken>> {
        let start = Utc::now();

        if !due(self.last, self.min_age, start) {
            debug!("skipping update cycle, last one is young enough");
            return Ok(None);
        }

        let since = self.last.unwrap_or(DateTime::UNIX_EPOCH);
        let changes = sqlx::query(SELECT_LATEST_CHANGES)
            .bind(since)
            .fetch_all(pool)
            .await?;

        let (mut added, mut changed, mut removed) = (0usize, 0usize, 0usize);

        for change in &changes {
            let fqid: String = change.try_get("fqid")?;
            let operation: String = change.try_get("operation")?;
            let (collection, id) = fqid::split(&fqid)?;

            if operation == "delete" {
                send(
                    &events,
                    Event::Removed {
                        collection: collection.to_string(),
                        id,
                    },
                )
                .await?;
                removed += 1;
                continue;
            }

            // The log only says *what* changed; the table holds current
            // truth. A row that vanished in the meantime is dropped here and
            // rediscovered by a later window if it comes back.
            let sql = format!("SELECT * FROM {collection}{TABLE_SUFFIX} WHERE id = $1");
            let Some(db_row) = sqlx::query(&sql).bind(id).fetch_optional(pool).await? else {
                debug!("row {fqid} not found, dropping the change");
                continue;
            };
            let data = row::to_row_map(&db_row);

            match operation.as_str() {
                "insert" => {
                    send(
                        &events,
                        Event::Added {
                            collection: collection.to_string(),
                            id,
                            row: data,
                        },
                    )
                    .await?;
                    added += 1;
                }
                "update" => {
                    send(
                        &events,
                        Event::Changed {
                            collection: collection.to_string(),
                            id,
                            row: data,
                        },
                    )
                    .await?;
                    changed += 1;
                }
                other => {
                    warn!("change-log entry {fqid} carries unknown operation {other:?}");
                }
            }
        }

        debug!(
            "update cycle over {} entries: {added} added / {changed} changed / {removed} removed",
            changes.len()
        );

        Ok(Some(CycleToken {
            start,
            generation: self.generation.wrapping_add(1),
        }))
    }
}

async fn send(events: &mpsc::Sender<Event>, event: Event) -> Result<()> {
    events.send(event).await.map_err(|_| Error::ChannelClosed)
}

/// Whether an update cycle is due at `now`.
fn due(last: Option<DateTime<Utc>>, min_age: Duration, now: DateTime<Utc>) -> bool {
    match last {
        None => true,
        Some(last) => now > last + min_age,
    }
}

// ============================================================================
// Tests
// ============================================================================
