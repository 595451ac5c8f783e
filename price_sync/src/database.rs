//! Database operations for the prices table
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Every store call opens its own connection, so concurrent requests never
//! share a handle; SQLite's own locking serializes writers.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::{IdStrategy, BUSY_TIMEOUT};
use crate::error::{PriceError, Result};
use crate::models::{PriceRecord, StatsSummary, StoredPrice};

/// Persistence boundary for price records.
///
/// The pipelines only talk to this trait, so tests can swap in a double.
pub trait PriceStore: Send + Sync {
    /// Primary key strategy this store was configured with
    fn id_strategy(&self) -> IdStrategy;

    /// Create the prices table if it does not exist yet
    fn create_schema_if_absent(&self) -> Result<()>;

    /// Insert all records inside one transaction.
    ///
    /// A record the database refuses is logged and skipped; only a failed
    /// begin or commit fails the batch.
    fn insert_batch(&self, records: &[PriceRecord]) -> Result<BatchOutcome>;

    /// Every row ordered by id. Any undecodable row fails the whole read.
    ///
    /// Natural ids are TEXT and sort lexicographically (`"10"` before `"2"`).
    fn read_all(&self) -> Result<Vec<StoredPrice>>;

    /// Whole-table statistics.
    ///
    /// These are cumulative over the table, not just the last batch, so they
    /// stay correct under concurrent imports and ignored duplicates.
    fn aggregate_stats(&self) -> Result<StatsSummary>;
}

/// Result of a batch insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows actually written
    pub inserted: usize,
    /// Rows ignored because their id already existed (natural ids only)
    pub duplicates: usize,
    /// Rows the database refused (bad date, negative price, empty name, ...)
    pub rejected: usize,
}

/// SQLite-backed [`PriceStore`]
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    id_strategy: IdStrategy,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>, id_strategy: IdStrategy) -> Self {
        Self {
            path: path.into(),
            id_strategy,
        }
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check that the database can be opened and answers a query
    pub fn ping(&self) -> Result<()> {
        let conn = self.open()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn schema_sql(&self) -> &'static str {
        // price holds integer cents; create_date must already be YYYY-MM-DD
        match self.id_strategy {
            IdStrategy::Generated => {
                "CREATE TABLE IF NOT EXISTS prices (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL CHECK (name <> ''),
                    category TEXT NOT NULL CHECK (category <> ''),
                    price INTEGER NOT NULL CHECK (price >= 0),
                    create_date TEXT NOT NULL CHECK (date(create_date) IS create_date)
                );"
            }
            IdStrategy::Natural => {
                "CREATE TABLE IF NOT EXISTS prices (
                    id TEXT PRIMARY KEY NOT NULL,
                    name TEXT NOT NULL CHECK (name <> ''),
                    category TEXT NOT NULL CHECK (category <> ''),
                    price INTEGER NOT NULL CHECK (price >= 0),
                    create_date TEXT NOT NULL CHECK (date(create_date) IS create_date)
                );"
            }
        }
    }

    /// Declared type of the `id` column for this strategy
    fn id_column_type(&self) -> &'static str {
        match self.id_strategy {
            IdStrategy::Generated => "INTEGER",
            IdStrategy::Natural => "TEXT",
        }
    }

    /// Fail if an existing table was created under the other id strategy
    fn check_id_column(&self, conn: &Connection) -> Result<()> {
        let declared: Option<String> = conn
            .query_row(
                "SELECT type FROM pragma_table_info('prices') WHERE name = 'id'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let expected = self.id_column_type();
        match declared {
            Some(found) if found.eq_ignore_ascii_case(expected) => Ok(()),
            found => Err(PriceError::SchemaMismatch {
                strategy: self.id_strategy,
                expected,
                found: found.unwrap_or_else(|| "no id column".to_string()),
            }),
        }
    }

    fn insert_batch_tx(
        &self,
        tx: &Transaction<'_>,
        records: &[PriceRecord],
    ) -> Result<BatchOutcome> {
        let sql = match self.id_strategy {
            IdStrategy::Generated => {
                "INSERT INTO prices (name, category, price, create_date)
                 VALUES (?1, ?2, ?3, ?4)"
            }
            IdStrategy::Natural => {
                "INSERT INTO prices (name, category, price, create_date, id)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO NOTHING"
            }
        };
        let mut stmt = tx.prepare_cached(sql)?;

        let mut outcome = BatchOutcome::default();
        for record in records {
            let Some(cents) = to_cents(record.price) else {
                log::warn!("Rejected row {}: price {} out of range", record.id, record.price);
                outcome.rejected += 1;
                continue;
            };
            let Some(date) = parse_create_date(&record.create_date) else {
                log::warn!("Rejected row {}: invalid date '{}'", record.id, record.create_date);
                outcome.rejected += 1;
                continue;
            };

            let result = match self.id_strategy {
                IdStrategy::Generated => {
                    stmt.execute(params![&record.name, &record.category, cents, date])
                }
                IdStrategy::Natural => stmt.execute(params![
                    &record.name,
                    &record.category,
                    cents,
                    date,
                    &record.id
                ]),
            };

            match result {
                Ok(0) => {
                    log::debug!("Ignored duplicate id {}", record.id);
                    outcome.duplicates += 1;
                }
                Ok(_) => outcome.inserted += 1,
                Err(e) => {
                    log::warn!("Rejected row {}: {}", record.id, e);
                    outcome.rejected += 1;
                }
            }
        }

        Ok(outcome)
    }
}

impl PriceStore for SqliteStore {
    fn id_strategy(&self) -> IdStrategy {
        self.id_strategy
    }

    fn create_schema_if_absent(&self) -> Result<()> {
        let conn = self.open()?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch(self.schema_sql())?;
        self.check_id_column(&conn)?;

        log::info!(
            "Database schema initialized (id strategy: {}, journal: {})",
            self.id_strategy,
            mode
        );
        Ok(())
    }

    fn insert_batch(&self, records: &[PriceRecord]) -> Result<BatchOutcome> {
        let mut conn = self.open()?;
        // take the write lock up front so a concurrent import waits instead of failing mid-batch
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = self.insert_batch_tx(&tx, records)?;
        tx.commit()?;

        log::info!(
            "Inserted {} rows ({} duplicates ignored, {} rejected)",
            outcome.inserted,
            outcome.duplicates,
            outcome.rejected
        );
        Ok(outcome)
    }

    fn read_all(&self) -> Result<Vec<StoredPrice>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT CAST(id AS TEXT), name, category, price, create_date
             FROM prices
             ORDER BY id ASC",
        )?;

        let prices: rusqlite::Result<Vec<StoredPrice>> = stmt
            .query_map([], |row| {
                Ok(StoredPrice {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                    price_cents: row.get(3)?,
                    create_date: row.get(4)?,
                })
            })?
            .collect();

        prices.map_err(|e| match e {
            e @ (rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)) => PriceError::CorruptRow(e.to_string()),
            e => PriceError::Database(e),
        })
    }

    fn aggregate_stats(&self) -> Result<StatsSummary> {
        let conn = self.open()?;
        let (items, categories, cents): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT category), COALESCE(SUM(price), 0) FROM prices",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(StatsSummary::from_cents(items, categories, cents))
    }
}

/// Round to the column's two-digit precision (half away from zero) and scale to cents
fn to_cents(price: Decimal) -> Option<i64> {
    price
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_i64()
}

/// Accept a plain date, or a timestamp whose date part is kept
fn parse_create_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
#[path = "database_tests.rs"]
mod tests;
