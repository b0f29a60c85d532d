//! Persistent bar store for barkeep.
//!
//! One logical row per bar identity key `(code, granularity, ts)`. Writes are
//! idempotent upserts committed in bounded transactions; reads are ordered
//! range scans. Each committed batch also appends a row to `ingest_log` so a
//! run leaves an operational trail inside the database itself.

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::Connection;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use duckdb::{AccessMode, ConnectionPool, LeasedConnection};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("batch write failed after {committed} committed rows: {source}")]
    BatchFailed {
        committed: usize,
        source: ::duckdb::Error,
    },

    #[error("write rejected: {0}")]
    WriteRejected(String),
}

impl WarehouseError {
    /// Rows durably committed before the error, when the error is partial.
    #[must_use]
    pub fn committed_rows(&self) -> usize {
        match self {
            Self::BatchFailed { committed, .. } => *committed,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub max_idle_connections: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let home = resolve_home();
        let db_path = home.join("cache").join("warehouse.duckdb");
        Self {
            home,
            db_path,
            max_idle_connections: 4,
        }
    }
}

impl WarehouseConfig {
    #[must_use]
    pub fn at_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let db_path = home.join("cache").join("warehouse.duckdb");
        Self {
            home,
            db_path,
            max_idle_connections: 4,
        }
    }
}

/// One stored bar row. Timestamps are SQL-formatted strings
/// (`YYYY-MM-DD HH:MM:SS`, UTC) at this layer; the core crate owns the
/// typed representation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarRecord {
    pub code: String,
    pub granularity: String,
    pub ts: String,
    pub raw_ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
}

#[derive(Clone)]
pub struct Warehouse {
    pool: ConnectionPool,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::new(config.db_path.clone(), config.max_idle_connections)?;
        let warehouse = Self { pool };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.pool.lease(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Upsert one batch of rows inside a single transaction.
    ///
    /// An identity-key collision overwrites the stored OHLCV fields in place.
    /// On failure the whole batch rolls back and nothing from it is visible.
    pub fn upsert_batch(&self, run_id: &str, rows: &[BarRecord]) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let connection = self.pool.lease(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), ::duckdb::Error> {
            for row in rows {
                connection.execute_batch(upsert_row_sql(row).as_str())?;
            }
            let log = format!(
                r#"
INSERT INTO ingest_log (run_id, code, granularity, status, row_count)
VALUES ('{run_id}', '{code}', '{granularity}', 'ok', {row_count});
"#,
                run_id = escape_sql_string(run_id),
                code = escape_sql_string(rows[0].code.as_str()),
                granularity = escape_sql_string(rows[0].granularity.as_str()),
                row_count = rows.len(),
            );
            connection.execute_batch(log.as_str())
        })();

        match result {
            Ok(()) => {
                connection.execute_batch("COMMIT")?;
                debug!(run_id, rows = rows.len(), "batch committed");
                Ok(rows.len())
            }
            Err(error) => {
                let _ = connection.execute_batch("ROLLBACK");
                Err(WarehouseError::DuckDb(error))
            }
        }
    }

    /// Upsert rows in transactions of `batch_size`, reporting partial success.
    ///
    /// A failure in batch N rolls back only that batch; batches 1..N-1 stay
    /// durable and the returned error carries the committed row count.
    pub fn upsert_bars(
        &self,
        run_id: &str,
        rows: &[BarRecord],
        batch_size: usize,
    ) -> Result<usize, WarehouseError> {
        if batch_size == 0 {
            return Err(WarehouseError::WriteRejected(String::from(
                "batch size must be greater than zero",
            )));
        }

        let mut committed = 0usize;
        for chunk in rows.chunks(batch_size) {
            match self.upsert_batch(run_id, chunk) {
                Ok(written) => committed += written,
                Err(WarehouseError::DuckDb(source)) => {
                    return Err(WarehouseError::BatchFailed { committed, source });
                }
                Err(other) => return Err(other),
            }
        }
        Ok(committed)
    }

    /// Ordered range read for one `(code, granularity)` pair, ascending by
    /// canonical timestamp. Bounds are inclusive SQL timestamps.
    pub fn query_bars(
        &self,
        code: &str,
        granularity: &str,
        start_ts: Option<&str>,
        end_ts: Option<&str>,
    ) -> Result<Vec<BarRecord>, WarehouseError> {
        let mut sql = format!(
            "SELECT code, granularity, CAST(ts AS VARCHAR), raw_ts, open, high, low, close, volume, amount \
             FROM bars WHERE code = '{}' AND granularity = '{}'",
            escape_sql_string(code),
            escape_sql_string(granularity),
        );
        if let Some(start) = start_ts {
            sql.push_str(
                format!(" AND ts >= TRY_CAST('{}' AS TIMESTAMP)", escape_sql_string(start)).as_str(),
            );
        }
        if let Some(end) = end_ts {
            sql.push_str(
                format!(" AND ts <= TRY_CAST('{}' AS TIMESTAMP)", escape_sql_string(end)).as_str(),
            );
        }
        sql.push_str(" ORDER BY ts ASC");

        let connection = self.pool.lease(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(sql.as_str())?;
        let mut cursor = statement.query([])?;

        let mut records = Vec::new();
        while let Some(row) = cursor.next()? {
            records.push(read_bar_row(row)?);
        }
        Ok(records)
    }

    /// Most recent stored row for a pair, if any.
    pub fn latest_bar(
        &self,
        code: &str,
        granularity: &str,
    ) -> Result<Option<BarRecord>, WarehouseError> {
        let sql = format!(
            "SELECT code, granularity, CAST(ts AS VARCHAR), raw_ts, open, high, low, close, volume, amount \
             FROM bars WHERE code = '{}' AND granularity = '{}' ORDER BY ts DESC LIMIT 1",
            escape_sql_string(code),
            escape_sql_string(granularity),
        );

        let connection = self.pool.lease(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(sql.as_str())?;
        let mut cursor = statement.query([])?;
        match cursor.next()? {
            Some(row) => Ok(Some(read_bar_row(row)?)),
            None => Ok(None),
        }
    }

    /// Total stored rows for a pair.
    pub fn count_bars(&self, code: &str, granularity: &str) -> Result<usize, WarehouseError> {
        let sql = format!(
            "SELECT COUNT(*) FROM bars WHERE code = '{}' AND granularity = '{}'",
            escape_sql_string(code),
            escape_sql_string(granularity),
        );
        let connection = self.pool.lease(AccessMode::ReadOnly)?;
        let count: i64 = connection.query_row(sql.as_str(), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn upsert_row_sql(row: &BarRecord) -> String {
    format!(
        r#"
INSERT OR REPLACE INTO bars (
    code, granularity, ts, raw_ts, open, high, low, close, volume, amount, updated_at
) VALUES (
    '{code}', '{granularity}', TRY_CAST('{ts}' AS TIMESTAMP), {raw_ts},
    {open}, {high}, {low}, {close}, {volume}, {amount}, CURRENT_TIMESTAMP
);
"#,
        code = escape_sql_string(row.code.as_str()),
        granularity = escape_sql_string(row.granularity.as_str()),
        ts = escape_sql_string(row.ts.as_str()),
        raw_ts = row.raw_ts,
        open = row.open,
        high = row.high,
        low = row.low,
        close = row.close,
        volume = row.volume,
        amount = row.amount,
    )
}

fn read_bar_row(row: &::duckdb::Row<'_>) -> Result<BarRecord, ::duckdb::Error> {
    Ok(BarRecord {
        code: row.get(0)?,
        granularity: row.get(1)?,
        ts: row.get(2)?,
        raw_ts: row.get(3)?,
        open: row.get(4)?,
        high: row.get(5)?,
        low: row.get(6)?,
        close: row.get(7)?,
        volume: row.get(8)?,
        amount: row.get(9)?,
    })
}

fn resolve_home() -> PathBuf {
    if let Some(path) = env::var_os("BARKEEP_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".barkeep");
    }

    PathBuf::from(".barkeep")
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Open a connection directly, bypassing the pool. Test and tooling hook.
pub fn open_raw_connection(path: &Path) -> Result<Connection, WarehouseError> {
    Ok(Connection::open(path)?)
}
