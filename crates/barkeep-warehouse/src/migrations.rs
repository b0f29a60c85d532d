use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// The composite primary key declares the bar identity key unique at the
// schema level; `INSERT OR REPLACE` resolves collisions by overwriting.
// The CHECK constraints make a malformed row fail its batch instead of
// landing in the table.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_bars",
        sql: r#"
CREATE TABLE IF NOT EXISTS bars (
    code TEXT NOT NULL,
    granularity TEXT NOT NULL,
    ts TIMESTAMP NOT NULL,
    raw_ts BIGINT NOT NULL,
    open DOUBLE NOT NULL,
    high DOUBLE NOT NULL,
    low DOUBLE NOT NULL,
    close DOUBLE NOT NULL,
    volume DOUBLE NOT NULL,
    amount DOUBLE NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (code, granularity, ts),
    CHECK (high >= low),
    CHECK (open >= 0 AND high >= 0 AND low >= 0 AND close >= 0),
    CHECK (volume >= 0 AND amount >= 0)
);

CREATE TABLE IF NOT EXISTS ingest_log (
    run_id TEXT NOT NULL,
    code TEXT NOT NULL,
    granularity TEXT NOT NULL,
    status TEXT NOT NULL,
    row_count BIGINT NOT NULL,
    timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_bars_code_granularity_ts ON bars(code, granularity, ts);
CREATE INDEX IF NOT EXISTS idx_ingest_log_run ON ingest_log(run_id, timestamp);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let query = format!(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = '{}'",
            escape_sql_string(migration.version)
        );
        let applied_count: i64 = connection.query_row(query.as_str(), [], |row| row.get(0))?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            let insert = format!(
                "INSERT INTO schema_migrations (version) VALUES ('{}')",
                escape_sql_string(migration.version)
            );
            connection.execute_batch(insert.as_str())?;
        }
    }

    Ok(())
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
