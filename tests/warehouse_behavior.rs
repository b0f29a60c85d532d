//! Behavior tests for the persistent bar store: windowed reads, the
//! ingest trail, and hostile input at the storage boundary.

mod support;

use barkeep_warehouse::{open_raw_connection, WarehouseError};
use support::{bar_record, open_temp_warehouse};

#[test]
fn when_user_queries_a_date_window_only_rows_inside_are_returned() {
    let (_temp, warehouse) = open_temp_warehouse();

    let rows = vec![
        bar_record("2024-05-27 16:00:00", 10.0),
        bar_record("2024-05-28 16:00:00", 11.0),
        bar_record("2024-05-29 16:00:00", 12.0),
        bar_record("2024-05-30 16:00:00", 13.0),
    ];
    warehouse.upsert_bars("run-1", &rows, 100).expect("write");

    let window = warehouse
        .query_bars(
            "515170",
            "1d",
            Some("2024-05-28 00:00:00"),
            Some("2024-05-29 23:59:59"),
        )
        .expect("query");

    let closes: Vec<f64> = window.iter().map(|row| row.close).collect();
    assert_eq!(closes, vec![11.0, 12.0]);
}

#[test]
fn latest_bar_returns_the_most_recent_row_for_the_pair() {
    let (_temp, warehouse) = open_temp_warehouse();

    let rows = vec![
        bar_record("2024-05-30 16:00:00", 13.0),
        bar_record("2024-05-28 16:00:00", 11.0),
    ];
    warehouse.upsert_bars("run-1", &rows, 100).expect("write");

    let latest = warehouse
        .latest_bar("515170", "1d")
        .expect("query")
        .expect("row present");
    assert_eq!(latest.ts, "2024-05-30 16:00:00");
    assert_eq!(latest.close, 13.0);

    assert!(warehouse
        .latest_bar("515170", "1w")
        .expect("query")
        .is_none());
}

#[test]
fn each_committed_batch_leaves_a_row_in_the_ingest_log() {
    let (_temp, warehouse) = open_temp_warehouse();

    let rows = vec![
        bar_record("2024-05-27 16:00:00", 10.0),
        bar_record("2024-05-28 16:00:00", 11.0),
        bar_record("2024-05-29 16:00:00", 12.0),
    ];
    warehouse.upsert_bars("run-42", &rows, 2).expect("write");

    let connection = open_raw_connection(warehouse.db_path()).expect("connection");
    let batches: i64 = connection
        .query_row(
            "SELECT COUNT(*) FROM ingest_log WHERE run_id = 'run-42' AND status = 'ok'",
            [],
            |row| row.get(0),
        )
        .expect("log count");
    assert_eq!(batches, 2, "3 rows at batch size 2 commit as 2 batches");
}

#[test]
fn when_a_code_carries_sql_metacharacters_it_is_stored_literally() {
    let (_temp, warehouse) = open_temp_warehouse();

    let mut row = bar_record("2024-05-29 16:00:00", 10.0);
    row.code = String::from("X'; DROP TABLE bars; --");
    warehouse
        .upsert_batch("run-1", std::slice::from_ref(&row))
        .expect("write");

    // The table survived and the hostile value round-trips verbatim.
    let stored = warehouse
        .query_bars("X'; DROP TABLE bars; --", "1d", None, None)
        .expect("query");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].code, "X'; DROP TABLE bars; --");
}

#[test]
fn zero_batch_size_is_rejected_up_front() {
    let (_temp, warehouse) = open_temp_warehouse();

    let error = warehouse
        .upsert_bars("run-1", &[bar_record("2024-05-29 16:00:00", 10.0)], 0)
        .expect_err("must be rejected");
    assert!(matches!(error, WarehouseError::WriteRejected(_)));
    assert_eq!(warehouse.count_bars("515170", "1d").expect("count"), 0);
}

#[test]
fn empty_upsert_is_a_no_op() {
    let (_temp, warehouse) = open_temp_warehouse();

    let written = warehouse.upsert_batch("run-1", &[]).expect("write");
    assert_eq!(written, 0);

    let connection = open_raw_connection(warehouse.db_path()).expect("connection");
    let logged: i64 = connection
        .query_row("SELECT COUNT(*) FROM ingest_log", [], |row| row.get(0))
        .expect("log count");
    assert_eq!(logged, 0, "no batch, no trail");
}

#[test]
fn reingesting_a_day_under_a_new_run_overwrites_in_place() {
    let (_temp, warehouse) = open_temp_warehouse();

    warehouse
        .upsert_batch("run-1", &[bar_record("2024-05-29 16:00:00", 10.0)])
        .expect("first write");
    warehouse
        .upsert_batch("run-2", &[bar_record("2024-05-29 16:00:00", 11.5)])
        .expect("second write");

    assert_eq!(warehouse.count_bars("515170", "1d").expect("count"), 1);
    let latest = warehouse
        .latest_bar("515170", "1d")
        .expect("query")
        .expect("row present");
    assert_eq!(latest.close, 11.5);
}
