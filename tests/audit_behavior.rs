//! Behavior tests for the data-quality auditor's corruption signatures.

mod support;

use barkeep_core::{AnomalyKind, AuditConfig, Auditor, Granularity};
use support::{bar_record, instrument, open_temp_warehouse};
use time::macros::date;

/// Config with every rule but the one under test effectively disabled.
fn only_rule(kind: AnomalyKind) -> AuditConfig {
    let mut config = AuditConfig {
        price_jump_pct: f64::MAX,
        normalized_share: 2.0,
        duplicate_share: 2.0,
    };
    match kind {
        AnomalyKind::PriceJump => config.price_jump_pct = 5.0,
        AnomalyKind::NormalizationSuspect => config.normalized_share = 0.5,
        AnomalyKind::DuplicateValueGlut => config.duplicate_share = 0.5,
        AnomalyKind::EpochUnderflow => {}
    }
    config
}

#[test]
fn bars_dated_before_2000_are_flagged_as_epoch_underflow() {
    let (_temp, warehouse) = open_temp_warehouse();
    warehouse
        .upsert_bars(
            "run-1",
            &[
                bar_record("1995-01-03 16:00:00", 10.0),
                bar_record("2024-05-29 16:00:00", 10.2),
            ],
            100,
        )
        .expect("write");

    let auditor = Auditor::with_config(warehouse, only_rule(AnomalyKind::EpochUnderflow));
    let anomalies = auditor
        .audit(&instrument("515170"), Granularity::Day, None, None)
        .expect("audit");

    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].kind, AnomalyKind::EpochUnderflow);
    assert_eq!(anomalies[0].magnitude, 1995.0);
    assert_eq!(
        anomalies[0].ts.expect("row-level finding").format_sql(),
        "1995-01-03 16:00:00"
    );
}

#[test]
fn a_close_to_close_jump_above_the_threshold_is_flagged() {
    let (_temp, warehouse) = open_temp_warehouse();
    warehouse
        .upsert_bars(
            "run-1",
            &[
                bar_record("2024-05-27 16:00:00", 10.0),
                bar_record("2024-05-28 16:00:00", 10.2),
                bar_record("2024-05-29 16:00:00", 20.0),
            ],
            100,
        )
        .expect("write");

    let auditor = Auditor::with_config(warehouse, only_rule(AnomalyKind::PriceJump));
    let anomalies = auditor
        .audit(&instrument("515170"), Granularity::Day, None, None)
        .expect("audit");

    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].kind, AnomalyKind::PriceJump);
    assert!(anomalies[0].magnitude > 90.0, "10.2 -> 20.0 is a ~96% move");
    assert_eq!(
        anomalies[0].ts.expect("row-level finding").format_sql(),
        "2024-05-29 16:00:00"
    );
}

#[test]
fn a_series_glued_to_its_first_close_looks_like_normalized_data() {
    let (_temp, warehouse) = open_temp_warehouse();
    let rows: Vec<_> = (0..10)
        .map(|day| {
            bar_record(
                format!("2024-05-{:02} 16:00:00", day + 1).as_str(),
                100.0 + f64::from(day) * 0.1,
            )
        })
        .collect();
    warehouse.upsert_bars("run-1", &rows, 100).expect("write");

    let auditor = Auditor::with_config(warehouse, only_rule(AnomalyKind::NormalizationSuspect));
    let anomalies = auditor
        .audit(&instrument("515170"), Granularity::Day, None, None)
        .expect("audit");

    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].kind, AnomalyKind::NormalizationSuspect);
    assert!(anomalies[0].ts.is_none(), "whole-series finding");
    assert_eq!(anomalies[0].magnitude, 100.0);
}

#[test]
fn sixty_percent_of_closes_in_the_first_close_band_crosses_the_threshold() {
    let (_temp, warehouse) = open_temp_warehouse();
    // 6 of 10 closes within ±10% of the first close; the rest far outside.
    let closes = [100.0, 102.0, 104.0, 106.0, 108.0, 95.0, 150.0, 200.0, 250.0, 300.0];
    let rows: Vec<_> = closes
        .iter()
        .enumerate()
        .map(|(day, close)| {
            bar_record(format!("2024-05-{:02} 16:00:00", day + 1).as_str(), *close)
        })
        .collect();
    warehouse.upsert_bars("run-1", &rows, 100).expect("write");

    let auditor = Auditor::with_config(warehouse, only_rule(AnomalyKind::NormalizationSuspect));
    let anomalies = auditor
        .audit(&instrument("515170"), Granularity::Day, None, None)
        .expect("audit");

    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].kind, AnomalyKind::NormalizationSuspect);
    assert!((anomalies[0].magnitude - 60.0).abs() < 1e-9, "6 of 10 rows");
}

#[test]
fn a_single_repeated_close_dominating_the_series_is_a_value_glut() {
    let (_temp, warehouse) = open_temp_warehouse();
    let closes = [100.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 200.0, 300.0, 400.0];
    let rows: Vec<_> = closes
        .iter()
        .enumerate()
        .map(|(day, close)| {
            bar_record(format!("2024-05-{:02} 16:00:00", day + 1).as_str(), *close)
        })
        .collect();
    warehouse.upsert_bars("run-1", &rows, 100).expect("write");

    let auditor = Auditor::with_config(warehouse, only_rule(AnomalyKind::DuplicateValueGlut));
    let anomalies = auditor
        .audit(&instrument("515170"), Granularity::Day, None, None)
        .expect("audit");

    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].kind, AnomalyKind::DuplicateValueGlut);
    assert!((anomalies[0].magnitude - 60.0).abs() < 1e-9, "6 of 10 rows");
}

#[test]
fn a_clean_trending_series_produces_no_findings() {
    let (_temp, warehouse) = open_temp_warehouse();
    let rows: Vec<_> = (0..20)
        .map(|day| {
            bar_record(
                format!("2024-05-{:02} 16:00:00", day + 1).as_str(),
                10.0 * 1.04_f64.powi(day),
            )
        })
        .collect();
    warehouse.upsert_bars("run-1", &rows, 100).expect("write");

    let auditor = Auditor::new(warehouse);
    let anomalies = auditor
        .audit(&instrument("515170"), Granularity::Day, None, None)
        .expect("audit");

    assert!(anomalies.is_empty(), "got: {anomalies:?}");
}

#[test]
fn rules_fire_independently_on_the_same_series() {
    let (_temp, warehouse) = open_temp_warehouse();
    // A perfectly flat series trips both whole-series rules at once.
    let rows: Vec<_> = (0..4)
        .map(|day| bar_record(format!("2024-05-{:02} 16:00:00", day + 1).as_str(), 10.0))
        .collect();
    warehouse.upsert_bars("run-1", &rows, 100).expect("write");

    let auditor = Auditor::new(warehouse);
    let anomalies = auditor
        .audit(&instrument("515170"), Granularity::Day, None, None)
        .expect("audit");

    let kinds: Vec<AnomalyKind> = anomalies.iter().map(|anomaly| anomaly.kind).collect();
    assert!(kinds.contains(&AnomalyKind::NormalizationSuspect));
    assert!(kinds.contains(&AnomalyKind::DuplicateValueGlut));
}

#[test]
fn the_audit_window_bounds_which_rows_are_examined() {
    let (_temp, warehouse) = open_temp_warehouse();
    warehouse
        .upsert_bars(
            "run-1",
            &[
                bar_record("1995-01-03 16:00:00", 10.0),
                bar_record("2024-05-29 16:00:00", 10.2),
            ],
            100,
        )
        .expect("write");

    let auditor = Auditor::with_config(warehouse, only_rule(AnomalyKind::EpochUnderflow));
    let windowed = auditor
        .audit(
            &instrument("515170"),
            Granularity::Day,
            Some(date!(2024 - 05 - 01)),
            Some(date!(2024 - 05 - 31)),
        )
        .expect("audit");

    assert!(windowed.is_empty(), "the 1995 row sits outside the window");
}
