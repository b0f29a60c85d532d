//! Shared fixtures for the behavior suites: a scripted provider gateway,
//! raw-row builders, and warehouse helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use barkeep_core::{
    BarRecord, FetchRange, Granularity, InstrumentCode, ProviderError, ProviderGateway, RawBar,
    Warehouse, WarehouseConfig,
};
use tempfile::{tempdir, TempDir};
use time::Date;

/// 2024-05-29 16:00:00 UTC, in provider milliseconds.
pub const BASE_MS: i64 = 1_716_998_400_000;

pub const DAY_MS: i64 = 86_400_000;

/// Millisecond timestamp `days` whole days after [`BASE_MS`].
pub fn day_offset_ms(days: i64) -> i64 {
    BASE_MS + days * DAY_MS
}

pub fn instrument(code: &str) -> InstrumentCode {
    InstrumentCode::parse(code).expect("test instrument code")
}

pub fn raw_bar(raw_ts: i64, close: f64) -> RawBar {
    RawBar {
        raw_ts,
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 1_000.0,
        amount: 10_000.0,
    }
}

pub fn bar_record(ts: &str, close: f64) -> BarRecord {
    BarRecord {
        code: String::from("515170"),
        granularity: String::from("1d"),
        ts: ts.to_owned(),
        raw_ts: BASE_MS,
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 1_000.0,
        amount: 10_000.0,
    }
}

pub fn open_temp_warehouse() -> (TempDir, Warehouse) {
    let temp = tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig::at_home(temp.path())).expect("warehouse open");
    (temp, warehouse)
}

/// Scripted in-memory provider.
///
/// Records every call in order, tracks how many backfills run at once, and
/// can inject outages.
#[derive(Default)]
pub struct MockGateway {
    listings: Mutex<HashMap<String, Date>>,
    rows: Mutex<HashMap<(String, String), Vec<RawBar>>>,
    calls: Mutex<Vec<String>>,
    active_backfills: AtomicUsize,
    peak_backfills: AtomicUsize,
    backfill_hold: Option<Duration>,
    fail_backfills: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep each backfill in flight for `hold`, so overlap is observable.
    pub fn with_backfill_hold(hold: Duration) -> Self {
        Self {
            backfill_hold: Some(hold),
            ..Self::default()
        }
    }

    pub fn add_listing(&self, code: &str, date: Date) {
        self.listings
            .lock()
            .expect("listings mutex")
            .insert(code.to_owned(), date);
    }

    pub fn add_rows(&self, code: &str, granularity: Granularity, rows: Vec<RawBar>) {
        self.rows
            .lock()
            .expect("rows mutex")
            .insert((code.to_owned(), granularity.as_str().to_owned()), rows);
    }

    pub fn fail_backfills(&self) {
        self.fail_backfills.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| *call == name).count()
    }

    pub fn peak_backfill_concurrency(&self) -> usize {
        self.peak_backfills.load(Ordering::SeqCst)
    }

    fn record(&self, name: &str) {
        self.calls
            .lock()
            .expect("calls mutex")
            .push(name.to_owned());
    }
}

impl ProviderGateway for MockGateway {
    fn listing_date(&self, code: &InstrumentCode) -> Result<Date, ProviderError> {
        self.record("listing_date");
        self.listings
            .lock()
            .expect("listings mutex")
            .get(code.as_str())
            .copied()
            .ok_or_else(|| ProviderError::listing_unknown(code))
    }

    fn ensure_backfill(
        &self,
        _code: &InstrumentCode,
        _granularity: Granularity,
        _range: &FetchRange,
    ) -> Result<(), ProviderError> {
        self.record("ensure_backfill");
        if self.fail_backfills.load(Ordering::SeqCst) {
            return Err(ProviderError::unavailable("injected provider outage"));
        }

        let active = self.active_backfills.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_backfills.fetch_max(active, Ordering::SeqCst);
        if let Some(hold) = self.backfill_hold {
            std::thread::sleep(hold);
        }
        self.active_backfills.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_cached(
        &self,
        code: &InstrumentCode,
        granularity: Granularity,
        _range: &FetchRange,
    ) -> Result<Vec<RawBar>, ProviderError> {
        self.record("read_cached");
        Ok(self
            .rows
            .lock()
            .expect("rows mutex")
            .get(&(code.as_str().to_owned(), granularity.as_str().to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}
