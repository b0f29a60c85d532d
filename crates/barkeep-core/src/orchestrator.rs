//! Fetch orchestration: range resolution, provider sequencing, normalization,
//! and batched persistence for one `(instrument, granularity)` pair.

use std::collections::BTreeMap;
use std::sync::Arc;

use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{yesterday_utc, Bar, FetchRange, Granularity, InstrumentCode, UtcDateTime};
use crate::error::FetchError;
use crate::locks::PairLocks;
use crate::normalize::normalize;
use crate::progress::{CancelToken, ProgressSink};
use crate::provider::{ProviderError, ProviderErrorKind, ProviderGateway};
use barkeep_warehouse::{BarRecord, Warehouse};

/// What to do with a provider row whose timestamp trips the normalizer guard.
///
/// Either way the corrupt value is never persisted; `Skip` keeps the run
/// alive and reports the dropped rows in the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BadTimestampPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Rows per store transaction on large backfills.
    pub batch_size: usize,
    pub bad_timestamps: BadTimestampPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            bad_timestamps: BadTimestampPolicy::default(),
        }
    }
}

/// One fetch invocation.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub code: InstrumentCode,
    pub granularity: Granularity,
    /// Omitted: resume from the last stored day, or fall back to the
    /// provider's listing date.
    pub start: Option<Date>,
    /// Omitted: the most recent completed UTC day. Never "now".
    pub end: Option<Date>,
    pub persist: bool,
}

impl FetchRequest {
    pub fn new(code: InstrumentCode, granularity: Granularity) -> Self {
        Self {
            code,
            granularity,
            start: None,
            end: None,
            persist: true,
        }
    }
}

/// Result of one completed fetch. `bars` are in strictly increasing
/// canonical-timestamp order.
#[derive(Debug)]
pub struct FetchOutcome {
    pub run_id: Uuid,
    pub code: InstrumentCode,
    pub granularity: Granularity,
    pub range: Option<FetchRange>,
    pub bars: Vec<Bar>,
    pub rows_written: usize,
    pub rows_skipped: usize,
}

impl FetchOutcome {
    pub fn summary(&self) -> String {
        match self.range {
            Some(range) => format!(
                "{}/{}: {} bars from {} through {}, {} written, {} skipped",
                self.code,
                self.granularity,
                self.bars.len(),
                range.start(),
                range.end(),
                self.rows_written,
                self.rows_skipped,
            ),
            None => format!("{}/{}: already current", self.code, self.granularity),
        }
    }
}

/// Ephemeral per-run bookkeeping, discarded once the outcome or error is
/// reported.
struct IngestionRun {
    run_id: Uuid,
    skipped: usize,
    committed: usize,
}

/// The fetch orchestrator. Cheap to clone; clones share the pair-lock
/// registry, so same-pair fetches serialize across clones too.
#[derive(Clone)]
pub struct Fetcher {
    provider: Arc<dyn ProviderGateway>,
    warehouse: Warehouse,
    locks: PairLocks,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(provider: Arc<dyn ProviderGateway>, warehouse: Warehouse) -> Self {
        Self::with_config(provider, warehouse, FetchConfig::default())
    }

    pub fn with_config(
        provider: Arc<dyn ProviderGateway>,
        warehouse: Warehouse,
        config: FetchConfig,
    ) -> Self {
        Self {
            provider,
            warehouse,
            locks: PairLocks::new(),
            config,
        }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    /// Run one ingestion: resolve the range, backfill then read the provider,
    /// normalize, and persist in batches.
    ///
    /// Holds the pair's mutual-exclusion token for the whole call. Progress,
    /// completion, and failure are reported through `sink`; `cancel` is
    /// observed between provider phases and between store batches.
    pub fn fetch(
        &self,
        request: &FetchRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<FetchOutcome, FetchError> {
        let _guard = self.locks.lock(&request.code, request.granularity);

        let mut run = IngestionRun {
            run_id: Uuid::new_v4(),
            skipped: 0,
            committed: 0,
        };
        info!(
            run_id = %run.run_id,
            code = %request.code,
            granularity = %request.granularity,
            "fetch started"
        );

        let result = self.run(&mut run, request, sink, cancel);
        match &result {
            Ok(outcome) => {
                info!(run_id = %run.run_id, rows_written = outcome.rows_written, "fetch completed");
                sink.completed(outcome.rows_written, outcome.rows_skipped, &outcome.summary());
            }
            Err(error) => {
                warn!(run_id = %run.run_id, %error, "fetch failed");
                sink.failed(&error.to_string());
            }
        }
        result
    }

    fn run(
        &self,
        run: &mut IngestionRun,
        request: &FetchRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<FetchOutcome, FetchError> {
        sink.progress(0, 0, "resolving fetch range");
        let Some(range) = self.resolve_range(request)? else {
            return Ok(FetchOutcome {
                run_id: run.run_id,
                code: request.code.clone(),
                granularity: request.granularity,
                range: None,
                bars: Vec::new(),
                rows_written: 0,
                rows_skipped: 0,
            });
        };

        self.check_cancelled(run, request, cancel)?;
        sink.progress(
            0,
            0,
            &format!(
                "backfilling provider cache {} through {}",
                range.start(),
                range.end()
            ),
        );
        // Backfill strictly before read: reading while the provider is still
        // populating its cache returns stale or partial data.
        self.provider
            .ensure_backfill(&request.code, request.granularity, &range)
            .map_err(|error| self.provider_error(request, error))?;

        self.check_cancelled(run, request, cancel)?;
        sink.progress(0, 0, "reading cached rows");
        let rows = self
            .provider
            .read_cached(&request.code, request.granularity, &range)
            .map_err(|error| self.provider_error(request, error))?;
        sink.progress(0, rows.len(), &format!("normalizing {} rows", rows.len()));

        let bars = self.normalize_rows(run, request, &range, rows)?;

        let rows_written = if request.persist {
            self.persist(run, request, &bars, sink, cancel)?
        } else {
            0
        };

        Ok(FetchOutcome {
            run_id: run.run_id,
            code: request.code.clone(),
            granularity: request.granularity,
            range: Some(range),
            bars,
            rows_written,
            rows_skipped: run.skipped,
        })
    }

    /// Resolve the requested interval. `Ok(None)` means the series is
    /// already current and there is nothing to fetch.
    fn resolve_range(&self, request: &FetchRequest) -> Result<Option<FetchRange>, FetchError> {
        let end = request.end.unwrap_or_else(yesterday_utc);

        let start = match request.start {
            Some(start) => start,
            None => match self
                .warehouse
                .latest_bar(request.code.as_str(), request.granularity.as_str())?
            {
                // Re-read the last stored day: it may have been ingested
                // while still partial, and the upsert absorbs the overlap.
                Some(record) => UtcDateTime::parse_sql(record.ts.as_str())?.date(),
                None => self
                    .provider
                    .listing_date(&request.code)
                    .map_err(|error| match error.kind() {
                        ProviderErrorKind::ListingUnknown => FetchError::RangeUnresolvable {
                            code: request.code.clone(),
                            granularity: request.granularity,
                        },
                        _ => self.provider_error(request, error),
                    })?,
            },
        };

        if start > end {
            return Ok(None);
        }
        Ok(Some(FetchRange::new(start, end)?))
    }

    /// Convert raw provider rows into canonical bars: normalize timestamps
    /// through the single sanctioned rule, drop rows outside the range, and
    /// resolve identity-key collisions with the last provider row winning.
    fn normalize_rows(
        &self,
        run: &mut IngestionRun,
        request: &FetchRequest,
        range: &FetchRange,
        rows: Vec<crate::domain::RawBar>,
    ) -> Result<Vec<Bar>, FetchError> {
        let mut deduped: BTreeMap<UtcDateTime, Bar> = BTreeMap::new();

        for (index, raw) in rows.iter().enumerate() {
            let ts = match normalize(raw.raw_ts) {
                Ok(ts) => ts,
                Err(source) => match self.config.bad_timestamps {
                    BadTimestampPolicy::Abort => {
                        return Err(FetchError::Timestamp {
                            code: request.code.clone(),
                            granularity: request.granularity,
                            index,
                            source,
                        });
                    }
                    BadTimestampPolicy::Skip => {
                        warn!(
                            run_id = %run.run_id,
                            index,
                            raw_ts = raw.raw_ts,
                            %source,
                            "skipping row with corrupt timestamp"
                        );
                        run.skipped += 1;
                        continue;
                    }
                },
            };

            if !range.contains(ts.date()) {
                continue;
            }

            let bar = Bar::from_raw(request.code.clone(), request.granularity, ts, raw)?;
            deduped.insert(ts, bar);
        }

        Ok(deduped.into_values().collect())
    }

    fn persist(
        &self,
        run: &mut IngestionRun,
        request: &FetchRequest,
        bars: &[Bar],
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<usize, FetchError> {
        let records: Vec<BarRecord> = bars.iter().map(Bar::to_record).collect();
        let total = records.len();
        let run_id = run.run_id.to_string();
        let batch_size = self.config.batch_size.max(1);

        for chunk in records.chunks(batch_size) {
            self.check_cancelled(run, request, cancel)?;
            match self.warehouse.upsert_batch(run_id.as_str(), chunk) {
                Ok(written) => {
                    run.committed += written;
                    sink.progress(run.committed, total, "writing bars");
                }
                Err(source) => {
                    return Err(FetchError::StoreWrite {
                        code: request.code.clone(),
                        granularity: request.granularity,
                        committed: run.committed,
                        source,
                    });
                }
            }
        }

        Ok(run.committed)
    }

    fn check_cancelled(
        &self,
        run: &IngestionRun,
        request: &FetchRequest,
        cancel: &CancelToken,
    ) -> Result<(), FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                code: request.code.clone(),
                granularity: request.granularity,
                committed: run.committed,
            });
        }
        Ok(())
    }

    fn provider_error(&self, request: &FetchRequest, source: ProviderError) -> FetchError {
        FetchError::ProviderUnavailable {
            code: request.code.clone(),
            granularity: request.granularity,
            source,
        }
    }
}
