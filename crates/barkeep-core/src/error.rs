use thiserror::Error;

use crate::domain::{Granularity, InstrumentCode};
use crate::provider::ProviderError;
use barkeep_warehouse::WarehouseError;

/// Validation and contract errors exposed by `barkeep-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("instrument code cannot be empty")]
    EmptyCode,
    #[error("instrument code length {len} exceeds max {max}")]
    CodeTooLong { len: usize, max: usize },
    #[error("instrument code must start with an ASCII letter or digit: '{ch}'")]
    CodeInvalidStart { ch: char },
    #[error("instrument code contains invalid character '{ch}' at index {index}")]
    CodeInvalidChar { ch: char, index: usize },

    #[error("invalid granularity '{value}', expected one of 1m, 5m, 1d, 1w, 1mo")]
    InvalidGranularity { value: String },

    #[error("timestamp must be UTC: '{value}'")]
    TimestampNotUtc { value: String },

    #[error("fetch range start {start} is after end {end}")]
    InvalidDateRange {
        start: time::Date,
        end: time::Date,
    },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,
}

/// Failure of the single sanctioned timestamp conversion rule.
///
/// Raw provider timestamps are milliseconds since the Unix epoch; any value
/// whose derived calendar year falls outside the plausible window is rejected
/// here instead of being silently persisted. A seconds-since-epoch
/// misinterpretation of a real provider timestamp lands near 1970 and trips
/// this guard.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimestampError {
    #[error("raw timestamp {raw} derives year {year}, outside {min}..={max}", min = crate::normalize::MIN_YEAR, max = crate::normalize::MAX_YEAR)]
    OutOfRange { raw: i64, year: i64 },
}

/// Error taxonomy for one ingestion run.
///
/// Variants that can follow committed batches carry the durable row count so
/// a caller can resume instead of re-fetching the whole range.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("provider unavailable for {code}/{granularity}: {source}")]
    ProviderUnavailable {
        code: InstrumentCode,
        granularity: Granularity,
        source: ProviderError,
    },

    #[error("cannot resolve fetch range for {code}/{granularity}: no stored bars and no listing date")]
    RangeUnresolvable {
        code: InstrumentCode,
        granularity: Granularity,
    },

    #[error("corrupt timestamp in {code}/{granularity} provider row {index}: {source}")]
    Timestamp {
        code: InstrumentCode,
        granularity: Granularity,
        index: usize,
        source: TimestampError,
    },

    #[error("store write for {code}/{granularity} failed after {committed} committed rows: {source}")]
    StoreWrite {
        code: InstrumentCode,
        granularity: Granularity,
        committed: usize,
        source: WarehouseError,
    },

    #[error("fetch of {code}/{granularity} cancelled after {committed} committed rows")]
    Cancelled {
        code: InstrumentCode,
        granularity: Granularity,
        committed: usize,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] WarehouseError),
}

impl FetchError {
    /// Rows durably committed before this error, where applicable.
    #[must_use]
    pub fn committed_rows(&self) -> usize {
        match self {
            Self::StoreWrite { committed, .. } | Self::Cancelled { committed, .. } => *committed,
            Self::Store(error) => error.committed_rows(),
            _ => 0,
        }
    }
}

/// Errors surfaced by the quality auditor's read path.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Store(#[from] WarehouseError),

    #[error("stored timestamp '{value}' is not parseable; the row predates the normalizer contract")]
    CorruptStoredTimestamp { value: String },
}
