use std::fmt::{Display, Formatter};

use time::Date;

use crate::{FetchRange, Granularity, InstrumentCode, RawBar};

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Unavailable,
    ListingUnknown,
    InvalidRequest,
    Internal,
}

/// Structured error from a provider gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn listing_unknown(code: &InstrumentCode) -> Self {
        Self {
            kind: ProviderErrorKind::ListingUnknown,
            message: format!("no listing date known for '{code}'"),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::Unavailable => "provider.unavailable",
            ProviderErrorKind::ListingUnknown => "provider.listing_unknown",
            ProviderErrorKind::InvalidRequest => "provider.invalid_request",
            ProviderErrorKind::Internal => "provider.internal",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Market-data provider boundary.
///
/// All three calls may block. `ensure_backfill` returns only once the
/// provider's own cache covers the requested range; `read_cached` before a
/// completed backfill would return stale or partial data, so the orchestrator
/// always sequences them strictly. The core never retries these calls.
pub trait ProviderGateway: Send + Sync {
    /// Resolve the instrument's listing date for full-history fetches.
    fn listing_date(&self, code: &InstrumentCode) -> Result<Date, ProviderError>;

    /// Instruct the provider to populate its local cache for the range.
    fn ensure_backfill(
        &self,
        code: &InstrumentCode,
        granularity: Granularity,
        range: &FetchRange,
    ) -> Result<(), ProviderError>;

    /// Read cached rows for the range. Row order is provider-defined; the
    /// orchestrator imposes canonical ordering.
    fn read_cached(
        &self,
        code: &InstrumentCode,
        granularity: Granularity,
        range: &FetchRange,
    ) -> Result<Vec<RawBar>, ProviderError>;
}
