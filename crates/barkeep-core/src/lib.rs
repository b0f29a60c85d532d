//! Core contracts for barkeep.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The single sanctioned timestamp normalization rule
//! - The provider gateway boundary and the replay adapter
//! - Fetch orchestration with per-pair serialization and progress channels
//! - The data-quality auditor

pub mod adapters;
pub mod audit;
pub mod domain;
pub mod error;
pub mod locks;
pub mod normalize;
pub mod orchestrator;
pub mod progress;
pub mod provider;

pub use adapters::{write_replay_cache, ReplayGateway};
pub use audit::{AnomalyKind, AnomalyRecord, AuditConfig, Auditor, EPOCH_UNDERFLOW_YEAR};
pub use domain::{yesterday_utc, Bar, FetchRange, Granularity, InstrumentCode, RawBar, UtcDateTime};
pub use error::{AuditError, FetchError, TimestampError, ValidationError};
pub use locks::{PairGuard, PairLocks};
pub use normalize::{normalize, MAX_YEAR, MIN_YEAR};
pub use orchestrator::{
    BadTimestampPolicy, FetchConfig, FetchOutcome, FetchRequest, Fetcher,
};
pub use progress::{CancelToken, ChannelSink, FetchEvent, NullSink, ProgressSink};
pub use provider::{ProviderError, ProviderErrorKind, ProviderGateway};
pub use barkeep_warehouse::{
    BarRecord, Warehouse, WarehouseConfig, WarehouseError,
};
