//! Data-quality audit over persisted bar series.
//!
//! The auditor is advisory: it reads through the warehouse's ordered query
//! and never mutates stored data. Detection runs in a single streaming pass
//! so multi-year minute series stay cheap to audit.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde::Serialize;
use time::Date;

use crate::domain::{Granularity, InstrumentCode, UtcDateTime};
use crate::error::AuditError;
use barkeep_warehouse::Warehouse;

/// Bars dated before this year carry the signature of the historical
/// seconds-vs-milliseconds ingestion bug.
pub const EPOCH_UNDERFLOW_YEAR: i32 = 2000;

/// Half-width of the band around the first close used by the
/// normalization-suspect rule.
const FIRST_CLOSE_BAND: f64 = 0.10;

#[derive(Debug, Clone, Copy)]
pub struct AuditConfig {
    /// Close-to-close move, in percent, above which a bar is flagged.
    pub price_jump_pct: f64,
    /// Share of closes within ±10% of the first close above which the whole
    /// series looks like accidentally normalized (base-100/base-1) data.
    pub normalized_share: f64,
    /// Share of rows held by the single most frequent close above which the
    /// feed looks stuck.
    pub duplicate_share: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            price_jump_pct: 5.0,
            normalized_share: 0.5,
            duplicate_share: 0.5,
        }
    }
}

/// Kinds of data-quality anomaly, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    EpochUnderflow,
    PriceJump,
    NormalizationSuspect,
    DuplicateValueGlut,
}

impl AnomalyKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EpochUnderflow => "epoch_underflow",
            Self::PriceJump => "price_jump",
            Self::NormalizationSuspect => "normalization_suspect",
            Self::DuplicateValueGlut => "duplicate_value_glut",
        }
    }
}

impl Display for AnomalyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit finding. `ts` is `None` for whole-series findings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord {
    pub code: InstrumentCode,
    pub granularity: Granularity,
    pub ts: Option<UtcDateTime>,
    pub kind: AnomalyKind,
    pub magnitude: f64,
}

#[derive(Clone)]
pub struct Auditor {
    warehouse: Warehouse,
    config: AuditConfig,
}

impl Auditor {
    pub fn new(warehouse: Warehouse) -> Self {
        Self::with_config(warehouse, AuditConfig::default())
    }

    pub fn with_config(warehouse: Warehouse, config: AuditConfig) -> Self {
        Self { warehouse, config }
    }

    /// Scan the stored series for corruption signatures. A bar may trigger
    /// more than one rule; each rule is applied independently.
    pub fn audit(
        &self,
        code: &InstrumentCode,
        granularity: Granularity,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<Vec<AnomalyRecord>, AuditError> {
        let start_sql = start.map(|date| format!("{date} 00:00:00"));
        let end_sql = end.map(|date| format!("{date} 23:59:59"));
        let rows = self.warehouse.query_bars(
            code.as_str(),
            granularity.as_str(),
            start_sql.as_deref(),
            end_sql.as_deref(),
        )?;

        let mut anomalies = Vec::new();
        let mut prev_close: Option<f64> = None;
        let mut first_close: Option<f64> = None;
        let mut within_band = 0usize;
        // Keyed by bit pattern so exact repeats group without hashing floats.
        let mut close_counts: HashMap<u64, usize> = HashMap::new();

        for row in &rows {
            let ts = UtcDateTime::parse_sql(row.ts.as_str()).map_err(|_| {
                AuditError::CorruptStoredTimestamp {
                    value: row.ts.clone(),
                }
            })?;

            if ts.year() < EPOCH_UNDERFLOW_YEAR {
                anomalies.push(AnomalyRecord {
                    code: code.clone(),
                    granularity,
                    ts: Some(ts),
                    kind: AnomalyKind::EpochUnderflow,
                    magnitude: f64::from(ts.year()),
                });
            }

            if let Some(prev) = prev_close {
                if prev > 0.0 {
                    let jump_pct = (row.close / prev - 1.0).abs() * 100.0;
                    if jump_pct > self.config.price_jump_pct {
                        anomalies.push(AnomalyRecord {
                            code: code.clone(),
                            granularity,
                            ts: Some(ts),
                            kind: AnomalyKind::PriceJump,
                            magnitude: jump_pct,
                        });
                    }
                }
            }
            prev_close = Some(row.close);

            let first = *first_close.get_or_insert(row.close);
            if first > 0.0 && (row.close / first - 1.0).abs() <= FIRST_CLOSE_BAND {
                within_band += 1;
            }

            *close_counts.entry(row.close.to_bits()).or_insert(0) += 1;
        }

        let total = rows.len();
        if total > 0 {
            let band_share = within_band as f64 / total as f64;
            if band_share > self.config.normalized_share {
                anomalies.push(AnomalyRecord {
                    code: code.clone(),
                    granularity,
                    ts: None,
                    kind: AnomalyKind::NormalizationSuspect,
                    magnitude: band_share * 100.0,
                });
            }

            let most_frequent = close_counts.values().copied().max().unwrap_or(0);
            let glut_share = most_frequent as f64 / total as f64;
            if glut_share > self.config.duplicate_share {
                anomalies.push(AnomalyRecord {
                    code: code.clone(),
                    granularity,
                    ts: None,
                    kind: AnomalyKind::DuplicateValueGlut,
                    magnitude: glut_share * 100.0,
                });
            }
        }

        Ok(anomalies)
    }
}
