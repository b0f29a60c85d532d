use serde::{Deserialize, Serialize};

use crate::{Granularity, InstrumentCode, UtcDateTime, ValidationError};
use barkeep_warehouse::BarRecord;

/// One provider row as received at ingress.
///
/// `raw_ts` is unit-ambiguous at this point and carries no meaning until it
/// has passed through the normalizer; nothing else may interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub raw_ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
}

/// One normalized OHLCV observation.
///
/// `ts` is the canonical UTC calendar timestamp and is only ever produced by
/// [`crate::normalize::normalize`]. Identity key: `(code, granularity, ts)`.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub code: InstrumentCode,
    pub granularity: Granularity,
    pub ts: UtcDateTime,
    pub raw_ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
}

impl Bar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: InstrumentCode,
        granularity: Granularity,
        ts: UtcDateTime,
        raw_ts: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        amount: f64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;
        validate_non_negative("volume", volume)?;
        validate_non_negative("amount", amount)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            code,
            granularity,
            ts,
            raw_ts,
            open,
            high,
            low,
            close,
            volume,
            amount,
        })
    }

    /// Assemble a normalized bar from a raw provider row and its canonical
    /// timestamp.
    pub fn from_raw(
        code: InstrumentCode,
        granularity: Granularity,
        ts: UtcDateTime,
        raw: &RawBar,
    ) -> Result<Self, ValidationError> {
        Self::new(
            code,
            granularity,
            ts,
            raw.raw_ts,
            raw.open,
            raw.high,
            raw.low,
            raw.close,
            raw.volume,
            raw.amount,
        )
    }

    /// Flatten to the warehouse row layout.
    pub fn to_record(&self) -> BarRecord {
        BarRecord {
            code: self.code.as_str().to_owned(),
            granularity: self.granularity.as_str().to_owned(),
            ts: self.ts.format_sql(),
            raw_ts: self.raw_ts,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            amount: self.amount,
        }
    }

    /// Rehydrate from a stored warehouse row.
    pub fn from_record(record: &BarRecord) -> Result<Self, ValidationError> {
        let code = InstrumentCode::parse(record.code.as_str())?;
        let granularity: Granularity = record.granularity.parse()?;
        let ts = UtcDateTime::parse_sql(record.ts.as_str())?;
        Self::new(
            code,
            granularity,
            ts,
            record.raw_ts,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
            record.amount,
        )
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> InstrumentCode {
        InstrumentCode::parse("515170").expect("code")
    }

    fn ts() -> UtcDateTime {
        UtcDateTime::parse("2024-05-29T16:00:00Z").expect("timestamp")
    }

    #[test]
    fn rejects_inverted_high_low() {
        let err = Bar::new(
            code(),
            Granularity::Day,
            ts(),
            0,
            10.0,
            9.0,
            11.0,
            10.0,
            0.0,
            0.0,
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidBarRange));
    }

    #[test]
    fn rejects_close_outside_bounds() {
        let err = Bar::new(
            code(),
            Granularity::Day,
            ts(),
            0,
            10.0,
            12.0,
            9.0,
            12.5,
            0.0,
            0.0,
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidBarBounds));
    }

    #[test]
    fn record_round_trip_preserves_identity() {
        let bar = Bar::new(
            code(),
            Granularity::Day,
            ts(),
            1_716_998_400_000,
            10.0,
            12.0,
            9.0,
            11.0,
            1000.0,
            10_500.0,
        )
        .expect("bar");

        let record = bar.to_record();
        assert_eq!(record.ts, "2024-05-29 16:00:00");

        let restored = Bar::from_record(&record).expect("restore");
        assert_eq!(restored, bar);
    }
}
