//! File-backed provider gateway.
//!
//! Replays a provider cache directory so the pipeline can run without a live
//! market-data connection:
//!
//! ```text
//! <root>/listings.json          {"515170": "2021-01-15", ...}
//! <root>/515170_1d.ndjson       one raw-row JSON object per line
//! ```
//!
//! Rows keep the provider's native integer timestamps; nothing here
//! interprets them.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::domain::{FetchRange, Granularity, InstrumentCode, RawBar};
use crate::provider::{ProviderError, ProviderGateway};

const LISTINGS_FILE: &str = "listings.json";

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub struct ReplayGateway {
    root: PathBuf,
}

impl ReplayGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn rows_path(&self, code: &InstrumentCode, granularity: Granularity) -> PathBuf {
        self.root.join(format!("{}_{}.ndjson", code, granularity))
    }

    fn load_listings(&self) -> Result<HashMap<String, String>, ProviderError> {
        let path = self.root.join(LISTINGS_FILE);
        let raw = fs::read_to_string(path.as_path()).map_err(|error| {
            ProviderError::unavailable(format!(
                "cannot read {}: {error}",
                path.display()
            ))
        })?;
        serde_json::from_str(raw.as_str()).map_err(|error| {
            ProviderError::internal(format!("malformed {}: {error}", path.display()))
        })
    }
}

impl ProviderGateway for ReplayGateway {
    fn listing_date(&self, code: &InstrumentCode) -> Result<Date, ProviderError> {
        let listings = self.load_listings()?;
        let value = listings
            .get(code.as_str())
            .ok_or_else(|| ProviderError::listing_unknown(code))?;
        Date::parse(value.as_str(), DATE_FORMAT).map_err(|_| {
            ProviderError::internal(format!("unparseable listing date '{value}' for '{code}'"))
        })
    }

    fn ensure_backfill(
        &self,
        code: &InstrumentCode,
        granularity: Granularity,
        _range: &FetchRange,
    ) -> Result<(), ProviderError> {
        // The replay cache is pre-populated; backfill reduces to checking
        // that the pair's row file exists at all.
        let path = self.rows_path(code, granularity);
        if !path.exists() {
            return Err(ProviderError::unavailable(format!(
                "no cached rows for {code}/{granularity} at {}",
                path.display()
            )));
        }
        Ok(())
    }

    fn read_cached(
        &self,
        code: &InstrumentCode,
        granularity: Granularity,
        _range: &FetchRange,
    ) -> Result<Vec<RawBar>, ProviderError> {
        let path = self.rows_path(code, granularity);
        let raw = fs::read_to_string(path.as_path()).map_err(|error| {
            ProviderError::unavailable(format!("cannot read {}: {error}", path.display()))
        })?;

        let mut rows = Vec::new();
        for (line_number, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: RawBar = serde_json::from_str(line).map_err(|error| {
                ProviderError::internal(format!(
                    "malformed row at {}:{}: {error}",
                    path.display(),
                    line_number + 1
                ))
            })?;
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Write a replay cache into `root`. Tooling/test helper.
pub fn write_replay_cache(
    root: &Path,
    listings: &HashMap<String, String>,
    rows: &HashMap<(String, String), Vec<RawBar>>,
) -> std::io::Result<()> {
    fs::create_dir_all(root)?;
    let listings_json =
        serde_json::to_string_pretty(listings).expect("listings map must serialize");
    fs::write(root.join(LISTINGS_FILE), listings_json)?;

    for ((code, granularity), bars) in rows {
        let mut body = String::new();
        for bar in bars {
            body.push_str(&serde_json::to_string(bar).expect("raw bar must serialize"));
            body.push('\n');
        }
        fs::write(root.join(format!("{code}_{granularity}.ndjson")), body)?;
    }
    Ok(())
}
