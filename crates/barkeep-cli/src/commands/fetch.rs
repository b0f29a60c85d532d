use std::sync::Arc;

use barkeep_core::{
    BadTimestampPolicy, CancelToken, FetchConfig, FetchRequest, Fetcher, Granularity,
    InstrumentCode, ReplayGateway,
};
use serde_json::json;

use crate::cli::{Cli, FetchArgs};
use crate::error::CliError;
use crate::output::{render, StderrSink};

use super::{open_warehouse, parse_date_opt};

pub fn run(cli: &Cli, args: &FetchArgs) -> Result<(), CliError> {
    let code = InstrumentCode::parse(args.code.as_str())?;
    let granularity: Granularity = args.granularity.parse()?;

    let mut config = FetchConfig::default();
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if args.skip_bad_timestamps {
        config.bad_timestamps = BadTimestampPolicy::Skip;
    }

    let warehouse = open_warehouse(cli.home.as_ref())?;
    let provider = Arc::new(ReplayGateway::new(args.provider_dir.clone()));
    let fetcher = Fetcher::with_config(provider, warehouse, config);

    let mut request = FetchRequest::new(code, granularity);
    request.start = parse_date_opt(args.start.as_ref())?;
    request.end = parse_date_opt(args.end.as_ref())?;
    request.persist = !args.dry_run;

    let outcome = fetcher.fetch(&request, &StderrSink, &CancelToken::new())?;

    render(
        &json!({
            "run_id": outcome.run_id.to_string(),
            "code": outcome.code.as_str(),
            "granularity": outcome.granularity.as_str(),
            "start": outcome.range.map(|range| range.start().to_string()),
            "end": outcome.range.map(|range| range.end().to_string()),
            "bars": outcome.bars.len(),
            "rows_written": outcome.rows_written,
            "rows_skipped": outcome.rows_skipped,
        }),
        cli.pretty,
    )
}
