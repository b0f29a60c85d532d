use barkeep_core::{Granularity, InstrumentCode};
use serde_json::json;

use crate::cli::{Cli, ShowArgs};
use crate::error::CliError;
use crate::output::render;

use super::{open_warehouse, parse_date_opt};

pub fn run(cli: &Cli, args: &ShowArgs) -> Result<(), CliError> {
    let code = InstrumentCode::parse(args.code.as_str())?;
    let granularity: Granularity = args.granularity.parse()?;

    let start = parse_date_opt(args.start.as_ref())?.map(|date| format!("{date} 00:00:00"));
    let end = parse_date_opt(args.end.as_ref())?.map(|date| format!("{date} 23:59:59"));

    let warehouse = open_warehouse(cli.home.as_ref())?;
    let mut rows = warehouse.query_bars(
        code.as_str(),
        granularity.as_str(),
        start.as_deref(),
        end.as_deref(),
    )?;
    rows.truncate(args.limit);

    render(
        &json!({
            "code": code.as_str(),
            "granularity": granularity.as_str(),
            "row_count": rows.len(),
            "bars": rows,
        }),
        cli.pretty,
    )
}
