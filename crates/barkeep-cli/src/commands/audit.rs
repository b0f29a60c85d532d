use barkeep_core::{AuditConfig, Auditor, Granularity, InstrumentCode};
use serde_json::json;

use crate::cli::{AuditArgs, Cli};
use crate::error::CliError;
use crate::output::render;

use super::{open_warehouse, parse_date_opt};

pub fn run(cli: &Cli, args: &AuditArgs) -> Result<(), CliError> {
    let code = InstrumentCode::parse(args.code.as_str())?;
    let granularity: Granularity = args.granularity.parse()?;

    let mut config = AuditConfig::default();
    if let Some(threshold) = args.jump_threshold {
        config.price_jump_pct = threshold;
    }

    let warehouse = open_warehouse(cli.home.as_ref())?;
    let auditor = Auditor::with_config(warehouse, config);

    let anomalies = auditor.audit(
        &code,
        granularity,
        parse_date_opt(args.start.as_ref())?,
        parse_date_opt(args.end.as_ref())?,
    )?;

    render(
        &json!({
            "code": code.as_str(),
            "granularity": granularity.as_str(),
            "anomaly_count": anomalies.len(),
            "anomalies": anomalies,
        }),
        cli.pretty,
    )
}
