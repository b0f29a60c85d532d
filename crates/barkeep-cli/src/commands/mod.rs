mod audit;
mod fetch;
mod show;

use std::path::PathBuf;

use barkeep_core::{Warehouse, WarehouseConfig};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::cli::{Cli, Command};
use crate::error::CliError;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Fetch(args) => fetch::run(cli, args),
        Command::Audit(args) => audit::run(cli, args),
        Command::Show(args) => show::run(cli, args),
    }
}

fn open_warehouse(home: Option<&PathBuf>) -> Result<Warehouse, CliError> {
    let config = match home {
        Some(home) => WarehouseConfig::at_home(home),
        None => WarehouseConfig::default(),
    };
    Ok(Warehouse::open(config)?)
}

fn parse_date(value: &str) -> Result<Date, CliError> {
    Date::parse(value.trim(), DATE_FORMAT).map_err(|_| CliError::InvalidDate {
        value: value.to_owned(),
    })
}

fn parse_date_opt(value: Option<&String>) -> Result<Option<Date>, CliError> {
    value.map(|value| parse_date(value)).transpose()
}
