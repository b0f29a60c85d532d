use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "barkeep",
    about = "Ingest, normalize, and audit OHLCV bar history",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Override the barkeep home directory (default: $BARKEEP_HOME or ~/.barkeep).
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch bars from a provider cache and persist them.
    Fetch(FetchArgs),
    /// Audit a stored series for corruption signatures.
    Audit(AuditArgs),
    /// Print stored bars for a pair.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Instrument code (e.g. 515170).
    pub code: String,

    #[arg(long, default_value = "1d")]
    pub granularity: String,

    /// Start day (YYYY-MM-DD); defaults to resume point or listing date.
    #[arg(long)]
    pub start: Option<String>,

    /// End day (YYYY-MM-DD); defaults to yesterday.
    #[arg(long)]
    pub end: Option<String>,

    /// Replay provider cache directory.
    #[arg(long)]
    pub provider_dir: PathBuf,

    /// Normalize without persisting.
    #[arg(long)]
    pub dry_run: bool,

    /// Rows per store transaction.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Skip rows with out-of-range timestamps instead of aborting the run.
    #[arg(long)]
    pub skip_bad_timestamps: bool,
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    pub code: String,

    #[arg(long, default_value = "1d")]
    pub granularity: String,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    /// Close-to-close move, in percent, above which a bar is flagged.
    #[arg(long)]
    pub jump_threshold: Option<f64>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub code: String,

    #[arg(long, default_value = "1d")]
    pub granularity: String,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    /// Maximum rows to print.
    #[arg(long, default_value_t = 100)]
    pub limit: usize,
}
