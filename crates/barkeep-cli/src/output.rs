use barkeep_core::ProgressSink;
use serde_json::Value;

use crate::error::CliError;

/// Progress sink that renders run notifications on stderr, keeping stdout
/// clean for the JSON result.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl ProgressSink for StderrSink {
    fn progress(&self, current: usize, total: usize, message: &str) {
        if total > 0 {
            eprintln!("[{current}/{total}] {message}");
        } else {
            eprintln!("{message}");
        }
    }

    fn completed(&self, _rows_written: usize, _rows_skipped: usize, message: &str) {
        eprintln!("done: {message}");
    }

    fn failed(&self, message: &str) {
        eprintln!("failed: {message}");
    }
}

pub fn render(value: &Value, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
