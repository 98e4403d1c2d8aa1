pub mod classical;
pub mod premature;
pub mod three_step;

use nestbox::StatusLine;
use serde::Serialize;

use crate::cli::GlobalFlags;

/// JSON form of one status line.
#[derive(Serialize)]
struct Record<'a> {
    scenario: &'a str,
    #[serde(flatten)]
    status: serde_json::Value,
}

/// Print a status line to stdout, as text or JSON per `--json`.
pub fn emit(global: &GlobalFlags, scenario: &str, line: &StatusLine) -> anyhow::Result<()> {
    if global.json {
        let record = Record {
            scenario,
            status: line.to_json(),
        };
        println!("{}", serde_json::to_string(&record)?);
    } else {
        println!("{}", line);
    }
    Ok(())
}
