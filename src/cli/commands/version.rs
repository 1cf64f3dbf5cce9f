//! Version command implementation.

use crate::error::Result;
use serde::Serialize;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    steps: usize,
}

/// Execute the version command.
///
/// Also reports how many migration steps this build knows about.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };
    let steps = crate::storage::default_steps().len();

    if json {
        let output = VersionOutput {
            version,
            build,
            steps,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("plansync {version} ({build}, {steps} migration steps)");
    Ok(())
}
