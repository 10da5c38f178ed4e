//! Implementation of the `ccw version` command

use ccw_core::state_root;

use crate::output::{JsonResponse, VersionData};

/// Run the version command
///
/// With `--verbose` also shows where state is kept.
pub fn run_version(verbose: bool, json_output: bool, quiet: bool) -> anyhow::Result<i32> {
    let version = env!("CARGO_PKG_VERSION");

    if json_output {
        JsonResponse::ok(
            "version",
            VersionData {
                version: version.to_string(),
            },
        )
        .print()?;
        return Ok(0);
    }
    if quiet {
        return Ok(0);
    }

    println!("ccw {}", version);
    if verbose {
        println!("  state: {}", state_root()?.display());
    }

    Ok(0)
}
