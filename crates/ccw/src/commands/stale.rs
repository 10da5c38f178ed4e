//! Implementation of the `ccw stale` command

use ccw_core::{CcwError, RemoveOptions};

use crate::colors::{COLORS, paint};
use crate::commands::build_manager;
use crate::output::{JsonIssue, JsonResponse, StaleData};

/// Run the stale command
pub fn run_stale(remove: bool, force: bool, json_output: bool, quiet: bool) -> anyhow::Result<i32> {
    let manager = build_manager(json_output)?;
    let stale = manager.stale(force)?;

    let mut removed = Vec::new();
    let mut failures: Vec<(String, CcwError)> = Vec::new();

    if remove {
        let opts = RemoveOptions {
            force,
            ..Default::default()
        };
        for status in &stale {
            match manager.remove(&status.id, &opts) {
                Ok(id) => {
                    if !json_output && !quiet {
                        println!("removed {}", id);
                    }
                    removed.push(id);
                }
                Err(e) => {
                    log::debug!("remove {} failed: {:?}", status.id, e);
                    failures.push((status.id.clone(), e));
                }
            }
        }
    }

    let exit_code = failures
        .iter()
        .map(|(_, e)| e.exit_code())
        .max()
        .unwrap_or(0);

    if json_output {
        let issues: Vec<JsonIssue> = failures
            .iter()
            .map(|(id, e)| JsonIssue::from(e).with_workspace(id))
            .collect();
        let data = StaleData {
            workspaces: stale,
            removed,
        };
        let response = if issues.is_empty() {
            JsonResponse::ok("stale", data)
        } else {
            JsonResponse::error("stale", data, issues)
        };
        response.print()?;
        return Ok(exit_code);
    }

    for (id, e) in &failures {
        eprintln!("error: {}: {}", id, e);
    }

    if !remove && !quiet {
        if stale.is_empty() {
            println!("No stale workspaces found");
        }
        for status in &stale {
            let verdict = status
                .merge
                .map(|v| v.to_string())
                .unwrap_or_else(|| "merged".to_string());
            println!(
                "{} (branch: {}, {})",
                status.id,
                status.workspace.branch,
                paint(&verdict, COLORS.warning)
            );
        }
    }

    Ok(exit_code)
}
