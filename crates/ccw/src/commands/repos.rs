//! Implementation of the `ccw repos` command

use crate::commands::build_manager;
use crate::output::{JsonResponse, ReposData};

/// Run the repos command
pub fn run_repos(json_output: bool, quiet: bool) -> anyhow::Result<i32> {
    let manager = build_manager(json_output)?;
    let repos_dir = manager.config().expanded_repos_dir()?;
    let repositories = manager.repositories()?;

    if json_output {
        JsonResponse::ok(
            "repos",
            ReposData {
                repos_dir,
                repositories,
            },
        )
        .print()?;
    } else if !quiet {
        if repositories.is_empty() {
            println!("No repositories found in {}", repos_dir.display());
        }
        for repo in &repositories {
            println!("{}", repo);
        }
    }

    Ok(0)
}
