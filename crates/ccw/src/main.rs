//! ccw CLI - git worktrees paired with tmux sessions running Claude Code

mod cli;
mod colors;
mod commands;
mod logging;
mod output;

use std::process::ExitCode;

use ccw_core::CcwError;

use cli::Commands;
use output::{JsonIssue, JsonResponse};

/// Code reported for failures that do not come from ccw-core
const CLI_ERROR_CODE: &str = "E000";

fn main() -> ExitCode {
    let cli = cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    let command = cli.command.as_ref().map(Commands::name).unwrap_or("ccw");

    let result = match cli.command {
        Some(Commands::New {
            repo,
            branch,
            base,
            no_attach,
            no_fetch,
        }) => commands::run_new(repo, branch, base, no_attach, no_fetch, cli.json, cli.quiet),
        Some(Commands::Open {
            workspace,
            resume,
            focus,
            attach,
        }) => commands::run_open(workspace, resume, focus, attach, cli.json, cli.quiet),
        Some(Commands::Ls { all, repo }) => commands::run_list(all, repo, cli.json, cli.quiet),
        Some(Commands::Info { workspace }) => commands::run_info(workspace, cli.json, cli.quiet),
        Some(Commands::Rm {
            workspace,
            force,
            keep_branch,
            keep_worktree,
            yes,
        }) => commands::run_remove(
            workspace,
            force,
            keep_branch,
            keep_worktree,
            yes,
            cli.json,
            cli.quiet,
        ),
        Some(Commands::Stale { rm, force }) => commands::run_stale(rm, force, cli.json, cli.quiet),
        Some(Commands::Repos) => commands::run_repos(cli.json, cli.quiet),
        Some(Commands::Config { key, value, reset }) => {
            commands::run_config(key, value, reset, cli.json, cli.quiet)
        }
        Some(Commands::Version) => commands::run_version(cli.verbose, cli.json, cli.quiet),
        None => {
            // No subcommand - print version info
            if !cli.quiet {
                println!("ccw v{}", env!("CARGO_PKG_VERSION"));
                println!("Use --help for usage information");
            }
            Ok(0)
        }
    };

    match result {
        Ok(code) => exit_code(code),
        Err(err) => {
            let (code, exit) = match err.downcast_ref::<CcwError>() {
                Some(core) => (core.code(), core.exit_code()),
                None => (CLI_ERROR_CODE, 1),
            };
            log::debug!("{} failed: {:?}", command, err);

            if cli.json {
                let response = JsonResponse::error(
                    command,
                    serde_json::Value::Null,
                    vec![JsonIssue::error(code, err.to_string())],
                );
                if let Err(e) = response.print() {
                    eprintln!("error: {}", e);
                }
            } else {
                eprintln!("error: {}", err);
            }
            exit_code(exit)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
