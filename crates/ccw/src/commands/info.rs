//! Implementation of the `ccw info` command

use chrono::Local;

use crate::colors::{COLORS, paint};
use crate::commands::build_manager;
use crate::commands::list::session_label;
use crate::output::JsonResponse;

/// Run the info command
pub fn run_info(workspace: String, json_output: bool, quiet: bool) -> anyhow::Result<i32> {
    let manager = build_manager(json_output)?;
    let status = manager.info(&workspace)?;

    if json_output {
        JsonResponse::ok("info", status).print()?;
        return Ok(0);
    }
    if quiet {
        return Ok(0);
    }

    let ws = &status.workspace;
    let base = if ws.base_branch.is_empty() {
        "auto"
    } else {
        ws.base_branch.as_str()
    };
    let style = if status.session_alive {
        COLORS.success
    } else {
        COLORS.fail
    };

    println!("{}", paint(&status.id, COLORS.active));
    println!("  repo:      {} ({})", ws.repo, ws.repo_path.display());
    println!("  branch:    {} (base {})", ws.branch, base);
    println!("  worktree:  {}", ws.worktree_path.display());
    println!(
        "  session:   {} [{}]",
        ws.tmux_session,
        paint(session_label(&status), style)
    );
    println!(
        "  created:   {}",
        ws.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  accessed:  {}",
        ws.last_accessed_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    );

    Ok(0)
}
