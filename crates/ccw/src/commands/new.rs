//! Implementation of the `ccw new` command

use ccw_core::CreateOptions;

use crate::colors::{COLORS, paint};
use crate::commands::build_manager;
use crate::output::{JsonResponse, WorkspaceData};

/// Run the new command
pub fn run_new(
    repo: String,
    branch: String,
    base: Option<String>,
    no_attach: bool,
    no_fetch: bool,
    json_output: bool,
    quiet: bool,
) -> anyhow::Result<i32> {
    let manager = build_manager(json_output)?;

    let opts = CreateOptions {
        base_branch: base.unwrap_or_default(),
        no_attach,
        no_fetch,
    };
    let ws = manager.create(&repo, &branch, &opts)?;
    let id = ws.id();

    if json_output {
        JsonResponse::ok("new", WorkspaceData { id, workspace: ws }).print()?;
    } else if !quiet {
        println!(
            "created workspace {} from {}",
            paint(&id, COLORS.success),
            ws.base_branch
        );
        println!("  worktree: {}", ws.worktree_path.display());
        println!("  session:  {}", ws.tmux_session);
        if no_attach {
            println!("attach with: ccw open {}", id);
        }
    }

    Ok(0)
}
