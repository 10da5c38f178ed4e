//! Implementation of the `ccw open` command

use ccw_core::OpenOptions;

use crate::commands::build_manager;
use crate::output::{JsonResponse, WorkspaceData};

/// Run the open command
pub fn run_open(
    workspace: String,
    resume: bool,
    focus: bool,
    attach: bool,
    json_output: bool,
    quiet: bool,
) -> anyhow::Result<i32> {
    let manager = build_manager(json_output)?;

    let opts = OpenOptions {
        resume,
        focus_existing: focus,
        force_attach: attach && !json_output,
    };
    let ws = manager.open(&workspace, &opts)?;

    if json_output {
        JsonResponse::ok(
            "open",
            WorkspaceData {
                id: ws.id(),
                workspace: ws,
            },
        )
        .print()?;
    } else if !quiet {
        log::debug!("opened {}", ws.id());
        println!("session: {}", ws.tmux_session);
    }

    Ok(0)
}
