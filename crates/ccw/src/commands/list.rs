//! Implementation of the `ccw ls` command

use chrono::Local;

use ccw_core::WorkspaceStatus;

use crate::colors::{COLORS, paint};
use crate::commands::build_manager;
use crate::output::{IndexedStatus, JsonResponse, ListData};

/// Run the ls command
pub fn run_list(
    all: bool,
    repo_filter: Option<String>,
    json_output: bool,
    quiet: bool,
) -> anyhow::Result<i32> {
    let manager = build_manager(json_output)?;
    let statuses = manager.list()?;
    let rows = filter_rows(statuses, repo_filter.as_deref());

    if json_output {
        JsonResponse::ok("ls", ListData { workspaces: rows }).print()?;
    } else if !quiet {
        if rows.is_empty() {
            println!("No workspaces found");
        } else {
            output_table(&rows, all);
        }
    }

    Ok(0)
}

/// Index against the full list first so `ccw open <n>` agrees with any filtered view
fn filter_rows(statuses: Vec<WorkspaceStatus>, repo: Option<&str>) -> Vec<IndexedStatus> {
    statuses
        .into_iter()
        .enumerate()
        .filter(|(_, status)| repo.is_none_or(|r| status.workspace.repo == r))
        .map(|(i, status)| IndexedStatus {
            index: i + 1,
            status,
        })
        .collect()
}

/// Session state label: attached, alive, or dead
pub fn session_label(status: &WorkspaceStatus) -> &'static str {
    if status.has_clients {
        "attached"
    } else if status.session_alive {
        "alive"
    } else {
        "dead"
    }
}

fn output_table(rows: &[IndexedStatus], all: bool) {
    let id_width = rows
        .iter()
        .map(|r| r.status.id.len())
        .max()
        .unwrap_or(9)
        .max(9);
    let index_width = rows.len().to_string().len().max(1);

    let mut header = format!(
        "{:>index_width$}  {:<id_width$}  {:<8}  {:<16}",
        "#", "WORKSPACE", "STATUS", "LAST ACCESSED"
    );
    if all {
        header.push_str("  BRANCH  WORKTREE");
    }
    println!("{}", header.trim_end());

    for row in rows {
        let label = session_label(&row.status);
        let style = if row.status.session_alive {
            COLORS.success
        } else {
            COLORS.fail
        };
        let last = row
            .status
            .workspace
            .last_accessed_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M");

        let mut line = format!(
            "{:>index_width$}  {:<id_width$}  {}  {:<16}",
            row.index,
            row.status.id,
            paint(&format!("{:<8}", label), style),
            last
        );
        if all {
            line.push_str(&format!(
                "  {}  {}",
                row.status.workspace.branch,
                row.status.workspace.worktree_path.display()
            ));
        }
        println!("{}", line.trim_end());
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Utc;
    use ccw_core::Workspace;

    use super::*;

    fn status(repo: &str, branch: &str, alive: bool, clients: bool) -> WorkspaceStatus {
        let now = Utc::now();
        let name = ccw_core::safe_name(repo, branch);
        WorkspaceStatus {
            id: ccw_core::workspace_id(repo, branch),
            workspace: Workspace {
                repo: repo.to_string(),
                repo_path: PathBuf::from("/repos").join(repo),
                branch: branch.to_string(),
                base_branch: "main".to_string(),
                worktree_path: PathBuf::from("/wt").join(&name),
                claude_session: name.clone(),
                tmux_session: name,
                created_at: now,
                last_accessed_at: now,
            },
            session_alive: alive,
            has_clients: clients,
            merge: None,
        }
    }

    #[test]
    fn test_filter_keeps_global_indices() {
        let statuses = vec![
            status("api", "a", true, false),
            status("web", "b", false, false),
            status("api", "c", true, true),
        ];
        let rows = filter_rows(statuses, Some("api"));
        let indices: Vec<_> = rows.iter().map(|r| (r.index, r.status.id.as_str())).collect();
        assert_eq!(indices, vec![(1, "api/a"), (3, "api/c")]);
    }

    #[test]
    fn test_no_filter_numbers_everything() {
        let rows = filter_rows(
            vec![status("api", "a", true, false), status("web", "b", false, false)],
            None,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].index, 2);
    }

    #[test]
    fn test_session_label() {
        assert_eq!(session_label(&status("r", "b", true, true)), "attached");
        assert_eq!(session_label(&status("r", "b", true, false)), "alive");
        assert_eq!(session_label(&status("r", "b", false, false)), "dead");
    }
}
