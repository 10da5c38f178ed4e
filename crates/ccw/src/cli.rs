//! CLI argument parsing with clap derive

use clap::{Parser, Subcommand};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// ccw - git worktrees paired with tmux sessions running Claude Code
#[derive(Parser)]
#[command(name = "ccw")]
#[command(version = VERSION)]
#[command(about = "Workspaces: a git worktree and a tmux session per branch")]
#[command(long_about = "ccw manages workspaces. A workspace is a branch checked out into its own git worktree, paired with a tmux session running Claude Code on the left and a secondary tool (lazygit by default) on the right.\n\nWorkspaces are tracked in a registry under $CCW_HOME (default ~/.ccw) and addressed as repo/branch, by a unique partial name, or by the index shown in `ccw ls`.")]
pub struct Cli {
    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a workspace for a new branch
    ///
    /// Creates the branch from base, pushes it to origin, adds a worktree,
    /// and starts the session.
    #[command(long_about = "Create a workspace for a new branch.\n\nSteps:\n  1. Fetch and fast-forward the base branch (skip with --no-fetch)\n  2. Create the branch from base and push it to origin\n  3. Add a worktree under $CCW_HOME/worktrees and copy .env\n  4. Start a tmux session with Claude Code and the secondary tool\n  5. Register the workspace and attach\n\nAny failure undoes the steps already taken.")]
    New {
        /// Repository name under repos_dir
        repo: String,

        /// Branch to create
        branch: String,

        /// Base branch (default: main or master, whichever exists)
        #[arg(short, long)]
        base: Option<String>,

        /// Create but don't attach to the session
        #[arg(long)]
        no_attach: bool,

        /// Skip fetching and fast-forwarding the base branch
        #[arg(long)]
        no_fetch: bool,
    },

    /// Open a workspace, rebuilding its session if needed
    Open {
        /// Workspace ID, unique partial name, or index from `ccw ls`
        workspace: String,

        /// Resume the previous Claude Code conversation when rebuilding
        #[arg(long)]
        resume: bool,

        /// Attach even if the workspace is already open elsewhere
        #[arg(long)]
        focus: bool,

        /// Attach even when not running in a terminal
        #[arg(long)]
        attach: bool,
    },

    /// List workspaces
    #[command(visible_alias = "list")]
    Ls {
        /// Show worktree and branch columns
        #[arg(short, long)]
        all: bool,

        /// Only show workspaces of this repository
        #[arg(long)]
        repo: Option<String>,
    },

    /// Show details for one workspace
    Info {
        /// Workspace ID, unique partial name, or index from `ccw ls`
        workspace: String,
    },

    /// Remove a workspace
    ///
    /// Refuses to delete a branch holding work that is not in its base.
    #[command(long_about = "Remove a workspace.\n\nRemoves the worktree, the local and remote branch, the registry entry, and the tmux session.\n\nThe branch must be merged into its base (by ancestry, squash, or a merged pull request). Otherwise ccw asks before deleting it, or fails when it cannot ask. --force skips every check; --keep-branch leaves both branches alone.")]
    Rm {
        /// Workspace ID, unique partial name, or index from `ccw ls`
        workspace: String,

        /// Delete even if the branch is not merged
        #[arg(short, long)]
        force: bool,

        /// Keep the local and remote branch
        #[arg(long)]
        keep_branch: bool,

        /// Keep the worktree on disk (only unregister)
        #[arg(long)]
        keep_worktree: bool,

        /// Answer yes to confirmation prompts
        #[arg(short, long)]
        yes: bool,
    },

    /// List workspaces whose branch is merged into its base
    Stale {
        /// Remove every stale workspace
        #[arg(long)]
        rm: bool,

        /// Skip workspaces that cannot be checked, and remove without checks
        #[arg(long)]
        force: bool,
    },

    /// List repositories under repos_dir
    Repos,

    /// View or edit configuration
    #[command(long_about = "View or edit configuration.\n\nWith no arguments prints every setting. With a key prints its value. With a key and a value validates, saves, and prints the new configuration.\n\nKeys: repos_dir, secondary_tool, skip_permissions, git_timeout_secs, lock_timeout_ms")]
    Config {
        /// Setting to read or write
        key: Option<String>,

        /// New value for the setting
        value: Option<String>,

        /// Reset configuration to defaults
        #[arg(long, conflicts_with_all = ["key", "value"])]
        reset: bool,
    },

    /// Show version information
    Version,
}

impl Commands {
    /// Name used in the JSON response envelope
    pub fn name(&self) -> &'static str {
        match self {
            Commands::New { .. } => "new",
            Commands::Open { .. } => "open",
            Commands::Ls { .. } => "ls",
            Commands::Info { .. } => "info",
            Commands::Rm { .. } => "rm",
            Commands::Stale { .. } => "stale",
            Commands::Repos => "repos",
            Commands::Config { .. } => "config",
            Commands::Version => "version",
        }
    }
}

/// Get the command args for use in the application
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_new_flags() {
        let cli = Cli::try_parse_from([
            "ccw", "new", "api", "feature/x", "-b", "develop", "--no-attach",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::New {
                repo,
                branch,
                base,
                no_attach,
                no_fetch,
            }) => {
                assert_eq!(repo, "api");
                assert_eq!(branch, "feature/x");
                assert_eq!(base.as_deref(), Some("develop"));
                assert!(no_attach);
                assert!(!no_fetch);
            }
            _ => panic!("expected new"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ccw", "ls", "--json", "-a"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Some(Commands::Ls { all: true, .. })));
    }

    #[test]
    fn test_list_alias() {
        let cli = Cli::try_parse_from(["ccw", "list"]).unwrap();
        assert_eq!(cli.command.unwrap().name(), "ls");
    }

    #[test]
    fn test_config_reset_conflicts_with_key() {
        assert!(Cli::try_parse_from(["ccw", "config", "repos_dir", "--reset"]).is_err());
        assert!(Cli::try_parse_from(["ccw", "config", "--reset"]).is_ok());
    }

    #[test]
    fn test_rm_requires_workspace() {
        assert!(Cli::try_parse_from(["ccw", "rm"]).is_err());
        let cli = Cli::try_parse_from(["ccw", "rm", "3", "-fy"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Rm {
                force: true,
                yes: true,
                ..
            })
        ));
    }
}
