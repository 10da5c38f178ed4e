//! CLI command implementations

pub mod config;
pub mod info;
pub mod list;
pub mod new;
pub mod open;
pub mod remove;
pub mod repos;
pub mod stale;
pub mod version;

pub use config::run_config;
pub use info::run_info;
pub use list::run_list;
pub use new::run_new;
pub use open::run_open;
pub use remove::run_remove;
pub use repos::run_repos;
pub use stale::run_stale;
pub use version::run_version;

use std::sync::Arc;

use ccw_core::{GhProvider, Manager, TmuxRunner, state_root};

/// Manager over the real state root, tmux, and the gh CLI
///
/// JSON mode never attaches: the caller is a program, not a terminal.
pub fn build_manager(json_output: bool) -> ccw_core::Result<Manager> {
    let manager = Manager::new(state_root()?, Arc::new(TmuxRunner::new()))?;
    let timeout = manager.config().git_timeout();
    let manager = manager.with_review_provider(Arc::new(GhProvider::new(Some(timeout))));

    if json_output {
        Ok(manager.with_interactive(false))
    } else {
        Ok(manager)
    }
}
