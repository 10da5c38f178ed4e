//! Workspace identifiers and session/filesystem-safe names
//!
//! A workspace is keyed by `repo/branch`. The safe name derived from that key
//! is used both as the worktree directory name and the tmux session name, so
//! it must survive tmux's own name mangling unchanged.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CcwError, Result};

/// Upper bound on safe name length (bytes)
pub const MAX_SAFE_NAME_LEN: usize = 128;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"));

/// Registry key for a workspace
pub fn workspace_id(repo: &str, branch: &str) -> String {
    format!("{}/{}", repo, branch)
}

/// Derive the tmux session / worktree directory name for a workspace
///
/// - '/' -> '--'
/// - runs of anything outside `[A-Za-z0-9._-]` -> '-'
/// - '.' -> '_' (tmux rewrites dots, and treats them as window.pane separators)
/// - truncated to 128 bytes, leading/trailing '-' trimmed
///
/// Returns "workspace" if nothing usable remains.
pub fn safe_name(repo: &str, branch: &str) -> String {
    let id = workspace_id(repo, branch).replace('/', "--");
    let mut name = UNSAFE_CHARS.replace_all(&id, "-").replace('.', "_");

    // Only ASCII survives the filter above, so byte truncation is char-safe.
    name.truncate(MAX_SAFE_NAME_LEN);

    let trimmed = name.trim_matches('-');
    if trimmed.is_empty() {
        "workspace".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Reject names that are empty, traverse directories, or are otherwise unsafe
/// to join onto a filesystem path
pub fn validate_name(what: &'static str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CcwError::validation(what, "name cannot be empty"));
    }
    if name.contains("..") {
        return Err(CcwError::validation(what, "name cannot contain '..'"));
    }
    if Path::new(name).is_absolute() || name.starts_with('/') {
        return Err(CcwError::validation(
            what,
            "name cannot be an absolute path",
        ));
    }
    if name.contains('\0') {
        return Err(CcwError::validation(what, "name contains invalid characters"));
    }
    if name.contains('\\') {
        return Err(CcwError::validation(
            what,
            "name cannot contain backslashes",
        ));
    }
    Ok(())
}

/// Branch names may contain '/', but never traversal segments
pub fn validate_branch(branch: &str) -> Result<()> {
    validate_name("branch name", branch)?;
    if branch.contains("/../") || branch.starts_with("../") || branch.ends_with("/..") {
        return Err(CcwError::validation(
            "branch name",
            "branch cannot traverse directories",
        ));
    }
    Ok(())
}
