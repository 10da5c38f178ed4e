//! Merge detection
//!
//! Decides whether a branch's work is already represented in its base. The
//! review oracle is consulted first; git heuristics are the fallback:
//!
//! 1. ancestry (`merge-base --is-ancestor`) catches ordinary merges
//! 2. the squash heuristic compares only the files the branch touched since
//!    the merge base, between the branch tip and the base tip
//!
//! The squash heuristic can misclassify a branch whose touched files were
//! later rewritten on base to coincidentally match. That approximation is
//! relied on by `ccw stale` and is kept as is.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::git::{ORIGIN, Vcs};
use crate::review::ReviewOracle;

/// Outcome of a merge check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeVerdict {
    /// Reachable from base, or confirmed by the review oracle
    Merged,
    /// Work exists that base does not contain
    NotMerged,
    /// Not reachable from base, but base already has identical content
    SquashMerged,
}

impl MergeVerdict {
    pub fn is_merged(self) -> bool {
        !matches!(self, MergeVerdict::NotMerged)
    }

    fn from_oracle(merged: bool) -> Self {
        if merged {
            MergeVerdict::Merged
        } else {
            MergeVerdict::NotMerged
        }
    }
}

impl fmt::Display for MergeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeVerdict::Merged => write!(f, "merged"),
            MergeVerdict::NotMerged => write!(f, "not_merged"),
            MergeVerdict::SquashMerged => write!(f, "squash_merged"),
        }
    }
}

/// Ask the oracle, swallowing lookup failures
fn oracle_verdict(oracle: Option<&dyn ReviewOracle>, branch: &str) -> Option<bool> {
    let oracle = oracle?;
    match oracle.is_merged(branch) {
        Ok(found) => found,
        Err(e) => {
            log::debug!("review lookup for {} failed, using git: {}", branch, e);
            None
        }
    }
}

/// Squash heuristic for a tip that is not an ancestor of `base_ref`
fn squash_verdict(vcs: &dyn Vcs, repo: &Path, tip: &str, base_ref: &str) -> MergeVerdict {
    let Ok(merge_base) = vcs.merge_base(repo, tip, base_ref) else {
        return MergeVerdict::NotMerged;
    };

    let files = match vcs.changed_files(repo, &merge_base, tip) {
        Ok(files) if !files.is_empty() => files,
        // Nothing touched since the fork point
        _ => return MergeVerdict::Merged,
    };

    match vcs.paths_identical(repo, tip, base_ref, &files) {
        Ok(true) => MergeVerdict::SquashMerged,
        _ => MergeVerdict::NotMerged,
    }
}

/// Decide whether `branch` is merged into `base` (empty base auto-detects)
///
/// Fails only when the base cannot be resolved or git itself breaks.
pub fn is_merged(
    vcs: &dyn Vcs,
    repo: &Path,
    branch: &str,
    base: &str,
    oracle: Option<&dyn ReviewOracle>,
) -> Result<MergeVerdict> {
    if let Some(merged) = oracle_verdict(oracle, branch) {
        return Ok(MergeVerdict::from_oracle(merged));
    }

    let base_ref = vcs.resolve_base_ref(repo, base)?;

    if vcs.is_ancestor(repo, branch, &base_ref)? {
        return Ok(MergeVerdict::Merged);
    }

    Ok(squash_verdict(vcs, repo, branch, &base_ref))
}

/// True when `origin/<branch>` carries work that base does not contain
///
/// A branch that was never pushed has nothing unmerged on the remote.
pub fn remote_branch_has_unmerged_commits(
    vcs: &dyn Vcs,
    repo: &Path,
    branch: &str,
    base: &str,
    oracle: Option<&dyn ReviewOracle>,
) -> Result<bool> {
    let remote = format!("{}/{}", ORIGIN, branch);
    if !vcs.ref_exists(repo, &remote)? {
        return Ok(false);
    }

    if let Some(merged) = oracle_verdict(oracle, branch) {
        return Ok(!merged);
    }

    let base_ref = vcs.resolve_base_ref(repo, base)?;

    if vcs.count_commits(repo, &format!("{}..{}", base_ref, remote))? == 0 {
        return Ok(false);
    }

    Ok(!squash_verdict(vcs, repo, &remote, &base_ref).is_merged())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_folding() {
        assert!(MergeVerdict::Merged.is_merged());
        assert!(MergeVerdict::SquashMerged.is_merged());
        assert!(!MergeVerdict::NotMerged.is_merged());
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(MergeVerdict::SquashMerged.to_string(), "squash_merged");
        assert_eq!(
            serde_json::to_string(&MergeVerdict::NotMerged).unwrap(),
            "\"not_merged\""
        );
    }
}
