//! Code-review oracle backed by GitHub pull requests
//!
//! The oracle answers "was the review record for this branch merged?". A
//! branch with no pull request is `Ok(None)`, which callers treat as "ask git
//! instead".

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::error::{CcwError, Result};
use crate::process::Invocation;

/// Review-host merge signal for one repository
pub trait ReviewOracle: Send + Sync {
    /// `Some(merged)` when a review record exists, `None` when there is none
    fn is_merged(&self, branch: &str) -> Result<Option<bool>>;
}

/// Source of per-repository oracles
pub trait ReviewProvider: Send + Sync {
    fn ensure_authenticated(&self) -> Result<()>;

    /// `None` when the repository is not hosted on the review host
    fn oracle_for(&self, repo_path: &Path) -> Option<Arc<dyn ReviewOracle>>;
}

static HOSTED_ORIGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https://github\.com/|git@github\.com:|ssh://git@github\.com/)")
        .expect("static regex")
});

/// Origin URL points at github.com
pub fn is_hosted_url(url: &str) -> bool {
    HOSTED_ORIGIN.is_match(url.trim())
}

/// `gh` CLI provider
#[derive(Debug, Clone)]
pub struct GhProvider {
    timeout: Option<Duration>,
}

impl GhProvider {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Default for GhProvider {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(120)))
    }
}

impl ReviewProvider for GhProvider {
    fn ensure_authenticated(&self) -> Result<()> {
        Invocation::new("gh")
            .args(["auth", "status", "--hostname", "github.com"])
            .timeout(self.timeout)
            .output()
            .map(|_| ())
            .map_err(|_| CcwError::NotAuthenticated)
    }

    fn oracle_for(&self, repo_path: &Path) -> Option<Arc<dyn ReviewOracle>> {
        let url = Invocation::new("git")
            .arg("-C")
            .arg(repo_path.to_string_lossy())
            .args(["remote", "get-url", "origin"])
            .timeout(self.timeout)
            .output()
            .ok()?;

        if !is_hosted_url(&url) {
            log::debug!("{} origin {} is not on github.com", repo_path.display(), url);
            return None;
        }

        Some(Arc::new(GhClient {
            repo_path: repo_path.to_path_buf(),
            timeout: self.timeout,
        }))
    }
}

/// Pull-request lookups for a single repository
#[derive(Debug, Clone)]
pub struct GhClient {
    repo_path: PathBuf,
    timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrView {
    state: String,
    #[serde(default)]
    merged_at: Option<String>,
}

impl PrView {
    /// A merge timestamp counts even when the state string disagrees
    fn is_merged(&self) -> bool {
        self.state == "MERGED" || self.merged_at.as_deref().is_some_and(|at| !at.is_empty())
    }
}

impl ReviewOracle for GhClient {
    fn is_merged(&self, branch: &str) -> Result<Option<bool>> {
        let out = Invocation::new("gh")
            .args(["pr", "view", branch, "--json", "state,mergedAt"])
            .current_dir(&self.repo_path)
            .timeout(self.timeout)
            .output();

        match out {
            Ok(json) => parse_pr_view(&json).map(Some),
            Err(e) if e.command_exit_code() == Some(1) && is_no_record(e.command_stderr()) => {
                Ok(None)
            }
            Err(e) => Err(e.during("query pull request")),
        }
    }
}

fn is_no_record(stderr: &str) -> bool {
    stderr.contains("no pull requests found") || stderr.contains("Could not resolve")
}

fn parse_pr_view(json: &str) -> Result<bool> {
    let view: PrView = serde_json::from_str(json)?;
    Ok(view.is_merged())
}
