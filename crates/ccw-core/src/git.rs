//! Version-control primitives
//!
//! `Vcs` is the capability interface the merge detector and lifecycle manager
//! consume. `GitCli` implements it over the `git` binary. Existence probes map
//! exit code 1 to "not found"; every other failure is a hard error.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CcwError, Result};
use crate::process::Invocation;

/// Remote every workspace branch is pushed to
pub const ORIGIN: &str = "origin";

/// Version-control operations used by ccw
pub trait Vcs: Send + Sync {
    /// Confirm `path` is an existing git work tree and return it
    fn validate_repo(&self, path: &Path) -> Result<PathBuf>;

    /// Local branch `refs/heads/<branch>` exists
    fn branch_exists(&self, repo: &Path, branch: &str) -> Result<bool>;

    /// Branch exists on `remote` (asks the remote, not the tracking refs)
    fn remote_branch_exists(&self, repo: &Path, remote: &str, branch: &str) -> Result<bool>;

    /// Any revision (`origin/main`, a sha, ...) resolves
    fn ref_exists(&self, repo: &Path, rev: &str) -> Result<bool>;

    /// Create `branch` pointing at `start`
    fn create_branch_at(&self, repo: &Path, branch: &str, start: &str) -> Result<()>;

    fn delete_branch(&self, repo: &Path, branch: &str, force: bool) -> Result<()>;

    fn delete_remote_branch(&self, repo: &Path, remote: &str, branch: &str) -> Result<()>;

    /// Push to origin and set upstream
    fn push_branch(&self, repo: &Path, branch: &str) -> Result<()>;

    fn create_worktree(&self, repo: &Path, path: &Path, branch: &str) -> Result<()>;

    /// Remove a worktree; a path that is already gone is not an error
    fn remove_worktree(&self, repo: &Path, path: &Path, force: bool) -> Result<()>;

    fn fetch(&self, repo: &Path, prune: bool) -> Result<()>;

    /// `a` is an ancestor of `b`
    fn is_ancestor(&self, repo: &Path, a: &str, b: &str) -> Result<bool>;

    fn merge_base(&self, repo: &Path, a: &str, b: &str) -> Result<String>;

    /// Files that differ between two revisions
    fn changed_files(&self, repo: &Path, from: &str, to: &str) -> Result<Vec<String>>;

    /// The given paths have identical content at `a` and `b`
    fn paths_identical(&self, repo: &Path, a: &str, b: &str, paths: &[String]) -> Result<bool>;

    /// Number of commits in a revision range such as `a..b`
    fn count_commits(&self, repo: &Path, range: &str) -> Result<u64>;

    /// Exactly one of `main`/`master` must exist, locally or on origin
    fn detect_default_branch(&self, repo: &Path) -> Result<String> {
        let main = self.branch_or_remote_exists(repo, "main");
        let master = self.branch_or_remote_exists(repo, "master");

        match (main, master) {
            (true, true) => Err(CcwError::AmbiguousDefaultBranch),
            (true, false) => Ok("main".to_string()),
            (false, true) => Ok("master".to_string()),
            (false, false) => Err(CcwError::NoDefaultBranch),
        }
    }

    /// Existence check that treats probe failures as absence
    fn branch_or_remote_exists(&self, repo: &Path, branch: &str) -> bool {
        if self.branch_exists(repo, branch).unwrap_or(false) {
            return true;
        }
        self.ref_exists(repo, &format!("{}/{}", ORIGIN, branch))
            .unwrap_or(false)
    }

    /// Resolve the base branch name, auto-detecting when empty
    fn resolve_base_name(&self, repo: &Path, base: &str) -> Result<String> {
        if base.is_empty() {
            self.detect_default_branch(repo)
        } else {
            Ok(base.to_string())
        }
    }

    /// Resolve the ref to compare against, preferring `origin/<base>`
    fn resolve_base_ref(&self, repo: &Path, base: &str) -> Result<String> {
        let base = self.resolve_base_name(repo, base)?;

        let remote = format!("{}/{}", ORIGIN, base);
        if self.ref_exists(repo, &remote)? {
            return Ok(remote);
        }
        if self.ref_exists(repo, &base)? {
            return Ok(base);
        }
        Err(CcwError::BaseBranchNotFound { branch: base })
    }

    /// Create a new workspace branch from its base
    ///
    /// Returns the resolved base branch name. Fails with `BranchExists` or
    /// `RemoteBranchFound` when the name is already taken.
    fn create_branch(&self, repo: &Path, branch: &str, base: &str, fetch: bool) -> Result<String> {
        if fetch {
            self.fetch(repo, true)?;
        }

        if self.branch_exists(repo, branch)? {
            return Err(CcwError::BranchExists {
                branch: branch.to_string(),
            });
        }
        if self.remote_branch_exists(repo, ORIGIN, branch)? {
            return Err(CcwError::RemoteBranchFound {
                branch: branch.to_string(),
            });
        }

        let base_name = self.resolve_base_name(repo, base)?;
        let base_ref = self.resolve_base_ref(repo, &base_name)?;
        self.create_branch_at(repo, branch, &base_ref)?;
        Ok(base_name)
    }

    /// Missing `origin/<branch>` counts as unpushed
    fn has_unpushed_commits(&self, repo: &Path, branch: &str) -> Result<bool> {
        let remote = format!("{}/{}", ORIGIN, branch);
        if !self.ref_exists(repo, &remote)? {
            return Ok(true);
        }
        Ok(self.count_commits(repo, &format!("{}..{}", remote, branch))? > 0)
    }

    /// Files differing between `branch` and the resolved base
    fn diff_files(&self, repo: &Path, branch: &str, base: &str) -> Result<Vec<String>> {
        let base_ref = self.resolve_base_ref(repo, base)?;
        self.changed_files(repo, branch, &base_ref)
    }
}

/// Deterministic worktree location for a workspace
pub fn default_worktree_path(root: &Path, safe_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(root).map_err(|e| CcwError::from(e).during("create worktree root"))?;
    Ok(root.join(safe_name))
}

/// `git` subprocess implementation of [`Vcs`]
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Option<Duration>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl GitCli {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn git(&self, repo: &Path) -> Invocation {
        Invocation::new("git")
            .arg("-C")
            .arg(repo.to_string_lossy())
            .timeout(self.timeout)
    }

    fn run<I, S>(&self, repo: &Path, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.git(repo).args(args).output()
    }
}

impl Vcs for GitCli {
    fn validate_repo(&self, path: &Path) -> Result<PathBuf> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CcwError::RepoNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !meta.is_dir() || self.run(path, ["rev-parse", "--is-inside-work-tree"]).is_err() {
            return Err(CcwError::NotAGitRepository {
                path: path.display().to_string(),
            });
        }

        Ok(path.to_path_buf())
    }

    fn branch_exists(&self, repo: &Path, branch: &str) -> Result<bool> {
        let head = format!("refs/heads/{}", branch);
        self.git(repo)
            .args(["show-ref", "--verify", "--quiet", &head])
            .probe()
    }

    fn remote_branch_exists(&self, repo: &Path, remote: &str, branch: &str) -> Result<bool> {
        match self.run(repo, ["ls-remote", "--heads", remote, branch]) {
            Ok(out) => Ok(!out.is_empty()),
            // Missing remote: nothing can exist there
            Err(e) if e.command_exit_code() == Some(128) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn ref_exists(&self, repo: &Path, rev: &str) -> Result<bool> {
        match self.run(repo, ["rev-parse", "--verify", "--quiet", rev]) {
            Ok(_) => Ok(true),
            Err(e) if e.command_exit_code().is_some() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn create_branch_at(&self, repo: &Path, branch: &str, start: &str) -> Result<()> {
        self.run(repo, ["branch", branch, start])?;
        Ok(())
    }

    fn delete_branch(&self, repo: &Path, branch: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        match self.run(repo, ["branch", flag, branch]) {
            Ok(_) => Ok(()),
            Err(e) if e.command_stderr().contains("not found") => Err(CcwError::BranchNotFound {
                branch: branch.to_string(),
            }),
            Err(e) if !force && e.command_stderr().contains("not fully merged") => {
                Err(CcwError::BranchNotMerged {
                    branch: branch.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn delete_remote_branch(&self, repo: &Path, remote: &str, branch: &str) -> Result<()> {
        self.run(repo, ["push", remote, "--delete", branch])?;
        Ok(())
    }

    fn push_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        self.run(repo, ["remote", "get-url", ORIGIN])
            .map_err(|e| e.during("origin remote not found"))?;
        self.run(repo, ["push", "-u", ORIGIN, branch])?;
        Ok(())
    }

    fn create_worktree(&self, repo: &Path, path: &Path, branch: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CcwError::from(e).during("create worktree parent dir"))?;
        }
        let path = path.to_string_lossy();
        self.run(repo, ["worktree", "add", path.as_ref(), branch])?;
        Ok(())
    }

    fn remove_worktree(&self, repo: &Path, path: &Path, force: bool) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let path = path.to_string_lossy();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(path.as_ref());

        match self.run(repo, args) {
            Ok(_) => Ok(()),
            Err(e) if e.command_stderr().contains("is not a working tree") => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn fetch(&self, repo: &Path, prune: bool) -> Result<()> {
        let mut args = vec!["fetch"];
        if prune {
            args.push("--prune");
        }
        self.run(repo, args)?;
        Ok(())
    }

    fn is_ancestor(&self, repo: &Path, a: &str, b: &str) -> Result<bool> {
        self.git(repo)
            .args(["merge-base", "--is-ancestor", a, b])
            .probe()
    }

    fn merge_base(&self, repo: &Path, a: &str, b: &str) -> Result<String> {
        self.run(repo, ["merge-base", a, b])
    }

    fn changed_files(&self, repo: &Path, from: &str, to: &str) -> Result<Vec<String>> {
        let out = self.run(repo, ["diff", "--name-only", from, to])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn paths_identical(&self, repo: &Path, a: &str, b: &str, paths: &[String]) -> Result<bool> {
        let mut args = vec!["diff", "--quiet", a, b, "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(repo).args(args).probe()
    }

    fn count_commits(&self, repo: &Path, range: &str) -> Result<u64> {
        let out = self.run(repo, ["rev-list", "--count", range])?;
        out.parse::<u64>()
            .map_err(|e| CcwError::Config(format!("unexpected rev-list output {:?}: {}", out, e)))
    }
}
