//! Shared fixtures: real git repositories with a local bare origin, and
//! in-memory doubles for the session runner and review oracle.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ccw_core::assistant::AssistantCapabilities;
use ccw_core::{
    CcwError, Config, ConfigStore, Manager, Result, ReviewOracle, ReviewProvider, SessionRunner,
};

/// Run git in `dir`, panicking on failure, returning trimmed stdout
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} in {} failed: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Run git and report only success
pub fn git_ok(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

pub fn configure_user(dir: &Path) {
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test User"]);
}

/// Write `content` to `file` in `dir` and commit it
pub fn commit_file(dir: &Path, file: &str, content: &str, message: &str) {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-m", message]);
}

pub fn local_branch_exists(repo: &Path, branch: &str) -> bool {
    git_ok(
        repo,
        &["show-ref", "--verify", "--quiet", &format!("refs/heads/{}", branch)],
    )
}

pub fn remote_branch_exists(origin: &Path, branch: &str) -> bool {
    git_ok(
        origin,
        &["show-ref", "--verify", "--quiet", &format!("refs/heads/{}", branch)],
    )
}

/// Temp layout: `state/` (ccw root), `repos/<name>` (work repo), `origin.git`
pub struct TestEnv {
    pub temp: tempfile::TempDir,
    pub state: PathBuf,
    pub repos: PathBuf,
    pub repo: PathBuf,
    pub origin: PathBuf,
}

impl TestEnv {
    /// Repo `demo` on `main` with one commit, pushed to a bare origin
    pub fn new() -> Self {
        Self::with_repo("demo")
    }

    pub fn with_repo(name: &str) -> Self {
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let state = temp.path().join("state");
        let repos = temp.path().join("repos");
        let repo = repos.join(name);
        let origin = temp.path().join("origin.git");
        fs::create_dir_all(&repo).unwrap();

        git(temp.path(), &["init", "--bare", "-b", "main", "origin.git"]);
        git(&repo, &["init", "-b", "main"]);
        configure_user(&repo);
        commit_file(&repo, "README.md", "# demo\n", "init");
        git(&repo, &["remote", "add", "origin", &origin.to_string_lossy()]);
        git(&repo, &["push", "-u", "origin", "main"]);

        let env = Self {
            temp,
            state,
            repos,
            repo,
            origin,
        };
        env.write_config(Config::default());
        env
    }

    /// Repo cloned from origin with HEAD detached and no local `main`
    pub fn cloned_without_local_main() -> Self {
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let state = temp.path().join("state");
        let repos = temp.path().join("repos");
        let seed = temp.path().join("seed");
        let origin = temp.path().join("origin.git");
        fs::create_dir_all(&seed).unwrap();
        fs::create_dir_all(&repos).unwrap();

        git(temp.path(), &["init", "--bare", "-b", "main", "origin.git"]);
        git(&seed, &["init", "-b", "main"]);
        configure_user(&seed);
        commit_file(&seed, "README.md", "# demo\n", "init");
        git(&seed, &["remote", "add", "origin", &origin.to_string_lossy()]);
        git(&seed, &["push", "-u", "origin", "main"]);

        git(
            &repos,
            &["clone", &origin.to_string_lossy(), "demo"],
        );
        let repo = repos.join("demo");
        configure_user(&repo);
        git(&repo, &["checkout", "--detach"]);
        git(&repo, &["branch", "-D", "main"]);

        let env = Self {
            temp,
            state,
            repos,
            repo,
            origin,
        };
        env.write_config(Config::default());
        env
    }

    pub fn write_config(&self, mut cfg: Config) {
        cfg.repos_dir = self.repos.to_string_lossy().into_owned();
        ConfigStore::new(&self.state).save(&cfg).unwrap();
    }

    pub fn manager(&self, sessions: Arc<StubSessions>) -> Manager {
        Manager::new(&self.state, sessions)
            .unwrap()
            .with_assistant_capabilities(AssistantCapabilities::default())
            .with_interactive(false)
    }

    pub fn worktree(&self, safe_name: &str) -> PathBuf {
        self.state.join("worktrees").join(safe_name)
    }
}

/// In-memory session runner
#[derive(Default)]
pub struct StubSessions {
    pub sessions: Mutex<HashSet<String>>,
    pub attached: Mutex<HashSet<String>>,
    pub keys: Mutex<HashMap<String, Vec<String>>>,
    pub attach_calls: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_split: AtomicBool,
    pub fail_kill: AtomicBool,
}

impl StubSessions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn alive(&self, name: &str) -> bool {
        self.sessions.lock().unwrap().contains(name)
    }

    pub fn count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn set_attached(&self, name: &str) {
        self.attached.lock().unwrap().insert(name.to_string());
    }

    pub fn drop_session(&self, name: &str) {
        self.sessions.lock().unwrap().remove(name);
    }

    fn failure(what: &str) -> CcwError {
        CcwError::CommandFailed {
            program: "tmux".to_string(),
            args: vec![what.to_string()],
            code: Some(2),
            stderr: format!("{} failed", what),
        }
    }
}

impl SessionRunner for StubSessions {
    fn session_exists(&self, name: &str) -> Result<bool> {
        Ok(self.alive(name))
    }

    fn has_attached_clients(&self, name: &str) -> Result<bool> {
        Ok(self.attached.lock().unwrap().contains(name))
    }

    fn create_session(&self, name: &str, _path: &Path, _detached: bool) -> Result<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::failure("new-session"));
        }
        if !self.sessions.lock().unwrap().insert(name.to_string()) {
            return Err(CcwError::SessionExists {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        if self.fail_kill.load(Ordering::SeqCst) {
            return Err(Self::failure("kill-session"));
        }
        self.attached.lock().unwrap().remove(name);
        if self.sessions.lock().unwrap().remove(name) {
            Ok(())
        } else {
            Err(CcwError::SessionMissing {
                name: name.to_string(),
            })
        }
    }

    fn attach_session(&self, _name: &str) -> Result<()> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn split_pane(&self, session: &str, _horizontal: bool, _path: &Path) -> Result<()> {
        if self.fail_split.load(Ordering::SeqCst) {
            return Err(Self::failure("split-window"));
        }
        if !self.alive(session) {
            return Err(CcwError::SessionMissing {
                name: session.to_string(),
            });
        }
        Ok(())
    }

    fn send_keys(&self, target: &str, keys: &[String], _enter: bool) -> Result<()> {
        self.keys
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .extend(keys.iter().cloned());
        Ok(())
    }
}

/// Oracle answering from a fixed table of branch -> merged
#[derive(Default)]
pub struct StubOracle {
    pub answers: HashMap<String, bool>,
    pub fail: bool,
}

impl StubOracle {
    pub fn with(branch: &str, merged: bool) -> Self {
        let mut answers = HashMap::new();
        answers.insert(branch.to_string(), merged);
        Self {
            answers,
            fail: false,
        }
    }
}

impl ReviewOracle for StubOracle {
    fn is_merged(&self, branch: &str) -> Result<Option<bool>> {
        if self.fail {
            return Err(CcwError::CommandFailed {
                program: "gh".to_string(),
                args: vec!["pr".to_string(), "view".to_string()],
                code: Some(1),
                stderr: "HTTP 502".to_string(),
            });
        }
        Ok(self.answers.get(branch).copied())
    }
}

/// Provider handing out one shared oracle, or none for "not hosted"
pub struct StubProvider {
    pub oracle: Option<Arc<StubOracle>>,
    pub authenticated: bool,
    pub lookups: AtomicUsize,
}

impl StubProvider {
    pub fn hosted(oracle: StubOracle) -> Arc<Self> {
        Arc::new(Self {
            oracle: Some(Arc::new(oracle)),
            authenticated: true,
            lookups: AtomicUsize::new(0),
        })
    }

    pub fn not_hosted() -> Arc<Self> {
        Arc::new(Self {
            oracle: None,
            authenticated: true,
            lookups: AtomicUsize::new(0),
        })
    }
}

impl ReviewProvider for StubProvider {
    fn ensure_authenticated(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(CcwError::NotAuthenticated)
        }
    }

    fn oracle_for(&self, _repo_path: &Path) -> Option<Arc<dyn ReviewOracle>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.oracle
            .clone()
            .map(|oracle| oracle as Arc<dyn ReviewOracle>)
    }
}
