//! Workspace lifecycle
//!
//! The manager sequences multi-step creation and teardown across git, the
//! session runner, and the registry. Creation pushes a typed undo step after
//! each step that succeeds and unwinds them in reverse on failure. Removal
//! runs every safety check before the first destructive action, then attempts
//! each teardown step independently and reports all failures together.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use chrono::Utc;
use serde::Serialize;

use crate::assistant::{AssistantCapabilities, launch_command};
use crate::config::{Config, ConfigKey, ConfigStore};
use crate::error::{CcwError, Result};
use crate::git::{GitCli, ORIGIN, Vcs, default_worktree_path};
use crate::merge::{self, MergeVerdict};
use crate::naming::{safe_name, validate_branch, validate_name, workspace_id};
use crate::registry::{RegistryStore, Workspace};
use crate::review::{ReviewOracle, ReviewProvider};
use crate::tmux::SessionRunner;

const WORKTREES_DIR: &str = "worktrees";
const ENV_FILE: &str = ".env";

/// Options for [`Manager::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Empty means detect `main`/`master`
    pub base_branch: String,
    pub no_attach: bool,
    pub no_fetch: bool,
}

/// Options for [`Manager::open`]
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Resume the assistant's previous conversation when the session is rebuilt
    pub resume: bool,
    /// Attach even if other clients are already attached
    pub focus_existing: bool,
    /// Attach even when stdout is not a terminal
    pub force_attach: bool,
}

/// Confirmation callback: `(reason, differing files) -> proceed?`
pub type ConfirmFn<'a> = &'a dyn Fn(&str, &[String]) -> bool;

/// Options for [`Manager::remove`]
#[derive(Default)]
pub struct RemoveOptions<'a> {
    pub force: bool,
    pub keep_branch: bool,
    pub keep_worktree: bool,
    /// Asked when work would be lost; without it removal fails instead
    pub confirm: Option<ConfirmFn<'a>>,
}

/// A workspace plus its live session state
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceStatus {
    pub id: String,
    pub workspace: Workspace,
    pub session_alive: bool,
    pub has_clients: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeVerdict>,
}

/// Compensating action for one completed creation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoStep {
    DeleteBranch { repo: PathBuf, branch: String },
    DeleteRemoteBranch { repo: PathBuf, branch: String },
    RemoveWorktree { repo: PathBuf, path: PathBuf },
    KillSession { name: String },
}

impl UndoStep {
    fn apply(&self, vcs: &dyn Vcs, sessions: &dyn SessionRunner) -> Result<()> {
        match self {
            UndoStep::DeleteBranch { repo, branch } => vcs.delete_branch(repo, branch, true),
            UndoStep::DeleteRemoteBranch { repo, branch } => {
                vcs.delete_remote_branch(repo, ORIGIN, branch)
            }
            UndoStep::RemoveWorktree { repo, path } => vcs.remove_worktree(repo, path, true),
            UndoStep::KillSession { name } => sessions.kill_session(name),
        }
    }

    fn describe(&self) -> String {
        match self {
            UndoStep::DeleteBranch { branch, .. } => format!("delete branch {}", branch),
            UndoStep::DeleteRemoteBranch { branch, .. } => {
                format!("delete remote branch {}/{}", ORIGIN, branch)
            }
            UndoStep::RemoveWorktree { path, .. } => format!("remove worktree {}", path.display()),
            UndoStep::KillSession { name } => format!("kill session {}", name),
        }
    }
}

/// Ordered undo log for a creation in progress
#[derive(Debug, Default)]
pub struct Rollback {
    steps: Vec<UndoStep>,
}

impl Rollback {
    pub fn push(&mut self, step: UndoStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[UndoStep] {
        &self.steps
    }

    /// Undo in reverse order; failures are logged and never returned
    pub fn run(self, vcs: &dyn Vcs, sessions: &dyn SessionRunner) {
        for step in self.steps.into_iter().rev() {
            match step.apply(vcs, sessions) {
                Ok(()) => log::debug!("rollback: {}", step.describe()),
                Err(e) => log::warn!("rollback: {} failed: {}", step.describe(), e),
            }
        }
    }
}

/// Workspace lifecycle manager
pub struct Manager {
    root: PathBuf,
    config: Config,
    config_store: ConfigStore,
    registry: RegistryStore,
    vcs: Arc<dyn Vcs>,
    sessions: Arc<dyn SessionRunner>,
    review: Option<Arc<dyn ReviewProvider>>,
    oracles: Mutex<HashMap<PathBuf, Option<Arc<dyn ReviewOracle>>>>,
    capabilities: OnceLock<AssistantCapabilities>,
    secondary_available: OnceLock<bool>,
    interactive: bool,
}

impl Manager {
    /// Load (or initialise) the config under `root` and build a manager over it
    pub fn new(root: impl Into<PathBuf>, sessions: Arc<dyn SessionRunner>) -> Result<Self> {
        let root = root.into();
        let config_store = ConfigStore::new(&root);
        let config = config_store.load()?;
        let registry = RegistryStore::new(&root).with_lock_timeout(config.lock_timeout());
        let vcs: Arc<dyn Vcs> = Arc::new(GitCli::new(Some(config.git_timeout())));

        Ok(Self {
            root,
            config,
            config_store,
            registry,
            vcs,
            sessions,
            review: None,
            oracles: Mutex::new(HashMap::new()),
            capabilities: OnceLock::new(),
            secondary_available: OnceLock::new(),
            interactive: console::Term::stdout().is_term(),
        })
    }

    pub fn with_vcs(mut self, vcs: Arc<dyn Vcs>) -> Self {
        self.vcs = vcs;
        self
    }

    /// Require hosted repositories and consult pull requests for merge checks
    pub fn with_review_provider(mut self, provider: Arc<dyn ReviewProvider>) -> Self {
        self.review = Some(provider);
        self
    }

    /// Skip probing the assistant binary
    pub fn with_assistant_capabilities(mut self, caps: AssistantCapabilities) -> Self {
        self.capabilities = OnceLock::from(caps);
        self
    }

    /// Override terminal detection for attach decisions
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &RegistryStore {
        &self.registry
    }

    /// Oracle for a repository, resolved once per manager
    fn oracle_for(&self, repo_path: &Path) -> Option<Arc<dyn ReviewOracle>> {
        let provider = self.review.as_ref()?;
        let mut cache = self.oracles.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .entry(repo_path.to_path_buf())
            .or_insert_with(|| provider.oracle_for(repo_path))
            .clone()
    }

    fn capabilities(&self) -> &AssistantCapabilities {
        self.capabilities.get_or_init(AssistantCapabilities::detect)
    }

    fn secondary_available(&self) -> bool {
        *self.secondary_available.get_or_init(|| {
            let found = which::which(&self.config.secondary_tool).is_ok();
            log::debug!("{} on PATH: {}", self.config.secondary_tool, found);
            found
        })
    }

    /// Create branch, remote branch, worktree, and session, then register them
    pub fn create(&self, repo: &str, branch: &str, opts: &CreateOptions) -> Result<Workspace> {
        validate_name("repo name", repo)?;
        validate_branch(branch)?;

        let repo_path = self.config.expanded_repos_dir()?.join(repo);
        let repo_path = self.vcs.validate_repo(&repo_path)?;

        if let Some(provider) = &self.review {
            if self.oracle_for(&repo_path).is_none() {
                return Err(CcwError::NotHostedRepository {
                    repo: repo.to_string(),
                });
            }
            provider.ensure_authenticated()?;
        }

        let id = workspace_id(repo, branch);
        let name = safe_name(repo, branch);
        let worktree_path = default_worktree_path(&self.root.join(WORKTREES_DIR), &name)?;

        let mut rollback = Rollback::default();
        let ws = match self.create_steps(
            repo,
            branch,
            &name,
            &repo_path,
            &worktree_path,
            opts,
            &mut rollback,
        ) {
            Ok(ws) => ws,
            Err(e) => {
                log::info!("create {} failed, rolling back: {}", id, e);
                rollback.run(self.vcs.as_ref(), self.sessions.as_ref());
                return Err(e);
            }
        };
        log::info!("created workspace {}", id);

        if !opts.no_attach && self.interactive {
            self.sessions.attach_session(&name)?;
        }

        Ok(ws)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_steps(
        &self,
        repo: &str,
        branch: &str,
        name: &str,
        repo_path: &Path,
        worktree_path: &Path,
        opts: &CreateOptions,
        rollback: &mut Rollback,
    ) -> Result<Workspace> {
        let base_branch =
            self.vcs
                .create_branch(repo_path, branch, &opts.base_branch, !opts.no_fetch)?;
        rollback.push(UndoStep::DeleteBranch {
            repo: repo_path.to_path_buf(),
            branch: branch.to_string(),
        });
        log::debug!("created branch {} from {}", branch, base_branch);

        self.vcs
            .push_branch(repo_path, branch)
            .map_err(|e| e.during("push branch"))?;
        rollback.push(UndoStep::DeleteRemoteBranch {
            repo: repo_path.to_path_buf(),
            branch: branch.to_string(),
        });

        self.vcs
            .create_worktree(repo_path, worktree_path, branch)
            .map_err(|e| e.during("create worktree"))?;
        rollback.push(UndoStep::RemoveWorktree {
            repo: repo_path.to_path_buf(),
            path: worktree_path.to_path_buf(),
        });

        copy_file_if_exists(&repo_path.join(ENV_FILE), &worktree_path.join(ENV_FILE))
            .map_err(|e| e.during("copy .env"))?;

        self.bootstrap_session(name, worktree_path, false)?;
        rollback.push(UndoStep::KillSession {
            name: name.to_string(),
        });

        let now = Utc::now();
        let ws = Workspace {
            repo: repo.to_string(),
            repo_path: repo_path.to_path_buf(),
            branch: branch.to_string(),
            base_branch,
            worktree_path: worktree_path.to_path_buf(),
            claude_session: name.to_string(),
            tmux_session: name.to_string(),
            created_at: now,
            last_accessed_at: now,
        };

        let entry = ws.clone();
        self.registry.update(|reg| reg.add(entry))?;

        Ok(ws)
    }

    /// Detached two-pane session: assistant left, secondary tool right
    ///
    /// A session created here is killed again if a later step fails.
    fn bootstrap_session(&self, name: &str, path: &Path, resume: bool) -> Result<()> {
        self.sessions.create_session(name, path, true)?;

        let result = self.sessions.split_pane(name, true, path).and_then(|()| {
            let cmd = launch_command(
                name,
                resume,
                self.capabilities(),
                self.config.skip_permissions,
            );
            self.sessions
                .send_keys(&format!("{}:0.0", name), &[cmd], true)
        });

        if let Err(e) = result {
            if let Err(kill) = self.sessions.kill_session(name) {
                log::warn!("kill half-built session {}: {}", name, kill);
            }
            return Err(e.during("bootstrap session"));
        }

        if self.secondary_available() {
            let tool = self.config.secondary_tool.clone();
            if let Err(e) = self
                .sessions
                .send_keys(&format!("{}:0.1", name), &[tool], true)
            {
                log::warn!("launch {} in {}: {}", self.config.secondary_tool, name, e);
            }
        }

        Ok(())
    }

    fn lookup(&self, query: &str) -> Result<(String, Workspace)> {
        validate_name("workspace identifier", query)?;
        self.registry.read()?.resolve(query)
    }

    fn status(&self, id: String, ws: Workspace) -> WorkspaceStatus {
        let session_alive = self
            .sessions
            .session_exists(&ws.tmux_session)
            .unwrap_or(false);
        let has_clients = session_alive
            && self
                .sessions
                .has_attached_clients(&ws.tmux_session)
                .unwrap_or(false);

        WorkspaceStatus {
            id,
            workspace: ws,
            session_alive,
            has_clients,
            merge: None,
        }
    }

    /// Rebuild the session if needed, touch last-accessed, and attach
    pub fn open(&self, query: &str, opts: &OpenOptions) -> Result<Workspace> {
        let (id, ws) = self.lookup(query)?;

        if self.sessions.session_exists(&ws.tmux_session)? {
            let has_clients = self
                .sessions
                .has_attached_clients(&ws.tmux_session)
                .unwrap_or(false);
            if has_clients && !opts.focus_existing {
                return Err(CcwError::WorkspaceAlreadyOpen { id });
            }
        } else {
            log::info!("session {} missing, rebuilding", ws.tmux_session);
            self.bootstrap_session(&ws.tmux_session, &ws.worktree_path, opts.resume)?;
        }

        let now = Utc::now();
        let ws = self.registry.update(|reg| {
            let entry = reg
                .workspaces
                .get_mut(&id)
                .ok_or_else(|| CcwError::WorkspaceNotFound { query: id.clone() })?;
            entry.last_accessed_at = now;
            Ok(entry.clone())
        })?;

        if opts.force_attach || self.interactive {
            self.sessions.attach_session(&ws.tmux_session)?;
        }

        Ok(ws)
    }

    /// Every workspace with live session state, sorted by id
    pub fn list(&self) -> Result<Vec<WorkspaceStatus>> {
        let reg = self.registry.read()?;
        Ok(reg
            .workspaces
            .into_iter()
            .map(|(id, ws)| self.status(id, ws))
            .collect())
    }

    pub fn info(&self, query: &str) -> Result<WorkspaceStatus> {
        let (id, ws) = self.lookup(query)?;
        Ok(self.status(id, ws))
    }

    /// Safety checks, then teardown of worktree, branches, registry entry, session
    ///
    /// Returns the id the query resolved to.
    pub fn remove(&self, query: &str, opts: &RemoveOptions<'_>) -> Result<String> {
        let (id, ws) = self.lookup(query)?;

        let mut force = opts.force;
        let mut merged = false;

        if !opts.keep_branch && !force {
            let outcome = self.check_removal(&ws, opts.confirm)?;
            force = outcome.force;
            merged = outcome.merged;
        }

        let mut failures = Vec::new();
        let repo = ws.repo_path.as_path();

        if !opts.keep_worktree {
            if let Err(e) = self.vcs.remove_worktree(repo, &ws.worktree_path, true) {
                failures.push(e.during("remove worktree"));
            }
        }

        if !opts.keep_branch {
            if self.vcs.branch_exists(repo, &ws.branch).unwrap_or(false) {
                // A verified merge may still fail `-d` when its upstream is gone
                match self.vcs.delete_branch(repo, &ws.branch, force || merged) {
                    Ok(()) | Err(CcwError::BranchNotFound { .. }) => {}
                    Err(e) => failures.push(e.during("delete branch")),
                }
            }

            if self
                .vcs
                .remote_branch_exists(repo, ORIGIN, &ws.branch)
                .unwrap_or(false)
            {
                if let Err(e) = self.vcs.delete_remote_branch(repo, ORIGIN, &ws.branch) {
                    failures.push(e.during("delete remote branch"));
                }
            }
        }

        if let Err(e) = self.registry.update(|reg| {
            reg.remove(&id);
            Ok(())
        }) {
            failures.push(e.during("update registry"));
        }

        // Last, since the caller may be running inside this session
        match self.sessions.kill_session(&ws.tmux_session) {
            Ok(()) | Err(CcwError::SessionMissing { .. }) => {}
            Err(e) => failures.push(e.during("kill session")),
        }

        if failures.is_empty() {
            log::info!("removed workspace {}", id);
            Ok(id)
        } else {
            for failure in &failures {
                log::warn!("remove {}: {}", id, failure);
            }
            Err(CcwError::Teardown { failures })
        }
    }

    /// Non-destructive checks guarding branch deletion
    fn check_removal(&self, ws: &Workspace, confirm: Option<ConfirmFn<'_>>) -> Result<RemovalCheck> {
        let repo = ws.repo_path.as_path();
        let mut check = RemovalCheck::default();

        let base_label = if ws.base_branch.is_empty() {
            self.vcs.detect_default_branch(repo).unwrap_or_default()
        } else {
            ws.base_branch.clone()
        };

        if !self.vcs.branch_exists(repo, &ws.branch).unwrap_or(false) {
            // Pushed work outlives a deleted local branch
            if !self
                .vcs
                .remote_branch_exists(repo, ORIGIN, &ws.branch)
                .unwrap_or(false)
            {
                return Ok(check);
            }
            self.vcs.fetch(repo, true).map_err(|e| e.during("fetch"))?;
            let oracle = self.checked_oracle(repo)?;
            check.force = self.check_remote(ws, &base_label, oracle.as_deref(), confirm)?;
            return Ok(check);
        }

        self.vcs.fetch(repo, true).map_err(|e| e.during("fetch"))?;
        let oracle = self.checked_oracle(repo)?;
        let oracle = oracle.as_deref();

        let verdict = merge::is_merged(self.vcs.as_ref(), repo, &ws.branch, &ws.base_branch, oracle)?;
        log::debug!("{} against {}: {}", ws.branch, base_label, verdict);
        check.merged = verdict.is_merged();

        if !check.merged {
            let files = self
                .vcs
                .diff_files(repo, &ws.branch, &ws.base_branch)
                .unwrap_or_default();
            let message = format!("Branch {:?} has changes not in {:?}", ws.branch, base_label);
            match confirm {
                Some(ask) if ask(&message, &files) => check.force = true,
                Some(_) => return Err(CcwError::Aborted),
                None => {
                    return Err(CcwError::Unmerged {
                        branch: ws.branch.clone(),
                        base: base_label,
                    });
                }
            }
            return Ok(check);
        }

        if self.has_unpushed_work(ws)? {
            return Err(CcwError::UnpushedCommits {
                branch: ws.branch.clone(),
            });
        }

        check.force = self.check_remote(ws, &base_label, oracle, confirm)?;
        Ok(check)
    }

    /// Oracle for `repo` after the provider confirms it is logged in
    fn checked_oracle(&self, repo: &Path) -> Result<Option<Arc<dyn ReviewOracle>>> {
        match &self.review {
            Some(provider) => {
                provider.ensure_authenticated()?;
                Ok(self.oracle_for(repo))
            }
            None => Ok(None),
        }
    }

    /// Guard `origin/<branch>`: true when the user agreed to lose its extra commits
    fn check_remote(
        &self,
        ws: &Workspace,
        base_label: &str,
        oracle: Option<&dyn ReviewOracle>,
        confirm: Option<ConfirmFn<'_>>,
    ) -> Result<bool> {
        let repo = ws.repo_path.as_path();
        if !merge::remote_branch_has_unmerged_commits(
            self.vcs.as_ref(),
            repo,
            &ws.branch,
            &ws.base_branch,
            oracle,
        )? {
            return Ok(false);
        }

        let remote = format!("{}/{}", ORIGIN, ws.branch);
        let files = self
            .vcs
            .diff_files(repo, &remote, &ws.base_branch)
            .unwrap_or_default();
        let message = format!("Remote branch {:?} has changes not in {:?}", remote, base_label);
        match confirm {
            Some(ask) if ask(&message, &files) => Ok(true),
            Some(_) => Err(CcwError::Aborted),
            None => Err(CcwError::RemoteUnmerged {
                branch: ws.branch.clone(),
                base: base_label.to_string(),
            }),
        }
    }

    /// Local commits absent from both the remote branch and base
    ///
    /// A remote branch deleted after its pull request merged is not "unpushed".
    fn has_unpushed_work(&self, ws: &Workspace) -> Result<bool> {
        let repo = ws.repo_path.as_path();
        let remote = format!("{}/{}", ORIGIN, ws.branch);
        if !self.vcs.ref_exists(repo, &remote)? {
            return Ok(false);
        }
        if !self.vcs.has_unpushed_commits(repo, &ws.branch)? {
            return Ok(false);
        }
        let base_ref = self.vcs.resolve_base_ref(repo, &ws.base_branch)?;
        Ok(!self.vcs.is_ancestor(repo, &ws.branch, &base_ref)?)
    }

    /// Workspaces whose branch is merged into its base, sorted by id
    ///
    /// With `force`, a workspace whose verdict cannot be computed is skipped
    /// instead of failing the scan.
    pub fn stale(&self, force: bool) -> Result<Vec<WorkspaceStatus>> {
        if let Some(provider) = &self.review {
            provider.ensure_authenticated()?;
        }

        let reg = self.registry.read()?;
        let mut stale = Vec::new();

        for (id, ws) in reg.workspaces {
            let oracle = self.oracle_for(&ws.repo_path);
            let verdict = match merge::is_merged(
                self.vcs.as_ref(),
                &ws.repo_path,
                &ws.branch,
                &ws.base_branch,
                oracle.as_deref(),
            ) {
                Ok(verdict) => verdict,
                Err(e) if force => {
                    log::warn!("skipping {}: {}", id, e);
                    continue;
                }
                Err(e) => return Err(e.during(format!("check {}", id))),
            };

            if verdict.is_merged() {
                let mut status = self.status(id, ws);
                status.merge = Some(verdict);
                stale.push(status);
            }
        }

        Ok(stale)
    }

    /// Repository directories under `repos_dir`, sorted
    pub fn repositories(&self) -> Result<Vec<String>> {
        let dir = self.config.expanded_repos_dir()?;
        let entries = fs::read_dir(&dir)
            .map_err(|e| CcwError::from(e).during(format!("read {}", dir.display())))?;

        let mut repos = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.file_type()?.is_dir() {
                continue;
            }
            repos.push(name);
        }
        repos.sort();
        Ok(repos)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate, persist, and apply one setting
    pub fn set_config(&mut self, key: ConfigKey, value: &str) -> Result<&Config> {
        let mut cfg = self.config.clone();
        cfg.set(key, value)?;
        self.config_store.save(&cfg)?;
        self.config = cfg;
        Ok(&self.config)
    }

    pub fn reset_config(&mut self) -> Result<&Config> {
        let cfg = Config::default();
        self.config_store.save(&cfg)?;
        self.config = cfg;
        Ok(&self.config)
    }
}

#[derive(Debug, Default)]
struct RemovalCheck {
    merged: bool,
    force: bool,
}

fn copy_file_if_exists(src: &Path, dst: &Path) -> Result<()> {
    match fs::copy(src, dst) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound && !src.exists() => Ok(()),
        Err(e) => Err(e.into()),
    }
}
