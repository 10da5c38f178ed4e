//! Error types for ccw operations

use thiserror::Error;

/// Result alias used throughout ccw-core
pub type Result<T, E = CcwError> = std::result::Result<T, E>;

/// Core error type for ccw operations
#[derive(Error, Debug)]
pub enum CcwError {
    // === Validation errors (E001) ===
    /// E001: Malformed repository, branch, or workspace identifier
    #[error("E001: invalid {what}: {reason}")]
    Validation { what: &'static str, reason: String },

    // === Expected-state errors (E010-E027) ===
    /// E010: Local branch already exists
    #[error("E010: branch already exists: {branch}")]
    BranchExists { branch: String },

    /// E011: Branch already exists on the remote
    #[error("E011: remote branch already exists: origin/{branch}")]
    RemoteBranchFound { branch: String },

    /// E012: Branch not found
    #[error("E012: branch not found: {branch}")]
    BranchNotFound { branch: String },

    /// E013: Safe delete refused because the branch is not fully merged
    #[error("E013: branch not merged: {branch}")]
    BranchNotMerged { branch: String },

    /// E014: Registry already holds this identifier
    #[error("E014: workspace {id} already exists")]
    WorkspaceExists { id: String },

    /// E015: No workspace matched the query
    #[error("E015: workspace {query} not found (try ccw ls)")]
    WorkspaceNotFound { query: String },

    /// E016: Partial name matched more than one workspace
    #[error(
        "E016: multiple workspaces match: {}\nPlease specify a full workspace ID (repo/branch).",
        matches.join(", ")
    )]
    AmbiguousWorkspace { matches: Vec<String> },

    /// E017: Numeric index outside 1..=count
    #[error("E017: workspace index {index} out of range (have {count} workspaces)")]
    IndexOutOfRange { index: usize, count: usize },

    /// E018: Session already has attached clients
    #[error("E018: workspace already open: {id} (use --focus to attach anyway)")]
    WorkspaceAlreadyOpen { id: String },

    /// E019: tmux session already exists
    #[error("E019: tmux session already exists: {name}")]
    SessionExists { name: String },

    /// E020: tmux session not found
    #[error("E020: tmux session not found: {name}")]
    SessionMissing { name: String },

    /// E021: Both main and master exist
    #[error("E021: both 'main' and 'master' branches exist; specify --base explicitly")]
    AmbiguousDefaultBranch,

    /// E022: Neither main nor master exists
    #[error("E022: neither 'main' nor 'master' branch found; specify --base explicitly")]
    NoDefaultBranch,

    /// E023: Explicit base branch could not be resolved
    #[error("E023: base branch {branch} not found")]
    BaseBranchNotFound { branch: String },

    /// E024: Repository directory does not exist
    #[error("E024: repository not found: {path}")]
    RepoNotFound { path: String },

    /// E025: Directory is not a git work tree
    #[error("E025: not a git repository: {path}")]
    NotAGitRepository { path: String },

    /// E026: origin does not point at GitHub
    #[error("E026: repository {repo:?} is not hosted on GitHub; ccw requires GitHub repositories")]
    NotHostedRepository { repo: String },

    /// E027: gh CLI not authenticated
    #[error("E027: gh CLI is not authenticated; run `gh auth login`")]
    NotAuthenticated,

    // === Safety aborts (E030-E033) ===
    /// E030: Local branch has work that is not in base
    #[error(
        "E030: branch {branch:?} is not merged into {base:?}.\nUse --force to delete anyway, or --keep-branch to only remove the workspace."
    )]
    Unmerged { branch: String, base: String },

    /// E031: Remote branch has work that is not in base
    #[error(
        "E031: remote branch \"origin/{branch}\" has commits not merged into {base:?}.\nUse --force to delete anyway, or --keep-branch to only remove the workspace."
    )]
    RemoteUnmerged { branch: String, base: String },

    /// E032: Local commits never pushed
    #[error("E032: branch {branch:?} has unpushed commits. Push or use --force/--keep-branch.")]
    UnpushedCommits { branch: String },

    /// E033: User declined the confirmation prompt
    #[error("E033: aborted")]
    Aborted,

    // === Infrastructure errors (E040-E048) ===
    /// E040: External command exited unsuccessfully
    #[error(
        "E040: {program} {} failed with exit code {}: {stderr}",
        args.join(" "),
        code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string())
    )]
    CommandFailed {
        program: String,
        args: Vec<String>,
        code: Option<i32>,
        stderr: String,
    },

    /// E041: External command exceeded its deadline
    #[error("E041: {program} {} timed out after {secs} seconds", args.join(" "))]
    CommandTimeout {
        program: String,
        args: Vec<String>,
        secs: u64,
    },

    /// E042: External command could not be started
    #[error("E042: failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// E043: Registry lock not acquired in time
    #[error("E043: acquire {mode} lock: timed out after {millis}ms")]
    LockTimeout { mode: &'static str, millis: u64 },

    /// E044: Registry unparsable and no backup could be used
    #[error("E044: parse registry and no usable backup: {reason}")]
    CorruptRegistry { reason: String },

    /// E045: On-disk document has a schema version we don't understand
    #[error("E045: unsupported {what} version {found} (expected {expected})")]
    UnsupportedVersion {
        what: &'static str,
        found: u32,
        expected: u32,
    },

    /// E046: IO error
    #[error("E046: IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E047: JSON encode/decode error
    #[error("E047: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// E048: Configuration error
    #[error("E048: configuration error: {0}")]
    Config(String),

    // === Wrapping and accumulation ===
    /// Infrastructure error annotated with the failing operation
    #[error("{op}: {source}")]
    Op {
        op: String,
        #[source]
        source: Box<CcwError>,
    },

    /// E050: One or more independent teardown steps failed
    #[error("E050: {}", join_errors(failures))]
    Teardown { failures: Vec<CcwError> },
}

fn join_errors(errors: &[CcwError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl CcwError {
    /// Build a validation error
    pub fn validation(what: &'static str, reason: impl Into<String>) -> Self {
        CcwError::Validation {
            what,
            reason: reason.into(),
        }
    }

    /// Wrap this error with the name of the operation that produced it
    pub fn during(self, op: impl Into<String>) -> Self {
        CcwError::Op {
            op: op.into(),
            source: Box::new(self),
        }
    }

    /// Strip operation wrappers
    pub fn root(&self) -> &CcwError {
        match self {
            CcwError::Op { source, .. } => source.root(),
            other => other,
        }
    }

    /// Exit code of a failed external command, if that is what this is
    pub fn command_exit_code(&self) -> Option<i32> {
        match self.root() {
            CcwError::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }

    /// stderr of a failed external command, or an empty string
    pub fn command_stderr(&self) -> &str {
        match self.root() {
            CcwError::CommandFailed { stderr, .. } => stderr,
            _ => "",
        }
    }

    /// Get the error code (e.g., "E001", "E040")
    pub fn code(&self) -> &'static str {
        match self {
            CcwError::Validation { .. } => "E001",
            CcwError::BranchExists { .. } => "E010",
            CcwError::RemoteBranchFound { .. } => "E011",
            CcwError::BranchNotFound { .. } => "E012",
            CcwError::BranchNotMerged { .. } => "E013",
            CcwError::WorkspaceExists { .. } => "E014",
            CcwError::WorkspaceNotFound { .. } => "E015",
            CcwError::AmbiguousWorkspace { .. } => "E016",
            CcwError::IndexOutOfRange { .. } => "E017",
            CcwError::WorkspaceAlreadyOpen { .. } => "E018",
            CcwError::SessionExists { .. } => "E019",
            CcwError::SessionMissing { .. } => "E020",
            CcwError::AmbiguousDefaultBranch => "E021",
            CcwError::NoDefaultBranch => "E022",
            CcwError::BaseBranchNotFound { .. } => "E023",
            CcwError::RepoNotFound { .. } => "E024",
            CcwError::NotAGitRepository { .. } => "E025",
            CcwError::NotHostedRepository { .. } => "E026",
            CcwError::NotAuthenticated => "E027",
            CcwError::Unmerged { .. } => "E030",
            CcwError::RemoteUnmerged { .. } => "E031",
            CcwError::UnpushedCommits { .. } => "E032",
            CcwError::Aborted => "E033",
            CcwError::CommandFailed { .. } => "E040",
            CcwError::CommandTimeout { .. } => "E041",
            CcwError::Spawn { .. } => "E042",
            CcwError::LockTimeout { .. } => "E043",
            CcwError::CorruptRegistry { .. } => "E044",
            CcwError::UnsupportedVersion { .. } => "E045",
            CcwError::Io(_) => "E046",
            CcwError::Json(_) => "E047",
            CcwError::Config(_) => "E048",
            CcwError::Op { source, .. } => source.code(),
            CcwError::Teardown { .. } => "E050",
        }
    }

    /// Get the process exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            CcwError::Validation { .. } => 2, // Rejected before any I/O

            CcwError::BranchExists { .. }
            | CcwError::RemoteBranchFound { .. }
            | CcwError::BranchNotFound { .. }
            | CcwError::BranchNotMerged { .. }
            | CcwError::WorkspaceExists { .. }
            | CcwError::WorkspaceNotFound { .. }
            | CcwError::AmbiguousWorkspace { .. }
            | CcwError::IndexOutOfRange { .. }
            | CcwError::WorkspaceAlreadyOpen { .. }
            | CcwError::SessionExists { .. }
            | CcwError::SessionMissing { .. }
            | CcwError::AmbiguousDefaultBranch
            | CcwError::NoDefaultBranch
            | CcwError::BaseBranchNotFound { .. }
            | CcwError::RepoNotFound { .. }
            | CcwError::NotAGitRepository { .. }
            | CcwError::NotHostedRepository { .. }
            | CcwError::NotAuthenticated => 3, // Expected state

            CcwError::Unmerged { .. }
            | CcwError::RemoteUnmerged { .. }
            | CcwError::UnpushedCommits { .. }
            | CcwError::Aborted => 4, // Safety abort

            CcwError::Teardown { .. } => 5, // Partial cleanup

            CcwError::Op { source, .. } => source.exit_code(),

            _ => 1, // Infrastructure
        }
    }

    /// True for errors the caller can clear with --force, --keep-branch, or confirmation
    pub fn is_safety_abort(&self) -> bool {
        self.root().exit_code() == 4
    }
}
