//! ccw-core: workspace orchestration for ccw
//!
//! A workspace pairs a git branch and worktree with a tmux session running a
//! coding assistant. This crate owns the registry, merge detection, and the
//! lifecycle manager; the `ccw` binary is a thin layer over [`Manager`].

/// Core error types for ccw operations
pub mod error;

/// Workspace identifiers and safe names
pub mod naming;

/// Subprocess execution with deadlines
pub mod process;

/// Backups and atomic writes
pub mod storage;

/// Version-control primitives
pub mod git;

/// tmux session runner
pub mod tmux;

/// Pull-request merge oracle
pub mod review;

/// Merge detection
pub mod merge;

/// Workspace registry store
pub mod registry;

/// Configuration handling
pub mod config;

/// Assistant launch command
pub mod assistant;

/// Workspace lifecycle manager
pub mod manager;

// Re-exports for convenience
pub use config::{Config, ConfigKey, ConfigStore, state_root};
pub use error::{CcwError, Result};
pub use git::{GitCli, Vcs};
pub use manager::{
    CreateOptions, Manager, OpenOptions, RemoveOptions, Rollback, UndoStep, WorkspaceStatus,
};
pub use merge::MergeVerdict;
pub use naming::{safe_name, workspace_id};
pub use registry::{Registry, RegistryStore, Workspace};
pub use review::{GhProvider, ReviewOracle, ReviewProvider};
pub use tmux::{SessionRunner, TmuxRunner};
