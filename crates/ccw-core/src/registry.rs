//! Durable workspace registry
//!
//! The registry is a single JSON document, `workspaces.json`, guarded by a
//! sibling lock file. Readers take a shared lock and writers an exclusive one;
//! both poll against a deadline instead of blocking. Every save backs up the
//! previous file and replaces it with a temp-file rename, so a reader never
//! sees a half-written document. An unparsable document is recovered from the
//! newest readable backup without reporting anything to the caller.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CcwError, Result};
use crate::storage::{backup_file, list_backups, write_atomic};

pub const REGISTRY_FILE: &str = "workspaces.json";
pub const LOCK_FILE: &str = "workspaces.json.lock";

/// Schema version written by this build
pub const CURRENT_VERSION: u32 = 1;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(50);

/// A registered workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub repo: String,
    pub repo_path: PathBuf,
    pub branch: String,
    /// Resolved at creation; empty in older records means auto-detect
    #[serde(default)]
    pub base_branch: String,
    pub worktree_path: PathBuf,
    pub claude_session: String,
    pub tmux_session: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl Workspace {
    pub fn id(&self) -> String {
        crate::naming::workspace_id(&self.repo, &self.branch)
    }
}

/// The on-disk document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub workspaces: BTreeMap<String, Workspace>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            workspaces: BTreeMap::new(),
        }
    }
}

impl Registry {
    /// Insert a workspace under its own id; an existing id is never overwritten
    pub fn add(&mut self, ws: Workspace) -> Result<()> {
        let id = ws.id();
        if self.workspaces.contains_key(&id) {
            return Err(CcwError::WorkspaceExists { id });
        }
        self.workspaces.insert(id, ws);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Workspace> {
        self.workspaces.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Workspace> {
        self.workspaces.get(id)
    }

    /// Ids containing `partial`, case-insensitively, in sorted order
    pub fn find_by_partial_name(&self, partial: &str) -> Vec<String> {
        let needle = partial.to_lowercase();
        self.workspaces
            .keys()
            .filter(|id| id.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// All ids in the order `ccw ls` numbers them
    pub fn sorted_ids(&self) -> Vec<String> {
        self.workspaces.keys().cloned().collect()
    }

    /// Resolve a user-supplied handle
    ///
    /// Precedence: exact id, then 1-based index over sorted ids, then a
    /// unique case-insensitive substring. An exact match wins even when the
    /// id looks numeric; `0` is never an index.
    pub fn resolve(&self, query: &str) -> Result<(String, Workspace)> {
        if let Some(ws) = self.workspaces.get(query) {
            return Ok((query.to_string(), ws.clone()));
        }

        if let Some(index) = query.parse::<usize>().ok().filter(|&i| i > 0) {
            let ids = self.sorted_ids();
            if index > ids.len() {
                return Err(CcwError::IndexOutOfRange {
                    index,
                    count: ids.len(),
                });
            }
            let id = ids[index - 1].clone();
            let ws = self.workspaces[&id].clone();
            return Ok((id, ws));
        }

        let mut matches = self.find_by_partial_name(query);
        match matches.len() {
            0 => Err(CcwError::WorkspaceNotFound {
                query: query.to_string(),
            }),
            1 => {
                let id = matches.remove(0);
                let ws = self.workspaces[&id].clone();
                Ok((id, ws))
            }
            _ => Err(CcwError::AmbiguousWorkspace { matches }),
        }
    }
}

/// Lock held for the duration of a read or update
struct RegistryLock {
    file: File,
}

impl RegistryLock {
    fn acquire(path: &Path, exclusive: bool, timeout: Duration) -> Result<Self> {
        let mode = if exclusive { "write" } else { "read" };
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| CcwError::from(e).during(format!("open {} lock", mode)))?;

        let deadline = Instant::now() + timeout;
        loop {
            let attempt = if exclusive {
                fs2::FileExt::try_lock_exclusive(&file)
            } else {
                fs2::FileExt::try_lock_shared(&file)
            };

            match attempt {
                Ok(()) => return Ok(Self { file }),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {}
                Err(e) => return Err(CcwError::from(e).during(format!("acquire {} lock", mode))),
            }

            if Instant::now() >= deadline {
                return Err(CcwError::LockTimeout {
                    mode,
                    millis: timeout.as_millis() as u64,
                });
            }
            thread::sleep(LOCK_RETRY);
        }
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Lock-protected access to `<root>/workspaces.json`
#[derive(Debug, Clone)]
pub struct RegistryStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl RegistryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    fn lock(&self, exclusive: bool) -> Result<RegistryLock> {
        fs::create_dir_all(&self.root)
            .map_err(|e| CcwError::from(e).during("create registry dir"))?;
        RegistryLock::acquire(&self.lock_path(), exclusive, self.lock_timeout)
    }

    /// Snapshot under a shared lock
    pub fn read(&self) -> Result<Registry> {
        let _lock = self.lock(false)?;
        self.load()
    }

    /// Load, mutate, save under an exclusive lock
    ///
    /// Nothing is written when `f` fails.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Registry) -> Result<T>,
    {
        let _lock = self.lock(true)?;
        let mut reg = self.load()?;
        let out = f(&mut reg)?;
        self.save(reg)?;
        Ok(out)
    }

    fn load(&self) -> Result<Registry> {
        let path = self.registry_path();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Registry::default()),
            Err(e) => return Err(CcwError::from(e).during("read registry")),
        };

        let reg = match serde_json::from_slice::<Registry>(&data) {
            Ok(reg) => reg,
            Err(parse_err) => match self.load_latest_backup()? {
                Some((reg, backup)) => {
                    log::debug!("registry unreadable, recovered from {}", backup.display());
                    reg
                }
                None => {
                    return Err(CcwError::CorruptRegistry {
                        reason: parse_err.to_string(),
                    });
                }
            },
        };

        check_version(&reg)?;
        Ok(reg)
    }

    fn load_latest_backup(&self) -> Result<Option<(Registry, PathBuf)>> {
        for backup in list_backups(&self.registry_path())? {
            let Ok(data) = fs::read(&backup) else { continue };
            match serde_json::from_slice::<Registry>(&data) {
                Ok(reg) if reg.version == CURRENT_VERSION => return Ok(Some((reg, backup))),
                _ => continue,
            }
        }
        Ok(None)
    }

    fn save(&self, mut reg: Registry) -> Result<()> {
        if reg.version == 0 {
            reg.version = CURRENT_VERSION;
        }

        let path = self.registry_path();
        backup_file(&path).map_err(|e| e.during("backup existing registry"))?;

        let data = serde_json::to_vec_pretty(&reg)?;
        write_atomic(&path, &data).map_err(|e| e.during("write registry"))
    }
}

fn check_version(reg: &Registry) -> Result<()> {
    if reg.version != CURRENT_VERSION {
        return Err(CcwError::UnsupportedVersion {
            what: "registry",
            found: reg.version,
            expected: CURRENT_VERSION,
        });
    }
    Ok(())
}
