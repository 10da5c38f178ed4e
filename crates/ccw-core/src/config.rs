//! Configuration handling for ccw
//!
//! Stored as TOML at `<root>/config.toml` and written with the same
//! backup-then-rename discipline as the registry.

use std::env;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CcwError, Result};
use crate::storage::{backup_file, write_atomic};

pub const CONFIG_FILE: &str = "config.toml";

/// Schema version written by this build
pub const CURRENT_VERSION: u32 = 1;

/// Environment variable overriding the state root
pub const HOME_ENV: &str = "CCW_HOME";

const STATE_DIR: &str = ".ccw";

/// ccw configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub version: u32,

    /// Directory holding the repositories workspaces are created from
    #[serde(default = "default_repos_dir")]
    pub repos_dir: String,

    /// Program launched in the right-hand pane when it is on PATH
    #[serde(default = "default_secondary_tool")]
    pub secondary_tool: String,

    /// Launch the assistant with permission prompts suppressed
    #[serde(default)]
    pub skip_permissions: bool,

    #[serde(default = "default_git_timeout_secs")]
    pub git_timeout_secs: u64,

    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_repos_dir() -> String {
    "~/github".to_string()
}

fn default_secondary_tool() -> String {
    "lazygit".to_string()
}

fn default_git_timeout_secs() -> u64 {
    120
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            repos_dir: default_repos_dir(),
            secondary_tool: default_secondary_tool(),
            skip_permissions: false,
            git_timeout_secs: default_git_timeout_secs(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    pub fn expanded_repos_dir(&self) -> Result<PathBuf> {
        expand_path(&self.repos_dir)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Current value of a key, formatted as `ccw config` prints it
    pub fn get(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::ReposDir => self.repos_dir.clone(),
            ConfigKey::SecondaryTool => self.secondary_tool.clone(),
            ConfigKey::SkipPermissions => self.skip_permissions.to_string(),
            ConfigKey::GitTimeoutSecs => self.git_timeout_secs.to_string(),
            ConfigKey::LockTimeoutMs => self.lock_timeout_ms.to_string(),
        }
    }

    /// Parse and assign one field; the config is untouched on error
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            ConfigKey::ReposDir => {
                if value.is_empty() {
                    return Err(invalid(key, "path cannot be empty"));
                }
                self.repos_dir = value.to_string();
            }
            ConfigKey::SecondaryTool => {
                if value.is_empty() {
                    return Err(invalid(key, "tool name cannot be empty"));
                }
                self.secondary_tool = value.to_string();
            }
            ConfigKey::SkipPermissions => self.skip_permissions = parse_bool(key, value)?,
            ConfigKey::GitTimeoutSecs => self.git_timeout_secs = parse_positive(key, value)?,
            ConfigKey::LockTimeoutMs => self.lock_timeout_ms = parse_positive(key, value)?,
        }
        Ok(())
    }
}

/// Settable configuration fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ReposDir,
    SecondaryTool,
    SkipPermissions,
    GitTimeoutSecs,
    LockTimeoutMs,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::ReposDir,
        ConfigKey::SecondaryTool,
        ConfigKey::SkipPermissions,
        ConfigKey::GitTimeoutSecs,
        ConfigKey::LockTimeoutMs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::ReposDir => "repos_dir",
            ConfigKey::SecondaryTool => "secondary_tool",
            ConfigKey::SkipPermissions => "skip_permissions",
            ConfigKey::GitTimeoutSecs => "git_timeout_secs",
            ConfigKey::LockTimeoutMs => "lock_timeout_ms",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = CcwError;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CcwError::Config(format!("unknown config key: {}", s)))
    }
}

fn invalid(key: ConfigKey, reason: &str) -> CcwError {
    CcwError::Config(format!("invalid {}: {}", key, reason))
}

fn parse_bool(key: ConfigKey, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(key, "expected true or false")),
    }
}

fn parse_positive(key: ConfigKey, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(key, "expected a positive integer")),
    }
}

/// Expand a leading `~` and make the path absolute
pub fn expand_path(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        return Ok(PathBuf::new());
    }

    let expanded = match path.strip_prefix('~') {
        Some(rest) => home_dir()?.join(rest.trim_start_matches('/')),
        None => PathBuf::from(path),
    };

    std::path::absolute(&expanded).map_err(|e| CcwError::from(e).during("resolve absolute path"))
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| CcwError::Config("cannot resolve home directory".to_string()))
}

/// `$CCW_HOME`, or `~/.ccw`
pub fn state_root() -> Result<PathBuf> {
    match env::var(HOME_ENV) {
        Ok(root) if !root.is_empty() => expand_path(&root),
        _ => Ok(home_dir()?.join(STATE_DIR)),
    }
}

/// Reads and writes `<root>/config.toml`
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Load the config, writing defaults on first use
    pub fn load(&self) -> Result<Config> {
        let text = match fs::read_to_string(self.path()) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let cfg = Config::default();
                self.save(&cfg)?;
                return Ok(cfg);
            }
            Err(e) => return Err(CcwError::from(e).during("read config")),
        };

        let cfg: Config = toml::from_str(&text)
            .map_err(|e| CcwError::Config(format!("parse {}: {}", self.path().display(), e)))?;

        if cfg.version != CURRENT_VERSION {
            return Err(CcwError::UnsupportedVersion {
                what: "config",
                found: cfg.version,
                expected: CURRENT_VERSION,
            });
        }
        Ok(cfg)
    }

    pub fn save(&self, cfg: &Config) -> Result<()> {
        let mut cfg = cfg.clone();
        if cfg.version == 0 {
            cfg.version = CURRENT_VERSION;
        }

        fs::create_dir_all(&self.root)
            .map_err(|e| CcwError::from(e).during("create config dir"))?;
        backup_file(&self.path()).map_err(|e| e.during("backup existing config"))?;

        let text = toml::to_string_pretty(&cfg)
            .map_err(|e| CcwError::Config(format!("encode config: {}", e)))?;
        write_atomic(&self.path(), text.as_bytes()).map_err(|e| e.during("write config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.repos_dir, "~/github");
        assert_eq!(cfg.secondary_tool, "lazygit");
        assert!(!cfg.skip_permissions);
        assert_eq!(cfg.lock_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!("repos_dir".parse::<ConfigKey>().unwrap(), ConfigKey::ReposDir);
        assert_eq!(
            "lock_timeout_ms".parse::<ConfigKey>().unwrap(),
            ConfigKey::LockTimeoutMs
        );
        for key in ConfigKey::ALL {
            assert_eq!(key.as_str().parse::<ConfigKey>().unwrap(), key);
        }
        assert!("iterm_cc_mode".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_set_validates_per_field() {
        let mut cfg = Config::default();

        cfg.set(ConfigKey::SkipPermissions, "yes").unwrap();
        assert!(cfg.skip_permissions);
        cfg.set(ConfigKey::SkipPermissions, "0").unwrap();
        assert!(!cfg.skip_permissions);
        assert!(cfg.set(ConfigKey::SkipPermissions, "maybe").is_err());

        cfg.set(ConfigKey::GitTimeoutSecs, "30").unwrap();
        assert_eq!(cfg.git_timeout_secs, 30);
        assert!(cfg.set(ConfigKey::GitTimeoutSecs, "0").is_err());
        assert!(cfg.set(ConfigKey::LockTimeoutMs, "-5").is_err());
        assert_eq!(cfg.lock_timeout_ms, 5000);

        assert!(cfg.set(ConfigKey::SecondaryTool, "  ").is_err());
        cfg.set(ConfigKey::SecondaryTool, "tig").unwrap();
        assert_eq!(cfg.get(ConfigKey::SecondaryTool), "tig");
    }

    #[test]
    fn test_expand_path() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_path("~/github").unwrap(), home.join("github"));
        assert_eq!(expand_path("~").unwrap(), home);
        assert_eq!(expand_path("/srv/repos").unwrap(), PathBuf::from("/srv/repos"));
        assert!(expand_path("relative").unwrap().is_absolute());
    }

    #[test]
    fn test_store_writes_defaults_once() {
        let temp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(temp.path());

        let cfg = store.load().unwrap();
        assert_eq!(cfg, Config::default());
        assert!(store.path().exists());
    }

    #[test]
    fn test_store_roundtrip_backs_up_previous() {
        let temp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(temp.path());
        store.load().unwrap();

        let mut cfg = Config::default();
        cfg.set(ConfigKey::ReposDir, "/srv/repos").unwrap();
        store.save(&cfg).unwrap();

        assert_eq!(store.load().unwrap().repos_dir, "/srv/repos");
        let backups = crate::storage::list_backups(&store.path()).unwrap();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_store_rejects_unknown_version() {
        let temp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(temp.path());
        fs::write(store.path(), "version = 7\n").unwrap();

        match store.load() {
            Err(CcwError::UnsupportedVersion { found, .. }) => assert_eq!(found, 7),
            other => panic!("expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_store_fills_missing_fields() {
        let temp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(temp.path());
        fs::write(store.path(), "version = 1\nrepos_dir = \"/x\"\n").unwrap();

        let cfg = store.load().unwrap();
        assert_eq!(cfg.repos_dir, "/x");
        assert_eq!(cfg.git_timeout_secs, 120);
    }
}
