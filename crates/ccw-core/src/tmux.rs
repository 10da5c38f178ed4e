//! Terminal-multiplexer session runner

use std::env;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{CcwError, Result};
use crate::process::Invocation;

/// Session operations the lifecycle manager depends on
pub trait SessionRunner: Send + Sync {
    fn session_exists(&self, name: &str) -> Result<bool>;

    fn has_attached_clients(&self, name: &str) -> Result<bool>;

    /// Fails with `SessionExists` if a session of that name is already running
    fn create_session(&self, name: &str, path: &Path, detached: bool) -> Result<()>;

    /// Fails with `SessionMissing` if there is nothing to kill
    fn kill_session(&self, name: &str) -> Result<()>;

    fn attach_session(&self, name: &str) -> Result<()>;

    fn split_pane(&self, session: &str, horizontal: bool, path: &Path) -> Result<()>;

    fn send_keys(&self, target: &str, keys: &[String], enter: bool) -> Result<()>;
}

/// Exact-match session target; a bare name would also match any session it prefixes
fn exact(name: &str) -> String {
    format!("={}", name)
}

/// Pane or window target pinned to an exact session name
///
/// Bare session names become `=<name>:` so tmux targets that session's
/// current window rather than guessing.
pub fn normalize_target(target: &str) -> String {
    let target = target.strip_prefix('=').unwrap_or(target);
    if target.contains(':') {
        exact(target)
    } else {
        format!("={}:", target)
    }
}

/// `tmux` subprocess implementation of [`SessionRunner`]
#[derive(Debug, Clone, Default)]
pub struct TmuxRunner;

impl TmuxRunner {
    pub fn new() -> Self {
        Self
    }

    fn tmux<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Invocation::new("tmux").args(args)
    }
}

impl SessionRunner for TmuxRunner {
    fn session_exists(&self, name: &str) -> Result<bool> {
        self.tmux(["has-session", "-t", exact(name).as_str()]).probe()
    }

    fn has_attached_clients(&self, name: &str) -> Result<bool> {
        let out = self
            .tmux(["list-clients", "-t", exact(name).as_str(), "-F", "#{client_name}"])
            .output()?;
        Ok(!out.is_empty())
    }

    fn create_session(&self, name: &str, path: &Path, detached: bool) -> Result<()> {
        if self.session_exists(name)? {
            return Err(CcwError::SessionExists {
                name: name.to_string(),
            });
        }

        let path = path.to_string_lossy();
        let mut args = vec!["new-session"];
        if detached {
            args.push("-d");
        }
        args.extend(["-s", name]);
        if !path.is_empty() {
            args.extend(["-c", path.as_ref()]);
        }

        self.tmux(args).output()?;
        Ok(())
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        match self.tmux(["kill-session", "-t", exact(name).as_str()]).output() {
            Ok(_) => Ok(()),
            Err(e) if e.command_exit_code() == Some(1) => Err(CcwError::SessionMissing {
                name: name.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    fn attach_session(&self, name: &str) -> Result<()> {
        // Nesting tmux is refused by tmux itself; move the current client instead
        let verb = if env::var_os("TMUX").is_some_and(|v| !v.is_empty()) {
            "switch-client"
        } else {
            "attach-session"
        };

        let target = exact(name);
        log::debug!("exec: tmux {} -t {}", verb, target);

        // Attaching takes over the terminal, so stdio is inherited
        let status = Command::new("tmux")
            .args([verb, "-t", target.as_str()])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| CcwError::Spawn {
                program: "tmux".to_string(),
                source: e,
            })?;

        if !status.success() {
            return Err(CcwError::CommandFailed {
                program: "tmux".to_string(),
                args: vec![verb.to_string(), "-t".to_string(), target],
                code: status.code(),
                stderr: String::new(),
            });
        }
        Ok(())
    }

    fn split_pane(&self, session: &str, horizontal: bool, path: &Path) -> Result<()> {
        let target = normalize_target(session);
        let path = path.to_string_lossy();
        let mut args = vec!["split-window", "-t", target.as_str()];
        args.push(if horizontal { "-h" } else { "-v" });
        if !path.is_empty() {
            args.extend(["-c", path.as_ref()]);
        }

        self.tmux(args).output()?;
        Ok(())
    }

    fn send_keys(&self, target: &str, keys: &[String], enter: bool) -> Result<()> {
        let target = normalize_target(target);
        let mut args = vec!["send-keys".to_string(), "-t".to_string(), target];
        args.extend(keys.iter().cloned());
        if enter {
            args.push("Enter".to_string());
        }

        self.tmux(args).output()?;
        Ok(())
    }
}
