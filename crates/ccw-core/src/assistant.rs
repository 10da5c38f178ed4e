//! Launch command for the coding assistant

use std::time::Duration;

use crate::process::Invocation;

pub const ASSISTANT_PROGRAM: &str = "claude";

const SKIP_PERMISSIONS_FLAG: &str = "--dangerously-skip-permissions";

/// Flags the installed assistant understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantCapabilities {
    pub supports_resume: bool,
    /// `--session-name` or `--name`, when either is supported
    pub session_name_flag: Option<&'static str>,
}

impl Default for AssistantCapabilities {
    fn default() -> Self {
        Self {
            supports_resume: true,
            session_name_flag: None,
        }
    }
}

impl AssistantCapabilities {
    /// Inspect `claude --help`; any failure yields the defaults
    pub fn detect() -> Self {
        match Invocation::new(ASSISTANT_PROGRAM)
            .arg("--help")
            .timeout(Some(Duration::from_secs(10)))
            .output()
        {
            Ok(help) => Self::from_help(&help),
            Err(e) => {
                log::debug!("assistant capability detection failed: {}", e);
                Self::default()
            }
        }
    }

    /// Flags as advertised by readable help text; only detection failure assumes `--resume`
    pub fn from_help(help: &str) -> Self {
        let text = help.to_lowercase();
        let session_name_flag = if text.contains("--session-name") {
            Some("--session-name")
        } else if text.contains("--name") {
            Some("--name")
        } else {
            None
        };
        Self {
            supports_resume: text.contains("--resume"),
            session_name_flag,
        }
    }
}

/// Command line typed into the assistant pane
pub fn launch_command(
    name: &str,
    resume: bool,
    caps: &AssistantCapabilities,
    skip_permissions: bool,
) -> String {
    let mut cmd = if resume && caps.supports_resume {
        format!("{} --resume {}", ASSISTANT_PROGRAM, name)
    } else if let Some(flag) = caps.session_name_flag {
        format!("{} {} {}", ASSISTANT_PROGRAM, flag, name)
    } else {
        ASSISTANT_PROGRAM.to_string()
    };

    if skip_permissions {
        cmd.push(' ');
        cmd.push_str(SKIP_PERMISSIONS_FLAG);
    }
    cmd
}
