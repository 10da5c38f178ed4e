//! JSON output formatting
//!
//! Every `--json` invocation prints exactly one [`JsonResponse`] envelope on
//! stdout, including failures.

use std::path::PathBuf;

use serde::Serialize;

use ccw_core::{CcwError, Config, WorkspaceStatus};

const SCHEMA_VERSION: &str = "1";

/// JSON response envelope
#[derive(Debug, Clone, Serialize)]
pub struct JsonResponse<T> {
    /// Schema version for forward compatibility
    pub schema_version: String,
    /// Command that generated this response
    pub command: String,
    /// Status: "ok" or "error"
    pub status: String,
    /// Command-specific payload
    pub data: T,
    /// Errors and warnings
    pub issues: Vec<JsonIssue>,
}

impl<T> JsonResponse<T> {
    /// Create a successful response
    pub fn ok(command: &str, data: T) -> Self {
        Self::ok_with_issues(command, data, vec![])
    }

    /// Create a successful response with issues
    pub fn ok_with_issues(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "ok".to_string(),
            data,
            issues,
        }
    }

    /// Create an error response
    pub fn error(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "error".to_string(),
            data,
            issues,
        }
    }
}

impl<T: Serialize> JsonResponse<T> {
    pub fn print(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// Issue object structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonIssue {
    /// Error code (e.g., "E015")
    pub code: String,
    /// "error" or "warning"
    pub severity: String,
    /// Human-readable message
    pub message: String,
    /// Workspace the issue is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
}

impl JsonIssue {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity: "error".to_string(),
            message: message.into(),
            workspace: None,
        }
    }

    /// Set the workspace ID
    pub fn with_workspace(mut self, id: &str) -> Self {
        self.workspace = Some(id.to_string());
        self
    }
}

impl From<&CcwError> for JsonIssue {
    fn from(err: &CcwError) -> Self {
        JsonIssue::error(err.code(), err.to_string())
    }
}

/// Data payload for new and open
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceData {
    pub id: String,
    pub workspace: ccw_core::Workspace,
}

/// A listed workspace with its `ccw ls` index
#[derive(Debug, Clone, Serialize)]
pub struct IndexedStatus {
    /// 1-based position in the full, unfiltered list
    pub index: usize,
    #[serde(flatten)]
    pub status: WorkspaceStatus,
}

/// Data payload for ls
#[derive(Debug, Clone, Serialize)]
pub struct ListData {
    pub workspaces: Vec<IndexedStatus>,
}

/// Data payload for rm
#[derive(Debug, Clone, Serialize)]
pub struct RemoveData {
    pub id: String,
}

/// Data payload for stale
#[derive(Debug, Clone, Serialize)]
pub struct StaleData {
    pub workspaces: Vec<WorkspaceStatus>,
    /// IDs removed with `--rm`
    pub removed: Vec<String>,
}

/// Data payload for repos
#[derive(Debug, Clone, Serialize)]
pub struct ReposData {
    pub repos_dir: PathBuf,
    pub repositories: Vec<String>,
}

/// Data payload for config
#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub path: PathBuf,
    pub config: Config,
}

/// Data payload for version
#[derive(Debug, Clone, Serialize)]
pub struct VersionData {
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let response = JsonResponse::ok(
            "repos",
            ReposData {
                repos_dir: PathBuf::from("/home/u/github"),
                repositories: vec!["api".to_string()],
            },
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["schema_version"], "1");
        assert_eq!(value["command"], "repos");
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"]["repositories"][0], "api");
        assert!(value["issues"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_issue_from_core_error() {
        let err = CcwError::WorkspaceNotFound {
            query: "nope".to_string(),
        };
        let issue = JsonIssue::from(&err).with_workspace("nope");
        assert_eq!(issue.code, "E015");
        assert_eq!(issue.severity, "error");
        assert!(issue.message.contains("nope"));

        let value = serde_json::to_value(JsonIssue::error("E001", "bad")).unwrap();
        assert!(value.get("workspace").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let response = JsonResponse::error(
            "rm",
            serde_json::Value::Null,
            vec![JsonIssue::error("E030", "not merged")],
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "error");
        assert!(value["data"].is_null());
        assert_eq!(value["issues"][0]["code"], "E030");
    }
}
