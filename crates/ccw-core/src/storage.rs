//! Timestamped backups and atomic file replacement

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{CcwError, Result};

/// Suffix separating a file name from its backup timestamp
pub const BACKUP_SUFFIX: &str = ".bak-";

const BACKUP_TIMESTAMP: &str = "%Y%m%dT%H%M%SZ";

/// Copy `path` to `<path>.bak-<UTC timestamp>` next to it
///
/// Returns `None` when there is nothing to back up. Backups are never pruned.
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CcwError::from(e).during("stat file for backup")),
    };
    if meta.is_dir() {
        return Err(CcwError::Config(format!(
            "backup target is a directory: {}",
            path.display()
        )));
    }

    let backup = backup_path(path, &Utc::now().format(BACKUP_TIMESTAMP).to_string());
    fs::copy(path, &backup).map_err(|e| CcwError::from(e).during("write backup"))?;
    Ok(Some(backup))
}

fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    name.push(stamp);
    PathBuf::from(name)
}

/// Backups of `path`, newest first (by mtime, then by name)
pub fn list_backups(path: &Path) -> Result<Vec<PathBuf>> {
    let Some(dir) = path.parent() else {
        return Ok(Vec::new());
    };
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let prefix = format!("{}{}", file_name, BACKUP_SUFFIX);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut backups = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(&prefix) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        backups.push((meta.modified()?, name.to_string(), entry.path()));
    }

    backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(backups.into_iter().map(|(_, _, path)| path).collect())
}

/// Write via `<path>.tmp` and rename over `path`
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(|e| CcwError::from(e).during("write temp file"))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(CcwError::from(e).during("rename temp file"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_missing_file_is_none() {
        let temp = tempfile::tempdir().unwrap();
        assert!(backup_file(&temp.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn test_backup_directory_is_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(backup_file(temp.path()).is_err());
    }

    #[test]
    fn test_backup_copies_contents() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("workspaces.json");
        fs::write(&file, "{\"version\":1}").unwrap();

        let backup = backup_file(&file).unwrap().expect("backup created");
        let name = backup.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("workspaces.json.bak-"));
        assert!(name.ends_with('Z'));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "{\"version\":1}");
    }

    #[test]
    fn test_list_backups_ignores_other_files() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("workspaces.json");
        fs::write(temp.path().join("workspaces.json.bak-20240101T000000Z"), "a").unwrap();
        fs::write(temp.path().join("workspaces.json.lock"), "").unwrap();
        fs::write(temp.path().join("config.toml.bak-20240101T000000Z"), "b").unwrap();

        let backups = list_backups(&file).unwrap();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].ends_with("workspaces.json.bak-20240101T000000Z"));
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("config.toml");
        fs::write(&file, "old").unwrap();

        write_atomic(&file, b"new").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "new");
        assert!(!temp.path().join("config.toml.tmp").exists());
    }
}
