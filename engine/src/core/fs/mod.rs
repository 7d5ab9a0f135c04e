//! Filesystem utilities.
//!
//! Crash-tolerant writes for settings and exported artifacts, and validation
//! of the plain file names used inside the engine's scratch filesystem.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{CoreError, CoreResult};

// =============================================================================
// Name Validation
// =============================================================================

/// Validates that a name is a single plain file name.
///
/// Engine files live in one flat scratch directory, so names containing
/// path separators, traversal sequences, drive markers or control
/// characters are rejected.
pub fn validate_file_name(name: &str, label: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(format!("{label} is empty or contains only whitespace"));
    }
    if trimmed != name {
        return Err(format!("Invalid {label}: leading or trailing whitespace"));
    }
    if name == "." || name.contains("..") || name.contains('/') || name.contains('\\') || name.contains(':')
    {
        return Err(format!("Invalid {label}: contains path characters"));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(format!("Invalid {label}: contains control characters"));
    }
    Ok(())
}

// =============================================================================
// Atomic Writes
// =============================================================================

/// Write bytes to a file atomically (temp file + rename).
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = tmp_path_for(path);
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    atomic_replace(path, &tmp_path)
}

/// Write a JSON file atomically with pretty formatting.
pub fn atomic_write_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes)
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| suffix.to_string());
    path.with_file_name(format!("{file_name}.{suffix}"))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "tmp")
}

fn atomic_replace(dest: &Path, src_tmp: &Path) -> CoreResult<()> {
    if !dest.exists() {
        std::fs::rename(src_tmp, dest)?;
        return Ok(());
    }

    // rename-over-existing is not portable; swap through a backup.
    let bak = sibling_with_suffix(dest, "bak");
    if bak.exists() {
        let _ = std::fs::remove_file(&bak);
    }

    std::fs::rename(dest, &bak)?;
    match std::fs::rename(src_tmp, dest) {
        Ok(()) => {
            let _ = std::fs::remove_file(&bak);
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::rename(&bak, dest);
            let _ = std::fs::remove_file(src_tmp);
            Err(CoreError::IoError(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("input.mp4", "name").is_ok());
        assert!(validate_file_name("subs.ass", "name").is_ok());

        assert!(validate_file_name("", "name").is_err());
        assert!(validate_file_name("   ", "name").is_err());
        assert!(validate_file_name("../escape.mp4", "name").is_err());
        assert!(validate_file_name("dir/file.mp4", "name").is_err());
        assert!(validate_file_name("c:file", "name").is_err());
        assert!(validate_file_name("bad\nname", "name").is_err());
        assert!(validate_file_name(" padded ", "name").is_err());
    }

    #[test]
    fn test_atomic_write_bytes_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.ass");

        atomic_write_bytes(&path, b"one").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one");

        atomic_write_bytes(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");

        assert!(!tmp_path_for(&path).exists());
        assert!(!sibling_with_suffix(&path, "bak").exists());
    }

    #[test]
    fn test_atomic_write_json_pretty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("value.json");

        atomic_write_json_pretty(&path, &serde_json::json!({ "a": 1 })).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"a\": 1"));
    }
}
