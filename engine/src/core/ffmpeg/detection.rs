//! FFmpeg Detection Module
//!
//! Locates the ffmpeg/ffprobe binaries and queries what they support.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::{EngineError, EngineResult};
use crate::core::process::configure_std_command;

#[cfg(target_os = "windows")]
const FFMPEG_BINARY: &str = "ffmpeg.exe";
#[cfg(not(target_os = "windows"))]
const FFMPEG_BINARY: &str = "ffmpeg";

#[cfg(target_os = "windows")]
const FFPROBE_BINARY: &str = "ffprobe.exe";
#[cfg(not(target_os = "windows"))]
const FFPROBE_BINARY: &str = "ffprobe";

/// Information about a detected FFmpeg installation
#[derive(Debug, Clone, PartialEq)]
pub struct EngineInfo {
    /// Path to ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// Path to ffprobe binary
    pub ffprobe_path: PathBuf,
    /// FFmpeg version string
    pub version: String,
}

/// Detects FFmpeg at an explicit path, or on the system otherwise
pub fn detect_ffmpeg(explicit: Option<&Path>) -> EngineResult<EngineInfo> {
    match explicit {
        Some(path) => detect_ffmpeg_at(path),
        None => detect_system_ffmpeg(),
    }
}

/// Uses an explicit ffmpeg binary; ffprobe is expected next to it
pub fn detect_ffmpeg_at(ffmpeg_path: &Path) -> EngineResult<EngineInfo> {
    if !ffmpeg_path.is_file() {
        return Err(EngineError::NotFound);
    }

    let sibling = ffmpeg_path
        .parent()
        .map(|dir| dir.join(FFPROBE_BINARY))
        .filter(|p| p.is_file());
    let ffprobe_path = match sibling {
        Some(path) => path,
        None => find_binary(FFPROBE_BINARY)?,
    };

    let version = get_ffmpeg_version(ffmpeg_path)?;
    info!("Using FFmpeg {} at {}", version, ffmpeg_path.display());

    Ok(EngineInfo {
        ffmpeg_path: ffmpeg_path.to_path_buf(),
        ffprobe_path,
        version,
    })
}

/// Detects FFmpeg from PATH and common install locations
pub fn detect_system_ffmpeg() -> EngineResult<EngineInfo> {
    let ffmpeg_path = find_binary(FFMPEG_BINARY)?;
    let ffprobe_path = find_binary(FFPROBE_BINARY)?;
    let version = get_ffmpeg_version(&ffmpeg_path)?;

    debug!("Detected system FFmpeg {} at {}", version, ffmpeg_path.display());

    Ok(EngineInfo {
        ffmpeg_path,
        ffprobe_path,
        version,
    })
}

/// Searches PATH first, then the platform's common install directories
fn find_binary(binary_name: &str) -> EngineResult<PathBuf> {
    let path_dirs = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();

    path_dirs
        .into_iter()
        .chain(get_common_ffmpeg_paths())
        .map(|dir| dir.join(binary_name))
        .find(|candidate| candidate.is_file())
        .ok_or(EngineError::NotFound)
}

/// Common FFmpeg installation paths for the current platform
fn get_common_ffmpeg_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from(r"C:\ffmpeg\bin"));
        paths.push(PathBuf::from(r"C:\Program Files\ffmpeg\bin"));

        if let Ok(programdata) = std::env::var("ProgramData") {
            paths.push(PathBuf::from(programdata).join("chocolatey").join("bin"));
        }
        if let Ok(userprofile) = std::env::var("USERPROFILE") {
            paths.push(PathBuf::from(userprofile).join("scoop").join("shims"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from("/opt/homebrew/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
        paths.push(PathBuf::from("/opt/local/bin"));
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
        paths.push(PathBuf::from("/snap/bin"));
    }

    paths
}

// =============================================================================
// Binary Queries
// =============================================================================

fn run_ffmpeg_query(ffmpeg_path: &Path, arg: &str) -> EngineResult<String> {
    let mut cmd = Command::new(ffmpeg_path);
    configure_std_command(&mut cmd);
    let output = cmd.args(["-hide_banner", arg]).output()?;

    if !output.status.success() {
        return Err(EngineError::ExecutionFailed(format!(
            "ffmpeg {} exited with {}",
            arg, output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Version string of the binary at `ffmpeg_path`
pub fn get_ffmpeg_version(ffmpeg_path: &Path) -> EngineResult<String> {
    let output = run_ffmpeg_query(ffmpeg_path, "-version")?;
    parse_version_output(&output)
}

/// Takes `X.Y.Z` out of `ffmpeg version X.Y.Z ...`, or the whole first line
pub fn parse_version_output(output: &str) -> EngineResult<String> {
    let first_line = output
        .lines()
        .next()
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| EngineError::ParseError("Could not parse FFmpeg version".to_string()))?;

    Ok(first_line
        .strip_prefix("ffmpeg version ")
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or(first_line)
        .to_string())
}

/// Names of every encoder the binary was built with
pub fn list_encoders(ffmpeg_path: &Path) -> EngineResult<Vec<String>> {
    let output = run_ffmpeg_query(ffmpeg_path, "-encoders")?;
    Ok(parse_encoder_list(&output))
}

/// Parses `ffmpeg -encoders` output (entries follow the ` ------` rule)
pub fn parse_encoder_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let _flags = parts.next()?;
            parts.next().map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_paths_not_empty() {
        assert!(!get_common_ffmpeg_paths().is_empty());
    }

    #[test]
    fn test_detect_ffmpeg_at_missing_path() {
        let result = detect_ffmpeg(Some(Path::new("/nonexistent/bin/ffmpeg")));
        assert!(matches!(result, Err(EngineError::NotFound)));
    }

    #[test]
    fn test_parse_version_output() {
        let out = "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023\nbuilt with gcc";
        assert_eq!(parse_version_output(out).unwrap(), "6.1.1-3ubuntu5");

        assert_eq!(parse_version_output("custom build\n").unwrap(), "custom build");
        assert!(parse_version_output("").is_err());
    }

    #[test]
    fn test_parse_encoder_list() {
        let out = "Encoders:\n V..... = Video\n A..... = Audio\n ------\n V....D libx264              libx264 H.264 / AVC\n V....D libvpx-vp9           libvpx VP9\n A....D aac                  AAC (Advanced Audio Coding)\n";

        let encoders = parse_encoder_list(out);
        assert_eq!(encoders, vec!["libx264", "libvpx-vp9", "aac"]);
        assert!(parse_encoder_list("no rule here").is_empty());
    }
}
