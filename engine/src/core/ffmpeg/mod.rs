//! FFmpeg Integration Module
//!
//! The video engine collaborator used by the export orchestrator:
//! - Binary detection (system PATH, common install locations, explicit path)
//! - A scratch directory acting as the engine's virtual filesystem
//! - Command execution with progress and log notifications
//! - Stream probing through ffprobe
//!
//! The orchestrator only sees the [`VideoEngine`] trait, so tests can swap
//! in an in-memory engine.

mod detection;
mod engine;
mod probe;
mod progress;

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

pub use detection::*;
pub use engine::FfmpegEngine;
pub use probe::{parse_frame_rate, parse_probe_output};
pub use progress::{parse_progress_line, EngineProgress};

/// FFmpeg-related error types
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("FFmpeg not found. Please install FFmpeg or pass its path explicitly.")]
    NotFound,

    #[error("FFmpeg execution failed: {0}")]
    ExecutionFailed(String),

    #[error("File not found in engine filesystem: {0}")]
    FileNotFound(String),

    #[error("Invalid engine file name: {0}")]
    InvalidFileName(String),

    #[error("FFprobe error: {0}")]
    ProbeError(String),

    #[error("Process error: {0}")]
    ProcessError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Engine Events
// =============================================================================

/// Notifications published while the engine works
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EngineEvent {
    /// One line of engine log output
    Log(String),
    /// Encoder progress block
    Progress(EngineProgress),
}

/// Capacity of the event broadcast channel; slow subscribers lose old events
pub const ENGINE_EVENT_CAPACITY: usize = 256;

// =============================================================================
// Video Engine Trait
// =============================================================================

/// A video engine with its own named-file namespace
///
/// File names are flat names inside the engine's namespace, never paths.
#[async_trait]
pub trait VideoEngine: Send + Sync {
    /// Stores bytes under `name`, replacing any existing file
    async fn write_file(&self, name: &str, bytes: &[u8]) -> EngineResult<()>;

    /// Reads the bytes stored under `name`
    async fn read_file(&self, name: &str) -> EngineResult<Vec<u8>>;

    /// Removes `name`; removing a missing file is an error
    async fn delete_file(&self, name: &str) -> EngineResult<()>;

    /// Runs the engine with command-line style arguments
    async fn exec(&self, args: &[String]) -> EngineResult<()>;

    /// Subscribes to log and progress notifications
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;

    /// Copies a host file into the engine namespace
    async fn import_file(&self, name: &str, source: &Path) -> EngineResult<()> {
        if !source.is_file() {
            return Err(EngineError::FileNotFound(source.to_string_lossy().to_string()));
        }
        let bytes = tokio::fs::read(source).await?;
        self.write_file(name, &bytes).await
    }
}

/// Checks that `name` is a plain file name usable inside the engine namespace
pub fn validate_engine_name(name: &str) -> EngineResult<()> {
    crate::core::fs::validate_file_name(name, "engine file name").map_err(EngineError::InvalidFileName)
}
