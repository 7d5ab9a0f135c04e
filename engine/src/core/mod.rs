//! Subburn Core Engine
//!
//! Core subtitle engine module.
//! Handles caption parsing, styling, markup generation, playback sync and export.

pub mod captions;
pub mod ffmpeg;
pub mod fs;
pub mod process;
pub mod render;
pub mod session;
pub mod settings;
pub mod style;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
