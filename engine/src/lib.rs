//! Subburn Core Library
//!
//! Subtitle styling and burn-in engine. This library holds the caption
//! parser, the style model and its presets, the subtitle markup generators,
//! playback sync, and the export orchestration that drives FFmpeg.
//!
//! The command-line front end lives in the `subburn-cli` crate.

pub mod core;
