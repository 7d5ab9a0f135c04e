//! Caption System Module
//!
//! Everything that deals with timed subtitle text:
//! - Segment data models (TimedSegment, WordSpan, SubtitleTrack)
//! - SubRip parsing and export, word splitting and timing interpolation
//! - Styled ASS document generation
//! - Playback sync lookups
//! - Audio extraction and the speech recognizer seam
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Caption System                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  models.rs     - Data structures (Segment, Word, Track)         │
//! │  formats.rs    - SRT parsing/export, word timing                │
//! │  ass.rs        - Styled ASS document generation                 │
//! │  sync.rs       - Timestamp -> segment/word lookups              │
//! │  audio.rs      - 16 kHz mono extraction and WAV loading         │
//! │  transcribe.rs - Recognizer traits and chunk mapping            │
//! │  whisper.rs    - whisper.cpp backend (feature `whisper`)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use crate::core::captions::{parse_srt, with_word_timing, display_text};
//!
//! let segments = with_word_timing(parse_srt(&std::fs::read_to_string("subs.srt")?));
//! let text = display_text(&segments, 1_500);
//! ```

mod ass;
pub mod audio;
mod formats;
mod models;
mod sync;
pub mod transcribe;
pub mod whisper;

// Re-export models
pub use models::{SubtitleTrack, TimedSegment, WordSpan};

// Re-export format functions
pub use formats::{
    export_srt, format_srt_timestamp, interpolate_words, parse_srt, split_words, with_word_timing,
};

pub use ass::{
    export_ass, format_ass_time, AssDocument, AssOptions, KaraokeMode, DEFAULT_KARAOKE_CS,
    DEFAULT_PLAY_RES,
};

pub use sync::{
    active_segment, active_word, display_text, sync_at, upcoming_words, PlaybackFrame,
};
