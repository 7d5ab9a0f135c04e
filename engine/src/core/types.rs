//! Subburn Core Type Definitions
//!
//! Defines fundamental types used throughout the project.

use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// ID Types
// =============================================================================

/// Subtitle track unique identifier (ULID)
pub type TrackId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Absolute time offset in milliseconds
pub type TimeMs = u64;

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Frame rate assumed when the source does not report a usable one
pub const DEFAULT_FPS: f64 = 30.0;

/// Converts a player position in seconds to milliseconds.
///
/// Negative and non-finite positions map to zero.
pub fn seconds_to_ms(seconds: TimeSec) -> TimeMs {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).round() as TimeMs
}

// =============================================================================
// Video Types
// =============================================================================

/// Metadata of a loaded video, read once when the file is opened
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Duration in seconds
    pub duration_sec: f64,
    /// Frames per second
    pub fps: f64,
}

impl VideoInfo {
    /// Creates video info, replacing an unusable frame rate with the default
    pub fn new(width: u32, height: u32, duration_sec: f64, fps: f64) -> Self {
        Self::with_fallback_fps(width, height, duration_sec, fps, DEFAULT_FPS)
    }

    /// Creates video info, replacing an unusable frame rate with `fallback_fps`
    pub fn with_fallback_fps(
        width: u32,
        height: u32,
        duration_sec: f64,
        fps: f64,
        fallback_fps: f64,
    ) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            warn!("Video reported fps {}, assuming {}", fps, fallback_fps);
            fallback_fps
        };
        Self {
            width,
            height,
            duration_sec: duration_sec.max(0.0),
            fps,
        }
    }

    /// Aspect ratio (width / height), zero for a degenerate frame
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Number of frames covering the first `duration_sec` seconds
    pub fn frames_in(&self, duration_sec: f64) -> u64 {
        (duration_sec.max(0.0).min(self.duration_sec) * self.fps).ceil() as u64
    }

    /// Duration of one frame in milliseconds
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 / self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_ms() {
        assert_eq!(seconds_to_ms(0.0), 0);
        assert_eq!(seconds_to_ms(0.999), 999);
        assert_eq!(seconds_to_ms(1.0), 1000);
        assert_eq!(seconds_to_ms(-3.0), 0);
        assert_eq!(seconds_to_ms(f64::NAN), 0);
    }

    #[test]
    fn test_video_info_fps_fallback() {
        let info = VideoInfo::new(1920, 1080, 10.0, 0.0);
        assert_eq!(info.fps, DEFAULT_FPS);

        let info = VideoInfo::new(1920, 1080, 10.0, f64::NAN);
        assert_eq!(info.fps, DEFAULT_FPS);

        let info = VideoInfo::with_fallback_fps(1920, 1080, 10.0, 0.0, 24.0);
        assert_eq!(info.fps, 24.0);
        let info = VideoInfo::with_fallback_fps(1920, 1080, 10.0, 50.0, 24.0);
        assert_eq!(info.fps, 50.0);
    }

    #[test]
    fn test_video_info_frames() {
        let info = VideoInfo::new(1280, 720, 2.01, 30.0);
        assert_eq!(info.frames_in(info.duration_sec), 61);
        assert_eq!(info.frames_in(1.0), 30);
        assert_eq!(info.frames_in(100.0), 61);
        assert_eq!(info.frames_in(-1.0), 0);
        assert!((info.frame_duration_ms() - 33.333).abs() < 0.001);
        assert!((info.aspect_ratio() - 16.0 / 9.0).abs() < 1e-9);
    }
}
