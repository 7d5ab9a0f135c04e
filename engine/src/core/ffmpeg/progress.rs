//! FFmpeg `-progress` output parsing
//!
//! With `-progress pipe:1` FFmpeg writes `key=value` lines on stdout and
//! terminates each block with `progress=continue` or `progress=end`.

use serde::Serialize;

/// Progress accumulated from one `-progress` block
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineProgress {
    /// Frames encoded so far
    pub frame: u64,
    /// Encoding speed in frames per second
    pub fps: f32,
    /// Output timestamp reached, in seconds
    pub time_sec: f64,
    /// Speed relative to realtime (e.g. 2.5 for "2.5x")
    pub speed: Option<f32>,
    /// Set on the final `progress=end` block
    pub done: bool,
}

impl EngineProgress {
    /// Percentage of `total_duration_sec` reached, capped at 100
    pub fn percent_of(&self, total_duration_sec: f64) -> f32 {
        if total_duration_sec <= 0.0 {
            return if self.done { 100.0 } else { 0.0 };
        }
        ((self.time_sec / total_duration_sec) * 100.0).clamp(0.0, 100.0) as f32
    }
}

/// Folds one line into `data`, returning true at a block boundary
pub fn parse_progress_line(line: &str, data: &mut EngineProgress) -> bool {
    let line = line.trim();

    if let Some(value) = line.strip_prefix("frame=") {
        data.frame = value.trim().parse().unwrap_or(data.frame);
        return false;
    }

    if let Some(value) = line.strip_prefix("fps=") {
        data.fps = value.trim().parse().unwrap_or(data.fps);
        return false;
    }

    if let Some(value) = line.strip_prefix("out_time_us=") {
        if let Ok(micros) = value.trim().parse::<u64>() {
            data.time_sec = micros as f64 / 1_000_000.0;
        }
        return false;
    }

    if let Some(value) = line.strip_prefix("out_time_ms=") {
        // Microseconds despite the name
        if let Ok(micros) = value.trim().parse::<u64>() {
            data.time_sec = micros as f64 / 1_000_000.0;
        }
        return false;
    }

    if let Some(value) = line.strip_prefix("speed=") {
        if let Some(num) = value.trim().strip_suffix('x') {
            data.speed = num.trim().parse().ok();
        }
        return false;
    }

    if let Some(value) = line.strip_prefix("progress=") {
        data.done = value.trim() == "end";
        return true;
    }

    false
}
