//! FFprobe output parsing into [`VideoInfo`]

use serde_json::Value;

use super::{EngineError, EngineResult};
use crate::core::VideoInfo;

/// Arguments for a JSON ffprobe run over `input`
pub(super) fn probe_args(input: &str) -> Vec<String> {
    [
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
        input,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Parses ffprobe JSON, taking the first video stream
///
/// The duration comes from the container, falling back to the stream. A
/// missing or zero frame rate is replaced by `fallback_fps`.
pub fn parse_probe_output(json_str: &str, fallback_fps: f64) -> EngineResult<VideoInfo> {
    let json: Value = serde_json::from_str(json_str)
        .map_err(|e| EngineError::ParseError(format!("Failed to parse FFprobe output: {}", e)))?;

    let stream = json
        .get("streams")
        .and_then(Value::as_array)
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.get("codec_type").and_then(Value::as_str) == Some("video"))
        })
        .ok_or_else(|| EngineError::ProbeError("No video stream found".to_string()))?;

    let width = stream.get("width").and_then(Value::as_u64).unwrap_or(0) as u32;
    let height = stream.get("height").and_then(Value::as_u64).unwrap_or(0) as u32;

    if width == 0 || height == 0 {
        return Err(EngineError::ProbeError(format!(
            "Video stream has no usable dimensions ({}x{})",
            width, height
        )));
    }

    let duration_sec = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .or_else(|| stream.get("duration"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let fps = ["avg_frame_rate", "r_frame_rate"]
        .iter()
        .filter_map(|key| stream.get(*key).and_then(Value::as_str))
        .find_map(parse_frame_rate)
        .unwrap_or(0.0);

    Ok(VideoInfo::with_fallback_fps(
        width,
        height,
        duration_sec,
        fps,
        fallback_fps,
    ))
}

/// Parses `30/1`, `30000/1001` or a plain number; `0/0` yields `None`
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den > 0.0 {
                num / den
            } else {
                return None;
            }
        }
        None => value.trim().parse().ok()?,
    };

    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DEFAULT_FPS;

    #[test]
    fn test_parse_probe_output_video() {
        let json = r#"{
            "format": { "duration": "10.5", "format_name": "mov,mp4,m4a,3gp,3g2,mj2" },
            "streams": [
                { "codec_type": "audio", "codec_name": "aac" },
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "avg_frame_rate": "30000/1001",
                    "r_frame_rate": "30/1"
                }
            ]
        }"#;

        let info = parse_probe_output(json, DEFAULT_FPS).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.duration_sec, 10.5);
        assert!((info.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_probe_output_fps_fallback() {
        let json = r#"{
            "format": { "duration": "2.0" },
            "streams": [
                { "codec_type": "video", "width": 640, "height": 360, "avg_frame_rate": "0/0", "r_frame_rate": "0/0" }
            ]
        }"#;

        let info = parse_probe_output(json, DEFAULT_FPS).unwrap();
        assert_eq!(info.fps, DEFAULT_FPS);

        let info = parse_probe_output(json, 25.0).unwrap();
        assert_eq!(info.fps, 25.0);
    }

    #[test]
    fn test_parse_probe_output_stream_duration() {
        let json = r#"{
            "format": {},
            "streams": [
                { "codec_type": "video", "width": 640, "height": 360, "duration": "3.25", "r_frame_rate": "25/1" }
            ]
        }"#;

        let info = parse_probe_output(json, DEFAULT_FPS).unwrap();
        assert_eq!(info.duration_sec, 3.25);
        assert_eq!(info.fps, 25.0);
    }

    #[test]
    fn test_parse_probe_output_no_video() {
        let json = r#"{ "format": {}, "streams": [ { "codec_type": "audio" } ] }"#;
        assert!(matches!(
            parse_probe_output(json, DEFAULT_FPS),
            Err(EngineError::ProbeError(_))
        ));
        assert!(matches!(
            parse_probe_output("not json", DEFAULT_FPS),
            Err(EngineError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }
}
