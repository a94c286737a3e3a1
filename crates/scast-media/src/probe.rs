//! FFprobe output parsing and artifact verification.
//!
//! The render engine may exit zero while producing a truncated or
//! unplayable file, so every artifact is probed and checked against the
//! plan before the pipeline declares success. Parsing is pure: the
//! executor runs ffprobe inside the sandbox and hands the JSON here.

use serde::Deserialize;

use scast_models::ArtifactInfo;

use crate::error::{MediaError, MediaResult};
use crate::plan::CompositionPlan;

/// Summary of a probed media file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSummary {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate
    pub fps: f64,
    /// Video codec name
    pub video_codec: String,
    /// Audio codec name
    pub audio_codec: String,
    /// Container format names (comma-separated, as ffprobe reports)
    pub format_name: String,
    /// File size in bytes
    pub size: u64,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Parse ffprobe's JSON output into a summary.
pub fn parse_probe_output(stdout: &[u8]) -> MediaResult<ProbeSummary> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::probe_failed("no video stream found"))?;

    let audio_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .ok_or_else(|| MediaError::probe_failed("no audio stream found"))?;

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size = probe
        .format
        .size
        .as_ref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(0.0);

    Ok(ProbeSummary {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        video_codec: video_stream.codec_name.clone().unwrap_or_default(),
        audio_codec: audio_stream.codec_name.clone().unwrap_or_default(),
        format_name: probe.format.format_name.unwrap_or_default(),
        size,
    })
}

/// Verify a probed artifact against the plan it was rendered from.
///
/// Checks container, codecs, resolution and duration (within the
/// configured tolerance). Returns the persisted artifact metadata on
/// success.
pub fn verify_artifact(
    summary: &ProbeSummary,
    plan: &CompositionPlan,
    duration_tolerance_ms: u64,
) -> MediaResult<ArtifactInfo> {
    if summary.size == 0 {
        return Err(MediaError::verification_failed("artifact is empty"));
    }

    if !summary.format_name.split(',').any(|f| f == "mp4") {
        return Err(MediaError::verification_failed(format!(
            "unexpected container '{}'",
            summary.format_name
        )));
    }

    let expected_video = stream_codec_name(&plan.encoding.codec);
    if summary.video_codec != expected_video {
        return Err(MediaError::verification_failed(format!(
            "video codec '{}', expected '{}'",
            summary.video_codec, expected_video
        )));
    }

    let expected_audio = stream_codec_name(&plan.encoding.audio_codec);
    if summary.audio_codec != expected_audio {
        return Err(MediaError::verification_failed(format!(
            "audio codec '{}', expected '{}'",
            summary.audio_codec, expected_audio
        )));
    }

    if (summary.width, summary.height) != (plan.width, plan.height) {
        return Err(MediaError::verification_failed(format!(
            "resolution {}x{}, expected {}x{}",
            summary.width, summary.height, plan.width, plan.height
        )));
    }

    let probed_ms = (summary.duration * 1000.0).round() as i64;
    let planned_ms = plan.total_ms() as i64;
    let drift = (probed_ms - planned_ms).unsigned_abs();
    if drift > duration_tolerance_ms {
        return Err(MediaError::verification_failed(format!(
            "duration {probed_ms}ms drifts {drift}ms from planned {planned_ms}ms"
        )));
    }

    Ok(ArtifactInfo {
        width: summary.width,
        height: summary.height,
        duration_ms: probed_ms as u64,
        fps: summary.fps,
        video_codec: summary.video_codec.clone(),
        audio_codec: summary.audio_codec.clone(),
        container: "mp4".to_string(),
        size_bytes: summary.size,
    })
}

/// Map an encoder name to the codec name ffprobe reports for its streams.
fn stream_codec_name(encoder: &str) -> &str {
    match encoder {
        "libx264" | "h264_nvenc" => "h264",
        "libx265" | "hevc_nvenc" => "hevc",
        other => other,
    }
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::build_plan;
    use crate::timeline::Timeline;
    use chrono::NaiveDate;
    use scast_models::{AudioAsset, Orientation, PipelineConfig, RenderRequest, SlideAsset};

    fn probe_json(duration: &str, width: u32, height: u32) -> Vec<u8> {
        format!(
            r#"{{
                "format": {{"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "{duration}", "size": "1048576"}},
                "streams": [
                    {{"codec_type": "video", "codec_name": "h264", "width": {width}, "height": {height}, "avg_frame_rate": "30/1"}},
                    {{"codec_type": "audio", "codec_name": "aac"}}
                ]
            }}"#
        )
        .into_bytes()
    }

    fn sample_plan() -> CompositionPlan {
        let request = RenderRequest {
            slides: vec![SlideAsset::new("s0.png", 0), SlideAsset::new("s1.png", 1)],
            audio: vec![
                AudioAsset::new("a0.mp3", 0, 10_000),
                AudioAsset::new("a1.mp3", 1, 10_000),
            ],
            orientation: Orientation::Portrait,
            overlay_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        };
        let config = PipelineConfig::default();
        let timeline = Timeline::compute(&request.audio, &config);
        build_plan(&request, &timeline, &config).unwrap()
    }

    #[test]
    fn test_parse_probe_output() {
        let summary = parse_probe_output(&probe_json("21.02", 1080, 1920)).unwrap();
        assert_eq!(summary.width, 1080);
        assert_eq!(summary.height, 1920);
        assert!((summary.fps - 30.0).abs() < 0.01);
        assert_eq!(summary.video_codec, "h264");
        assert_eq!(summary.audio_codec, "aac");
        assert_eq!(summary.size, 1_048_576);
    }

    #[test]
    fn test_parse_rejects_missing_video_stream() {
        let json = br#"{"format": {"format_name": "mp4"}, "streams": [{"codec_type": "audio", "codec_name": "aac"}]}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::ProbeFailed(_))
        ));
    }

    #[test]
    fn test_verify_accepts_matching_artifact() {
        let plan = sample_plan();
        // Plan totals 21s; 21.02s is within the 500ms default tolerance
        let summary = parse_probe_output(&probe_json("21.02", 1080, 1920)).unwrap();
        let info = verify_artifact(&summary, &plan, 500).unwrap();
        assert_eq!(info.duration_ms, 21_020);
        assert_eq!(info.container, "mp4");
        assert_eq!(info.size_bytes, 1_048_576);
    }

    #[test]
    fn test_verify_rejects_truncated_duration() {
        let plan = sample_plan();
        let summary = parse_probe_output(&probe_json("14.0", 1080, 1920)).unwrap();
        let err = verify_artifact(&summary, &plan, 500).unwrap_err();
        assert!(matches!(err, MediaError::VerificationFailed(_)));
    }

    #[test]
    fn test_verify_rejects_wrong_resolution() {
        let plan = sample_plan();
        let summary = parse_probe_output(&probe_json("21.0", 1920, 1080)).unwrap();
        assert!(verify_artifact(&summary, &plan, 500).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_codec() {
        let plan = sample_plan();
        let mut summary = parse_probe_output(&probe_json("21.0", 1080, 1920)).unwrap();
        summary.video_codec = "mpeg4".to_string();
        assert!(verify_artifact(&summary, &plan, 500).is_err());
    }

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("30/0").is_none());
    }
}
