//! Composition planning.
//!
//! Translates a computed timeline into render-engine-agnostic
//! instructions. The plan is a pure data structure derived once from the
//! render request; it carries no knowledge of which backend executes it.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use scast_models::{PipelineConfig, RenderRequest, ZoomDirection};

use crate::error::{MediaError, MediaResult};
use crate::timeline::Timeline;

/// Pan/zoom animation for one slide, bounded by its computed frame count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideClip {
    /// Slide being animated
    pub slide_index: u32,
    /// Image filename inside the render working directory
    pub image: String,
    /// On-screen duration, seconds
    pub duration_secs: f64,
    /// Number of output frames for this clip
    pub frame_count: u64,
    /// Zoom direction
    pub zoom: ZoomDirection,
    /// Per-frame zoom increment
    pub zoom_step: f64,
}

/// A cross-fade between two consecutive slides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crossfade {
    /// Slide being faded out
    pub from_index: u32,
    /// Slide being faded in
    pub to_index: u32,
    /// Second at which the fade begins, on the unoverlapped timeline
    pub offset_secs: f64,
    /// Fade duration, seconds
    pub duration_secs: f64,
}

/// Localized date text burned into the composed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateOverlay {
    /// Unescaped overlay text; backends escape for their own syntax
    pub text: String,
}

/// The full, render-engine-agnostic description of what to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionPlan {
    /// Output width, pixels
    pub width: u32,
    /// Output height, pixels
    pub height: u32,
    /// Output frame rate
    pub fps: u32,
    /// Per-slide animations, in timeline order
    pub slides: Vec<SlideClip>,
    /// Cross-fades between consecutive slides
    pub crossfades: Vec<Crossfade>,
    /// Narration filenames, concatenated in slide order with no re-timing
    pub audio: Vec<String>,
    /// Date overlay for the composed frame
    pub overlay: DateOverlay,
    /// Nominal duration of the composed video, seconds
    pub total_secs: f64,
    /// Encoding settings for the output
    pub encoding: scast_models::EncodingConfig,
}

impl CompositionPlan {
    /// Total duration in milliseconds, rounded to the nearest ms.
    pub fn total_ms(&self) -> u64 {
        (self.total_secs * 1000.0).round() as u64
    }
}

/// Build the composition plan for a validated request.
///
/// The caller must have run the validator; this function still refuses
/// structurally impossible pairings rather than producing a broken plan.
pub fn build_plan(
    request: &RenderRequest,
    timeline: &Timeline,
    config: &PipelineConfig,
) -> MediaResult<CompositionPlan> {
    if timeline.len() != request.slides.len() {
        return Err(MediaError::internal(format!(
            "timeline has {} slots for {} slides",
            timeline.len(),
            request.slides.len()
        )));
    }

    let (width, height) = request.orientation.dimensions();

    let mut slides_sorted: Vec<_> = request.slides.iter().collect();
    slides_sorted.sort_by_key(|s| s.slide_index);
    let mut audio_sorted: Vec<_> = request.audio.iter().collect();
    audio_sorted.sort_by_key(|a| a.slide_index);

    let mut slides = Vec::with_capacity(timeline.len());
    for (slot, slide) in timeline.slots.iter().zip(&slides_sorted) {
        if slot.slide_index != slide.slide_index {
            return Err(MediaError::internal(format!(
                "timeline slot {} does not match slide {}",
                slot.slide_index, slide.slide_index
            )));
        }
        slides.push(SlideClip {
            slide_index: slot.slide_index,
            image: slide.local_name(),
            duration_secs: slot.on_screen_secs,
            frame_count: slot.frame_count,
            zoom: slot.zoom,
            zoom_step: timeline.zoom_step(slot, config.max_zoom),
        });
    }

    let mut crossfades = Vec::with_capacity(timeline.len().saturating_sub(1));
    for i in 1..timeline.len() {
        let offset = timeline
            .crossfade_offset_secs(i)
            .ok_or_else(|| MediaError::internal("missing crossfade offset"))?;
        crossfades.push(Crossfade {
            from_index: timeline.slots[i - 1].slide_index,
            to_index: timeline.slots[i].slide_index,
            offset_secs: offset,
            duration_secs: timeline.transition_secs,
        });
    }

    let audio = audio_sorted.iter().map(|a| a.local_name()).collect();

    Ok(CompositionPlan {
        width,
        height,
        fps: config.fps,
        slides,
        crossfades,
        audio,
        overlay: DateOverlay {
            text: format_overlay_date(request.overlay_date),
        },
        total_secs: timeline.total_secs(),
        encoding: config.encoding.clone(),
    })
}

/// Format the overlay date as e.g. "June 1, 2025".
fn format_overlay_date(date: NaiveDate) -> String {
    format!("{} {}, {}", date.format("%B"), date.day(), date.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scast_models::{AudioAsset, Orientation, SlideAsset};

    fn request(n: u32) -> RenderRequest {
        RenderRequest {
            slides: (0..n).map(|i| SlideAsset::new(format!("s{i}.png"), i)).collect(),
            audio: (0..n)
                .map(|i| AudioAsset::new(format!("a{i}.mp3"), i, 12_000))
                .collect(),
            orientation: Orientation::Portrait,
            overlay_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        }
    }

    fn plan_for(n: u32) -> CompositionPlan {
        let req = request(n);
        let config = PipelineConfig::default();
        let timeline = Timeline::compute(&req.audio, &config);
        build_plan(&req, &timeline, &config).unwrap()
    }

    #[test]
    fn test_plan_shape() {
        let plan = plan_for(3);
        assert_eq!(plan.slides.len(), 3);
        assert_eq!(plan.crossfades.len(), 2);
        assert_eq!(plan.audio.len(), 3);
        assert_eq!((plan.width, plan.height), (1080, 1920));
    }

    #[test]
    fn test_crossfade_offsets_use_configured_transition() {
        let plan = plan_for(3);
        // 13s on screen, fade into slide 1 starts at 13 - 1 = 12
        assert!((plan.crossfades[0].offset_secs - 12.0).abs() < 1e-9);
        assert!((plan.crossfades[1].offset_secs - 25.0).abs() < 1e-9);
        assert!((plan.crossfades[0].duration_secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_audio_concatenation_order_matches_timeline() {
        let mut req = request(3);
        req.audio.reverse();
        req.slides.reverse();
        let config = PipelineConfig::default();
        let timeline = Timeline::compute(&req.audio, &config);
        let plan = build_plan(&req, &timeline, &config).unwrap();

        assert_eq!(
            plan.audio,
            vec!["narration_000.mp3", "narration_001.mp3", "narration_002.mp3"]
        );
        let indices: Vec<u32> = plan.slides.iter().map(|s| s.slide_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_overlay_date_formatting() {
        assert_eq!(
            format_overlay_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
            "June 1, 2025"
        );
        assert_eq!(
            format_overlay_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
            "December 31, 2024"
        );
    }

    #[test]
    fn test_plan_is_deterministic() {
        assert_eq!(plan_for(4), plan_for(4));
    }
}
