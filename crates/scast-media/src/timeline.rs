//! Timeline calculation.
//!
//! Converts per-slide narration lengths plus the configured transition
//! duration into on-screen durations, cumulative offsets and zoom
//! parameters. The derivation is closed-form and order-independent:
//! no iterative search, no external state.

use scast_models::{AudioAsset, PipelineConfig, TimelineSlot, ZoomDirection};

/// The computed timeline for one render.
///
/// Slots are ordered by `slide_index` and never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// One slot per slide, in `slide_index` order
    pub slots: Vec<TimelineSlot>,
    /// Cross-fade duration used for the computation, seconds
    pub transition_secs: f64,
    /// Output frame rate used for frame counts
    pub fps: u32,
}

impl Timeline {
    /// Compute the timeline for a set of narration clips.
    ///
    /// Each slide stays on screen for its narration length plus one
    /// transition duration, so a cross-fade never encroaches on narration
    /// audio. Zoom direction alternates per slide.
    pub fn compute(audio: &[AudioAsset], config: &PipelineConfig) -> Self {
        let mut clips: Vec<&AudioAsset> = audio.iter().collect();
        clips.sort_by_key(|clip| clip.slide_index);

        let transition_secs = config.transition_secs;
        let fps = config.fps;

        let mut slots = Vec::with_capacity(clips.len());
        let mut cumulative = 0.0_f64;

        for clip in clips {
            let on_screen_secs = clip.duration_secs() + transition_secs;
            let frame_count = (on_screen_secs * fps as f64).ceil() as u64;

            slots.push(TimelineSlot {
                slide_index: clip.slide_index,
                on_screen_secs,
                start_secs: cumulative,
                zoom: ZoomDirection::for_slide(clip.slide_index),
                frame_count,
            });

            cumulative += on_screen_secs;
        }

        Self {
            slots,
            transition_secs,
            fps,
        }
    }

    /// Number of slides in the timeline.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The second at which the fade into slot `i` begins.
    ///
    /// The fade starts one transition duration before the slot's nominal
    /// start so the two shots visually overlap without losing narration
    /// time. The first slot has no incoming fade.
    pub fn crossfade_offset_secs(&self, i: usize) -> Option<f64> {
        if i == 0 || i >= self.slots.len() {
            return None;
        }
        Some(self.slots[i].start_secs - self.transition_secs)
    }

    /// Total nominal duration of the composed video, seconds.
    ///
    /// Cross-fades overlap, so the displayed runtime is shorter than the
    /// naive sum of on-screen durations.
    pub fn total_secs(&self) -> f64 {
        let naive: f64 = self.slots.iter().map(|s| s.on_screen_secs).sum();
        let overlaps = self.slots.len().saturating_sub(1) as f64;
        naive - overlaps * self.transition_secs
    }

    /// Per-frame zoom increment for a slot, so magnitude moves linearly
    /// between 1.0 and `max_zoom` over the slot's frame count.
    pub fn zoom_step(&self, slot: &TimelineSlot, max_zoom: f64) -> f64 {
        if slot.frame_count == 0 {
            return 0.0;
        }
        (max_zoom - 1.0) / slot.frame_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scast_models::AudioAsset;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn clips(durations_ms: &[u64]) -> Vec<AudioAsset> {
        durations_ms
            .iter()
            .enumerate()
            .map(|(i, ms)| AudioAsset::new(format!("a{i}.mp3"), i as u32, *ms))
            .collect()
    }

    #[test]
    fn test_reference_timeline() {
        // 12s, 15s, 9s narration with a 1s transition
        let timeline = Timeline::compute(&clips(&[12_000, 15_000, 9_000]), &config());

        let on_screen: Vec<f64> = timeline.slots.iter().map(|s| s.on_screen_secs).collect();
        assert_eq!(on_screen, vec![13.0, 16.0, 10.0]);

        let starts: Vec<f64> = timeline.slots.iter().map(|s| s.start_secs).collect();
        assert_eq!(starts, vec![0.0, 13.0, 29.0]);

        assert_eq!(timeline.crossfade_offset_secs(1), Some(12.0));
        assert_eq!(timeline.crossfade_offset_secs(2), Some(28.0));
        assert_eq!(timeline.crossfade_offset_secs(0), None);
        assert_eq!(timeline.crossfade_offset_secs(3), None);

        assert!((timeline.total_secs() - 37.0).abs() < 1e-9);
    }

    #[test]
    fn test_six_equal_slides() {
        // Six 10s narrations at 1s transition: 6*11 - 5 = 61s nominal
        let timeline = Timeline::compute(&clips(&[10_000; 6]), &config());
        assert!((timeline.total_secs() - 61.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_counts_round_up() {
        let mut cfg = config();
        cfg.fps = 30;
        // 1.5s narration + 1s transition = 2.5s on screen -> 75 frames
        let timeline = Timeline::compute(&clips(&[1_500]), &cfg);
        assert_eq!(timeline.slots[0].frame_count, 75);

        // 1.033s + 1s = 2.033s -> ceil(60.99) = 61 frames
        let timeline = Timeline::compute(&clips(&[1_033]), &cfg);
        assert_eq!(timeline.slots[0].frame_count, 61);
    }

    #[test]
    fn test_slots_sorted_by_slide_index() {
        let mut audio = clips(&[5_000, 6_000, 7_000]);
        audio.reverse();
        let timeline = Timeline::compute(&audio, &config());
        let indices: Vec<u32> = timeline.slots.iter().map(|s| s.slide_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(timeline.slots[0].on_screen_secs, 6.0);
    }

    #[test]
    fn test_zoom_alternation_and_step() {
        let timeline = Timeline::compute(&clips(&[4_000, 4_000]), &config());
        assert_eq!(timeline.slots[0].zoom, ZoomDirection::In);
        assert_eq!(timeline.slots[1].zoom, ZoomDirection::Out);

        let step = timeline.zoom_step(&timeline.slots[0], 1.2);
        let expected = 0.2 / timeline.slots[0].frame_count as f64;
        assert!((step - expected).abs() < 1e-12);
    }

    #[test]
    fn test_single_slide_has_no_overlap() {
        let timeline = Timeline::compute(&clips(&[8_000]), &config());
        assert!((timeline.total_secs() - 9.0).abs() < 1e-9);
        assert_eq!(timeline.crossfade_offset_secs(1), None);
    }
}
