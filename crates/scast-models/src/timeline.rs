//! Derived timeline slot types.
//!
//! Slots are computed once per render by the timeline calculator and never
//! mutated afterwards.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Direction of the slow zoom applied while a slide is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ZoomDirection {
    /// Magnitude grows from 1.0 toward the configured maximum
    In,
    /// Magnitude shrinks from the configured maximum toward 1.0
    Out,
}

impl ZoomDirection {
    /// Alternating assignment: even slides zoom in, odd slides zoom out.
    pub fn for_slide(slide_index: u32) -> Self {
        if slide_index % 2 == 0 {
            ZoomDirection::In
        } else {
            ZoomDirection::Out
        }
    }
}

/// One slide's computed position in the video timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineSlot {
    /// Slide this slot schedules
    pub slide_index: u32,
    /// Narration length plus transition padding, in seconds
    pub on_screen_secs: f64,
    /// Sum of all preceding on-screen durations, in seconds
    pub start_secs: f64,
    /// Zoom direction while on screen
    pub zoom: ZoomDirection,
    /// `ceil(on_screen_secs * fps)`
    pub frame_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_alternates() {
        assert_eq!(ZoomDirection::for_slide(0), ZoomDirection::In);
        assert_eq!(ZoomDirection::for_slide(1), ZoomDirection::Out);
        assert_eq!(ZoomDirection::for_slide(2), ZoomDirection::In);
    }
}
