//! Structural validation of render requests.
//!
//! A mismatched or malformed timeline is undetectable late in the
//! pipeline except as a corrupted or truncated video, so every invariant
//! is checked here before any sandbox or network work starts. Validation
//! has no side effects and is idempotent.

use std::collections::HashSet;

use thiserror::Error;

use scast_models::RenderRequest;

/// A render request that violates a structural invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("slide/audio count mismatch: {slides} slides, {audio} narration clips")]
    CountMismatch { slides: usize, audio: usize },

    #[error("request contains no slides")]
    Empty,

    #[error("duplicate slide index {0} in slide list")]
    DuplicateSlideIndex(u32),

    #[error("duplicate slide index {0} in narration list")]
    DuplicateAudioIndex(u32),

    #[error("slide {0} has no narration clip")]
    MissingNarration(u32),

    #[error("narration for slide {0} has non-positive duration")]
    InvalidDuration(u32),
}

/// Check every structural invariant of a render request.
///
/// Fails fast on the first violation; performs no I/O.
pub fn validate_request(request: &RenderRequest) -> Result<(), ValidationError> {
    if request.slides.is_empty() {
        return Err(ValidationError::Empty);
    }

    if request.slides.len() != request.audio.len() {
        return Err(ValidationError::CountMismatch {
            slides: request.slides.len(),
            audio: request.audio.len(),
        });
    }

    let mut slide_indices = HashSet::with_capacity(request.slides.len());
    for slide in &request.slides {
        if !slide_indices.insert(slide.slide_index) {
            return Err(ValidationError::DuplicateSlideIndex(slide.slide_index));
        }
    }

    let mut audio_indices = HashSet::with_capacity(request.audio.len());
    for clip in &request.audio {
        if !audio_indices.insert(clip.slide_index) {
            return Err(ValidationError::DuplicateAudioIndex(clip.slide_index));
        }
        if clip.duration_ms == 0 {
            return Err(ValidationError::InvalidDuration(clip.slide_index));
        }
    }

    // Counts and uniqueness already match, so a single direction suffices
    // for the 1:1 pairing check.
    for slide in &request.slides {
        if !audio_indices.contains(&slide.slide_index) {
            return Err(ValidationError::MissingNarration(slide.slide_index));
        }
    }

    Ok(())
}
