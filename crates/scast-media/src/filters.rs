//! FFmpeg filter construction for the slide composition.
//!
//! Builders here emit filter fragments consumed by the filter-graph
//! backend: per-slide pan/zoom, the cross-fade chain, narration
//! concatenation and the date overlay.

use crate::plan::{CompositionPlan, Crossfade, DateOverlay, SlideClip};

/// Font used for the burned-in date overlay.
pub const OVERLAY_FONT_FILE: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

/// Escape text for FFmpeg's drawtext/filter syntax.
///
/// Backslash first, then the characters drawtext treats specially.
pub fn escape_filter_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
        .replace('%', "\\%")
        .replace(',', "\\,")
}

/// Pan/zoom chain for one slide.
///
/// The source image is scaled to cover the output frame, cropped, then
/// animated with a linear zoom over the slot's frame count. `setsar=1`
/// keeps xfade inputs compatible.
pub fn filter_slide_motion(clip: &SlideClip, width: u32, height: u32, fps: u32) -> String {
    // zoom_step * frame_count recovers the configured zoom ceiling
    let ceiling = 1.0 + clip.zoom_step * clip.frame_count as f64;
    let zoom_expr = match clip.zoom {
        scast_models::ZoomDirection::In => {
            format!("min(1+{:.6}*on\\,{:.4})", clip.zoom_step, ceiling)
        }
        scast_models::ZoomDirection::Out => {
            format!("max({:.4}-{:.6}*on\\,1.0)", ceiling, clip.zoom_step)
        }
    };

    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},\
         zoompan=z='{zoom}':d={frames}:x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':s={w}x{h}:fps={fps},\
         setsar=1",
        w = width,
        h = height,
        zoom = zoom_expr,
        frames = clip.frame_count,
        fps = fps,
    )
}

/// Chain the cross-fades over slide labels `[v0]..[vN]`.
///
/// Returns the chain fragments and the final video label. xfade offsets
/// are measured on the already-shortened output of the preceding fade,
/// so each fade's planned offset is reduced by the overlap the earlier
/// fades have consumed.
pub fn filter_crossfade_chain(crossfades: &[Crossfade]) -> (Vec<String>, String) {
    if crossfades.is_empty() {
        return (Vec::new(), "v0".to_string());
    }

    let mut chains = Vec::with_capacity(crossfades.len());
    let mut consumed = 0.0_f64;
    let mut current = "v0".to_string();

    for (i, fade) in crossfades.iter().enumerate() {
        let next_input = format!("v{}", i + 1);
        let out = format!("x{}", i + 1);
        let chain_offset = fade.offset_secs - consumed;
        chains.push(format!(
            "[{current}][{next_input}]xfade=transition=fade:duration={:.3}:offset={:.3}[{out}]",
            fade.duration_secs, chain_offset
        ));
        consumed += fade.duration_secs;
        current = out;
    }

    (chains, current)
}

/// Concatenate narration inputs `first..first+n` into one audio track.
pub fn filter_audio_concat(count: usize, first_input: usize) -> String {
    let inputs: String = (0..count)
        .map(|i| format!("[{}:a]", first_input + i))
        .collect();
    format!("{inputs}concat=n={count}:v=0:a=1[aout]")
}

/// Date overlay burned into the composed frame, bottom-centered.
pub fn filter_drawtext(overlay: &DateOverlay) -> String {
    format!(
        "drawtext=fontfile={font}:text='{text}':fontcolor=white:fontsize=h/20:\
         x=(w-text_w)/2:y=h-text_h-h/12:box=1:boxcolor=black@0.4:boxborderw=16",
        font = OVERLAY_FONT_FILE,
        text = escape_filter_text(&overlay.text),
    )
}

/// Assemble the complete filter graph for a plan.
///
/// Returns the `-filter_complex` value and the output video/audio labels.
/// Image inputs occupy positions `0..n`, narration inputs `n..2n`.
pub fn build_filter_graph(plan: &CompositionPlan) -> (String, String, String) {
    let n = plan.slides.len();
    let mut chains = Vec::with_capacity(2 * n + 2);

    for (i, clip) in plan.slides.iter().enumerate() {
        chains.push(format!(
            "[{i}:v]{}[v{i}]",
            filter_slide_motion(clip, plan.width, plan.height, plan.fps)
        ));
    }

    let (fade_chains, video_label) = filter_crossfade_chain(&plan.crossfades);
    chains.extend(fade_chains);

    chains.push(format!(
        "[{video_label}]{}[vout]",
        filter_drawtext(&plan.overlay)
    ));

    chains.push(filter_audio_concat(n, n));

    (chains.join(";"), "vout".to_string(), "aout".to_string())
}
