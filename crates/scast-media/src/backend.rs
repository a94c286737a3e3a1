//! Interchangeable render backends.
//!
//! A composition plan can be executed by the FFmpeg filter-graph engine
//! or by a declarative scene-document engine. Both are modeled behind one
//! trait; the executor selects an implementation from configuration and
//! nothing else in the pipeline branches on the engine.

use serde::{Deserialize, Serialize};

use scast_models::{RenderEngine, ZoomDirection};

use crate::command::compose_args;
use crate::error::MediaResult;
use crate::plan::CompositionPlan;

/// Filename of the rendered artifact inside the sandbox working directory.
pub const RENDER_OUTPUT_FILE: &str = "out.mp4";

/// Filename of the poster frame extracted beside the artifact.
pub const THUMBNAIL_FILE: &str = "thumb.jpg";

/// A concrete engine invocation derived from a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInvocation {
    /// Program to execute inside the sandbox
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Files the executor must write into the working directory first
    pub extra_files: Vec<(String, Vec<u8>)>,
    /// Path of the produced artifact, relative to the working directory
    pub output_path: String,
}

/// A render engine that can execute a composition plan.
pub trait RenderBackend: Send + Sync {
    /// Engine name for logs and failure reports.
    fn name(&self) -> &'static str;

    /// Turn a plan into a sandbox invocation.
    fn invocation(&self, plan: &CompositionPlan) -> MediaResult<RenderInvocation>;
}

/// Select the backend for a configured engine.
pub fn backend_for(engine: RenderEngine) -> Box<dyn RenderBackend> {
    match engine {
        RenderEngine::FilterGraph => Box::new(FilterGraphBackend),
        RenderEngine::SceneDoc => Box::new(SceneDocBackend::default()),
    }
}

/// FFmpeg filter-graph renderer.
pub struct FilterGraphBackend;

impl RenderBackend for FilterGraphBackend {
    fn name(&self) -> &'static str {
        "filter_graph"
    }

    fn invocation(&self, plan: &CompositionPlan) -> MediaResult<RenderInvocation> {
        Ok(RenderInvocation {
            program: "ffmpeg".to_string(),
            args: compose_args(plan, RENDER_OUTPUT_FILE),
            extra_files: Vec::new(),
            output_path: RENDER_OUTPUT_FILE.to_string(),
        })
    }
}

/// Declarative scene-document renderer.
///
/// Serializes the plan into a scene document consumed by the scene
/// renderer the sandbox image ships.
pub struct SceneDocBackend {
    program: String,
}

impl Default for SceneDocBackend {
    fn default() -> Self {
        Self {
            program: "scene-render".to_string(),
        }
    }
}

impl SceneDocBackend {
    /// Use a specific renderer binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Scene document filename written into the working directory.
pub const SCENE_DOC_FILE: &str = "scene.json";

#[derive(Debug, Serialize, Deserialize)]
struct SceneDoc {
    composition: SceneComposition,
    clips: Vec<SceneClip>,
    audio: Vec<SceneAudio>,
    overlays: Vec<SceneOverlay>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneComposition {
    width: u32,
    height: u32,
    fps: u32,
    duration_secs: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneClip {
    src: String,
    start_secs: f64,
    duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition: Option<SceneTransition>,
    effect: SceneEffect,
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneTransition {
    kind: String,
    duration_secs: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneEffect {
    kind: String,
    zoom_from: f64,
    zoom_to: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneAudio {
    src: String,
    sequence: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneOverlay {
    kind: String,
    text: String,
    position: String,
}

impl RenderBackend for SceneDocBackend {
    fn name(&self) -> &'static str {
        "scene_doc"
    }

    fn invocation(&self, plan: &CompositionPlan) -> MediaResult<RenderInvocation> {
        let mut clips = Vec::with_capacity(plan.slides.len());
        let mut start = 0.0_f64;

        for (i, slide) in plan.slides.iter().enumerate() {
            let ceiling = 1.0 + slide.zoom_step * slide.frame_count as f64;
            let (zoom_from, zoom_to) = match slide.zoom {
                ZoomDirection::In => (1.0, ceiling),
                ZoomDirection::Out => (ceiling, 1.0),
            };

            // The incoming fade for clip i is crossfade i-1
            let transition = (i > 0).then(|| SceneTransition {
                kind: "crossfade".to_string(),
                duration_secs: plan.crossfades[i - 1].duration_secs,
            });

            clips.push(SceneClip {
                src: slide.image.clone(),
                start_secs: start,
                duration_secs: slide.duration_secs,
                transition,
                effect: SceneEffect {
                    kind: "zoom".to_string(),
                    zoom_from,
                    zoom_to,
                },
            });

            start += slide.duration_secs;
        }

        let audio = plan
            .audio
            .iter()
            .enumerate()
            .map(|(i, src)| SceneAudio {
                src: src.clone(),
                sequence: i as u32,
            })
            .collect();

        let doc = SceneDoc {
            composition: SceneComposition {
                width: plan.width,
                height: plan.height,
                fps: plan.fps,
                duration_secs: plan.total_secs,
            },
            clips,
            audio,
            overlays: vec![SceneOverlay {
                kind: "text".to_string(),
                text: plan.overlay.text.clone(),
                position: "bottom-center".to_string(),
            }],
        };

        let doc_bytes = serde_json::to_vec_pretty(&doc)?;

        Ok(RenderInvocation {
            program: self.program.clone(),
            args: vec![
                "--spec".to_string(),
                SCENE_DOC_FILE.to_string(),
                "--output".to_string(),
                RENDER_OUTPUT_FILE.to_string(),
            ],
            extra_files: vec![(SCENE_DOC_FILE.to_string(), doc_bytes)],
            output_path: RENDER_OUTPUT_FILE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::build_plan;
    use crate::timeline::Timeline;
    use chrono::NaiveDate;
    use scast_models::{AudioAsset, Orientation, PipelineConfig, RenderRequest, SlideAsset};

    fn sample_plan() -> CompositionPlan {
        let request = RenderRequest {
            slides: vec![SlideAsset::new("s0.png", 0), SlideAsset::new("s1.png", 1)],
            audio: vec![
                AudioAsset::new("a0.mp3", 0, 12_000),
                AudioAsset::new("a1.mp3", 1, 9_000),
            ],
            orientation: Orientation::Portrait,
            overlay_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        };
        let config = PipelineConfig::default();
        let timeline = Timeline::compute(&request.audio, &config);
        build_plan(&request, &timeline, &config).unwrap()
    }

    #[test]
    fn test_backend_selection() {
        assert_eq!(backend_for(RenderEngine::FilterGraph).name(), "filter_graph");
        assert_eq!(backend_for(RenderEngine::SceneDoc).name(), "scene_doc");
    }

    #[test]
    fn test_filter_graph_invocation() {
        let invocation = FilterGraphBackend.invocation(&sample_plan()).unwrap();
        assert_eq!(invocation.program, "ffmpeg");
        assert_eq!(invocation.output_path, RENDER_OUTPUT_FILE);
        assert!(invocation.extra_files.is_empty());
        assert!(invocation.args.iter().any(|a| a.contains("xfade")));
    }

    #[test]
    fn test_scene_doc_invocation() {
        let invocation = SceneDocBackend::default().invocation(&sample_plan()).unwrap();
        assert_eq!(invocation.program, "scene-render");
        assert_eq!(invocation.extra_files.len(), 1);

        let (name, bytes) = &invocation.extra_files[0];
        assert_eq!(name, SCENE_DOC_FILE);

        let doc: SceneDoc = serde_json::from_slice(bytes).unwrap();
        assert_eq!(doc.clips.len(), 2);
        assert!(doc.clips[0].transition.is_none());
        let second = doc.clips[1].transition.as_ref().unwrap();
        assert_eq!(second.kind, "crossfade");
        assert!((second.duration_secs - 1.0).abs() < 1e-9);
        // Second clip starts after the first's padded duration
        assert!((doc.clips[1].start_secs - 13.0).abs() < 1e-9);
        assert_eq!(doc.audio.len(), 2);
        assert_eq!(doc.overlays[0].text, "June 1, 2025");
    }

    #[test]
    fn test_scene_doc_zoom_endpoints() {
        let invocation = SceneDocBackend::default().invocation(&sample_plan()).unwrap();
        let doc: SceneDoc = serde_json::from_slice(&invocation.extra_files[0].1).unwrap();

        // Even slide zooms in toward the ceiling, odd slide back out
        assert!((doc.clips[0].effect.zoom_from - 1.0).abs() < 1e-9);
        assert!((doc.clips[0].effect.zoom_to - 1.2).abs() < 1e-6);
        assert!((doc.clips[1].effect.zoom_from - 1.2).abs() < 1e-6);
        assert!((doc.clips[1].effect.zoom_to - 1.0).abs() < 1e-9);
    }
}
