//! FFmpeg command builder.
//!
//! Builds the argument vector for a composition render. The command is
//! executed by the render executor inside the sandbox, never by this
//! crate.

use crate::plan::CompositionPlan;

/// One input file with its preceding arguments.
#[derive(Debug, Clone)]
struct Input {
    /// Arguments placed before this input's `-i`
    args: Vec<String>,
    /// Input path
    path: String,
}

/// Builder for a multi-input FFmpeg invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<Input>,
    output: String,
    filter_complex: Option<String>,
    maps: Vec<String>,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new command writing to `output`.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.into(),
            filter_complex: None,
            maps: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add a plain input file.
    pub fn input(mut self, path: impl Into<String>) -> Self {
        self.inputs.push(Input {
            args: Vec::new(),
            path: path.into(),
        });
        self
    }

    /// Add a looped still-image input held for `duration_secs`.
    pub fn image_input(mut self, path: impl Into<String>, duration_secs: f64) -> Self {
        self.inputs.push(Input {
            args: vec![
                "-loop".to_string(),
                "1".to_string(),
                "-t".to_string(),
                format!("{:.3}", duration_secs),
            ],
            path: path.into(),
        });
        self
    }

    /// Set the filter graph.
    pub fn filter_complex(mut self, filter: impl Into<String>) -> Self {
        self.filter_complex = Some(filter.into());
        self
    }

    /// Map a filter output label into the output file.
    pub fn map_label(mut self, label: impl Into<String>) -> Self {
        self.maps.push(format!("[{}]", label.into()));
        self
    }

    /// Add output arguments (after inputs and filters).
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Cap the output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_args(["-t".to_string(), format!("{:.3}", seconds)])
    }

    /// Set the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the full argument vector.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.clone());
        }

        if let Some(ref filter) = self.filter_complex {
            args.push("-filter_complex".to_string());
            args.push(filter.clone());
        }

        for map in &self.maps {
            args.push("-map".to_string());
            args.push(map.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.clone());

        args
    }
}

/// Build the render invocation arguments for a composition plan.
///
/// Image inputs come first (positions `0..n`), narration inputs second
/// (`n..2n`), matching the filter graph's input numbering.
pub fn compose_args(plan: &CompositionPlan, output: &str) -> Vec<String> {
    let (graph, vout, aout) = crate::filters::build_filter_graph(plan);

    let mut cmd = FfmpegCommand::new(output);
    for clip in &plan.slides {
        cmd = cmd.image_input(&clip.image, clip.duration_secs);
    }
    for narration in &plan.audio {
        cmd = cmd.input(narration);
    }

    cmd.filter_complex(graph)
        .map_label(vout)
        .map_label(aout)
        .output_args(plan.encoding.to_ffmpeg_args())
        .output_args(["-r".to_string(), plan.fps.to_string()])
        .duration(plan.total_secs)
        .build_args()
}

/// Arguments for probing a rendered file with ffprobe.
pub fn probe_args(path: &str) -> Vec<String> {
    vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        path.to_string(),
    ]
}

/// Arguments for extracting a poster frame from a rendered file.
pub fn thumbnail_args(input: &str, output: &str, at_secs: f64) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        format!("{:.3}", at_secs),
        "-i".to_string(),
        input.to_string(),
        "-vframes".to_string(),
        "1".to_string(),
        output.to_string(),
    ]
}
