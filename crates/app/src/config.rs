//! Command-line options and output format selection

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use scrivener_config::RenderConfig;
use scrivener_ipc::{
    DetailedRenderRequest, LineStyle, MAX_LINE_CHARS, RenderRequest, split_into_segments,
};

/// What the batch render writes out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Raw SVG document (default)
    #[default]
    Svg,
    /// `data:image/svg+xml;base64,...` URI
    DataUri,
    /// Rasterized PNG, needs the `raster` feature
    Png,
    /// Single-page PDF, needs the `pdf` feature
    Pdf,
}

impl OutputFormat {
    /// Parse from environment variable SCRIVENER_FORMAT
    pub fn from_env() -> Self {
        match std::env::var("SCRIVENER_FORMAT").as_deref() {
            Ok("data-uri") => Self::DataUri,
            Ok("png") => Self::Png,
            Ok("pdf") => Self::Pdf,
            Ok("svg") | _ => Self::Svg,
        }
    }
}

/// Render handwriting from recorded stroke samples
#[derive(Debug, Parser)]
#[command(name = "scrivener", version, about)]
pub struct Cli {
    /// JSON file of recorded stroke samples
    #[arg(short, long)]
    pub samples: PathBuf,

    /// One line of text; repeat for more lines
    #[arg(short, long = "line", conflicts_with_all = ["text", "request"])]
    pub lines: Vec<String>,

    /// Free text, wrapped into lines of at most 75 characters
    #[arg(short, long, conflicts_with = "request")]
    pub text: Option<String>,

    /// JSON file with a detailed per-line request
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Stroke color for every line
    #[arg(long)]
    pub color: Option<String>,

    /// Stroke width for every line
    #[arg(long)]
    pub width: Option<f32>,

    /// Sampling bias for every line
    #[arg(long, default_value_t = scrivener_ipc::DEFAULT_BIAS)]
    pub bias: f32,

    /// Handwriting style to prime every line with
    #[arg(long)]
    pub style: Option<u32>,

    /// Batch output format; defaults to SCRIVENER_FORMAT or svg
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Print event-stream frames instead of a finished document
    #[arg(long, conflicts_with = "format")]
    pub stream: bool,

    /// Write output here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Simulated model latency per line, in milliseconds
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Sampling worker count, overriding SCRIVENER_WORKERS
    #[arg(long)]
    pub workers: Option<usize>,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_else(OutputFormat::from_env)
    }

    /// Build the render request from whichever input flag was given
    pub fn build_request(&self, render: &RenderConfig) -> anyhow::Result<RenderRequest> {
        let color = self
            .color
            .clone()
            .unwrap_or_else(|| render.default_stroke_color.clone());
        let width = self.width.unwrap_or(render.default_stroke_width);

        if let Some(path) = &self.request {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading request {}", path.display()))?;
            let detailed: DetailedRenderRequest =
                serde_json::from_str(&json).context("parsing detailed request")?;
            return Ok(detailed.into_request(&color, width)?);
        }

        let lines = match (&self.text, self.lines.is_empty()) {
            (Some(text), _) => split_into_segments(text, MAX_LINE_CHARS),
            (None, false) => self.lines.clone(),
            (None, true) => bail!("nothing to render: pass --line, --text or --request"),
        };

        let mut style = LineStyle::new(color, width).with_bias(self.bias);
        style.style_id = self.style;
        Ok(RenderRequest::uniform(lines, style))
    }
}
