//! Sampler backend that serves previously recorded stroke samples

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{Sampler, SamplingError, SamplingMode, StrokeSample};

/// One recorded line in a recording file
#[derive(Debug, Deserialize)]
struct RecordedLine {
    line: String,
    #[serde(default)]
    style: Option<u32>,
    strokes: StrokeSample,
}

#[derive(Debug, Deserialize)]
struct Recording {
    #[serde(default)]
    styles: Vec<u32>,
    samples: Vec<RecordedLine>,
}

/// Replays recorded model output keyed by line text.
///
/// A primed request first looks for a recording made with that style and
/// falls back to the freehand recording of the same text. Bias is ignored.
///
/// Recording files are JSON:
///
/// ```text
/// {
///   "styles": [9],
///   "samples": [
///     { "line": "hi", "strokes": [[0.0, 0.0, 0.0], [1.2, -0.4, 1.0]] },
///     { "line": "hi", "style": 9, "strokes": [[...]] }
///   ]
/// }
/// ```
#[derive(Debug, Default)]
pub struct ReplaySampler {
    samples: HashMap<(String, Option<u32>), StrokeSample>,
    styles: BTreeSet<u32>,
    latency: Option<Duration>,
}

impl ReplaySampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a recording from its JSON text
    pub fn from_json_str(json: &str) -> Result<Self, SamplingError> {
        let recording: Recording = serde_json::from_str(json)
            .map_err(|e| SamplingError::InvalidRecording(e.to_string()))?;

        let mut sampler = Self::new();
        sampler.styles.extend(recording.styles);
        for entry in recording.samples {
            if let Some(style) = entry.style {
                sampler.styles.insert(style);
            }
            sampler
                .samples
                .insert((entry.line, entry.style), entry.strokes.trim_padding());
        }

        debug!(
            "Loaded {} recorded lines across {} styles",
            sampler.samples.len(),
            sampler.styles.len()
        );
        Ok(sampler)
    }

    /// Load a recording file
    pub fn from_path(path: &Path) -> Result<Self, SamplingError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| SamplingError::InvalidRecording(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Register a freehand recording
    pub fn insert(&mut self, line: impl Into<String>, strokes: StrokeSample) {
        self.samples.insert((line.into(), None), strokes);
    }

    /// Register a recording made with `style`
    pub fn insert_styled(&mut self, line: impl Into<String>, style: u32, strokes: StrokeSample) {
        self.styles.insert(style);
        self.samples.insert((line.into(), Some(style)), strokes);
    }

    /// Sleep this long inside every call, to mimic model run time
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Sampler for ReplaySampler {
    fn sample(
        &self,
        line: &str,
        _bias: f32,
        mode: SamplingMode,
    ) -> Result<StrokeSample, SamplingError> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }

        if let SamplingMode::Primed(style) = mode {
            if !self.styles.contains(&style) {
                return Err(SamplingError::UnknownStyle(style));
            }
            if let Some(sample) = self.samples.get(&(line.to_string(), Some(style))) {
                return Ok(sample.clone());
            }
        }

        self.samples
            .get(&(line.to_string(), None))
            .cloned()
            .ok_or_else(|| SamplingError::Unavailable(line.to_string()))
    }
}
