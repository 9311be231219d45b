//! Scripted samplers shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use scrivener_config::EngineConfig;
use scrivener_ipc::{LineStyle, RenderRequest};
use scrivener_render::RenderEngine;
use scrivener_sampler::{Sampler, SamplingError, SamplingMode, StrokePoint, StrokeSample};

/// Two short strokes, trailing model padding included
pub fn two_strokes() -> StrokeSample {
    StrokeSample::from_triples(&[
        [0.0, 0.0, 0.0],
        [2.0, 3.0, 0.0],
        [2.0, -3.0, 0.0],
        [1.5, 2.5, 1.0],
        [3.0, -1.0, 0.0],
        [1.0, 2.0, 0.0],
        [2.0, -2.0, 1.0],
        [0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0],
    ])
}

/// A long wavy stroke that needs downscaling to fit a line
pub fn long_stroke(points: usize) -> StrokeSample {
    (0..points)
        .map(|i| {
            let dy = if i % 2 == 0 { 6.0 } else { -5.0 };
            let eos = if i + 1 == points { 1.0 } else { 0.0 };
            StrokePoint::new(4.0, dy, eos)
        })
        .collect()
}

/// Answers from a fixed table and fails on anything else
#[derive(Default)]
pub struct ScriptedSampler {
    samples: HashMap<String, StrokeSample>,
    failures: HashMap<String, String>,
    latency: Option<Duration>,
    pub calls: AtomicUsize,
}

impl ScriptedSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, line: &str, sample: StrokeSample) -> Self {
        self.samples.insert(line.to_string(), sample);
        self
    }

    pub fn failing(mut self, line: &str, message: &str) -> Self {
        self.failures.insert(line.to_string(), message.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Sampler for ScriptedSampler {
    fn sample(&self, line: &str, _bias: f32, _mode: SamplingMode) -> Result<StrokeSample, SamplingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        if let Some(message) = self.failures.get(line) {
            return Err(SamplingError::Model(message.clone()));
        }
        self.samples
            .get(line)
            .cloned()
            .ok_or_else(|| SamplingError::Unavailable(line.to_string()))
    }
}

pub fn engine_with(sampler: Arc<ScriptedSampler>, config: EngineConfig) -> RenderEngine {
    RenderEngine::open(config, sampler).expect("default config is valid")
}

pub fn request(lines: &[&str]) -> RenderRequest {
    RenderRequest::uniform(
        lines.iter().map(|l| l.to_string()).collect(),
        LineStyle::new("black", 2.0),
    )
}

/// Parse `M`/`L` coordinate pairs out of a path string, skipping the anchor
pub fn path_points(data: &str) -> Vec<(char, f64, f64)> {
    data.split_whitespace()
        .skip(1)
        .filter_map(|token| {
            let command = token.chars().next()?;
            let (x, y) = token[1..].split_once(',')?;
            Some((command, x.parse().ok()?, y.parse().ok()?))
        })
        .collect()
}
