//! Stroke sampling for Scrivener
//!
//! The generative handwriting model is an external collaborator. This crate
//! defines what it produces ([`StrokeSample`]), how it is asked
//! ([`Sampler`], [`SamplingMode`]) and how it fails ([`SamplingError`]),
//! plus a [`ReplaySampler`] backend that serves recorded samples.

mod replay;
mod types;

pub use replay::ReplaySampler;
pub use types::{StrokePoint, StrokeSample, PEN_LIFT_THRESHOLD};

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Model execution failed: {0}")]
    Model(String),

    #[error("Unknown style: {0}")]
    UnknownStyle(u32),

    #[error("No strokes available for line {0:?}")]
    Unavailable(String),

    #[error("Invalid stroke recording: {0}")]
    InvalidRecording(String),

    #[error("Sampling timed out after {0:?}")]
    Timeout(Duration),

    #[error("Sampling worker failed: {0}")]
    Worker(String),

    #[error("Cancelled")]
    Cancelled,
}

/// How the model is conditioned for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingMode {
    /// Unconditioned handwriting
    Freehand,
    /// Primed with a stored handwriting style
    Primed(u32),
}

impl SamplingMode {
    pub fn style_id(&self) -> Option<u32> {
        match self {
            Self::Freehand => None,
            Self::Primed(id) => Some(*id),
        }
    }

    /// Resolve per-line style ids into sampling modes for a whole request.
    ///
    /// Either every line names a style or none does; a mix returns `None`.
    pub fn resolve<I>(style_ids: I) -> Option<Vec<SamplingMode>>
    where
        I: IntoIterator<Item = Option<u32>>,
    {
        let ids: Vec<Option<u32>> = style_ids.into_iter().collect();
        if ids.iter().all(Option::is_some) {
            Some(ids.into_iter().flatten().map(Self::Primed).collect())
        } else if ids.iter().all(Option::is_none) {
            Some(vec![Self::Freehand; ids.len()])
        } else {
            None
        }
    }
}

/// Trait for stroke sampling backends.
///
/// Calls are blocking and may be slow; the renderer only ever invokes them
/// from its worker pool.
pub trait Sampler: Send + Sync {
    /// Produce the raw stroke sample for one line of text
    fn sample(
        &self,
        line: &str,
        bias: f32,
        mode: SamplingMode,
    ) -> Result<StrokeSample, SamplingError>;
}

impl<S: Sampler + ?Sized> Sampler for std::sync::Arc<S> {
    fn sample(
        &self,
        line: &str,
        bias: f32,
        mode: SamplingMode,
    ) -> Result<StrokeSample, SamplingError> {
        (**self).sample(line, bias, mode)
    }
}
