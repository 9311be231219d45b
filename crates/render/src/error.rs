//! Error taxonomy for the render pipeline.

use scrivener_sampler::SamplingError;
use thiserror::Error;

use crate::scheduler::ScheduleError;

/// Malformed input caught before or during geometry processing.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Request contains no lines")]
    NoLines,

    #[error("Got {lines} lines but {styles} styles")]
    StyleCountMismatch { lines: usize, styles: usize },

    #[error("Got {lines} lines but {samples} stroke samples")]
    SampleCountMismatch { lines: usize, samples: usize },

    #[error("Line {index} has {len} characters; at most {max} are allowed")]
    LineTooLong { index: usize, len: usize, max: usize },

    #[error("Invalid character {ch:?} in line {index}")]
    InvalidCharacter { index: usize, ch: char },

    #[error("Line {index} has an invalid bias: {bias}")]
    InvalidBias { index: usize, bias: f32 },

    #[error("Line {index} has an invalid stroke width: {width}")]
    InvalidStrokeWidth { index: usize, width: f32 },

    #[error("Line {index} has an invalid stroke color: {color:?}")]
    InvalidColor { index: usize, color: String },

    #[error("Either every line or no line may select a handwriting style")]
    MixedStyles,

    #[error("Stroke sample has a non-finite value at point {index}")]
    NonFiniteSample { index: usize },

    #[error("Viewport {width}x{line_height} leaves no drawable area inside padding {padding}")]
    DegenerateViewport {
        width: u32,
        line_height: u32,
        padding: u32,
    },

    #[error("Stroke scale must be positive and finite, got {0}")]
    InvalidStrokeScale(f64),
}

/// Failure turning a finished vector document into another format.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Malformed vector document: {0}")]
    Parse(String),

    #[error("Rasterization failed: {0}")]
    Raster(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Reserved; cache bookkeeping never fails in normal operation
    #[error("Transform cache failure: {0}")]
    Cache(String),

    #[error("Render engine is closed")]
    EngineClosed,
}

impl From<ScheduleError> for SamplingError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::TimedOut(limit) => SamplingError::Timeout(limit),
            ScheduleError::Panicked(msg) => SamplingError::Worker(msg),
            ScheduleError::Closed => SamplingError::Cancelled,
        }
    }
}
