//! Scrivener rendering core - raw pen strokes to vector drawings
//!
//! This crate turns stroke samples from a handwriting model into SVG:
//! - [`geometry`] - Integration, denoising, scaling and placement of strokes
//! - [`path`] - Pen-up/pen-down path command generation
//! - [`cache`] - Size- and age-bounded memo of normalized geometry
//! - [`document`] - One complete document per request
//! - [`stream`] - Incremental path events over a bounded channel
//! - [`scheduler`] - Bounded worker pool for blocking sampler calls
//! - [`engine`] - Lifecycle owner tying the pieces together
//! - [`export`] - Converters from finished documents to other formats
//! - [`validation`] - Defensive request checks

pub mod cache;
pub mod constants;
pub mod document;
pub mod engine;
pub mod error;
pub mod export;
pub mod geometry;
pub mod path;
pub mod scheduler;
pub mod stream;
pub mod types;
pub mod validation;

pub use cache::{CacheStats, TransformCache};
pub use constants::*;
pub use document::DocumentRenderer;
pub use engine::RenderEngine;
pub use error::{ConversionError, RenderError, ValidationError};
pub use export::{DataUriConverter, SvgPassthrough, VectorToDocument};
#[cfg(feature = "pdf")]
pub use export::PdfConverter;
#[cfg(feature = "raster")]
pub use export::RasterConverter;
pub use geometry::GeometryNormalizer;
pub use path::{PathBuilder, split_segments};
pub use scheduler::{JobHandle, RenderScheduler, ScheduleError};
pub use stream::{CancelHandle, RenderStream, StreamOutcome, StreamPhase, StreamRenderer};
pub use types::{Bounds, Coordinate, CoordinateSequence};
pub use validation::{is_drawable, validate_request};
