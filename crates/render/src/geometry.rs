//! Stroke geometry normalization
//!
//! Raw model output is a list of pen offsets. Turning it into drawable
//! coordinates happens in two stages:
//!
//! - [`GeometryNormalizer::fit`] integrates, denoises, aligns and scales a
//!   sample into line-local coordinates. The result depends only on the
//!   sample and the viewport geometry, so it is what the transform cache
//!   memoizes.
//! - [`GeometryNormalizer::place`] moves line-local coordinates into a line
//!   slot of a concrete document, centres them and clamps them to the
//!   padded viewport.

use scrivener_config::RenderConfig;
use scrivener_sampler::{StrokePoint, StrokeSample};

use crate::cache::TransformCache;
use crate::constants::{BASELINE_FRACTION, DENOISE_TOLERANCE};
use crate::error::ValidationError;
use crate::types::{Bounds, Coordinate, CoordinateSequence};

/// Converts raw stroke samples into viewport coordinates for one config.
#[derive(Debug, Clone)]
pub struct GeometryNormalizer {
    config: RenderConfig,
    available_width: f64,
    available_height: f64,
}

impl GeometryNormalizer {
    /// Fails when the viewport leaves no drawable area inside its padding.
    pub fn new(config: RenderConfig) -> Result<Self, ValidationError> {
        let available_width = config.available_width();
        let available_height = config.available_height();
        if available_width <= 0.0 || available_height <= 0.0 {
            return Err(ValidationError::DegenerateViewport {
                width: config.viewport_width,
                line_height: config.line_height,
                padding: config.padding,
            });
        }
        if !config.stroke_scale.is_finite() || config.stroke_scale <= 0.0 {
            return Err(ValidationError::InvalidStrokeScale(config.stroke_scale));
        }
        Ok(Self {
            config,
            available_width,
            available_height,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Full pipeline for the line at `line_index` of a `line_count`-line document
    pub fn normalize(
        &self,
        raw: &StrokeSample,
        line_index: usize,
        line_count: usize,
    ) -> Result<CoordinateSequence, ValidationError> {
        let local = self.fit(raw)?;
        Ok(self.place(&local, line_index, line_count))
    }

    /// Integrate, denoise, align, flip and scale a sample into line-local
    /// coordinates whose bounding box starts at the origin.
    pub fn fit(&self, raw: &StrokeSample) -> Result<CoordinateSequence, ValidationError> {
        check_finite(raw.points())?;

        let integrated = integrate(raw.points(), self.config.stroke_scale);
        let mut points = denoise(&integrated, DENOISE_TOLERANCE);
        align(&mut points);
        invert_y(&mut points);

        let Some(bounds) = Bounds::of(&points) else {
            return Ok(CoordinateSequence::default());
        };
        let scale = fit_scale(&bounds, self.available_width, self.available_height);

        Ok(points
            .into_iter()
            .map(|p| Coordinate::new(p.x * scale - bounds.min_x * scale, p.y * scale - bounds.min_y * scale, p.eos))
            .collect())
    }

    /// Same as [`fit`](Self::fit), consulting `cache` first when given
    pub fn fit_cached(
        &self,
        raw: &StrokeSample,
        cache: Option<&TransformCache>,
    ) -> Result<CoordinateSequence, ValidationError> {
        match cache {
            Some(cache) => cache.get_or_compute(self.cache_key(raw), || self.fit(raw)),
            None => self.fit(raw),
        }
    }

    /// Move line-local coordinates into the slot of `line_index`.
    ///
    /// The line is centred horizontally, its baseline sits three quarters of
    /// a line height into the slot, and every point is clamped to the padded
    /// viewport of a `line_count`-line document.
    pub fn place(
        &self,
        local: &CoordinateSequence,
        line_index: usize,
        line_count: usize,
    ) -> CoordinateSequence {
        let Some(bounds) = local.bounds() else {
            return CoordinateSequence::default();
        };

        let width = f64::from(self.config.viewport_width);
        let line_height = f64::from(self.config.line_height);
        let height = f64::from(self.config.viewport_height(line_count));
        let padding = f64::from(self.config.padding);

        let x_offset = (width - bounds.width()) / 2.0 - bounds.min_x;
        let y_offset = BASELINE_FRACTION * line_height + line_index as f64 * line_height;

        local
            .iter()
            .map(|p| {
                Coordinate::new(
                    clamp(p.x + x_offset, padding, width - padding),
                    clamp(p.y + y_offset, padding, height - padding),
                    p.eos,
                )
            })
            .collect()
    }

    /// Cache key for `raw` under this normalizer's geometry.
    ///
    /// Covers every input of [`fit`](Self::fit): the exact sample bytes plus
    /// the drawable area and stroke scale.
    pub fn cache_key(&self, raw: &StrokeSample) -> Vec<u8> {
        let mut key = Vec::with_capacity(24 + raw.len() * 12);
        key.extend_from_slice(&self.available_width.to_le_bytes());
        key.extend_from_slice(&self.available_height.to_le_bytes());
        key.extend_from_slice(&self.config.stroke_scale.to_le_bytes());
        key.extend_from_slice(&raw.to_bytes());
        key
    }
}

fn check_finite(points: &[StrokePoint]) -> Result<(), ValidationError> {
    match points
        .iter()
        .position(|p| !(p.dx.is_finite() && p.dy.is_finite() && p.eos.is_finite()))
    {
        Some(index) => Err(ValidationError::NonFiniteSample { index }),
        None => Ok(()),
    }
}

/// Running sum of offsets scaled by `scale`
pub fn integrate(offsets: &[StrokePoint], scale: f64) -> Vec<Coordinate> {
    let (mut x, mut y) = (0.0_f64, 0.0_f64);
    offsets
        .iter()
        .map(|o| {
            x += f64::from(o.dx) * scale;
            y += f64::from(o.dy) * scale;
            Coordinate::new(x, y, o.eos)
        })
        .collect()
}

/// Drop interior points that barely turn the pen.
///
/// A point survives when the cross product of its incoming and outgoing
/// segments exceeds `tolerance`, when it lifts the pen, or when it starts a
/// stroke. First and last points always survive.
pub fn denoise(points: &[Coordinate], tolerance: f64) -> Vec<Coordinate> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .filter(|&(i, p)| {
            if i == 0 || i == last || p.is_pen_lift() || points[i - 1].is_pen_lift() {
                return true;
            }
            let (prev, next) = (points[i - 1], points[i + 1]);
            let (ax, ay) = (p.x - prev.x, p.y - prev.y);
            let (bx, by) = (next.x - p.x, next.y - p.y);
            (ax * by - ay * bx).abs() > tolerance
        })
        .map(|(_, p)| *p)
        .collect()
}

/// Translate so the minimum x and y sit at the origin
pub fn align(points: &mut [Coordinate]) {
    if let Some(bounds) = Bounds::of(points) {
        for p in points.iter_mut() {
            p.x -= bounds.min_x;
            p.y -= bounds.min_y;
        }
    }
}

/// Model y grows upward; document y grows downward
pub fn invert_y(points: &mut [Coordinate]) {
    for p in points.iter_mut() {
        p.y = -p.y;
    }
}

/// Uniform factor that fits `bounds` into the drawable area, never upscaling
pub fn fit_scale(bounds: &Bounds, available_width: f64, available_height: f64) -> f64 {
    let axis = |extent: f64, available: f64| {
        if extent > 0.0 { available / extent } else { 1.0 }
    };
    axis(bounds.width(), available_width)
        .min(axis(bounds.height(), available_height))
        .min(1.0)
}

fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> GeometryNormalizer {
        GeometryNormalizer::new(RenderConfig::default()).unwrap()
    }

    fn zigzag(n: usize, step: f32) -> StrokeSample {
        (0..n)
            .map(|i| {
                let dy = if i % 2 == 0 { step } else { -step };
                let eos = if i == n - 1 { 1.0 } else { 0.0 };
                StrokePoint::new(step, dy, eos)
            })
            .collect()
    }

    #[test]
    fn test_integrate_scales_offsets() {
        let points = integrate(
            &[StrokePoint::new(1.0, 2.0, 0.0), StrokePoint::new(1.0, -1.0, 1.0)],
            1.5,
        );
        assert_eq!(points[0], Coordinate::new(1.5, 3.0, 0.0));
        assert_eq!(points[1], Coordinate::new(3.0, 1.5, 1.0));
    }

    #[test]
    fn test_denoise_drops_collinear_points() {
        let points: Vec<_> = (0..5).map(|i| Coordinate::new(i as f64, 0.0, 0.0)).collect();
        let kept = denoise(&points, DENOISE_TOLERANCE);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].x, 0.0);
        assert_eq!(kept[1].x, 4.0);
    }

    #[test]
    fn test_denoise_keeps_pen_lifts_and_stroke_starts() {
        let points = vec![
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(1.0, 0.0, 1.0),
            Coordinate::new(2.0, 0.0, 0.0),
            Coordinate::new(3.0, 0.0, 0.0),
            Coordinate::new(4.0, 0.0, 0.0),
        ];
        let kept = denoise(&points, DENOISE_TOLERANCE);
        let xs: Vec<f64> = kept.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_denoise_short_input_untouched() {
        let points = vec![Coordinate::new(0.0, 0.0, 0.0), Coordinate::new(1.0, 0.0, 0.0)];
        assert_eq!(denoise(&points, DENOISE_TOLERANCE), points);
    }

    #[test]
    fn test_fit_scale_never_upscales() {
        let small = Bounds { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 5.0 };
        assert_eq!(fit_scale(&small, 960.0, 40.0), 1.0);

        let tall = Bounds { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 80.0 };
        assert_eq!(fit_scale(&tall, 960.0, 40.0), 0.5);

        let flat = Bounds { min_x: 0.0, min_y: 0.0, max_x: 1920.0, max_y: 0.0 };
        assert_eq!(fit_scale(&flat, 960.0, 40.0), 0.5);
    }

    #[test]
    fn test_fit_respects_available_area() {
        let n = normalizer();
        let local = n.fit(&zigzag(400, 4.0)).unwrap();
        let bounds = local.bounds().unwrap();
        assert!(bounds.width() <= 960.0 + 1e-9);
        assert!(bounds.height() <= 40.0 + 1e-9);
        assert!(bounds.min_x.abs() < 1e-9);
        assert!(bounds.min_y.abs() < 1e-9);
    }

    #[test]
    fn test_place_centres_and_clamps() {
        let n = normalizer();
        let local = n.fit(&zigzag(20, 2.0)).unwrap();
        let placed = n.place(&local, 1, 3);
        let bounds = placed.bounds().unwrap();

        let centre = (bounds.min_x + bounds.max_x) / 2.0;
        assert!((centre - 500.0).abs() < 1e-6);
        assert!(bounds.min_y >= 20.0);
        assert!(bounds.max_y <= 240.0 - 20.0);
        // second slot: baseline at 0.75 * 60 + 60
        assert!(bounds.min_y >= 105.0 - 1e-9);
    }

    #[test]
    fn test_clamp_to_padding() {
        let n = normalizer();
        let local = CoordinateSequence::new(vec![
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(2000.0, 500.0, 1.0),
        ]);
        for p in n.place(&local, 0, 1).iter() {
            assert!((20.0..=980.0).contains(&p.x));
            assert!((20.0..=100.0).contains(&p.y));
        }
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let n = normalizer();
        let sample = zigzag(50, 3.0);
        assert_eq!(n.normalize(&sample, 2, 4).unwrap(), n.normalize(&sample, 2, 4).unwrap());
    }

    #[test]
    fn test_empty_sample() {
        let n = normalizer();
        assert!(n.normalize(&StrokeSample::default(), 0, 1).unwrap().is_empty());
    }

    #[test]
    fn test_non_finite_sample_rejected() {
        let sample = StrokeSample::from_triples(&[[1.0, 0.0, 0.0], [f32::NAN, 0.0, 1.0]]);
        assert_eq!(
            normalizer().fit(&sample),
            Err(ValidationError::NonFiniteSample { index: 1 })
        );
    }

    #[test]
    fn test_degenerate_viewport_rejected() {
        let config = RenderConfig {
            viewport_width: 30,
            ..RenderConfig::default()
        };
        assert!(matches!(
            GeometryNormalizer::new(config),
            Err(ValidationError::DegenerateViewport { .. })
        ));
    }

    #[test]
    fn test_cache_key_tracks_geometry() {
        let sample = zigzag(4, 1.0);
        let a = normalizer();
        let b = GeometryNormalizer::new(RenderConfig {
            line_height: 80,
            ..RenderConfig::default()
        })
        .unwrap();
        assert_eq!(a.cache_key(&sample), a.cache_key(&sample));
        assert_ne!(a.cache_key(&sample), b.cache_key(&sample));
    }
}
