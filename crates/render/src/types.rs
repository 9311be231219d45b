use std::sync::Arc;

use scrivener_sampler::PEN_LIFT_THRESHOLD;

/// An absolute pen position with its end-of-stroke flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub eos: f32,
}

impl Coordinate {
    pub const fn new(x: f64, y: f64, eos: f32) -> Self {
        Self { x, y, eos }
    }

    pub fn is_pen_lift(&self) -> bool {
        self.eos >= PEN_LIFT_THRESHOLD
    }
}

/// Normalized points for one line. Shares its storage, so clones are cheap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateSequence {
    points: Arc<[Coordinate]>,
}

impl CoordinateSequence {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self {
            points: points.into(),
        }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coordinate> {
        self.points.iter()
    }

    /// Axis-aligned bounds, `None` when empty
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of(&self.points)
    }
}

impl FromIterator<Coordinate> for CoordinateSequence {
    fn from_iter<I: IntoIterator<Item = Coordinate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CoordinateSequence {
    type Item = &'a Coordinate;
    type IntoIter = std::slice::Iter<'a, Coordinate>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn of(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let init = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(points.iter().fold(init, |b, p| Self {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}
