use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// End-of-stroke values at or above this mark a pen-lift
pub const PEN_LIFT_THRESHOLD: f32 = 0.95;

/// A single pen offset as produced by the model.
///
/// Serialized as a `[dx, dy, eos]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct StrokePoint {
    pub dx: f32,
    pub dy: f32,
    /// End-of-stroke flag, nominally 0 or 1
    pub eos: f32,
}

impl StrokePoint {
    pub const fn new(dx: f32, dy: f32, eos: f32) -> Self {
        Self { dx, dy, eos }
    }

    pub fn is_pen_lift(&self) -> bool {
        self.eos >= PEN_LIFT_THRESHOLD
    }

    fn is_padding(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0 && self.eos == 0.0
    }
}

impl From<[f32; 3]> for StrokePoint {
    fn from([dx, dy, eos]: [f32; 3]) -> Self {
        Self { dx, dy, eos }
    }
}

impl From<StrokePoint> for [f32; 3] {
    fn from(p: StrokePoint) -> Self {
        [p.dx, p.dy, p.eos]
    }
}

/// Ordered pen offsets for one line of text. Immutable once sampled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeSample {
    points: Vec<StrokePoint>,
}

impl StrokeSample {
    pub fn new(points: Vec<StrokePoint>) -> Self {
        Self { points }
    }

    pub fn from_triples(triples: &[[f32; 3]]) -> Self {
        Self {
            points: triples.iter().copied().map(StrokePoint::from).collect(),
        }
    }

    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop the all-zero rows the model pads its output with
    pub fn trim_padding(mut self) -> Self {
        self.points.retain(|p| !p.is_padding());
        self
    }

    /// Indices of pen-lift points in this raw sample
    pub fn eos_indices(&self) -> BTreeSet<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_pen_lift())
            .map(|(i, _)| i)
            .collect()
    }

    /// Exact byte content, little-endian `dx, dy, eos` per point
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.points.len() * 12);
        for p in &self.points {
            bytes.extend_from_slice(&p.dx.to_le_bytes());
            bytes.extend_from_slice(&p.dy.to_le_bytes());
            bytes.extend_from_slice(&p.eos.to_le_bytes());
        }
        bytes
    }
}

impl FromIterator<StrokePoint> for StrokeSample {
    fn from_iter<I: IntoIterator<Item = StrokePoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
