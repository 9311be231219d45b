//! Path command generation from normalized coordinates

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::constants::{COORD_DECIMALS, PATH_ANCHOR};
use crate::types::Coordinate;

/// Accumulates `M`/`L` commands for one path string.
///
/// A point is a move when it is the first point after the anchor or the
/// point before it lifted the pen; otherwise it is a line.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    data: String,
    pen_up: bool,
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PathBuilder {
    pub fn new() -> Self {
        Self {
            data: String::from(PATH_ANCHOR),
            pen_up: true,
        }
    }

    /// One path for a whole line
    pub fn build(coords: &[Coordinate]) -> String {
        let mut builder = Self::new();
        for c in coords {
            builder.push(c);
        }
        builder.data
    }

    pub fn push(&mut self, c: &Coordinate) {
        let command = if self.pen_up { 'M' } else { 'L' };
        // Writing into a String cannot fail
        let _ = write!(
            self.data,
            "{command}{},{} ",
            format_coord(c.x),
            format_coord(c.y)
        );
        self.pen_up = c.is_pen_lift();
    }

    /// True while nothing but the anchor has been written
    pub fn is_anchor_only(&self) -> bool {
        self.data == PATH_ANCHOR
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Hand out the accumulated path and start over from the anchor
    pub fn take(&mut self) -> String {
        self.pen_up = true;
        std::mem::replace(&mut self.data, String::from(PATH_ANCHOR))
    }
}

/// Split one line's coordinates into the path strings a stream emits.
///
/// A path is cut after a pen-lift, after any index listed in
/// `eos_indices`, and after the last point. The index set comes from the
/// raw sample before denoising, so it may not line up with pen-lifts in
/// `coords`; cuts happen at those positions regardless.
pub fn split_segments(coords: &[Coordinate], eos_indices: &BTreeSet<usize>) -> Vec<String> {
    let mut builder = PathBuilder::new();
    let mut segments = Vec::new();
    let last = coords.len().saturating_sub(1);

    for (i, c) in coords.iter().enumerate() {
        builder.push(c);
        let cut = c.is_pen_lift() || eos_indices.contains(&i) || i == last;
        if cut && !builder.is_anchor_only() {
            segments.push(builder.take());
        }
    }
    segments
}

/// Round to a fixed number of decimals and print in shortest form
pub fn format_coord(value: f64) -> String {
    let factor = 10f64.powi(COORD_DECIMALS);
    let rounded = (value * factor).round() / factor;
    // avoid printing "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}
