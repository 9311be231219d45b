/// Minimum |cross product| of neighbouring offsets for a point to survive denoising.
pub const DENOISE_TOLERANCE: f64 = 0.01;

/// Zero-length sub-path every path string starts with, kept for output compatibility.
pub const PATH_ANCHOR: &str = "M0,0 ";

/// Fraction of a line height between the top of a line slot and its baseline.
pub const BASELINE_FRACTION: f64 = 0.75;

/// Decimal places kept when formatting path coordinates.
pub const COORD_DECIMALS: i32 = 3;

/// Fill used behind all strokes.
pub const BACKGROUND_FILL: &str = "white";

/// Id of the clip region referenced by the stroke group.
pub const CLIP_PATH_ID: &str = "clip-path";
