//! Converters from a finished SVG document to deliverable bytes
//!
//! PNG output sits behind the `raster` feature and PDF behind `pdf`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::ConversionError;

/// Turns a rendered vector document into another representation.
///
/// Conversions may be slow; the engine runs them on its worker pool.
pub trait VectorToDocument: Send + Sync {
    /// MIME type of the produced bytes
    fn media_type(&self) -> &'static str;

    fn convert(&self, document: &str) -> Result<Vec<u8>, ConversionError>;
}

/// Passes the SVG through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgPassthrough;

impl VectorToDocument for SvgPassthrough {
    fn media_type(&self) -> &'static str {
        "image/svg+xml"
    }

    fn convert(&self, document: &str) -> Result<Vec<u8>, ConversionError> {
        if !document.trim_start().starts_with("<svg") {
            return Err(ConversionError::Parse("document has no <svg> root".to_string()));
        }
        Ok(document.as_bytes().to_vec())
    }
}

/// Wraps the SVG in a base64 `data:` URI for direct embedding
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUriConverter;

impl DataUriConverter {
    pub const PREFIX: &'static str = "data:image/svg+xml;base64,";

    pub fn encode(document: &str) -> String {
        format!("{}{}", Self::PREFIX, BASE64.encode(document.as_bytes()))
    }
}

impl VectorToDocument for DataUriConverter {
    fn media_type(&self) -> &'static str {
        "text/uri-list"
    }

    fn convert(&self, document: &str) -> Result<Vec<u8>, ConversionError> {
        Ok(Self::encode(document).into_bytes())
    }
}

/// Rasterizes the SVG and encodes it as PNG
#[cfg(feature = "raster")]
#[derive(Debug, Clone, Copy)]
pub struct RasterConverter {
    scale: f32,
}

#[cfg(feature = "raster")]
impl Default for RasterConverter {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

#[cfg(feature = "raster")]
impl RasterConverter {
    /// Output pixels per document unit
    pub fn with_scale(scale: f32) -> Self {
        Self { scale }
    }
}

#[cfg(feature = "raster")]
impl VectorToDocument for RasterConverter {
    fn media_type(&self) -> &'static str {
        "image/png"
    }

    fn convert(&self, document: &str) -> Result<Vec<u8>, ConversionError> {
        use image::{DynamicImage, ImageFormat, RgbaImage};
        use resvg::tiny_skia::{Pixmap, Transform};
        use resvg::usvg;

        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConversionError::Raster(format!("invalid scale {}", self.scale)));
        }

        let tree = usvg::Tree::from_str(document, &usvg::Options::default())
            .map_err(|e| ConversionError::Parse(e.to_string()))?;
        let size = tree.size();
        let width = (size.width() * self.scale).ceil() as u32;
        let height = (size.height() * self.scale).ceil() as u32;

        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| ConversionError::Raster(format!("cannot allocate {width}x{height} pixmap")))?;
        resvg::render(&tree, Transform::from_scale(self.scale, self.scale), &mut pixmap.as_mut());

        let mut rgba = pixmap.data().to_vec();
        unpremultiply_rgba(&mut rgba);
        let buffer = RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| ConversionError::Raster("pixel buffer size mismatch".to_string()))?;

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(buffer)
            .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ConversionError::Encode(e.to_string()))?;
        Ok(png)
    }
}

/// Converts the SVG into a single-page PDF sized to the viewport
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfConverter;

#[cfg(feature = "pdf")]
impl VectorToDocument for PdfConverter {
    fn media_type(&self) -> &'static str {
        "application/pdf"
    }

    fn convert(&self, document: &str) -> Result<Vec<u8>, ConversionError> {
        use svg2pdf::usvg;
        use svg2pdf::{ConversionOptions, PageOptions};

        let tree = usvg::Tree::from_str(document, &usvg::Options::default())
            .map_err(|e| ConversionError::Parse(e.to_string()))?;
        svg2pdf::to_pdf(&tree, ConversionOptions::default(), PageOptions::default())
            .map_err(|e| ConversionError::Encode(e.to_string()))
    }
}

#[cfg(feature = "raster")]
fn unpremultiply_rgba(data: &mut [u8]) {
    for pixel in data.chunks_mut(4) {
        let alpha = pixel[3];
        if alpha == 0 {
            pixel[..3].fill(0);
            continue;
        }
        let a = u32::from(alpha);
        for channel in &mut pixel[..3] {
            *channel = ((u32::from(*channel) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}
