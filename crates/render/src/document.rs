//! Batch rendering of a whole request into one SVG document

use std::fmt::Write;

use scrivener_ipc::LineStyle;
use scrivener_sampler::StrokeSample;
use tracing::debug;

use crate::cache::TransformCache;
use crate::constants::{BACKGROUND_FILL, CLIP_PATH_ID};
use crate::error::ValidationError;
use crate::geometry::GeometryNormalizer;
use crate::path::PathBuilder;

/// Composes per-line paths into a complete document.
///
/// Output is a pure function of the inputs: identical lines, samples and
/// styles produce byte-identical documents.
#[derive(Debug, Clone, Copy)]
pub struct DocumentRenderer<'a> {
    normalizer: &'a GeometryNormalizer,
    cache: Option<&'a TransformCache>,
}

impl<'a> DocumentRenderer<'a> {
    pub fn new(normalizer: &'a GeometryNormalizer) -> Self {
        Self {
            normalizer,
            cache: None,
        }
    }

    /// Reuse normalized geometry across renders
    pub fn with_cache(mut self, cache: &'a TransformCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Render `lines` with their raw `samples` and `styles`, all index-aligned.
    ///
    /// Empty lines and empty samples draw nothing but still take up a line slot.
    pub fn render(
        &self,
        lines: &[String],
        samples: &[StrokeSample],
        styles: &[LineStyle],
    ) -> Result<String, ValidationError> {
        if samples.len() != lines.len() {
            return Err(ValidationError::SampleCountMismatch {
                lines: lines.len(),
                samples: samples.len(),
            });
        }
        if styles.len() != lines.len() {
            return Err(ValidationError::StyleCountMismatch {
                lines: lines.len(),
                styles: styles.len(),
            });
        }

        let config = self.normalizer.config();
        let line_count = lines.len();
        let width = config.viewport_width;
        let height = config.viewport_height(line_count);

        let mut paths = Vec::with_capacity(line_count);
        for (index, ((line, sample), style)) in lines.iter().zip(samples).zip(styles).enumerate() {
            if line.is_empty() || sample.is_empty() {
                debug!(line = index, "Skipping blank line");
                continue;
            }
            let local = self.normalizer.fit_cached(sample, self.cache)?;
            let placed = self.normalizer.place(&local, index, line_count);
            if placed.is_empty() {
                continue;
            }
            paths.push((PathBuilder::build(placed.points()), style));
        }

        let mut svg = String::new();
        // Writing into a String cannot fail
        let _ = write_document(&mut svg, width, height, &config.view_box(line_count), &paths);
        debug!(lines = line_count, paths = paths.len(), bytes = svg.len(), "Rendered document");
        Ok(svg)
    }
}

fn write_document(
    out: &mut String,
    width: u32,
    height: u32,
    view_box: &str,
    paths: &[(String, &LineStyle)],
) -> std::fmt::Result {
    write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="{view_box}">"#
    )?;
    write!(
        out,
        r#"<defs><clipPath id="{CLIP_PATH_ID}"><rect x="0" y="0" width="{width}" height="{height}"/></clipPath></defs>"#
    )?;
    write!(out, r#"<g clip-path="url(#{CLIP_PATH_ID})">"#)?;
    write!(
        out,
        r#"<rect x="0" y="0" width="{width}" height="{height}" fill="{BACKGROUND_FILL}"/>"#
    )?;
    for (data, style) in paths {
        write!(
            out,
            r#"<path d="{data}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="round"/>"#,
            escape_attr(&style.stroke_color),
            style.stroke_width
        )?;
    }
    out.push_str("</g></svg>");
    Ok(())
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
