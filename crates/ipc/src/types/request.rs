//! Render request shapes.

use serde::{Deserialize, Serialize};

use super::text::{split_into_segments, MAX_LINE_CHARS};
use crate::error::IpcError;

/// Sampling bias used when a request leaves it unspecified
pub const DEFAULT_BIAS: f32 = 0.5;

/// Per-line drawing and sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub stroke_color: String,
    pub stroke_width: f32,
    /// Sampling bias; higher values give neater, less varied strokes
    pub bias: f32,
    /// Handwriting style to prime the model with, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_id: Option<u32>,
}

impl LineStyle {
    pub fn new(stroke_color: impl Into<String>, stroke_width: f32) -> Self {
        Self {
            stroke_color: stroke_color.into(),
            stroke_width,
            bias: DEFAULT_BIAS,
            style_id: None,
        }
    }

    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_style(mut self, style_id: u32) -> Self {
        self.style_id = Some(style_id);
        self
    }
}

/// A fully resolved request: one [`LineStyle`] per text line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub lines: Vec<String>,
    pub styles: Vec<LineStyle>,
}

impl RenderRequest {
    pub fn new(lines: Vec<String>, styles: Vec<LineStyle>) -> Self {
        Self { lines, styles }
    }

    /// Every line drawn with the same style
    pub fn uniform(lines: Vec<String>, style: LineStyle) -> Self {
        let styles = vec![style; lines.len()];
        Self { lines, styles }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Request with parallel per-line lists, each optional except the text.
///
/// Missing lists fall back to the supplied defaults; present lists must
/// have one entry per line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailedRenderRequest {
    pub text_input: Vec<String>,
    #[serde(default)]
    pub styles: Option<Vec<u32>>,
    #[serde(default)]
    pub biases: Option<Vec<f32>>,
    #[serde(default)]
    pub stroke_widths: Option<Vec<f32>>,
    #[serde(default)]
    pub stroke_colors: Option<Vec<String>>,
}

impl DetailedRenderRequest {
    /// Zip the parallel lists into a [`RenderRequest`].
    pub fn into_request(
        self,
        default_color: &str,
        default_width: f32,
    ) -> Result<RenderRequest, IpcError> {
        let count = self.text_input.len();
        check_len("styles", self.styles.as_ref(), count)?;
        check_len("biases", self.biases.as_ref(), count)?;
        check_len("stroke_widths", self.stroke_widths.as_ref(), count)?;
        check_len("stroke_colors", self.stroke_colors.as_ref(), count)?;

        let styles = (0..count)
            .map(|i| LineStyle {
                stroke_color: self
                    .stroke_colors
                    .as_ref()
                    .map_or_else(|| default_color.to_string(), |c| c[i].clone()),
                stroke_width: self.stroke_widths.as_ref().map_or(default_width, |w| w[i]),
                bias: self.biases.as_ref().map_or(DEFAULT_BIAS, |b| b[i]),
                style_id: self.styles.as_ref().map(|s| s[i]),
            })
            .collect();

        Ok(RenderRequest {
            lines: self.text_input,
            styles,
        })
    }
}

fn check_len<T>(
    field: &'static str,
    list: Option<&Vec<T>>,
    expected: usize,
) -> Result<(), IpcError> {
    match list {
        Some(list) if list.len() != expected => Err(IpcError::LengthMismatch {
            field,
            expected,
            actual: list.len(),
        }),
        _ => Ok(()),
    }
}

/// Single block of free text rendered with one style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleRenderRequest {
    pub text_input: String,
    #[serde(default)]
    pub style: Option<u32>,
    #[serde(default = "default_bias")]
    pub bias: f32,
    pub stroke_width: f32,
    pub stroke_color: String,
}

fn default_bias() -> f32 {
    DEFAULT_BIAS
}

impl SimpleRenderRequest {
    /// Wrap the text into model-sized lines sharing this request's style.
    pub fn into_request(self) -> RenderRequest {
        let lines = split_into_segments(&self.text_input, MAX_LINE_CHARS);
        let mut style = LineStyle::new(self.stroke_color, self.stroke_width).with_bias(self.bias);
        style.style_id = self.style;
        RenderRequest::uniform(lines, style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detailed_defaults() {
        let request = DetailedRenderRequest {
            text_input: vec!["one".into(), "two".into()],
            ..Default::default()
        }
        .into_request("black", 2.0)
        .unwrap();

        assert_eq!(request.line_count(), 2);
        assert_eq!(request.styles[1], LineStyle::new("black", 2.0));
    }

    #[test]
    fn test_detailed_zips_lists() {
        let request = DetailedRenderRequest {
            text_input: vec!["one".into(), "two".into()],
            styles: Some(vec![9, 12]),
            biases: Some(vec![0.75, 0.2]),
            stroke_widths: Some(vec![1.0, 3.0]),
            stroke_colors: Some(vec!["red".into(), "green".into()]),
        }
        .into_request("black", 2.0)
        .unwrap();

        assert_eq!(
            request.styles[1],
            LineStyle::new("green", 3.0).with_bias(0.2).with_style(12)
        );
    }

    #[test]
    fn test_detailed_rejects_length_mismatch() {
        let err = DetailedRenderRequest {
            text_input: vec!["one".into(), "two".into()],
            biases: Some(vec![0.75]),
            ..Default::default()
        }
        .into_request("black", 2.0)
        .unwrap_err();

        assert!(matches!(
            err,
            IpcError::LengthMismatch {
                field: "biases",
                expected: 2,
                actual: 1
            }
        ));
        assert!(err.to_string().contains("biases"));
    }

    #[test]
    fn test_simple_request_wraps_text() {
        let request = SimpleRenderRequest {
            text_input: "word ".repeat(40),
            style: Some(3),
            bias: 0.9,
            stroke_width: 1.0,
            stroke_color: "blue".into(),
        }
        .into_request();

        assert!(request.line_count() > 1);
        assert_eq!(request.styles.len(), request.line_count());
        assert!(request.styles.iter().all(|s| s.style_id == Some(3)));
    }

    #[test]
    fn test_line_style_json() {
        let style: LineStyle =
            serde_json::from_str(r#"{"stroke_color":"red","stroke_width":1.5,"bias":0.6}"#)
                .unwrap();
        assert_eq!(style.style_id, None);
        assert_eq!(style.stroke_width, 1.5);
    }
}
