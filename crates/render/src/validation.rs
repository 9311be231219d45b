use scrivener_ipc::{MAX_LINE_CHARS, RenderRequest};
use scrivener_sampler::SamplingMode;

use crate::error::ValidationError;

/// Punctuation the handwriting model has glyphs for, besides ASCII letters and digits
pub const ALLOWED_PUNCTUATION: &str = " !\"#'(),-.:;?";

/// Characters that would break out of an attribute value
const MARKUP_CHARS: &[char] = &['<', '>', '"', '&', '\''];

/// Check if the model can draw `ch`
pub fn is_drawable(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(ch)
}

/// Validate a request and resolve its sampling mode per line
pub fn validate_request(request: &RenderRequest) -> Result<Vec<SamplingMode>, ValidationError> {
    if request.lines.is_empty() {
        return Err(ValidationError::NoLines);
    }
    if request.styles.len() != request.lines.len() {
        return Err(ValidationError::StyleCountMismatch {
            lines: request.lines.len(),
            styles: request.styles.len(),
        });
    }

    for (index, line) in request.lines.iter().enumerate() {
        validate_line(index, line)?;
    }

    for (index, style) in request.styles.iter().enumerate() {
        if !style.bias.is_finite() || style.bias <= 0.0 {
            return Err(ValidationError::InvalidBias {
                index,
                bias: style.bias,
            });
        }
        if !style.stroke_width.is_finite() || style.stroke_width <= 0.0 {
            return Err(ValidationError::InvalidStrokeWidth {
                index,
                width: style.stroke_width,
            });
        }
        if style.stroke_color.trim().is_empty() || style.stroke_color.contains(MARKUP_CHARS) {
            return Err(ValidationError::InvalidColor {
                index,
                color: style.stroke_color.clone(),
            });
        }
    }

    SamplingMode::resolve(request.styles.iter().map(|s| s.style_id))
        .ok_or(ValidationError::MixedStyles)
}

/// Length and alphabet check for one line. Empty lines are allowed.
pub fn validate_line(index: usize, line: &str) -> Result<(), ValidationError> {
    let len = line.chars().count();
    if len > MAX_LINE_CHARS {
        return Err(ValidationError::LineTooLong {
            index,
            len,
            max: MAX_LINE_CHARS,
        });
    }
    match line.chars().find(|&ch| !is_drawable(ch)) {
        Some(ch) => Err(ValidationError::InvalidCharacter { index, ch }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener_ipc::LineStyle;

    fn request(lines: &[&str]) -> RenderRequest {
        RenderRequest::uniform(
            lines.iter().map(|l| l.to_string()).collect(),
            LineStyle::new("black", 2.0),
        )
    }

    #[test]
    fn test_valid_request_is_freehand() {
        let modes = validate_request(&request(&["Hello, world!", ""])).unwrap();
        assert_eq!(modes, vec![SamplingMode::Freehand, SamplingMode::Freehand]);
    }

    #[test]
    fn test_empty_request() {
        assert_eq!(validate_request(&request(&[])), Err(ValidationError::NoLines));
    }

    #[test]
    fn test_style_count_mismatch() {
        let mut req = request(&["a", "b"]);
        req.styles.pop();
        assert_eq!(
            validate_request(&req),
            Err(ValidationError::StyleCountMismatch { lines: 2, styles: 1 })
        );
    }

    #[test]
    fn test_line_too_long() {
        let long = "a".repeat(MAX_LINE_CHARS + 1);
        assert!(matches!(
            validate_request(&request(&[&long])),
            Err(ValidationError::LineTooLong { index: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(
            validate_request(&request(&["ok", "50%"])),
            Err(ValidationError::InvalidCharacter { index: 1, ch: '%' })
        );
    }

    #[test]
    fn test_style_parameters() {
        let mut req = request(&["a"]);
        req.styles[0].bias = 0.0;
        assert!(matches!(validate_request(&req), Err(ValidationError::InvalidBias { .. })));

        let mut req = request(&["a"]);
        req.styles[0].stroke_width = f32::NAN;
        assert!(matches!(validate_request(&req), Err(ValidationError::InvalidStrokeWidth { .. })));

        let mut req = request(&["a"]);
        req.styles[0].stroke_color = "red\" onload=\"x".to_string();
        assert!(matches!(validate_request(&req), Err(ValidationError::InvalidColor { .. })));
    }

    #[test]
    fn test_style_modes() {
        let mut req = request(&["a", "b"]);
        req.styles[0].style_id = Some(4);
        assert_eq!(validate_request(&req), Err(ValidationError::MixedStyles));

        req.styles[1].style_id = Some(9);
        assert_eq!(
            validate_request(&req).unwrap(),
            vec![SamplingMode::Primed(4), SamplingMode::Primed(9)]
        );
    }
}
