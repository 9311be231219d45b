//! Errors raised while framing events or decoding render requests

#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A stream frame without the `data: ` prefix
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A per-line list whose length disagrees with the number of lines
    #[error("{field} has {actual} entries but text_input has {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}
