//! Events emitted by a streaming render, and their event-stream framing.

use serde::{Deserialize, Serialize};

use crate::error::IpcError;

/// Prefix of every event-stream frame
pub const FRAME_PREFIX: &str = "data: ";

/// One completed run of path commands belonging to a single text line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Path commands (`M`/`L` pairs)
    #[serde(rename = "data")]
    pub path_data: String,
    /// Stroke color of the owning line
    pub color: String,
    /// Stroke width of the owning line
    pub width: f32,
    /// Zero-based index of the owning line in the request
    #[serde(rename = "lineNumber")]
    pub line_index: usize,
}

/// Messages from a streaming render to its consumer.
///
/// A well-formed stream is exactly one `Setup`, any number of `Path`
/// events, at most one `Error`, and exactly one trailing `Done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderEvent {
    /// Document geometry, sent before any path
    Setup {
        #[serde(rename = "viewBox")]
        view_box: String,
        width: u32,
        height: u32,
    },

    /// A path segment ready to draw
    Path(PathSegment),

    /// The render failed; remaining lines were abandoned
    Error { message: String },

    /// End of stream
    Done,
}

impl RenderEvent {
    /// Whether this event closes the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Serialize to the JSON body carried by one frame
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode as a single `data: <JSON>\n\n` event-stream frame
    pub fn to_frame(&self) -> Result<String, IpcError> {
        Ok(format!("{FRAME_PREFIX}{}\n\n", self.to_json()?))
    }

    /// Decode one frame produced by [`RenderEvent::to_frame`]
    pub fn from_frame(frame: &str) -> Result<Self, IpcError> {
        let body = frame
            .trim_end_matches(['\n', '\r'])
            .strip_prefix(FRAME_PREFIX)
            .ok_or_else(|| IpcError::MalformedFrame(format!("missing `{FRAME_PREFIX}` prefix")))?;
        Ok(serde_json::from_str(body)?)
    }
}
