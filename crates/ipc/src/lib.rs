//! Wire protocol for Scrivener
//!
//! Defines the render requests clients send and the events a streaming
//! render emits back, plus the text-event-stream framing those events
//! travel in.

mod error;
mod messages;
mod types;

pub use error::IpcError;
pub use messages::{PathSegment, RenderEvent, FRAME_PREFIX};
pub use types::*;
