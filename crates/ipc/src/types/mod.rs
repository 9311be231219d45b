//! Request types accepted by the renderer.

mod request;
mod text;

pub use request::*;
pub use text::*;
