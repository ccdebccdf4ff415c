//! Streaming relay between the upstream Messages API and the browser.

pub mod decoder;
pub mod engine;
pub mod events;
pub mod transform;

pub use decoder::{FrameDecoder, StreamFrame};
pub use engine::{RelayEngine, RelaySettings};
pub use events::{DownstreamEvent, UpstreamEvent};
pub use transform::{RelayAction, dispatch};
