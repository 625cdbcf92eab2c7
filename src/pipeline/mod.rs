//! Per-frame processing and the control tick.

mod control;
mod detect;

pub use control::{ControlLoop, TickReport};
pub use detect::{DetectionPipeline, FrameReport};
