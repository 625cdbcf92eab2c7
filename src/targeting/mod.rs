//! From classified detections to an actuation request.

mod decision;
mod mapper;

pub use decision::{ActuationPolicy, Engagement};
pub use mapper::{CoordinateMapper, TargetAngles};
