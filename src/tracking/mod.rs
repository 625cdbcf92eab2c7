//! Multi-object tracking by nearest-centroid association.

mod history;
mod tracker;

pub use history::{TrackHistory, TrackSample};
pub use tracker::{ObjectTracker, Track, TrackedDetection};
