//! Motion detection by background subtraction.
//!
//! [`MotionDetector`] turns each frame into a bounded list of
//! [`MotionRegion`]s: luminance, running-average background, thresholded
//! foreground mask, a cross-shaped opening, then 4-connected components
//! filtered by area and aspect ratio.

mod components;
mod morphology;
mod motion;

pub use components::{Component, label_components};
pub use morphology::{BACKGROUND, FOREGROUND, dilate_cross, erode_cross, open_cross};
pub use motion::{MotionDetector, MotionRegion, MotionResult};
