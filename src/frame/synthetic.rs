//! Synthetic camera feed for replay runs and tests.
//!
//! Frame 0 is always the bare background so the detector can seed its
//! model; the object appears from frame 1 on.

use super::{Frame, FrameDims};
use crate::constants::simulate::{OBJECT_HEIGHT, OBJECT_WIDTH};

const BACKGROUND_LEVEL: u8 = 50;
const OBJECT_LEVEL: u8 = 200;
const NOISE_LEVEL: u8 = 255;
/// One in this many pixels flickers in the noise scenario.
const NOISE_ONE_IN: u64 = 500;
/// Pixels the transit object moves per frame.
const TRANSIT_STEP: u16 = 50;
/// Offsets inside a 4x4 px box, cycled by the hover scenario.
const JITTER: [(u16, u16); 8] = [
    (0, 0),
    (2, 1),
    (3, 3),
    (1, 2),
    (0, 3),
    (3, 0),
    (2, 2),
    (1, 0),
];

/// Kind of synthetic scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Target-sized object jittering in place.
    Hover,
    /// Target-sized object crossing the frame quickly.
    Transit,
    /// Nothing moves.
    Static,
    /// Isolated single-pixel flicker and nothing else.
    Noise,
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hover => write!(f, "hover"),
            Self::Transit => write!(f, "transit"),
            Self::Static => write!(f, "static"),
            Self::Noise => write!(f, "noise"),
        }
    }
}

impl std::str::FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hover" => Ok(Self::Hover),
            "transit" | "flyby" => Ok(Self::Transit),
            "static" => Ok(Self::Static),
            "noise" => Ok(Self::Noise),
            other => Err(format!("unknown scenario: {other}")),
        }
    }
}

/// Deterministic frame generator.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    scenario: Scenario,
    dims: FrameDims,
    interval_ms: u64,
    object_w: u16,
    object_h: u16,
}

impl SyntheticScene {
    /// Create a scene at the given resolution and frame rate.
    #[must_use]
    pub fn new(scenario: Scenario, dims: FrameDims, fps: u32) -> Self {
        Self {
            scenario,
            dims,
            interval_ms: 1000 / u64::from(fps.max(1)),
            object_w: OBJECT_WIDTH,
            object_h: OBJECT_HEIGHT,
        }
    }

    /// Override the object size.
    #[must_use]
    pub const fn with_object_size(mut self, width: u16, height: u16) -> Self {
        self.object_w = width;
        self.object_h = height;
        self
    }

    /// Scenario being generated.
    #[must_use]
    pub const fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Milliseconds between frames.
    #[must_use]
    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Top-left corner of the object in frame `index`, if one is drawn.
    #[must_use]
    pub fn object_origin(&self, index: u64) -> Option<(u16, u16)> {
        if index == 0 {
            return None;
        }

        // Keep the object in the lower half so its tilt points downward.
        let base_y = (self.dims.height / 3 * 2).saturating_sub(self.object_h / 2);
        let step = index - 1;

        match self.scenario {
            Scenario::Hover => {
                let base_x = (self.dims.width / 2).saturating_sub(self.object_w / 2);
                let (dx, dy) = JITTER[usize::try_from(step).unwrap_or(0) % JITTER.len()];
                Some((base_x + dx, base_y + dy))
            }
            Scenario::Transit => {
                let margin = 10u16;
                let travel = self
                    .dims
                    .width
                    .saturating_sub(self.object_w + 2 * margin)
                    .max(1);
                let offset = (step * u64::from(TRANSIT_STEP)) % u64::from(travel);
                Some((margin + u16::try_from(offset).unwrap_or(0), base_y))
            }
            Scenario::Static | Scenario::Noise => None,
        }
    }

    /// Render frame `index`.
    #[must_use]
    pub fn frame(&self, index: u64) -> Frame {
        let mut frame = Frame::uniform(
            self.dims,
            BACKGROUND_LEVEL,
            index,
            index * self.interval_ms,
        );

        if let Some((x, y)) = self.object_origin(index) {
            frame.fill_rect(x, y, self.object_w, self.object_h, OBJECT_LEVEL);
        }

        if self.scenario == Scenario::Noise && index > 0 {
            let mut state = index.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
            for px in frame.data_mut().chunks_exact_mut(3) {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                if state % NOISE_ONE_IN == 0 {
                    px.fill(NOISE_LEVEL);
                }
            }
        }

        frame
    }
}
