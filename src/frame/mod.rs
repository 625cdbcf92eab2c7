//! Frame representation and luminance conversion.
//!
//! A [`Frame`] is the opaque raster handed to the core by an external
//! source: interleaved BGR bytes of a fixed resolution, a sequence number
//! and a monotonic millisecond timestamp. Frames live for one processing
//! cycle only.

mod buffers;
mod synthetic;

pub use buffers::{BudgetedBuffers, BufferProvider, HeapBuffers, provision};
pub use synthetic::{Scenario, SyntheticScene};

use crate::config::FrameConfig;
use crate::constants::frame::{CHANNELS, LUMA_WEIGHT_B, LUMA_WEIGHT_G, LUMA_WEIGHT_R};

/// Fixed frame resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameDims {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
}

impl FrameDims {
    /// Create a resolution.
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Number of pixels in one frame.
    #[must_use]
    pub const fn pixels(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Length in bytes of an interleaved BGR raster.
    #[must_use]
    pub const fn raster_len(self) -> usize {
        self.pixels() * CHANNELS
    }
}

impl From<FrameConfig> for FrameDims {
    fn from(config: FrameConfig) -> Self {
        Self::new(config.width, config.height)
    }
}

/// One captured frame.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Vec<u8>,
    dims: FrameDims,
    sequence: u64,
    timestamp_ms: u64,
}

impl Frame {
    /// Wrap an interleaved BGR raster.
    ///
    /// The raster length is not checked here; the detector rejects frames
    /// that do not match its configured resolution.
    #[must_use]
    pub fn new(data: Vec<u8>, dims: FrameDims, sequence: u64, timestamp_ms: u64) -> Self {
        Self {
            data,
            dims,
            sequence,
            timestamp_ms,
        }
    }

    /// A frame filled with one gray level.
    #[must_use]
    pub fn uniform(dims: FrameDims, level: u8, sequence: u64, timestamp_ms: u64) -> Self {
        Self::new(vec![level; dims.raster_len()], dims, sequence, timestamp_ms)
    }

    /// Raw BGR bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw BGR bytes, used by scene generators.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Resolution.
    #[must_use]
    pub const fn dims(&self) -> FrameDims {
        self.dims
    }

    /// Sequence number.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Capture timestamp in milliseconds.
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Paint an axis-aligned rectangle of one gray level, clipped to the frame.
    pub fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, level: u8) {
        let width = usize::from(self.dims.width);
        let x_end = usize::from(x.saturating_add(w)).min(width);
        let y_end = usize::from(y.saturating_add(h)).min(usize::from(self.dims.height));

        for row in usize::from(y)..y_end {
            let start = (row * width + usize::from(x)) * CHANNELS;
            let end = (row * width + x_end) * CHANNELS;
            if start < end {
                self.data[start..end].fill(level);
            }
        }
    }
}

/// Convert interleaved BGR to single-channel luminance.
///
/// Integer weights keep the result identical on every platform.
/// `out` must hold one byte per pixel; extra input or output is ignored.
pub fn bgr_to_luma(bgr: &[u8], out: &mut [u8]) {
    for (px, y) in bgr.chunks_exact(CHANNELS).zip(out.iter_mut()) {
        let b = u32::from(px[0]);
        let g = u32::from(px[1]);
        let r = u32::from(px[2]);
        let luma = (LUMA_WEIGHT_R * r + LUMA_WEIGHT_G * g + LUMA_WEIGHT_B * b) >> 8;
        // Weights sum to 256, so the shifted value always fits.
        *y = u8::try_from(luma).unwrap_or(u8::MAX);
    }
}
