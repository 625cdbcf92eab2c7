//! Pixel to pan/tilt mapping.
//!
//! Pixels are normalised to -0.5..0.5 around the frame centre and scaled by
//! the field of view. Image rows grow downward, so the top half of the frame
//! maps to positive (upward) tilt. Calibration then applies
//! `angle * scale + offset`.

use crate::config::TargetingConfig;
use crate::frame::FrameDims;

/// Pan and tilt in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetAngles {
    /// Horizontal angle, positive to the right.
    pub pan_deg: f32,
    /// Vertical angle, positive upward.
    pub tilt_deg: f32,
}

/// Calibrated camera-to-actuator mapping.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    dims: FrameDims,
    config: TargetingConfig,
}

impl CoordinateMapper {
    /// Create a mapper for frames of `dims`.
    #[must_use]
    pub const fn new(dims: FrameDims, config: &TargetingConfig) -> Self {
        Self {
            dims,
            config: *config,
        }
    }

    /// Angles for a pixel position.
    #[must_use]
    pub fn pixel_to_angles(&self, x: u16, y: u16) -> TargetAngles {
        let norm_x = f32::from(x) / f32::from(self.dims.width.max(1)) - 0.5;
        let norm_y = f32::from(y) / f32::from(self.dims.height.max(1)) - 0.5;

        let pan = norm_x * self.config.fov_h_deg;
        let tilt = -norm_y * self.config.fov_v_deg;

        TargetAngles {
            pan_deg: pan * self.config.scale_pan + self.config.offset_pan_deg,
            tilt_deg: tilt * self.config.scale_tilt + self.config.offset_tilt_deg,
        }
    }

    /// Pixel position for a pair of angles; the inverse of
    /// [`CoordinateMapper::pixel_to_angles`], clamped to the frame.
    #[must_use]
    pub fn angles_to_pixel(&self, angles: TargetAngles) -> (u16, u16) {
        let pan = (angles.pan_deg - self.config.offset_pan_deg) / self.config.scale_pan;
        let tilt = (angles.tilt_deg - self.config.offset_tilt_deg) / self.config.scale_tilt;

        let norm_x = pan / self.config.fov_h_deg;
        let norm_y = -tilt / self.config.fov_v_deg;

        let to_pixel = |norm: f32, extent: u16| -> u16 {
            let px = ((norm + 0.5) * f32::from(extent)).round();
            // Clamped into 0..extent, so the cast cannot truncate.
            px.clamp(0.0, f32::from(extent.saturating_sub(1))) as u16
        };

        (
            to_pixel(norm_x, self.dims.width),
            to_pixel(norm_y, self.dims.height),
        )
    }
}
