//! Background-subtraction motion detector.

use super::components::label_components;
use super::morphology::{BACKGROUND, FOREGROUND, open_cross};
use crate::config::{MotionConfig, validate_motion};
use crate::constants::motion::MOTION_PIXEL_FLOOR;
use crate::error::{Error, Result};
use crate::frame::{BufferProvider, Frame, FrameDims, bgr_to_luma, provision};
use tracing::{debug, info, warn};

/// A connected region of motion in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionRegion {
    /// Bounding box left edge.
    pub x: u16,
    /// Bounding box top edge.
    pub y: u16,
    /// Bounding box width.
    pub w: u16,
    /// Bounding box height.
    pub h: u16,
    /// Foreground pixel count.
    pub area: u32,
    /// Centroid column.
    pub centroid_x: u16,
    /// Centroid row.
    pub centroid_y: u16,
}

impl MotionRegion {
    /// Larger of width and height.
    #[must_use]
    pub fn size(&self) -> u16 {
        self.w.max(self.h)
    }

    /// Width over height.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        f32::from(self.w) / f32::from(self.h.max(1))
    }
}

/// Output of one detector cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionResult {
    /// Regions that passed the area and aspect filters.
    pub regions: Vec<MotionRegion>,
    /// More than a handful of raw foreground pixels changed.
    pub has_motion: bool,
    /// Raw foreground pixels before morphology.
    pub motion_pixels: usize,
    /// Regions beyond the per-frame cap that were dropped.
    pub dropped: usize,
}

#[derive(Debug)]
struct DetectorState {
    config: MotionConfig,
    dims: FrameDims,
    background: Vec<f32>,
    background_level: Vec<u8>,
    luma: Vec<u8>,
    mask: Vec<u8>,
    scratch: Vec<u8>,
    worklist: Vec<u32>,
    fill_capacity: usize,
    seeded: bool,
    updates_since_seed: u32,
    spill_warned: bool,
}

/// Adaptive background model plus region extraction.
///
/// Created uninitialised; call [`MotionDetector::init`] before processing.
#[derive(Debug, Default)]
pub struct MotionDetector {
    state: Option<DetectorState>,
}

impl MotionDetector {
    /// Create an uninitialised detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate working buffers for `dims` and apply `config`.
    ///
    /// Re-initialising replaces the previous buffers and starts a fresh
    /// background model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] for frames under 3x3 or invalid
    /// settings, and [`Error::BufferAllocation`] if the provider refuses a
    /// buffer.
    pub fn init(
        &mut self,
        config: &MotionConfig,
        dims: FrameDims,
        provider: &mut dyn BufferProvider,
    ) -> Result<()> {
        self.state = None;

        if dims.width < 3 || dims.height < 3 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "frame must be at least 3x3 pixels, got {}x{}",
                    dims.width, dims.height
                ),
            });
        }
        validate_motion(config)?;

        let pixels = dims.pixels();
        // A fill never holds more pixels than the frame has.
        let fill_capacity = config.fill_capacity.min(pixels);
        let background = provision::<f32>(provider, "background model", pixels)?;
        let background_level = provision::<u8>(provider, "background levels", pixels)?;
        let luma = provision::<u8>(provider, "luminance", pixels)?;
        let mask = provision::<u8>(provider, "foreground mask", pixels)?;
        let scratch = provision::<u8>(provider, "morphology scratch", pixels)?;
        let mut worklist = provision::<u32>(provider, "flood-fill worklist", fill_capacity)?;
        worklist.clear();

        info!(
            "Motion detector initialized ({}x{}, threshold={}, area={}..{})",
            dims.width, dims.height, config.threshold, config.min_area, config.max_area
        );

        self.state = Some(DetectorState {
            config: *config,
            dims,
            background,
            background_level,
            luma,
            mask,
            scratch,
            worklist,
            fill_capacity,
            seeded: false,
            updates_since_seed: 0,
            spill_warned: false,
        });
        Ok(())
    }

    /// Whether [`MotionDetector::init`] has succeeded.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Whether the background has been seeded from a frame.
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.seeded)
    }

    /// Drop all buffers. Later calls to `process` fail until re-init.
    pub fn release(&mut self) {
        if self.state.take().is_some() {
            info!("Motion detector released");
        }
    }

    /// Forget the background; the next frame reseeds it.
    pub fn reset_background(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.seeded = false;
            state.updates_since_seed = 0;
            state.background.fill(0.0);
            state.background_level.fill(0);
            info!("Background model reset");
        }
    }

    /// Run one detection cycle.
    ///
    /// The very first frame after init or reset only seeds the background
    /// and yields no regions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `init` and
    /// [`Error::FrameSizeMismatch`] if the raster has the wrong length.
    pub fn process(&mut self, frame: &Frame) -> Result<MotionResult> {
        let state = self.state.as_mut().ok_or(Error::NotInitialized {
            component: "motion detector",
        })?;

        let expected = state.dims.raster_len();
        if frame.data().len() != expected {
            return Err(Error::FrameSizeMismatch {
                expected,
                actual: frame.data().len(),
            });
        }

        bgr_to_luma(frame.data(), &mut state.luma);

        if !state.seeded {
            state.seed();
            debug!("Background seeded from frame {}", frame.sequence());
            return Ok(MotionResult::default());
        }

        state.update_background();
        let motion_pixels = state.threshold_mask();

        let width = usize::from(state.dims.width);
        let height = usize::from(state.dims.height);
        open_cross(&mut state.mask, &mut state.scratch, width, height);

        let mut result = MotionResult {
            regions: Vec::with_capacity(state.config.max_regions),
            has_motion: motion_pixels > MOTION_PIXEL_FLOOR,
            motion_pixels,
            dropped: 0,
        };

        let config = state.config;
        let rescanned = label_components(
            &state.mask,
            state.dims.width,
            state.dims.height,
            &mut state.scratch,
            &mut state.worklist,
            state.fill_capacity,
            |component| {
                if component.area < config.min_area || component.area > config.max_area {
                    return;
                }
                let (w, h) = (component.width(), component.height());
                let aspect = f32::from(w) / f32::from(h.max(1));
                if aspect < config.min_aspect || aspect > config.max_aspect {
                    return;
                }
                if result.regions.len() >= config.max_regions {
                    result.dropped += 1;
                    return;
                }
                let (centroid_x, centroid_y) = component.centroid();
                result.regions.push(MotionRegion {
                    x: component.min_x,
                    y: component.min_y,
                    w,
                    h,
                    area: component.area,
                    centroid_x,
                    centroid_y,
                });
            },
        );

        if rescanned > 0 {
            if state.spill_warned {
                debug!("Rescanned {rescanned} component(s) larger than the fill worklist");
            } else {
                warn!(
                    "Flood fill worklist of {} pixels overflowed; {rescanned} component(s) finished by rescan",
                    state.fill_capacity
                );
                state.spill_warned = true;
            }
        }

        if result.dropped > 0 {
            warn!(
                "Frame {}: {} region(s) over the cap of {} dropped",
                frame.sequence(),
                result.dropped,
                config.max_regions
            );
        }

        Ok(result)
    }
}

impl DetectorState {
    fn seed(&mut self) {
        for ((bg, level), &y) in self
            .background
            .iter_mut()
            .zip(self.background_level.iter_mut())
            .zip(&self.luma)
        {
            *bg = f32::from(y);
            *level = y;
        }
        self.seeded = true;
        self.updates_since_seed = 0;
    }

    fn update_background(&mut self) {
        let alpha = if self.updates_since_seed < self.config.warmup_frames {
            self.config.warmup_learning_rate
        } else {
            self.config.learning_rate
        };
        let keep = 1.0 - alpha;

        for ((bg, level), &y) in self
            .background
            .iter_mut()
            .zip(self.background_level.iter_mut())
            .zip(&self.luma)
        {
            *bg = alpha * f32::from(y) + keep * *bg;
            // Rounded and clamped; the model never leaves 0..=255.
            *level = bg.round().clamp(0.0, 255.0) as u8;
        }
        self.updates_since_seed = self.updates_since_seed.saturating_add(1);
    }

    /// Build the foreground mask and return the raw foreground count.
    fn threshold_mask(&mut self) -> usize {
        let threshold = self.config.threshold;
        let mut count = 0;

        for ((m, &y), &bg) in self
            .mask
            .iter_mut()
            .zip(&self.luma)
            .zip(&self.background_level)
        {
            if y.abs_diff(bg) > threshold {
                *m = FOREGROUND;
                count += 1;
            } else {
                *m = BACKGROUND;
            }
        }

        // Morphology skips the border, so clear it here.
        let width = usize::from(self.dims.width);
        let height = usize::from(self.dims.height);
        for x in 0..width {
            self.mask[x] = BACKGROUND;
            self.mask[(height - 1) * width + x] = BACKGROUND;
        }
        for y in 1..height - 1 {
            self.mask[y * width] = BACKGROUND;
            self.mask[y * width + width - 1] = BACKGROUND;
        }

        count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::frame::{BudgetedBuffers, HeapBuffers};

    const DIMS: FrameDims = FrameDims::new(80, 60);

    fn detector() -> MotionDetector {
        let mut detector = MotionDetector::new();
        detector
            .init(&MotionConfig::default(), DIMS, &mut HeapBuffers)
            .unwrap();
        detector
    }

    fn frame_with_object(seq: u64, x: u16, y: u16, w: u16, h: u16) -> Frame {
        let mut frame = Frame::uniform(DIMS, 50, seq, seq * 100);
        frame.fill_rect(x, y, w, h, 200);
        frame
    }

    #[test]
    fn test_process_before_init_is_reported() {
        let mut detector = MotionDetector::new();
        let result = detector.process(&Frame::uniform(DIMS, 0, 0, 0));
        assert!(matches!(result, Err(Error::NotInitialized { .. })));
    }

    #[test]
    fn test_wrong_frame_size_is_rejected() {
        let mut detector = detector();
        let frame = Frame::uniform(FrameDims::new(10, 10), 0, 0, 0);
        assert!(matches!(
            detector.process(&frame),
            Err(Error::FrameSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_first_frame_seeds_without_regions() {
        let mut detector = detector();
        let result = detector.process(&frame_with_object(0, 10, 10, 20, 20)).unwrap();
        assert!(result.regions.is_empty());
        assert!(detector.is_seeded());
    }

    #[test]
    fn test_static_scene_yields_nothing() {
        let mut detector = detector();
        for seq in 0..10 {
            let result = detector.process(&Frame::uniform(DIMS, 90, seq, seq * 100)).unwrap();
            assert!(result.regions.is_empty());
            assert!(!result.has_motion);
        }
    }

    #[test]
    fn test_object_region_matches_geometry() {
        let mut detector = detector();
        detector.process(&Frame::uniform(DIMS, 50, 0, 0)).unwrap();

        let result = detector.process(&frame_with_object(1, 20, 15, 20, 16)).unwrap();
        assert!(result.has_motion);
        assert_eq!(result.regions.len(), 1);

        let region = result.regions[0];
        assert_eq!((region.x, region.y, region.w, region.h), (20, 15, 20, 16));
        // Opening trims the four corners.
        assert_eq!(region.area, 20 * 16 - 4);
        assert!(region.centroid_x.abs_diff(29) <= 1);
        assert!(region.centroid_y.abs_diff(22) <= 1);
    }

    #[test]
    fn test_small_blob_filtered_by_area() {
        let mut detector = detector();
        detector.process(&Frame::uniform(DIMS, 50, 0, 0)).unwrap();
        let result = detector.process(&frame_with_object(1, 30, 30, 6, 6)).unwrap();
        assert!(result.regions.is_empty());
    }

    #[test]
    fn test_thin_blob_filtered_by_aspect() {
        let mut detector = detector();
        detector.process(&Frame::uniform(DIMS, 50, 0, 0)).unwrap();
        let result = detector.process(&frame_with_object(1, 5, 20, 60, 5)).unwrap();
        assert!(result.regions.is_empty());
    }

    #[test]
    fn test_reset_background_reseeds() {
        let mut detector = detector();
        detector.process(&Frame::uniform(DIMS, 50, 0, 0)).unwrap();
        detector.reset_background();
        assert!(!detector.is_seeded());

        let result = detector.process(&frame_with_object(1, 20, 15, 20, 16)).unwrap();
        assert!(result.regions.is_empty());
    }

    #[test]
    fn test_release_makes_process_fail() {
        let mut detector = detector();
        detector.release();
        assert!(!detector.is_initialized());
        assert!(detector.process(&Frame::uniform(DIMS, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_init_fails_on_small_budget() {
        let mut detector = MotionDetector::new();
        let result = detector.init(
            &MotionConfig::default(),
            DIMS,
            &mut BudgetedBuffers::new(1024),
        );
        assert!(matches!(result, Err(Error::BufferAllocation { .. })));
        assert!(!detector.is_initialized());
    }

    #[test]
    fn test_init_rejects_degenerate_frame() {
        let mut detector = MotionDetector::new();
        for dims in [FrameDims::new(80, 0), FrameDims::new(2, 60), FrameDims::new(0, 0)] {
            let result = detector.init(&MotionConfig::default(), dims, &mut HeapBuffers);
            assert!(matches!(result, Err(Error::ConfigValidation { .. })));
            assert!(!detector.is_initialized());
        }
    }

    #[test]
    fn test_large_object_within_max_area_is_reported() {
        let dims = FrameDims::new(640, 480);
        let mut detector = MotionDetector::new();
        detector
            .init(&MotionConfig::default(), dims, &mut HeapBuffers)
            .unwrap();
        detector.process(&Frame::uniform(dims, 50, 0, 0)).unwrap();

        let mut frame = Frame::uniform(dims, 50, 1, 100);
        frame.fill_rect(200, 100, 220, 220, 200);
        let result = detector.process(&frame).unwrap();

        assert_eq!(result.regions.len(), 1);
        let region = result.regions[0];
        assert_eq!((region.w, region.h), (220, 220));
        assert_eq!(region.area, 220 * 220 - 4);
        assert!(region.area <= MotionConfig::default().max_area);
    }

    #[test]
    fn test_small_worklist_emits_no_fragments() {
        let config = MotionConfig {
            fill_capacity: 64,
            min_area: 20,
            max_area: 64,
            ..MotionConfig::default()
        };
        let mut detector = MotionDetector::new();
        detector.init(&config, DIMS, &mut HeapBuffers).unwrap();
        detector.process(&Frame::uniform(DIMS, 50, 0, 0)).unwrap();

        let result = detector.process(&frame_with_object(1, 10, 10, 30, 30)).unwrap();
        // Too large for max_area, and never reported as fragments either.
        assert!(result.regions.is_empty());
    }

    #[test]
    fn test_region_cap_drops_excess() {
        let config = MotionConfig {
            max_regions: 1,
            min_area: 20,
            ..MotionConfig::default()
        };
        let mut detector = MotionDetector::new();
        detector.init(&config, DIMS, &mut HeapBuffers).unwrap();
        detector.process(&Frame::uniform(DIMS, 50, 0, 0)).unwrap();

        let mut frame = Frame::uniform(DIMS, 50, 1, 100);
        frame.fill_rect(5, 5, 10, 10, 200);
        frame.fill_rect(40, 30, 10, 10, 200);
        let result = detector.process(&frame).unwrap();
        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.dropped, 1);
    }
}
