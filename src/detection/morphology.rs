//! Binary morphology with a 3x3 cross structuring element.
//!
//! Only interior pixels are rewritten. Border rows and columns are left
//! untouched rather than wrapped or clamped.

/// Mask value for a foreground pixel.
pub const FOREGROUND: u8 = 255;
/// Mask value for a background pixel.
pub const BACKGROUND: u8 = 0;

/// Erode `mask` in place: an interior pixel survives only if it and its
/// four neighbours are all foreground.
///
/// `scratch` must be at least as long as `mask`.
pub fn erode_cross(mask: &mut [u8], scratch: &mut [u8], width: usize, height: usize) {
    apply_cross(mask, scratch, width, height, |cross| {
        cross.iter().all(|&v| v != BACKGROUND)
    });
}

/// Dilate `mask` in place: an interior pixel is set if it or any of its
/// four neighbours is foreground.
///
/// `scratch` must be at least as long as `mask`.
pub fn dilate_cross(mask: &mut [u8], scratch: &mut [u8], width: usize, height: usize) {
    apply_cross(mask, scratch, width, height, |cross| {
        cross.iter().any(|&v| v == FOREGROUND)
    });
}

/// One opening pass: erosion followed by dilation.
pub fn open_cross(mask: &mut [u8], scratch: &mut [u8], width: usize, height: usize) {
    erode_cross(mask, scratch, width, height);
    dilate_cross(mask, scratch, width, height);
}

fn apply_cross(
    mask: &mut [u8],
    scratch: &mut [u8],
    width: usize,
    height: usize,
    keep: impl Fn(&[u8; 5]) -> bool,
) {
    let pixels = width * height;
    if width < 3 || height < 3 || mask.len() < pixels || scratch.len() < pixels {
        return;
    }

    let source = &mut scratch[..pixels];
    source.copy_from_slice(&mask[..pixels]);

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = y * width + x;
            let cross = [
                source[idx - width],
                source[idx - 1],
                source[idx],
                source[idx + 1],
                source[idx + width],
            ];
            mask[idx] = if keep(&cross) { FOREGROUND } else { BACKGROUND };
        }
    }
}
