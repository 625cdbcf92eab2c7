//! 4-connected component labeling.
//!
//! Iterative flood fill over an explicit, fixed-capacity worklist. Pixels
//! are marked before they are pushed, so nothing is queued twice. When the
//! worklist is full, neighbours are marked deferred instead and picked up
//! by a rescan, so a component is always labeled whole.

use super::morphology::BACKGROUND;

const UNSEEN: u8 = 0;
const QUEUED: u8 = 1;
const DEFERRED: u8 = 2;

/// Bounding box and moments of one connected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Leftmost column.
    pub min_x: u16,
    /// Topmost row.
    pub min_y: u16,
    /// Rightmost column.
    pub max_x: u16,
    /// Bottom row.
    pub max_y: u16,
    /// Member pixel count.
    pub area: u32,
    /// Sum of member x coordinates.
    pub sum_x: u64,
    /// Sum of member y coordinates.
    pub sum_y: u64,
}

impl Component {
    fn seed(x: u16, y: u16) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 0,
            sum_x: 0,
            sum_y: 0,
        }
    }

    fn add(&mut self, x: u16, y: u16) {
        self.area += 1;
        self.sum_x += u64::from(x);
        self.sum_y += u64::from(y);
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    /// Bounding box width.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.max_x - self.min_x + 1
    }

    /// Bounding box height.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.max_y - self.min_y + 1
    }

    /// Integer mean of member coordinates.
    #[must_use]
    pub fn centroid(&self) -> (u16, u16) {
        let area = u64::from(self.area.max(1));
        let cx = u16::try_from(self.sum_x / area).unwrap_or(self.max_x);
        let cy = u16::try_from(self.sum_y / area).unwrap_or(self.max_y);
        (cx, cy)
    }
}

/// Label every foreground component of `mask` in raster order.
///
/// `visited` must hold one byte per pixel and is overwritten. `worklist`
/// is cleared and never grows past `capacity`. A component that does not
/// fit in the worklist is finished by rescanning for deferred pixels, which
/// is slower but still reports it once and complete. Returns the number of
/// components that needed a rescan.
pub fn label_components(
    mask: &[u8],
    width: u16,
    height: u16,
    visited: &mut [u8],
    worklist: &mut Vec<u32>,
    capacity: usize,
    mut emit: impl FnMut(Component),
) -> usize {
    let w = usize::from(width);
    let h = usize::from(height);
    let pixels = w * h;
    if mask.len() < pixels || visited.len() < pixels || capacity == 0 {
        return 0;
    }

    visited[..pixels].fill(UNSEEN);
    let mut fill = Fill {
        mask: &mask[..pixels],
        visited: &mut visited[..pixels],
        worklist,
        capacity,
        width: w,
        height: h,
    };
    let mut rescanned = 0;

    for start in 0..pixels {
        if fill.mask[start] == BACKGROUND || fill.visited[start] != UNSEEN {
            continue;
        }

        let (sx, sy) = coords(start, w);
        let mut component = Component::seed(sx, sy);
        let mut spilled = fill.flood(start, &mut component);
        if spilled {
            rescanned += 1;
        }

        // Pixels earlier in raster order belong to finished components, so
        // deferred ones can only sit at or after `start`.
        while spilled {
            spilled = false;
            for idx in start..pixels {
                if fill.visited[idx] == DEFERRED {
                    spilled |= fill.flood(idx, &mut component);
                }
            }
        }

        emit(component);
    }

    rescanned
}

struct Fill<'a> {
    mask: &'a [u8],
    visited: &'a mut [u8],
    worklist: &'a mut Vec<u32>,
    capacity: usize,
    width: usize,
    height: usize,
}

impl Fill<'_> {
    /// Flood from `seed` into `component`. Returns true if any neighbour had
    /// to be deferred for lack of worklist space.
    fn flood(&mut self, seed: usize, component: &mut Component) -> bool {
        let (w, h) = (self.width, self.height);
        let mut spilled = false;

        self.worklist.clear();
        self.visited[seed] = QUEUED;
        self.worklist.push(seed as u32);

        while let Some(idx) = self.worklist.pop() {
            let idx = idx as usize;
            let (x, y) = coords(idx, w);
            component.add(x, y);

            let (xu, yu) = (usize::from(x), usize::from(y));
            let neighbours = [
                (xu + 1 < w).then(|| idx + 1),
                (xu > 0).then(|| idx - 1),
                (yu + 1 < h).then(|| idx + w),
                (yu > 0).then(|| idx - w),
            ];

            for next in neighbours.into_iter().flatten() {
                if self.mask[next] == BACKGROUND || self.visited[next] == QUEUED {
                    continue;
                }
                if self.worklist.len() >= self.capacity {
                    self.visited[next] = DEFERRED;
                    spilled = true;
                    continue;
                }
                self.visited[next] = QUEUED;
                self.worklist.push(next as u32);
            }
        }

        spilled
    }
}

fn coords(idx: usize, width: usize) -> (u16, u16) {
    // Frame dimensions are u16, so both coordinates fit.
    let x = u16::try_from(idx % width).unwrap_or(u16::MAX);
    let y = u16::try_from(idx / width).unwrap_or(u16::MAX);
    (x, y)
}
