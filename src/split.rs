//! Randomized weak learners comparing pixel values at small offsets.

use crate::image::Image;
use crate::rng::TrainingRng;

/// 2D offset parameterising one probe of a split function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitOffset {
    pub x: i32,
    pub y: i32,
}

/// A binary predicate over a pixel's neighborhood.
///
/// Carries one or two offsets drawn uniformly from `[-R, R]^2`:
/// with one offset the predicate is `pixel(p + d) < pixel(p)`, with two
/// it is `pixel(p + d0) < pixel(p + d1)`. Probes are folded back into
/// the image by reflection before sampling, so evaluation never reads
/// outside the grid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitFunction {
    offsets: Vec<SplitOffset>,
}

impl SplitFunction {
    /// Draws a fresh candidate: offset count uniform in {1, 2}, each
    /// offset uniform in `[-radius, radius]^2`.
    pub fn random(max_search_radius: i32, rng: &mut TrainingRng) -> Self {
        let count = rng.integer_range(1, 2);
        let offsets = (0..count)
            .map(|_| SplitOffset {
                x: rng.integer_range(-max_search_radius, max_search_radius),
                y: rng.integer_range(-max_search_radius, max_search_radius),
            })
            .collect();
        SplitFunction { offsets }
    }

    pub(crate) fn from_offsets(offsets: Vec<SplitOffset>) -> Self {
        SplitFunction { offsets }
    }

    pub(crate) fn offsets(&self) -> &[SplitOffset] {
        &self.offsets
    }

    /// Sorts the pixel at `(x, y)` of `image`: true sends the sample to
    /// the right branch. A function without offsets (possible only via
    /// deserialization) is constantly false.
    pub fn evaluate(&self, image: &Image, x: usize, y: usize) -> bool {
        match self.offsets.as_slice() {
            [probe] => {
                let (px, py) = project(image, x, y, *probe);
                // Compare as i32: u8 operands cannot wrap.
                i32::from(image.get(px, py)) < i32::from(image.get(x, y))
            }
            [first, second] => {
                let (px0, py0) = project(image, x, y, *first);
                let (px1, py1) = project(image, x, y, *second);
                i32::from(image.get(px0, py0)) < i32::from(image.get(px1, py1))
            }
            _ => false,
        }
    }
}

/// Applies `offset` to `(x, y)` and reflects the result back inside the
/// image. Offsets are clamped to half the image dimension first, which
/// guarantees a single reflection suffices on each axis.
fn project(image: &Image, x: usize, y: usize, offset: SplitOffset) -> (usize, usize) {
    let half_width = (image.width() as i32) >> 1;
    let half_height = (image.height() as i32) >> 1;

    let offset_x = offset.x.clamp(-half_width, half_width);
    let offset_y = offset.y.clamp(-half_height, half_height);

    let mut rx = x as i32 + offset_x;
    let mut ry = y as i32 + offset_y;

    if rx < 0 {
        rx = -rx;
    }
    if ry < 0 {
        ry = -ry;
    }

    let max_x = image.width() as i32 - 1;
    let max_y = image.height() as i32 - 1;
    if rx > max_x {
        rx = 2 * max_x - rx;
    }
    if ry > max_y {
        ry = 2 * max_y - ry;
    }

    (rx as usize, ry as usize)
}
