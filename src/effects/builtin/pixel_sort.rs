//! Pixel Sort Effect
//!
//! Within each row (or column), pixels brighter than a threshold are
//! reordered by ascending brightness. Only the masked positions are
//! rewritten; everything else is copied through.

use serde::{Deserialize, Serialize};

use crate::effects::traits::{Effect, EffectError, EffectInput};
use crate::frame::{luma, Frame};

/// Threshold at intensity 0.0; intensity 1.0 masks every non-black pixel
const MAX_THRESHOLD: f32 = 200.0;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrientation {
    /// Sort within each row
    #[default]
    Horizontal,
    /// Sort within each column
    Vertical,
}

/// Pixel sort runtime
pub struct PixelSortEffect {
    threshold: u8,
    orientation: SortOrientation,
}

impl PixelSortEffect {
    pub fn new(intensity: f32, orientation: SortOrientation) -> Self {
        let threshold = (MAX_THRESHOLD * (1.0 - intensity.clamp(0.0, 1.0))) as u8;
        Self::with_threshold(threshold, orientation)
    }

    pub fn with_threshold(threshold: u8, orientation: SortOrientation) -> Self {
        Self {
            threshold,
            orientation,
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }
}

/// Sort the masked positions of one line by brightness
///
/// The sort is stable, so equal-brightness pixels keep their order.
fn sort_line(src: &Frame, dst: &mut Frame, brightness: &[u8], line: &[(u32, u32)], threshold: u8) {
    let width = src.width() as usize;
    let level = |(x, y): (u32, u32)| brightness[y as usize * width + x as usize];

    let masked: Vec<(u32, u32)> = line.iter().copied().filter(|&p| level(p) > threshold).collect();
    if masked.len() < 2 {
        return;
    }

    let mut order: Vec<(u32, u32)> = masked.clone();
    order.sort_by_key(|&p| level(p));

    for (&(dx, dy), &(sx, sy)) in masked.iter().zip(order.iter()) {
        dst.put_pixel(dx, dy, *src.get_pixel(sx, sy));
    }
}

impl Effect for PixelSortEffect {
    fn effect_type(&self) -> &'static str {
        "pixel_sort"
    }

    fn apply(&mut self, frame: &Frame, _input: &EffectInput<'_>) -> Result<Frame, EffectError> {
        let (width, height) = frame.dimensions();
        let brightness = luma(frame);
        let mut result = frame.clone();

        match self.orientation {
            SortOrientation::Horizontal => {
                for y in 0..height {
                    let line: Vec<(u32, u32)> = (0..width).map(|x| (x, y)).collect();
                    sort_line(frame, &mut result, &brightness, &line, self.threshold);
                }
            }
            SortOrientation::Vertical => {
                for x in 0..width {
                    let line: Vec<(u32, u32)> = (0..height).map(|y| (x, y)).collect();
                    sort_line(frame, &mut result, &brightness, &line, self.threshold);
                }
            }
        }

        Ok(result)
    }
}
