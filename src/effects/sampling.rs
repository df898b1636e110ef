//! Source-coordinate sampling for displacement effects
//!
//! Displacement effects compute, for every destination pixel, a fractional
//! source coordinate. Sampling clamps that coordinate into the frame, then
//! interpolates bilinearly; the `+1` neighbour is edge-reflected so the last
//! row/column never reads out of bounds.

use image::Rgb;

use crate::frame::Frame;

/// Reflect an index into `0..len` (`fedcba|abcdef|fedcba`)
pub fn reflect_index(index: i64, len: i64) -> i64 {
    if len <= 1 {
        return 0;
    }
    let mut i = index;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= len {
            i = 2 * len - i - 1;
        } else {
            return i;
        }
    }
}

/// Clamp a coordinate into `[0, len - 1]`; non-finite values map to 0
#[inline]
pub fn clamp_coord(value: f32, len: u32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, len.saturating_sub(1) as f32)
}

/// Bilinearly sample `src` at a fractional coordinate
pub fn sample_bilinear(src: &Frame, x: f32, y: f32) -> [u8; 3] {
    let (width, height) = src.dimensions();
    let x = clamp_coord(x, width);
    let y = clamp_coord(y, height);

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let x0 = x0 as i64;
    let y0 = y0 as i64;
    let x1 = reflect_index(x0 + 1, width as i64) as u32;
    let y1 = reflect_index(y0 + 1, height as i64) as u32;
    let x0 = x0 as u32;
    let y0 = y0 as u32;

    let p00 = src.get_pixel(x0, y0).0;
    let p10 = src.get_pixel(x1, y0).0;
    let p01 = src.get_pixel(x0, y1).0;
    let p11 = src.get_pixel(x1, y1).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Build a new frame by sampling `src` at `map(x, y)` for each destination pixel
pub fn remap<F>(src: &Frame, map: F) -> Frame
where
    F: Fn(u32, u32) -> (f32, f32),
{
    let (width, height) = src.dimensions();
    Frame::from_fn(width, height, |x, y| {
        let (sx, sy) = map(x, y);
        Rgb(sample_bilinear(src, sx, sy))
    })
}
