//! Depth gradient stencils used for edge detection.
//!
//! imageproc's gradient operators are defined over 8-bit images, so the 3x3
//! Sobel pair is written out here directly over f32 depth samples, with
//! replicate borders.

use image::Luma;

use crate::{DepthMap, MASK_SET, Mask, blank_mask};

/// Flags pixels where the summed absolute Sobel responses exceed `threshold`.
pub fn depth_edge_mask(dpt: &DepthMap, threshold: f32) -> Mask {
    let (width, height) = dpt.dimensions();
    let mut edges = blank_mask(width, height);
    for y in 0..height {
        for x in 0..width {
            let (gx, gy) = sobel_pair(dpt, x as i64, y as i64);
            if gx.abs() + gy.abs() > threshold {
                edges.put_pixel(x, y, Luma([MASK_SET]));
            }
        }
    }
    edges
}

/// Horizontal and vertical Sobel responses at one pixel.
fn sobel_pair(dpt: &DepthMap, x: i64, y: i64) -> (f32, f32) {
    let tl = sample(dpt, x - 1, y - 1);
    let tm = sample(dpt, x, y - 1);
    let tr = sample(dpt, x + 1, y - 1);
    let ml = sample(dpt, x - 1, y);
    let mr = sample(dpt, x + 1, y);
    let bl = sample(dpt, x - 1, y + 1);
    let bm = sample(dpt, x, y + 1);
    let br = sample(dpt, x + 1, y + 1);

    let gx = (tr + 2.0 * mr + br) - (tl + 2.0 * ml + bl);
    let gy = (bl + 2.0 * bm + br) - (tl + 2.0 * tm + tr);
    (gx, gy)
}

/// Reads a depth sample with coordinates clamped to the image bounds.
fn sample(dpt: &DepthMap, x: i64, y: i64) -> f32 {
    let x = x.clamp(0, dpt.width() as i64 - 1) as u32;
    let y = y.clamp(0, dpt.height() as i64 - 1) as u32;
    dpt.get_pixel(x, y)[0]
}
