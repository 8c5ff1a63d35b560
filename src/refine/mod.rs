//! Hole-mask refinement for inpainting.
//!
//! Expands the inpaint masks of a [`Frame`] around large invalid-depth
//! regions and along depth discontinuities, while keeping sky pixels out of
//! the synthesized set.

pub mod gradient;

use image::Luma;
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use imageproc::region_labelling::{Connectivity, connected_components};
use tracing::debug;

use crate::{DepthMap, Frame, MASK_CLEAR, MASK_SET, Mask, blank_mask, config::RefinerConfig};

/// Configuration-driven mask refiner.
///
/// Both passes mutate the frame's `inpaint` and `inpaint_wo_edge` fields in
/// place; neither raises errors. Shape agreement between depth and masks is
/// guaranteed by [`Frame`] construction.
#[derive(Debug, Clone)]
pub struct HoleMaskRefiner {
    config: RefinerConfig,
    sky_depth: f32,
}

impl HoleMaskRefiner {
    pub fn new(config: RefinerConfig, sky_depth: f32) -> Self {
        Self { config, sky_depth }
    }

    /// Runs the hole expansion pass followed by the aggressive pass.
    pub fn refine(&self, frame: &mut Frame) {
        self.find_and_expand_holes(frame);
        self.process_frame_aggressive(frame);
    }

    /// Expands the inpaint masks around large depth holes.
    ///
    /// A depth hole is an 8-connected region where depth is zero or at/above
    /// the sky threshold. Components at or below `hole_min_size` pixels are
    /// ignored; the rest are dilated by the expansion element and unioned
    /// into both inpaint masks.
    pub fn find_and_expand_holes(&self, frame: &mut Frame) {
        let invalid = self.invalid_depth_mask(&frame.dpt);
        if !any_set(&invalid) {
            return;
        }

        let labels = connected_components(&invalid, Connectivity::Eight, Luma([MASK_CLEAR]));

        let mut max_label = 0u32;
        for Luma([label]) in labels.pixels() {
            max_label = max_label.max(*label);
        }
        let mut areas = vec![0u32; max_label as usize + 1];
        for Luma([label]) in labels.pixels() {
            areas[*label as usize] += 1;
        }

        let (width, height) = frame.dpt.dimensions();
        let mut large = blank_mask(width, height);
        let mut kept = 0usize;
        for (x, y, Luma([label])) in labels.enumerate_pixels() {
            if *label != 0 && areas[*label as usize] > self.config.hole_min_size {
                large.put_pixel(x, y, Luma([MASK_SET]));
                kept += 1;
            }
        }
        debug!(
            components = max_label,
            kept_pixels = kept,
            "labeled depth holes"
        );
        if kept == 0 {
            return;
        }

        // Dilation distributes over union, so the kept components are
        // expanded in one pass instead of per component.
        let expanded = morphology::dilate(&large, Norm::LInf, self.config.expansion_radius);
        union_into(&mut frame.inpaint, &expanded);
        union_into(&mut frame.inpaint_wo_edge, &expanded);
    }

    /// Aggressively grows the inpaint mask and force-includes depth edges.
    ///
    /// The rebuilt mask is the dilated inpaint mask unioned with depth-edge
    /// pixels, minus sky; `inpaint_wo_edge` additionally drops the edge
    /// pixels themselves.
    pub fn process_frame_aggressive(&self, frame: &mut Frame) {
        let dilated = morphology::dilate(&frame.inpaint, Norm::LInf, self.config.dilate_radius);
        let edges = gradient::depth_edge_mask(&frame.dpt, self.config.edge_threshold);

        let (width, height) = frame.dpt.dimensions();
        let mut inpaint = blank_mask(width, height);
        let mut inpaint_wo_edge = blank_mask(width, height);
        for y in 0..height {
            for x in 0..width {
                if frame.sky.get_pixel(x, y)[0] != MASK_CLEAR {
                    continue;
                }
                let edge = edges.get_pixel(x, y)[0] != MASK_CLEAR;
                if edge || dilated.get_pixel(x, y)[0] != MASK_CLEAR {
                    inpaint.put_pixel(x, y, Luma([MASK_SET]));
                    if !edge {
                        inpaint_wo_edge.put_pixel(x, y, Luma([MASK_SET]));
                    }
                }
            }
        }

        frame.inpaint = inpaint;
        frame.inpaint_wo_edge = inpaint_wo_edge;
    }

    /// Marks pixels whose depth is missing or at/beyond the sky threshold.
    fn invalid_depth_mask(&self, dpt: &DepthMap) -> Mask {
        let (width, height) = dpt.dimensions();
        let mut invalid = blank_mask(width, height);
        for (x, y, Luma([depth])) in dpt.enumerate_pixels() {
            if *depth >= self.sky_depth || *depth == 0.0 {
                invalid.put_pixel(x, y, Luma([MASK_SET]));
            }
        }
        invalid
    }
}

/// True when at least one mask pixel is set.
fn any_set(mask: &Mask) -> bool {
    mask.pixels().any(|Luma([value])| *value != MASK_CLEAR)
}

/// ORs `src` into `dst` pixel-wise.
fn union_into(dst: &mut Mask, src: &Mask) {
    for (dst, Luma([src])) in dst.pixels_mut().zip(src.pixels()) {
        if *src != MASK_CLEAR {
            dst.0[0] = MASK_SET;
        }
    }
}
