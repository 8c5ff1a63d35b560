use image::Luma;

use viewforge::config::RefinerConfig;
use viewforge::refine::HoleMaskRefiner;
use viewforge::{DepthMap, Frame, MASK_CLEAR, MASK_SET, Mask, blank_mask};

const SKY_DEPTH: f32 = 50.0;

fn refiner_config() -> RefinerConfig {
    RefinerConfig {
        hole_min_size: 10,
        expansion_radius: 5,
        dilate_radius: 2,
        edge_threshold: 0.5,
    }
}

fn refiner() -> HoleMaskRefiner {
    HoleMaskRefiner::new(refiner_config(), SKY_DEPTH)
}

fn flat_depth(width: u32, height: u32, value: f32) -> DepthMap {
    DepthMap::from_pixel(width, height, Luma([value]))
}

fn punch_hole(dpt: &mut DepthMap, x0: u32, y0: u32, side: u32, value: f32) {
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            dpt.put_pixel(x, y, Luma([value]));
        }
    }
}

fn set_count(mask: &Mask) -> usize {
    mask.pixels().filter(|px| px.0[0] != MASK_CLEAR).count()
}

fn is_set(mask: &Mask, x: u32, y: u32) -> bool {
    mask.get_pixel(x, y)[0] != MASK_CLEAR
}

#[test]
fn clean_depth_leaves_masks_unchanged() {
    let mut frame = Frame::from_depth(flat_depth(32, 32, 5.0)).expect("frame");
    refiner().find_and_expand_holes(&mut frame);
    assert_eq!(set_count(&frame.inpaint), 0);
    assert_eq!(set_count(&frame.inpaint_wo_edge), 0);
}

#[test]
fn small_hole_is_ignored() {
    let mut dpt = flat_depth(40, 40, 5.0);
    // 3x3 = 9 pixels, at the configured minimum of 10 this must not expand.
    punch_hole(&mut dpt, 10, 10, 3, 0.0);
    let mut frame = Frame::from_depth(dpt).expect("frame");
    refiner().find_and_expand_holes(&mut frame);
    assert_eq!(set_count(&frame.inpaint), 0);
    assert_eq!(set_count(&frame.inpaint_wo_edge), 0);
}

#[test]
fn large_hole_expands_whole_neighborhood() {
    let mut dpt = flat_depth(40, 40, 5.0);
    // 5x5 = 25 pixels, above the minimum.
    punch_hole(&mut dpt, 10, 10, 5, 0.0);
    let mut frame = Frame::from_depth(dpt).expect("frame");
    refiner().find_and_expand_holes(&mut frame);

    // Expansion radius 5 around the 10..15 square covers 5..=19.
    for y in 5..=19 {
        for x in 5..=19 {
            assert!(is_set(&frame.inpaint, x, y), "expected ({x},{y}) set");
            assert!(is_set(&frame.inpaint_wo_edge, x, y));
        }
    }
    assert!(!is_set(&frame.inpaint, 4, 12));
    assert!(!is_set(&frame.inpaint, 12, 25));
}

#[test]
fn sky_depth_region_counts_as_hole() {
    let mut dpt = flat_depth(40, 40, 5.0);
    punch_hole(&mut dpt, 20, 20, 6, SKY_DEPTH + 10.0);
    let mut frame = Frame::from_depth(dpt).expect("frame");
    refiner().find_and_expand_holes(&mut frame);
    assert!(is_set(&frame.inpaint, 22, 22));
    assert!(is_set(&frame.inpaint, 15, 22));
}

#[test]
fn expansion_unions_into_existing_masks() {
    let mut dpt = flat_depth(40, 40, 5.0);
    punch_hole(&mut dpt, 10, 10, 5, 0.0);
    let mut inpaint = blank_mask(40, 40);
    inpaint.put_pixel(35, 35, Luma([MASK_SET]));
    let mut frame = Frame::new(dpt, None, Some(inpaint), None).expect("frame");
    refiner().find_and_expand_holes(&mut frame);
    // The pre-existing pixel survives the union.
    assert!(is_set(&frame.inpaint, 35, 35));
    assert!(is_set(&frame.inpaint, 12, 12));
}

#[test]
fn aggressive_never_marks_sky() {
    // Depth steps from 5 to 30 at x = 20, putting strong edges on the sky
    // boundary; sky covers the right half including the step.
    let mut dpt = flat_depth(40, 40, 5.0);
    for y in 0..40 {
        for x in 20..40 {
            dpt.put_pixel(x, y, Luma([30.0]));
        }
    }
    let mut sky = blank_mask(40, 40);
    for y in 0..40 {
        for x in 20..40 {
            sky.put_pixel(x, y, Luma([MASK_SET]));
        }
    }
    let mut inpaint = blank_mask(40, 40);
    inpaint.put_pixel(25, 10, Luma([MASK_SET]));
    let mut frame = Frame::new(dpt, Some(sky), Some(inpaint), None).expect("frame");
    refiner().process_frame_aggressive(&mut frame);

    for y in 0..40 {
        for x in 20..40 {
            assert!(
                !is_set(&frame.inpaint, x, y),
                "sky pixel ({x},{y}) marked for inpainting"
            );
            assert!(!is_set(&frame.inpaint_wo_edge, x, y));
        }
    }
}

#[test]
fn aggressive_keeps_wo_edge_subset_of_inpaint() {
    let mut dpt = flat_depth(40, 40, 5.0);
    for y in 0..40 {
        for x in 20..40 {
            dpt.put_pixel(x, y, Luma([8.0]));
        }
    }
    let mut inpaint = blank_mask(40, 40);
    inpaint.put_pixel(10, 10, Luma([MASK_SET]));
    inpaint.put_pixel(30, 30, Luma([MASK_SET]));
    let mut frame = Frame::new(dpt, None, Some(inpaint), None).expect("frame");
    refiner().process_frame_aggressive(&mut frame);

    for y in 0..40 {
        for x in 0..40 {
            if is_set(&frame.inpaint_wo_edge, x, y) {
                assert!(
                    is_set(&frame.inpaint, x, y),
                    "({x},{y}) in inpaint_wo_edge but not inpaint"
                );
            }
        }
    }
}

#[test]
fn aggressive_dilates_seed_pixels() {
    let mut frame = Frame::new(
        flat_depth(32, 32, 5.0),
        None,
        Some({
            let mut seed = blank_mask(32, 32);
            seed.put_pixel(10, 10, Luma([MASK_SET]));
            seed
        }),
        None,
    )
    .expect("frame");
    refiner().process_frame_aggressive(&mut frame);

    // Dilation radius 2 around the seed.
    for y in 8..=12 {
        for x in 8..=12 {
            assert!(is_set(&frame.inpaint, x, y), "expected ({x},{y}) set");
        }
    }
    assert!(!is_set(&frame.inpaint, 13, 10));
    assert!(!is_set(&frame.inpaint, 10, 13));
}

#[test]
fn aggressive_includes_depth_edges_but_not_in_wo_edge() {
    // A unit depth step at x = 16 produces gradient sums above 0.5.
    let mut dpt = flat_depth(32, 32, 5.0);
    for y in 0..32 {
        for x in 16..32 {
            dpt.put_pixel(x, y, Luma([6.0]));
        }
    }
    let mut frame = Frame::from_depth(dpt).expect("frame");
    refiner().process_frame_aggressive(&mut frame);

    assert!(is_set(&frame.inpaint, 15, 16));
    assert!(is_set(&frame.inpaint, 16, 16));
    assert!(!is_set(&frame.inpaint_wo_edge, 15, 16));
    assert!(!is_set(&frame.inpaint_wo_edge, 16, 16));
    // Far from the step there is neither seed nor edge.
    assert!(!is_set(&frame.inpaint, 5, 5));
}

#[test]
fn refine_runs_both_passes() {
    let mut dpt = flat_depth(40, 40, 5.0);
    punch_hole(&mut dpt, 10, 10, 5, 0.0);
    let mut frame = Frame::from_depth(dpt).expect("frame");
    refiner().refine(&mut frame);
    // Hole expansion plus the aggressive dilation radius.
    assert!(is_set(&frame.inpaint, 12, 12));
    assert!(is_set(&frame.inpaint, 3, 12));
    // The hole rim is a depth edge, excluded from the wo_edge variant.
    assert!(!is_set(&frame.inpaint_wo_edge, 9, 12));
}

#[test]
fn frame_rejects_mismatched_mask_shapes() {
    let err = Frame::new(flat_depth(12, 12, 5.0), Some(blank_mask(10, 10)), None, None)
        .expect_err("mismatched sky mask should fail");
    assert!(format!("{err}").contains("sky mask"));
}
