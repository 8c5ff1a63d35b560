use criterion::{Criterion, criterion_group, criterion_main};

use viewforge::config::RefinerConfig;
use viewforge::refine::HoleMaskRefiner;
use viewforge::{DepthMap, Frame};

fn scene_frame(width: u32, height: u32) -> Frame {
    let mut dpt = DepthMap::new(width, height);
    for (x, y, px) in dpt.enumerate_pixels_mut() {
        let in_hole = x >= width / 8 && x < width / 4 && y >= height / 3 && y < height / 2;
        px.0[0] = if in_hole {
            0.0
        } else {
            2.0 + 8.0 * (y as f32 / height as f32)
        };
    }
    Frame::from_depth(dpt).expect("frame")
}

fn bench_refine(c: &mut Criterion) {
    let refiner = HoleMaskRefiner::new(
        RefinerConfig {
            hole_min_size: 10,
            expansion_radius: 5,
            dilate_radius: 2,
            edge_threshold: 0.5,
        },
        50.0,
    );
    let frame = scene_frame(1280, 720);

    let mut group = c.benchmark_group("hole_mask_refine");
    group.bench_function("find_and_expand_holes", |b| {
        b.iter(|| {
            let mut frame = frame.clone();
            refiner.find_and_expand_holes(&mut frame);
        })
    });
    group.bench_function("process_frame_aggressive", |b| {
        b.iter(|| {
            let mut frame = frame.clone();
            refiner.process_frame_aggressive(&mut frame);
        })
    });
    group.finish();
}

criterion_group!(benches, bench_refine);
criterion_main!(benches);
