//! Source stage building the scene frame from disk or synthetic data.

use std::path::Path;

use image::Luma;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::{
    DepthMap, Frame, MASK_CLEAR, MASK_SET, Mask, PipelineError, SceneMetadata, ScenePayload,
    blank_mask,
    config::{PolicyLimits, RuntimeConfig, SkyConfig, SourceConfig},
};

use super::StageSender;

/// Dimensions of the synthetic dry-run scene.
const SYNTHETIC_WIDTH: u32 = 320;
const SYNTHETIC_HEIGHT: u32 = 180;

/// Spawns the source stage that emits the configured scene.
pub fn spawn(
    runtime: RuntimeConfig,
    source: SourceConfig,
    sky: SkyConfig,
    limits: PolicyLimits,
    output: StageSender<ScenePayload>,
) -> JoinHandle<Result<(), PipelineError>> {
    tokio::task::spawn_blocking(move || run_source(runtime, source, sky, limits, output))
}

/// Loads or fabricates the frame, validates it, and pushes it downstream.
#[instrument(skip_all, fields(scene = %runtime.scene_id))]
fn run_source(
    runtime: RuntimeConfig,
    source: SourceConfig,
    sky: SkyConfig,
    limits: PolicyLimits,
    output: StageSender<ScenePayload>,
) -> Result<(), PipelineError> {
    let frame = match runtime.depth_path.as_deref() {
        Some(path) => load_frame(path, runtime.sky_path.as_deref(), source.depth_scale)?,
        None => {
            info!("no depth input configured, using synthetic scene");
            synthetic_frame(&sky)?
        }
    };

    let metadata = SceneMetadata {
        scene_id: runtime.scene_id.clone(),
        width: frame.width(),
        height: frame.height(),
    };
    metadata.validate(&limits)?;

    let payload = ScenePayload { frame, metadata };
    output
        .blocking_send(Ok(payload))
        .map_err(|err| PipelineError::Source(format!("downstream closed source channel: {err}")))?;
    drop(output);
    Ok(())
}

/// Reads the depth map and optional sky mask from disk.
fn load_frame(
    depth_path: &Path,
    sky_path: Option<&Path>,
    depth_scale: f32,
) -> Result<Frame, PipelineError> {
    let depth_image = image::open(depth_path)
        .map_err(|err| source_error(depth_path, format!("open failed: {err}")))?
        .to_luma16();
    let (width, height) = depth_image.dimensions();
    let mut dpt = DepthMap::new(width, height);
    for (dst, src) in dpt.pixels_mut().zip(depth_image.pixels()) {
        dst.0[0] = src.0[0] as f32 * depth_scale;
    }

    let sky = match sky_path {
        Some(path) => Some(load_sky_mask(path)?),
        None => None,
    };

    Frame::new(dpt, sky, None, None)
}

/// Reads an 8-bit sky mask; any nonzero sample counts as sky.
fn load_sky_mask(path: &Path) -> Result<Mask, PipelineError> {
    let sky_image = image::open(path)
        .map_err(|err| source_error(path, format!("open failed: {err}")))?
        .to_luma8();
    let mut sky = blank_mask(sky_image.width(), sky_image.height());
    for (dst, src) in sky.pixels_mut().zip(sky_image.pixels()) {
        if src.0[0] != MASK_CLEAR {
            dst.0[0] = MASK_SET;
        }
    }
    Ok(sky)
}

/// Fabricates a deterministic scene: a receding floor, one zero-depth hole,
/// and a sky band across the top.
fn synthetic_frame(sky: &SkyConfig) -> Result<Frame, PipelineError> {
    let (width, height) = (SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT);
    let sky_rows = height / 6;
    let hole_x = width / 8..width / 4;
    let hole_y = height / 3..height / 2;

    let mut dpt = DepthMap::new(width, height);
    let mut sky_mask = blank_mask(width, height);
    for y in 0..height {
        for x in 0..width {
            let depth = if y < sky_rows {
                sky_mask.put_pixel(x, y, Luma([MASK_SET]));
                sky.depth * 2.0
            } else if hole_x.contains(&x) && hole_y.contains(&y) {
                0.0
            } else {
                2.0 + 8.0 * (y as f32 / height as f32)
            };
            dpt.put_pixel(x, y, Luma([depth]));
        }
    }

    Frame::new(dpt, Some(sky_mask), None, None)
}

/// Formats a source error with the path context included.
fn source_error(path: &Path, message: String) -> PipelineError {
    PipelineError::Source(format!("{}: {message}", path.display()))
}
