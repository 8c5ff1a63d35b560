//! Core library for the Viewforge scene-reconstruction tools.
//!
//! The crate exposes the frame data model shared across the asynchronous
//! pipeline stages, the hole-mask refiner and trajectory generator invoked by
//! those stages, configuration loading utilities, and the orchestration entry
//! point used by the CLI application.

pub mod config;
pub mod pipeline;
pub mod refine;
pub mod telemetry;
pub mod trajectory;

use std::fmt::Display;

use image::{GrayImage, ImageBuffer, Luma};
use thiserror::Error;
use tracing::instrument;

/// Per-pixel depth in scene units, stored as f32.
pub type DepthMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Boolean per-pixel mask stored as an 8-bit image.
pub type Mask = GrayImage;

/// Pixel value marking a set mask entry.
pub const MASK_SET: u8 = u8::MAX;
/// Pixel value marking a clear mask entry.
pub const MASK_CLEAR: u8 = 0;

/// Returns an all-clear mask matching the given dimensions.
pub fn blank_mask(width: u32, height: u32) -> Mask {
    GrayImage::from_pixel(width, height, Luma([MASK_CLEAR]))
}

/// Single reconstructed frame travelling through the pipeline.
///
/// All masks share the depth map's dimensions. Optional mask inputs are
/// resolved to all-clear buffers once, at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Estimated per-pixel depth.
    pub dpt: DepthMap,
    /// Pixels classified as sky, excluded from inpainting.
    pub sky: Mask,
    /// Pixels requiring synthesized content.
    pub inpaint: Mask,
    /// Inpaint variant with depth-edge pixels removed.
    pub inpaint_wo_edge: Mask,
}

impl Frame {
    /// Builds a frame, defaulting absent masks and validating dimensions.
    pub fn new(
        dpt: DepthMap,
        sky: Option<Mask>,
        inpaint: Option<Mask>,
        inpaint_wo_edge: Option<Mask>,
    ) -> Result<Self, PipelineError> {
        let (width, height) = dpt.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::Source(
                "depth map must have nonzero dimensions".to_string(),
            ));
        }
        let sky = resolve_mask("sky", sky, width, height)?;
        let inpaint = resolve_mask("inpaint", inpaint, width, height)?;
        let inpaint_wo_edge = resolve_mask("inpaint_wo_edge", inpaint_wo_edge, width, height)?;
        Ok(Self {
            dpt,
            sky,
            inpaint,
            inpaint_wo_edge,
        })
    }

    /// Builds a frame carrying only a depth map.
    pub fn from_depth(dpt: DepthMap) -> Result<Self, PipelineError> {
        Self::new(dpt, None, None, None)
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.dpt.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.dpt.height()
    }
}

/// Defaults an absent mask and rejects dimension mismatches.
fn resolve_mask(
    name: &str,
    mask: Option<Mask>,
    width: u32,
    height: u32,
) -> Result<Mask, PipelineError> {
    match mask {
        Some(mask) if mask.dimensions() == (width, height) => Ok(mask),
        Some(mask) => Err(PipelineError::Source(format!(
            "{name} mask is {}x{} but depth map is {width}x{height}",
            mask.width(),
            mask.height()
        ))),
        None => Ok(blank_mask(width, height)),
    }
}

/// Metadata describing a scene travelling through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneMetadata {
    pub scene_id: String,
    pub width: u32,
    pub height: u32,
}

impl SceneMetadata {
    /// Validates the metadata against runtime policy constraints.
    pub fn validate(&self, limits: &config::PolicyLimits) -> Result<(), PipelineError> {
        if self.width > limits.max_width || self.height > limits.max_height {
            return Err(PipelineError::PolicyViolation(format!(
                "resolution {}x{} exceeds policy bound {}x{}",
                self.width, self.height, limits.max_width, limits.max_height
            )));
        }
        Ok(())
    }
}

/// Payload travelling across the reconstruction pipeline.
#[derive(Debug, Clone)]
pub struct ScenePayload {
    pub frame: Frame,
    pub metadata: SceneMetadata,
}

/// Errors returned by asynchronous pipeline stages.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("I/O failure: {0}")]
    Io(String),
    #[error("source failure: {0}")]
    Source(String),
    #[error("refine failure: {0}")]
    Refine(String),
    #[error("trajectory failure: {0}")]
    Trajectory(String),
    #[error("export failure: {0}")]
    Export(String),
    #[error("policy violation: {0}")]
    PolicyViolation(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("task join failure: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}

/// Result alias for stage processing.
pub type StageResult<T> = Result<T, PipelineError>;

/// Executes the pipeline end-to-end once configuration is loaded.
#[instrument(skip_all)]
pub async fn run(config: config::AppConfig) -> Result<(), PipelineError> {
    let telemetry = telemetry::TelemetrySink::default();
    pipeline::execute_pipeline(config, telemetry).await
}

impl Display for ScenePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ScenePayload(scene={}, {}x{})",
            self.metadata.scene_id, self.metadata.width, self.metadata.height
        )
    }
}
