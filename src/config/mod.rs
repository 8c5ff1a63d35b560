//! Configuration loading and validation utilities.

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use tokio::fs;
use tracing::instrument;

use crate::PipelineError;

/// Command-line arguments used to bootstrap the runtime.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Viewforge scene reconstruction pipeline")]
pub struct CliArgs {
    /// Location of the configuration document.
    #[arg(long, value_name = "PATH", default_value = "viewforge.toml")]
    pub config: PathBuf,
    /// Input depth map (16-bit grayscale PNG). A synthetic scene is used when absent.
    #[arg(long, value_name = "PATH")]
    pub depth: Option<PathBuf>,
    /// Optional sky mask (8-bit grayscale PNG, nonzero = sky).
    #[arg(long, value_name = "PATH")]
    pub sky: Option<PathBuf>,
    /// Directory receiving refined masks and the trajectory document.
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,
    /// Identifier for the scene used in telemetry.
    #[arg(long, value_name = "ID", default_value = "synthetic_scene")]
    pub scene_id: String,
    /// Trajectory frame count override.
    #[arg(long, value_name = "FRAMES", env = "VIEWFORGE_FRAMES")]
    pub frames: Option<u32>,
    /// Trajectory orbit radius override.
    #[arg(long, value_name = "RADIUS", env = "VIEWFORGE_RADIUS")]
    pub radius: Option<f64>,
    /// Bounded channel capacity.
    #[arg(long, value_name = "CAPACITY", env = "VIEWFORGE_CHANNEL_CAPACITY")]
    pub channel_capacity: Option<u32>,
}

/// Limits enforced at runtime.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PolicyLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub max_trajectory_frames: u32,
}

/// Default runtime values provided by configuration authors.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RuntimeDefaults {
    pub channel_capacity: u32,
}

/// Depth input decoding parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceConfig {
    /// Scale applied to raw 16-bit depth samples to reach scene units.
    pub depth_scale: f32,
}

/// Sky classification parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SkyConfig {
    /// Depth at or beyond this value is treated as sky.
    pub depth: f32,
}

/// Hole-mask refiner parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RefinerConfig {
    /// Connected hole components at or below this pixel count are ignored.
    pub hole_min_size: u32,
    /// Chebyshev radius of the hole expansion element.
    pub expansion_radius: u8,
    /// Chebyshev radius of the aggressive-pass dilation element.
    pub dilate_radius: u8,
    /// Gradient magnitude sum marking a depth edge.
    pub edge_threshold: f32,
}

/// Trajectory generation parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrajectoryConfig {
    /// Number of camera poses sampled along the orbit.
    pub frames: u32,
    /// Base orbit radius in scene units.
    pub radius: f64,
    /// Look-at target depth as a fraction of the radius.
    pub look_at_ratio: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct ConfigDocument {
    pub limits: PolicyLimits,
    pub defaults: RuntimeDefaults,
    pub source: SourceConfig,
    pub sky: SkyConfig,
    pub refiner: RefinerConfig,
    pub trajectory: TrajectoryConfig,
}

/// Derived runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub scene_id: String,
    pub depth_path: Option<PathBuf>,
    pub sky_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub channel_capacity: u32,
}

/// Fully merged configuration set.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cli: CliArgs,
    pub limits: PolicyLimits,
    pub source: SourceConfig,
    pub sky: SkyConfig,
    pub refiner: RefinerConfig,
    pub trajectory: TrajectoryConfig,
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    #[instrument(skip_all)]
    pub async fn load(cli: CliArgs) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(&cli.config)
            .await
            .map_err(|err| PipelineError::Config(format!("failed to read config: {err}")))?;
        let document: ConfigDocument = toml::from_str(&raw)
            .map_err(|err| PipelineError::Config(format!("invalid config document: {err}")))?;

        let mut trajectory = document.trajectory.clone();
        if let Some(frames) = cli.frames {
            trajectory.frames = frames;
        }
        if let Some(radius) = cli.radius {
            trajectory.radius = radius;
        }

        if trajectory.frames == 0 {
            return Err(PipelineError::Config(
                "trajectory frame count must be positive".to_string(),
            ));
        }
        if trajectory.frames > document.limits.max_trajectory_frames {
            return Err(PipelineError::PolicyViolation(format!(
                "trajectory frame count {} exceeds policy cap {}",
                trajectory.frames, document.limits.max_trajectory_frames
            )));
        }
        if !trajectory.radius.is_finite() || trajectory.radius <= 0.0 {
            return Err(PipelineError::Config(format!(
                "trajectory radius must be positive, got {}",
                trajectory.radius
            )));
        }
        if !trajectory.look_at_ratio.is_finite() {
            return Err(PipelineError::Config(
                "trajectory look_at_ratio must be finite".to_string(),
            ));
        }
        if !document.sky.depth.is_finite() || document.sky.depth <= 0.0 {
            return Err(PipelineError::Config(format!(
                "sky depth threshold must be positive, got {}",
                document.sky.depth
            )));
        }
        if !document.source.depth_scale.is_finite() || document.source.depth_scale <= 0.0 {
            return Err(PipelineError::Config(format!(
                "depth scale must be positive, got {}",
                document.source.depth_scale
            )));
        }
        if document.refiner.expansion_radius == 0 || document.refiner.dilate_radius == 0 {
            return Err(PipelineError::Config(
                "refiner structuring radii must be at least 1".to_string(),
            ));
        }
        if !document.refiner.edge_threshold.is_finite() || document.refiner.edge_threshold < 0.0 {
            return Err(PipelineError::Config(format!(
                "edge threshold must be non-negative, got {}",
                document.refiner.edge_threshold
            )));
        }

        let channel_capacity = cli
            .channel_capacity
            .unwrap_or(document.defaults.channel_capacity)
            .max(1);

        let runtime = RuntimeConfig {
            scene_id: cli.scene_id.clone(),
            depth_path: cli.depth.clone(),
            sky_path: cli.sky.clone(),
            output_dir: cli.output.clone(),
            channel_capacity,
        };

        Ok(Self {
            cli,
            limits: document.limits,
            source: document.source,
            sky: document.sky,
            refiner: document.refiner,
            trajectory,
            runtime,
        })
    }
}
