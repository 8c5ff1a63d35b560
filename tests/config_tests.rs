use std::path::PathBuf;

use viewforge::PipelineError;
use viewforge::config::{AppConfig, CliArgs};

fn base_cli() -> CliArgs {
    CliArgs {
        config: PathBuf::from("viewforge.toml"),
        depth: None,
        sky: None,
        output: None,
        scene_id: "config_test".into(),
        frames: None,
        radius: None,
        channel_capacity: None,
    }
}

#[tokio::test]
async fn config_loads_defaults_successfully() {
    let config = AppConfig::load(base_cli()).await.expect("load defaults");
    assert_eq!(config.refiner.hole_min_size, 10);
    assert_eq!(config.refiner.expansion_radius, 5);
    assert_eq!(config.trajectory.frames, 90);
    assert_eq!(config.sky.depth, 50.0);
    assert_eq!(config.runtime.channel_capacity, 8);
    assert_eq!(config.runtime.scene_id, "config_test");
}

#[tokio::test]
async fn cli_overrides_trajectory_values() {
    let mut cli = base_cli();
    cli.frames = Some(12);
    cli.radius = Some(4.0);
    let config = AppConfig::load(cli).await.expect("load with overrides");
    assert_eq!(config.trajectory.frames, 12);
    assert_eq!(config.trajectory.radius, 4.0);
}

#[tokio::test]
async fn config_rejects_frame_overflow() {
    let mut cli = base_cli();
    cli.frames = Some(100_000);
    let err = AppConfig::load(cli)
        .await
        .expect_err("frame overflow should fail");
    assert!(matches!(err, PipelineError::PolicyViolation(_)));
    assert!(format!("{err}").contains("exceeds policy cap"));
}

#[tokio::test]
async fn config_rejects_zero_frames() {
    let mut cli = base_cli();
    cli.frames = Some(0);
    let err = AppConfig::load(cli).await.expect_err("zero frames should fail");
    assert!(format!("{err}").contains("frame count"));
}

#[tokio::test]
async fn config_rejects_nonpositive_radius() {
    let mut cli = base_cli();
    cli.radius = Some(0.0);
    let err = AppConfig::load(cli).await.expect_err("zero radius should fail");
    assert!(format!("{err}").contains("radius"));
}

#[tokio::test]
async fn config_rejects_missing_document() {
    let mut cli = base_cli();
    cli.config = PathBuf::from("does_not_exist.toml");
    let err = AppConfig::load(cli).await.expect_err("missing file should fail");
    assert!(format!("{err}").contains("failed to read config"));
}
