//! Pose stage fanning each refined scene out into per-view work items.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::{
    PipelineError, ScenePayload, config::TrajectoryConfig, telemetry::TelemetrySink,
    trajectory::orbit_camera_poses,
};

use super::{NovelView, StageReceiver, StageSender};

/// Spawns the pose stage generating one [`NovelView`] per trajectory pose.
///
/// The fan-out shape does not fit `spawn_stage`'s one-in/one-out contract,
/// so the stage loop is written out here.
pub fn spawn(
    trajectory: TrajectoryConfig,
    telemetry: TelemetrySink,
    mut input: StageReceiver<ScenePayload>,
    output: StageSender<NovelView>,
) -> JoinHandle<Result<(), PipelineError>> {
    tokio::spawn(async move {
        while let Some(message) = input.recv().await {
            match message {
                Ok(payload) => {
                    let poses = match orbit_camera_poses(
                        trajectory.frames,
                        trajectory.radius,
                        trajectory.look_at_ratio,
                    ) {
                        Ok(poses) => poses,
                        Err(error) => {
                            if output.send(Err(error.clone())).await.is_err() {
                                warn!(target = "pipeline", stage = "pose", "downstream dropped error");
                            }
                            return Err(error);
                        }
                    };

                    let scene = Arc::new(payload);
                    for (index, pose) in poses.into_iter().enumerate() {
                        telemetry.record_stage("pose");
                        let view = NovelView {
                            scene: scene.clone(),
                            index,
                            pose,
                        };
                        if output.send(Ok(view)).await.is_err() {
                            warn!(target = "pipeline", stage = "pose", "downstream dropped");
                            return Ok(());
                        }
                    }
                }
                Err(error) => {
                    if output.send(Err(error.clone())).await.is_err() {
                        warn!(
                            target = "pipeline",
                            stage = "pose",
                            "downstream dropped propagated error"
                        );
                    }
                    return Err(error);
                }
            }
        }
        Ok(())
    })
}
