//! Pipeline orchestration utilities and stage wiring.

use std::sync::Arc;

use glam::DMat4;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{instrument, warn};

use crate::{PipelineError, ScenePayload, StageResult, config::AppConfig, telemetry::TelemetrySink};

pub mod export;
pub mod pose;
pub mod refine;
pub mod source;

/// Single synthesized view request produced by the pose stage.
#[derive(Debug, Clone)]
pub struct NovelView {
    /// Refined scene shared by every view of the trajectory.
    pub scene: Arc<ScenePayload>,
    /// Index within the reversed pose sequence.
    pub index: usize,
    /// Camera-to-world transform for this view.
    pub pose: DMat4,
}

/// Sender type alias for pipeline stages.
pub type StageSender<T> = mpsc::Sender<StageResult<T>>;
/// Receiver type alias for pipeline stages.
pub type StageReceiver<T> = mpsc::Receiver<StageResult<T>>;

/// Creates a bounded channel for connecting two pipeline stages.
pub fn channel<T>(capacity: usize) -> (StageSender<T>, StageReceiver<T>) {
    mpsc::channel(capacity)
}

/// Spawns a processing stage that transforms payloads and forwards the result.
///
/// Stages are typed on their input and output payloads; errors received from
/// upstream are forwarded downstream and terminate the stage task.
pub fn spawn_stage<I, O, F, Fut>(
    stage_name: &'static str,
    mut input: StageReceiver<I>,
    output: StageSender<O>,
    mut handler: F,
) -> JoinHandle<Result<(), PipelineError>>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = StageResult<O>> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = input.recv().await {
            match message {
                Ok(payload) => match handler(payload).await {
                    Ok(next) => {
                        if output.send(Ok(next)).await.is_err() {
                            warn!(
                                target = "pipeline",
                                stage = stage_name,
                                "downstream dropped"
                            );
                            break;
                        }
                    }
                    Err(error) => {
                        if output.send(Err(error.clone())).await.is_err() {
                            warn!(
                                target = "pipeline",
                                stage = stage_name,
                                "downstream dropped error"
                            );
                        }
                        return Err(error);
                    }
                },
                Err(error) => {
                    if output.send(Err(error.clone())).await.is_err() {
                        warn!(
                            target = "pipeline",
                            stage = stage_name,
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

/// Executes the configured pipeline over a single source scene.
#[instrument(skip_all)]
pub async fn execute_pipeline(
    config: AppConfig,
    telemetry: TelemetrySink,
) -> Result<(), PipelineError> {
    let capacity = config.runtime.channel_capacity as usize;
    let (refine_tx, refine_rx) = channel(capacity);
    let (pose_tx, pose_rx) = channel(capacity);
    let (export_tx, export_rx) = channel(capacity);
    let (sink_tx, mut sink_rx) = channel(capacity);

    let source_handle = source::spawn(
        config.runtime.clone(),
        config.source.clone(),
        config.sky.clone(),
        config.limits.clone(),
        refine_tx,
    );
    let refine_handle = refine::spawn(
        config.refiner.clone(),
        config.sky.clone(),
        config.limits.clone(),
        telemetry.clone(),
        refine_rx,
        pose_tx,
    );
    let pose_handle = pose::spawn(
        config.trajectory.clone(),
        telemetry.clone(),
        pose_rx,
        export_tx,
    );
    let export_handle = export::spawn(
        telemetry.clone(),
        export_rx,
        sink_tx,
        config.runtime.output_dir.clone(),
    );

    // Drain views emitted by the export stage.
    while let Some(result) = sink_rx.recv().await {
        match result {
            Ok(_view) => telemetry.record_completed(),
            Err(err) => return Err(err),
        }
    }

    source_handle.await.map_err(PipelineError::from)??;
    refine_handle.await.map_err(PipelineError::from)??;
    pose_handle.await.map_err(PipelineError::from)??;
    export_handle.await.map_err(PipelineError::from)??;

    Ok(())
}
