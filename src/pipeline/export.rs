//! Export stage persisting refined masks and the trajectory document.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use image::ImageFormat;
use serde::Serialize;
use tokio::{fs, task::JoinHandle};
use tracing::warn;

use crate::{Mask, PipelineError, telemetry::TelemetrySink};

use super::{NovelView, StageReceiver, StageSender};

/// One camera pose as written to `trajectory.json`.
#[derive(Debug, Clone, Serialize)]
pub struct PoseRecord {
    /// Index within the exported sequence.
    pub index: usize,
    /// Row-major 4x4 camera-to-world transform.
    pub matrix: [[f64; 4]; 4],
}

/// Spawns the export stage, optionally writing artifacts under `output_dir`.
///
/// Masks are written once per scene; pose records are accumulated and the
/// trajectory document is written when the upstream channel closes.
pub fn spawn(
    telemetry: TelemetrySink,
    mut input: StageReceiver<NovelView>,
    output: StageSender<NovelView>,
    output_dir: Option<PathBuf>,
) -> JoinHandle<Result<(), PipelineError>> {
    tokio::spawn(async move {
        let mut poses: Vec<PoseRecord> = Vec::new();
        let mut masks_written = false;

        while let Some(message) = input.recv().await {
            match message {
                Ok(view) => {
                    telemetry.record_stage("export");
                    if let Some(dir) = output_dir.as_deref() {
                        if !masks_written {
                            write_masks(dir, &view).await?;
                            masks_written = true;
                        }
                    }
                    poses.push(PoseRecord {
                        index: view.index,
                        matrix: row_major(view.pose),
                    });
                    if output.send(Ok(view)).await.is_err() {
                        warn!(target = "pipeline", stage = "export", "downstream dropped");
                        return Ok(());
                    }
                }
                Err(error) => {
                    if output.send(Err(error.clone())).await.is_err() {
                        warn!(
                            target = "pipeline",
                            stage = "export",
                            "downstream dropped propagated error"
                        );
                    }
                    return Err(error);
                }
            }
        }

        if let Some(dir) = output_dir.as_deref() {
            write_trajectory(dir, &poses).await?;
        }
        Ok(())
    })
}

/// Writes the refined masks for the scene carried by `view`.
async fn write_masks(dir: &Path, view: &NovelView) -> Result<(), PipelineError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|err| PipelineError::Io(err.to_string()))?;
    let frame = &view.scene.frame;
    for (name, mask) in [
        ("inpaint.png", &frame.inpaint),
        ("inpaint_wo_edge.png", &frame.inpaint_wo_edge),
    ] {
        let bytes = encode_png(mask)?;
        fs::write(dir.join(name), bytes)
            .await
            .map_err(|err| PipelineError::Io(err.to_string()))?;
    }
    Ok(())
}

/// Writes the accumulated pose records as `trajectory.json`.
async fn write_trajectory(dir: &Path, poses: &[PoseRecord]) -> Result<(), PipelineError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|err| PipelineError::Io(err.to_string()))?;
    let document = serde_json::to_vec_pretty(poses)
        .map_err(|err| PipelineError::Export(format!("trajectory serialization: {err}")))?;
    fs::write(dir.join("trajectory.json"), document)
        .await
        .map_err(|err| PipelineError::Io(err.to_string()))
}

/// Encodes a mask as an in-memory PNG.
fn encode_png(mask: &Mask) -> Result<Vec<u8>, PipelineError> {
    let mut bytes = Vec::new();
    mask.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| PipelineError::Export(format!("png encode: {err}")))?;
    Ok(bytes)
}

/// Converts a column-major glam matrix into row-major nested arrays.
fn row_major(pose: glam::DMat4) -> [[f64; 4]; 4] {
    pose.transpose().to_cols_array_2d()
}
