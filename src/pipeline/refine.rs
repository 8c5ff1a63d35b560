//! Refine stage applying the hole-mask refiner to incoming scenes.

use tokio::task::JoinHandle;

use crate::{
    MASK_CLEAR, Mask, PipelineError, ScenePayload,
    config::{PolicyLimits, RefinerConfig, SkyConfig},
    refine::HoleMaskRefiner,
    telemetry::TelemetrySink,
};

use super::{StageReceiver, StageSender, spawn_stage};

/// Spawns the mask refinement stage.
pub fn spawn(
    refiner: RefinerConfig,
    sky: SkyConfig,
    limits: PolicyLimits,
    telemetry: TelemetrySink,
    input: StageReceiver<ScenePayload>,
    output: StageSender<ScenePayload>,
) -> JoinHandle<Result<(), PipelineError>> {
    let refiner = HoleMaskRefiner::new(refiner, sky.depth);
    spawn_stage("refine", input, output, move |mut payload: ScenePayload| {
        let refiner = refiner.clone();
        let telemetry = telemetry.clone();
        let limits = limits.clone();
        async move {
            payload.metadata.validate(&limits)?;
            refiner.refine(&mut payload.frame);
            telemetry.record_refined(
                set_pixels(&payload.frame.inpaint),
                set_pixels(&payload.frame.inpaint_wo_edge),
            );
            telemetry.record_stage("refine");
            Ok(payload)
        }
    })
}

/// Counts set pixels in a mask.
fn set_pixels(mask: &Mask) -> u64 {
    mask.pixels().filter(|px| px.0[0] != MASK_CLEAR).count() as u64
}
