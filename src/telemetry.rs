//! Telemetry collection primitives for pipeline diagnostics.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

#[derive(Debug, Default)]
struct TelemetryState {
    stage_counts: HashMap<&'static str, u64>,
    inpaint_pixels: u64,
    inpaint_wo_edge_pixels: u64,
    completed_views: u64,
}

/// Snapshot of telemetry suitable for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub stage_counts: Vec<(String, u64)>,
    pub inpaint_pixels: u64,
    pub inpaint_wo_edge_pixels: u64,
    pub completed_views: u64,
}

/// Shared sink capturing per-stage events.
#[derive(Clone, Default)]
pub struct TelemetrySink {
    state: Arc<Mutex<TelemetryState>>,
}

impl TelemetrySink {
    /// Records a stage observation.
    pub fn record_stage(&self, stage: &'static str) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        *state.stage_counts.entry(stage).or_insert(0) += 1;
    }

    /// Records the refined mask sizes produced for a scene.
    pub fn record_refined(&self, inpaint_pixels: u64, inpaint_wo_edge_pixels: u64) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        state.inpaint_pixels += inpaint_pixels;
        state.inpaint_wo_edge_pixels += inpaint_wo_edge_pixels;
    }

    /// Records the completion of a novel view at the end of the pipeline.
    pub fn record_completed(&self) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        state.completed_views += 1;
    }

    /// Exposes a snapshot for diagnostics and testing.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let state = self.state.lock().expect("telemetry mutex poisoned");
        TelemetrySnapshot {
            stage_counts: state
                .stage_counts
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            inpaint_pixels: state.inpaint_pixels,
            inpaint_wo_edge_pixels: state.inpaint_wo_edge_pixels,
            completed_views: state.completed_views,
        }
    }
}
