//! Orbital camera trajectory generation.
//!
//! Produces camera-to-world poses tracing a horizontal circle that always
//! look toward a fixed target point in front of the scene.

use glam::{DMat3, DMat4, DVec3};

use crate::PipelineError;

/// World-up axis used for look-at orientation.
pub const WORLD_UP: DVec3 = DVec3::new(0.0, 1.0, 0.0);
/// Fixed orbit height above the scene origin.
pub const ORBIT_HEIGHT: f64 = 5.0;
/// Horizontal radius scale applied to the configured base radius.
pub const RADIUS_SCALE: f64 = 1.5;
/// Directions shorter than this are rejected as degenerate.
const DEGENERATE_EPSILON: f64 = 1e-9;

/// Samples `num_frames` positions on a horizontal circle.
///
/// The circle has radius `RADIUS_SCALE * radius` at height `ORBIT_HEIGHT`;
/// theta spans one full turn with both endpoints included, so the last
/// sample of a multi-frame orbit coincides with the first.
pub fn orbit_positions(num_frames: u32, radius: f64) -> Vec<DVec3> {
    let r = radius * RADIUS_SCALE;
    (0..num_frames)
        .map(|i| {
            let t = if num_frames > 1 {
                i as f64 / (num_frames - 1) as f64
            } else {
                0.0
            };
            let theta = std::f64::consts::TAU * t;
            DVec3::new(r * theta.cos(), ORBIT_HEIGHT, r * theta.sin())
        })
        .collect()
}

/// Camera-to-world rotation orienting a camera at `position` toward `target`.
///
/// Fails when the viewing direction has zero length or is parallel to
/// [`WORLD_UP`], instead of letting NaNs propagate into the pose.
pub fn look_at(position: DVec3, target: DVec3) -> Result<DMat3, PipelineError> {
    let offset = target - position;
    if offset.length() <= DEGENERATE_EPSILON {
        return Err(PipelineError::Trajectory(format!(
            "camera position {position:?} coincides with the look-at target"
        )));
    }
    let forward = offset / offset.length();
    let right = WORLD_UP.cross(forward);
    if right.length() <= DEGENERATE_EPSILON {
        return Err(PipelineError::Trajectory(format!(
            "viewing direction {forward:?} is parallel to the world-up axis"
        )));
    }
    let right = right / right.length();
    let up = forward.cross(right);
    // Columns [right, up, forward] are the inverse of the row-stacked
    // orthonormal basis.
    Ok(DMat3::from_cols(right, up, forward))
}

/// Builds the orbit's pose sequence, reversed.
///
/// The target sits at `(0, 0, radius * look_at_ratio)`. The collected poses
/// are returned in reverse sampling order so playback runs the orbit
/// backward; callers must not assume sampling order.
pub fn orbit_camera_poses(
    num_frames: u32,
    radius: f64,
    look_at_ratio: f64,
) -> Result<Vec<DMat4>, PipelineError> {
    let target = DVec3::new(0.0, 0.0, radius * look_at_ratio);
    let mut poses = Vec::with_capacity(num_frames as usize);
    for position in orbit_positions(num_frames, radius) {
        let rotation = look_at(position, target)?;
        poses.push(pose_matrix(rotation, position));
    }
    poses.reverse();
    Ok(poses)
}

/// Assembles a 4x4 camera-to-world transform from rotation and position.
fn pose_matrix(rotation: DMat3, translation: DVec3) -> DMat4 {
    DMat4::from_cols(
        rotation.x_axis.extend(0.0),
        rotation.y_axis.extend(0.0),
        rotation.z_axis.extend(0.0),
        translation.extend(1.0),
    )
}
