use glam::{Mat4, Vec3};
use parking_lot::RwLock;

use crate::render::{CameraParams, LightParams};

/// Fixed camera placement from the original presentation.
pub const CAMERA_POSITION: Vec3 = Vec3::new(-45.0, 70.0, 70.0);
pub const CAMERA_TARGET: Vec3 = Vec3::ZERO;
pub const CAMERA_FOV_DEG: f32 = 45.0;
pub const CAMERA_NEAR: f32 = 1.0;
pub const CAMERA_FAR: f32 = 1000.0;

/// Primary point light position.
pub const LIGHT_POSITION: Vec3 = Vec3::new(-100.0, 70.0, 80.0);

/// Shared window size, written by the resize handler and read wherever the
/// aspect ratio is needed.
#[derive(Debug)]
pub struct WindowViewport {
    size: RwLock<(u32, u32)>,
}

impl WindowViewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: RwLock::new((width.max(1), height.max(1))),
        }
    }

    pub fn update(&self, width: u32, height: u32) {
        *self.size.write() = (width.max(1), height.max(1));
    }

    pub fn size(&self) -> (u32, u32) {
        *self.size.read()
    }

    pub fn aspect(&self) -> f32 {
        let (width, height) = self.size();
        width as f32 / height as f32
    }
}

/// Unit vector from the camera toward its target.
pub fn camera_forward() -> Vec3 {
    (CAMERA_TARGET - CAMERA_POSITION).normalize()
}

/// Euler angles (radians, applied Z * Y * X) that aim a node's +Z axis from
/// `from` toward `to`. Used to face the overlay text at the camera.
pub fn look_at_rotation(from: Vec3, to: Vec3) -> Vec3 {
    let dir = (to - from).normalize_or_zero();
    let pitch = -dir.y.asin();
    let yaw = dir.x.atan2(dir.z);
    Vec3::new(pitch, yaw, 0.0)
}

/// View-projection for the scene's fixed camera at the given aspect ratio.
pub fn camera_params(aspect: f32) -> CameraParams {
    let view = Mat4::look_at_rh(CAMERA_POSITION, CAMERA_TARGET, Vec3::Y);
    let projection = Mat4::perspective_rh_gl(
        CAMERA_FOV_DEG.to_radians(),
        aspect.max(0.01),
        CAMERA_NEAR,
        CAMERA_FAR,
    );
    CameraParams {
        view_proj: projection * view,
        position: CAMERA_POSITION,
    }
}

pub fn light_params() -> LightParams {
    LightParams {
        position: LIGHT_POSITION,
        color: Vec3::ONE,
        intensity: 1.0,
    }
}
