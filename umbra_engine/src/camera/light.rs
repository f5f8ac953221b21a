//! Directional light and the push-constant blocks both passes consume.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Light position; the light looks at the origin
pub const LIGHT_POSITION: Vec3 = Vec3::new(4.0, 8.0, 6.0);

/// Half extent of the light's orthographic volume
pub const LIGHT_HALF_EXTENT: f32 = 6.0;

pub const LIGHT_NEAR: f32 = 0.1;
pub const LIGHT_FAR: f32 = 30.0;

/// Fixed light view-projection (orthographic, Vulkan clip conventions)
pub fn light_view_projection() -> Mat4 {
    let view = Mat4::look_at_rh(LIGHT_POSITION, Vec3::ZERO, Vec3::Y);
    let mut projection = Mat4::orthographic_rh(
        -LIGHT_HALF_EXTENT,
        LIGHT_HALF_EXTENT,
        -LIGHT_HALF_EXTENT,
        LIGHT_HALF_EXTENT,
        LIGHT_NEAR,
        LIGHT_FAR,
    );
    projection.y_axis.y *= -1.0;
    projection * view
}

/// Direction light travels, normalized (used by the fragment shader)
pub fn light_direction() -> Vec3 {
    (-LIGHT_POSITION).normalize()
}

/// Shadow pass push constants (vertex stage)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowPushConstants {
    pub light_mvp: Mat4,
}

impl ShadowPushConstants {
    pub fn new(model: Mat4) -> Self {
        Self { light_mvp: light_view_projection() * model }
    }
}

/// Color pass push constants (vertex stage)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorPushConstants {
    pub mvp: Mat4,
    pub view: Mat4,
    pub light_mvp: Mat4,
}

impl ColorPushConstants {
    pub fn new(camera: &super::CameraTransform, model: Mat4) -> Self {
        Self {
            mvp: camera.mvp(model),
            view: camera.view,
            light_mvp: light_view_projection() * model,
        }
    }
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
