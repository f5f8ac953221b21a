/// Camera transform handed to the renderer each frame.
///
/// The renderer computes nothing from it except the MVP product; the host
/// (fly controller in the demo, fixed pose in tests) owns position and
/// orientation and rebuilds the matrices whenever they change.

use glam::{Mat4, Vec3};

/// Vertical field of view used by [`CameraTransform::look_at`]
pub const DEFAULT_FOV_Y: f32 = std::f32::consts::FRAC_PI_4;

pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 100.0;

/// View and projection for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

impl CameraTransform {
    pub fn new(view: Mat4, projection: Mat4, position: Vec3) -> Self {
        Self { view, projection, position }
    }

    /// Camera at `eye` looking at `target`, Y up, default perspective
    pub fn look_at(eye: Vec3, target: Vec3, aspect: f32) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: vulkan_perspective(DEFAULT_FOV_Y, aspect, DEFAULT_NEAR, DEFAULT_FAR),
            position: eye,
        }
    }

    /// projection * view
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// projection * view * model
    pub fn mvp(&self, model: Mat4) -> Mat4 {
        self.view_projection() * model
    }

    /// Rebuild the projection for a new aspect ratio (after a resize)
    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection = vulkan_perspective(DEFAULT_FOV_Y, aspect, DEFAULT_NEAR, DEFAULT_FAR);
    }
}

/// Right-handed perspective with Vulkan clip conventions (depth 0..1, Y down)
pub fn vulkan_perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let mut projection = Mat4::perspective_rh(fov_y, aspect.max(f32::EPSILON), near, far);
    projection.y_axis.y *= -1.0;
    projection
}

/// Aspect ratio of an extent, 1.0 for degenerate heights
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
