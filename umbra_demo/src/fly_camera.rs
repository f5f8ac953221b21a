//! Free-fly camera driven by the keyboard

use glam::{Mat4, Vec3};
use umbra_engine::umbra::camera::{vulkan_perspective, CameraTransform, DEFAULT_FAR, DEFAULT_FOV_Y, DEFAULT_NEAR};

/// Units per second
pub const MOVE_SPEED: f32 = 2.5;

/// Radians per second
pub const TURN_SPEED: f32 = 1.5;

/// Pitch stays short of straight up/down so the view basis never degenerates
pub const PITCH_LIMIT: f32 = 89.0_f32 * (std::f32::consts::PI / 180.0);

/// Per-axis input in `-1.0..=1.0`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlyInput {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    /// Rotation about +Y; zero looks down -Z
    pub yaw: f32,
    pub pitch: f32,
}

impl FlyCamera {
    pub fn new(position: Vec3) -> Self {
        Self { position, yaw: 0.0, pitch: 0.0 }
    }

    pub fn forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch)
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Integrate one frame of input over `dt` seconds
    pub fn update(&mut self, input: FlyInput, dt: f32) {
        self.yaw += input.yaw * TURN_SPEED * dt;
        self.pitch = (self.pitch + input.pitch * TURN_SPEED * dt).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let direction = self.forward() * input.forward + self.right() * input.right + Vec3::Y * input.up;
        if direction.length_squared() > 0.0 {
            self.position += direction.normalize() * MOVE_SPEED * dt;
        }
    }

    pub fn transform(&self, aspect: f32) -> CameraTransform {
        CameraTransform::new(
            Mat4::look_to_rh(self.position, self.forward(), Vec3::Y),
            vulkan_perspective(DEFAULT_FOV_Y, aspect, DEFAULT_NEAR, DEFAULT_FAR),
            self.position,
        )
    }
}

#[cfg(test)]
#[path = "fly_camera_tests.rs"]
mod tests;
