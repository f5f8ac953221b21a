//! Camera and light transforms.

mod camera;
mod light;

pub use camera::{aspect_ratio, vulkan_perspective, CameraTransform, DEFAULT_FAR, DEFAULT_FOV_Y, DEFAULT_NEAR};
pub use light::{
    light_direction, light_view_projection, ColorPushConstants, ShadowPushConstants, LIGHT_POSITION,
};
