use glam::{Mat4, Vec3, Vec4};
use super::*;
use crate::camera::CameraTransform;

#[test]
fn test_push_constant_sizes() {
    assert_eq!(std::mem::size_of::<ShadowPushConstants>(), 64);
    assert_eq!(std::mem::size_of::<ColorPushConstants>(), 192);
    assert!(std::mem::size_of::<ColorPushConstants>() as u32 <= crate::config::MAX_PUSH_CONSTANT_SIZE);
}

#[test]
fn test_origin_is_inside_light_volume() {
    let clip = light_view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    let ndc = clip.truncate() / clip.w;
    assert!(ndc.x.abs() < 1e-4);
    assert!(ndc.y.abs() < 1e-4);
    assert!(ndc.z > 0.0 && ndc.z < 1.0);
}

#[test]
fn test_light_direction_points_at_origin() {
    let dir = light_direction();
    assert!((dir.length() - 1.0).abs() < 1e-5);
    assert!(dir.dot(-LIGHT_POSITION) > 0.0);
}

#[test]
fn test_color_push_constants_layout() {
    let camera = CameraTransform::look_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, 1.0);
    let pc = ColorPushConstants::new(&camera, Mat4::IDENTITY);

    let bytes = bytemuck::bytes_of(&pc);
    let mvp: &[f32] = bytemuck::cast_slice(&bytes[0..64]);
    assert_eq!(mvp, &camera.mvp(Mat4::IDENTITY).to_cols_array()[..]);

    let light: &[f32] = bytemuck::cast_slice(&bytes[128..192]);
    assert_eq!(light, &light_view_projection().to_cols_array()[..]);
}

#[test]
fn test_shadow_push_constants_match_color_light_matrix() {
    let camera = CameraTransform::look_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, 1.0);
    let model = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(
        ShadowPushConstants::new(model).light_mvp,
        ColorPushConstants::new(&camera, model).light_mvp
    );
}
