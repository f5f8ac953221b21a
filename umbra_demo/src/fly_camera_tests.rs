use super::*;

const EPSILON: f32 = 1e-5;

#[test]
fn test_default_orientation_looks_down_negative_z() {
    let camera = FlyCamera::new(Vec3::ZERO);
    assert!(camera.forward().abs_diff_eq(Vec3::NEG_Z, EPSILON));
    assert!(camera.right().abs_diff_eq(Vec3::X, EPSILON));
}

#[test]
fn test_forward_motion_scales_with_time() {
    let mut camera = FlyCamera::new(Vec3::ZERO);
    camera.update(FlyInput { forward: 1.0, ..Default::default() }, 2.0);
    assert!(camera.position.abs_diff_eq(Vec3::new(0.0, 0.0, -2.0 * MOVE_SPEED), EPSILON));
}

#[test]
fn test_diagonal_motion_is_not_faster() {
    let mut camera = FlyCamera::new(Vec3::ZERO);
    camera.update(FlyInput { forward: 1.0, right: 1.0, ..Default::default() }, 1.0);
    assert!((camera.position.length() - MOVE_SPEED).abs() < EPSILON);
}

#[test]
fn test_pitch_is_clamped() {
    let mut camera = FlyCamera::new(Vec3::ZERO);
    camera.update(FlyInput { pitch: 1.0, ..Default::default() }, 100.0);
    assert_eq!(camera.pitch, PITCH_LIMIT);
    camera.update(FlyInput { pitch: -1.0, ..Default::default() }, 1000.0);
    assert_eq!(camera.pitch, -PITCH_LIMIT);
}

#[test]
fn test_idle_input_leaves_camera_unchanged() {
    let mut camera = FlyCamera::new(Vec3::new(1.0, 2.0, 3.0));
    let before = camera;
    camera.update(FlyInput::default(), 0.5);
    assert_eq!(camera, before);
}

#[test]
fn test_transform_maps_eye_to_view_origin() {
    let mut camera = FlyCamera::new(Vec3::new(0.0, 1.0, 4.0));
    camera.yaw = 0.7;
    let transform = camera.transform(16.0 / 9.0);
    assert_eq!(transform.position, camera.position);
    assert!(transform.view.transform_point3(camera.position).abs_diff_eq(Vec3::ZERO, EPSILON));

    // A point straight ahead lands on the view's -Z axis
    let ahead = transform.view.transform_point3(camera.position + camera.forward() * 5.0);
    assert!(ahead.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-4));
}
