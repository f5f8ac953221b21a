//! End-to-end frame: shadow pass, color pass, present and read back
//!
//! Run with: cargo test -p umbra_renderer_vulkan --test frame_tests -- --ignored
//! (add `--features vulkan-validation` to also assert a clean validation log)

mod common;

use common::{compiled_shaders, create_test_window, TestHost, TEST_HEIGHT, TEST_WIDTH};
use umbra_engine::glam::Vec3;
use umbra_engine::umbra::asset::{assemble_mesh, MeshData, RawAttribute, RawMesh, RawPrimitive, TextureData};
use umbra_engine::umbra::camera::{aspect_ratio, CameraTransform};
use umbra_engine::umbra::config::RendererConfig;
use umbra_engine::umbra::ScratchArena;
use umbra_renderer_vulkan::ash::vk;
use umbra_renderer_vulkan::umbra::{FrameOutcome, SceneAssets, VulkanRenderer};

/// Ground quad at z = 0 plus a small occluder one unit above it, placed so
/// its shadow (the light travels along -(4, 8, 6)) lands on the origin.
fn ground_with_occluder() -> MeshData {
    let quad = |center: [f32; 3], h: f32| {
        let [x, y, z] = center;
        [[x - h, y - h, z], [x + h, y - h, z], [x + h, y + h, z], [x - h, y + h, z]]
    };
    let mut positions = quad([0.0, 0.0, 0.0], 1.5).to_vec();
    positions.extend(quad([2.0 / 3.0, 4.0 / 3.0, 1.0], 0.3));

    let primitive = RawPrimitive {
        attributes: vec![
            RawAttribute::Position(positions),
            RawAttribute::Normal(vec![[0.0, 0.0, 1.0]; 8]),
            RawAttribute::Tangent(vec![[1.0, 0.0, 0.0, 1.0]; 8]),
            RawAttribute::TexCoord(vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]].repeat(2)),
        ],
        indices: Some(vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]),
        triangles: true,
    };
    assemble_mesh(vec![RawMesh { primitives: vec![primitive] }]).unwrap()
}

/// Pixel of the world point `(x, y, 0)` seen from (0, 0, 3) with the default
/// 45 degree vertical field of view
fn ground_pixel(x: f32, y: f32, width: u32, height: u32) -> (u32, u32) {
    let half_height = 3.0 * (std::f32::consts::FRAC_PI_8).tan();
    let half_width = half_height * width as f32 / height as f32;
    let px = (0.5 + 0.5 * x / half_width) * width as f32;
    let py = (0.5 - 0.5 * y / half_height) * height as f32;
    (px as u32, py as u32)
}

fn assert_near(actual: [u8; 4], expected: [u8; 3], what: &str) {
    for channel in 0..3 {
        let delta = (actual[channel] as i32 - expected[channel] as i32).abs();
        assert!(delta <= 12, "{}: expected about {:?}, got {:?}", what, expected, &actual[..3]);
    }
}

#[test]
#[ignore] // Requires GPU
fn test_shadowed_scene_reaches_the_swapchain() {
    let Some(shaders) = compiled_shaders() else { return };

    let (window, mut event_loop) = create_test_window();
    let mut arena = ScratchArena::new().unwrap();
    let mesh = ground_with_occluder();
    let albedo = TextureData::solid(4, 4, [200, 120, 40, 255]).unwrap();
    let normal = TextureData::solid(4, 4, [128, 128, 255, 255]).unwrap();

    let used_before = arena.used();
    let mut renderer = VulkanRenderer::new(
        &window,
        (TEST_WIDTH, TEST_HEIGHT),
        &RendererConfig::default(),
        &mut arena,
        SceneAssets { mesh: &mesh, albedo: &albedo, normal: &normal, shaders },
    )
    .unwrap();
    assert_eq!(arena.used(), used_before);
    assert!(renderer.shadow_pass().is_drawn());
    assert_eq!(renderer.color_pass().framebuffer_count(), renderer.swapchain_image_count());

    let extent = renderer.swapchain_extent();
    let camera = CameraTransform::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, aspect_ratio(extent.width, extent.height));
    let mut host = TestHost { window: &window, event_loop: &mut event_loop };

    // Cycle every frame slot at least once before reading back
    for _ in 0..3 {
        let outcome = renderer.draw_frame(&mut host, &camera).unwrap();
        assert!(matches!(outcome, FrameOutcome::Presented | FrameOutcome::Skipped));
    }

    let Some(frame) = renderer.capture_frame(&mut host, &camera).unwrap() else {
        eprintln!("Skipping readback: swapchain does not support TRANSFER_SRC");
        return;
    };
    assert_eq!((frame.width, frame.height), (extent.width, extent.height));

    // Albedo (200, 120, 40) lit by ambient 0.15 plus diffuse 6 / sqrt(116),
    // faded by about 3% at three units from the eye, then sRGB encoded
    let (lit_x, lit_y) = ground_pixel(-0.75, -0.75, frame.width, frame.height);
    let lit = frame.rgba(lit_x, lit_y).unwrap();
    // The origin sits in the occluder's shadow and only gets ambient light
    let shadowed = frame.rgba(frame.width / 2, frame.height / 2).unwrap();

    if matches!(frame.format, vk::Format::B8G8R8A8_SRGB | vk::Format::R8G8B8A8_SRGB) {
        assert_near(lit, [169, 100, 32], "lit ground");
        assert_near(shadowed, [82, 46, 10], "shadowed ground");
    }
    assert!(
        shadowed[0] < lit[0] && shadowed[1] < lit[1],
        "shadowed {:?} should be darker than lit {:?}",
        &shadowed[..3],
        &lit[..3]
    );

    // Corners fall outside the ground quad and keep the clear color
    assert_eq!(frame.rgba(0, 0).unwrap()[..3], [0, 0, 0]);

    #[cfg(feature = "vulkan-validation")]
    {
        let stats = umbra_renderer_vulkan::umbra::get_validation_stats();
        assert_eq!(stats.errors, 0, "validation reported errors");
    }
}
