//! Swapchain recreation while the window reports a 0x0 framebuffer
//!
//! Run with: cargo test -p umbra_renderer_vulkan --test minimize_tests -- --ignored

mod common;

use common::{compiled_shaders, create_test_window, MinimizedHost, TEST_HEIGHT, TEST_WIDTH};
use umbra_engine::glam::Vec3;
use umbra_engine::umbra::asset::{MeshData, TextureData};
use umbra_engine::umbra::camera::CameraTransform;
use umbra_engine::umbra::config::RendererConfig;
use umbra_engine::umbra::ScratchArena;
use umbra_renderer_vulkan::umbra::{FrameOutcome, SceneAssets, VulkanRenderer};

#[test]
#[ignore] // Requires GPU
fn test_recreation_waits_out_minimization() {
    let Some(shaders) = compiled_shaders() else { return };

    let (window, _event_loop) = create_test_window();
    let mut arena = ScratchArena::new().unwrap();
    let mesh = MeshData::quad(1.0);
    let texture = TextureData::solid(2, 2, [255, 255, 255, 255]).unwrap();

    let mut renderer = VulkanRenderer::new(
        &window,
        (TEST_WIDTH, TEST_HEIGHT),
        &RendererConfig::default(),
        &mut arena,
        SceneAssets { mesh: &mesh, albedo: &texture, normal: &texture, shaders },
    )
    .unwrap();

    let image_count = renderer.swapchain_image_count();
    let mut host = MinimizedHost { extent: (TEST_WIDTH, TEST_HEIGHT), zero_pumps_left: 3, pumps: 0 };
    renderer.recreate_swapchain(&mut host).unwrap();

    assert_eq!(host.pumps, 3);
    assert_eq!(renderer.swapchain_image_count(), image_count);
    assert_eq!(renderer.color_pass().framebuffer_count(), image_count);
    let extent = renderer.swapchain_extent();
    assert!(extent.width > 0 && extent.height > 0);

    let camera = CameraTransform::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, 4.0 / 3.0);
    let frames_before = renderer.frame_count();
    let outcome = renderer.draw_frame(&mut host, &camera).unwrap();
    if outcome == FrameOutcome::Presented {
        assert_eq!(renderer.frame_count(), frames_before + 1);
    }
}
