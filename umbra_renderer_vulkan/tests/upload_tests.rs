//! Staging upload round trips on a real device
//!
//! Run with: cargo test -p umbra_renderer_vulkan --test upload_tests -- --ignored

mod common;

use std::sync::Arc;

use common::create_test_window;
use umbra_engine::umbra::asset::{MeshData, TextureData};
use umbra_engine::umbra::config::RendererConfig;
use umbra_renderer_vulkan::ash::vk;
use umbra_renderer_vulkan::umbra::{read_buffer, UploadBatch, VulkanDevice};

#[test]
#[ignore] // Requires GPU
fn test_upload_is_deterministic() {
    let (window, _event_loop) = create_test_window();
    let size = window.inner_size();
    let device = VulkanDevice::initialize(&window, (size.width, size.height), &RendererConfig::default()).unwrap();
    let ctx = Arc::clone(device.context());

    let mesh = MeshData::quad(0.5);
    let texture = TextureData::solid(16, 8, [10, 20, 30, 255]).unwrap();

    let mut batch = UploadBatch::begin(Arc::clone(&ctx)).unwrap();
    let first = batch.buffer(mesh.position_bytes(), vk::BufferUsageFlags::VERTEX_BUFFER, "first").unwrap();
    let second = batch.buffer(mesh.position_bytes(), vk::BufferUsageFlags::VERTEX_BUFFER, "second").unwrap();
    let indices = batch.buffer(mesh.index_bytes(), vk::BufferUsageFlags::INDEX_BUFFER, "indices").unwrap();
    let image = batch.texture(&texture, "texture").unwrap();
    assert_eq!(batch.pending(), 4);
    batch.finish().unwrap();

    let first_bytes = read_buffer(&ctx, &first).unwrap();
    let second_bytes = read_buffer(&ctx, &second).unwrap();
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(first_bytes, mesh.position_bytes());
    assert_eq!(read_buffer(&ctx, &indices).unwrap(), mesh.index_bytes());

    assert_eq!(image.mip_levels(), 5);
    assert_eq!((image.extent().width, image.extent().height), (16, 8));

    // A batch dropped before submission releases its staging buffers
    let mut abandoned = UploadBatch::begin(Arc::clone(&ctx)).unwrap();
    let _unused = abandoned.buffer(&[1, 2, 3, 4], vk::BufferUsageFlags::VERTEX_BUFFER, "abandoned").unwrap();
    drop(abandoned);
    ctx.wait_idle().unwrap();
}

