use super::*;

const COLOR: vk::Format = vk::Format::B8G8R8A8_SRGB;
const DEPTH: vk::Format = vk::Format::D32_SFLOAT;

#[test]
fn test_msaa_pass_has_three_attachments() {
    let attachments = color_pass_attachments(vk::SampleCountFlags::TYPE_4, COLOR, DEPTH);
    assert_eq!(attachments.len(), 3);

    let (msaa, depth, resolve) = (&attachments[0], &attachments[1], &attachments[2]);
    assert_eq!(msaa.samples, vk::SampleCountFlags::TYPE_4);
    assert_eq!(msaa.load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(msaa.store_op, vk::AttachmentStoreOp::DONT_CARE);

    assert_eq!(depth.format, DEPTH);
    assert_eq!(depth.samples, vk::SampleCountFlags::TYPE_4);
    assert_eq!(depth.load_op, vk::AttachmentLoadOp::CLEAR);

    assert_eq!(resolve.samples, vk::SampleCountFlags::TYPE_1);
    assert_eq!(resolve.store_op, vk::AttachmentStoreOp::STORE);
    assert_eq!(resolve.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
}

#[test]
fn test_single_sample_pass_renders_into_swapchain() {
    let attachments = color_pass_attachments(vk::SampleCountFlags::TYPE_1, COLOR, DEPTH);
    assert_eq!(attachments.len(), 2);
    assert_eq!(attachments[0].format, COLOR);
    assert_eq!(attachments[0].load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(attachments[0].store_op, vk::AttachmentStoreOp::STORE);
    assert_eq!(attachments[0].final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    assert_eq!(attachments[1].format, DEPTH);
}

#[test]
fn test_clear_values_black_and_far() {
    let values = clear_values(3);
    assert_eq!(values.len(), 3);
    unsafe {
        assert_eq!(values[0].color.float32, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(values[1].depth_stencil.depth, 1.0);
        assert_eq!(values[2].color.float32, [0.0, 0.0, 0.0, 1.0]);
    }
    assert_eq!(clear_values(2).len(), 2);
}
