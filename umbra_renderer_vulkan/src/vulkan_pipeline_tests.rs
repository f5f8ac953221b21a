use super::*;

fn image_binding() -> DescriptorBinding {
    DescriptorBinding::sampled_image(vk::ShaderStageFlags::FRAGMENT, vk::ImageView::null(), vk::Sampler::null())
}

#[test]
fn test_attribute_location_is_index() {
    let attributes = [
        VertexAttribute { binding: 0, format: vk::Format::R32G32B32_SFLOAT, offset: 0 },
        VertexAttribute { binding: 1, format: vk::Format::R32G32B32_SFLOAT, offset: 0 },
        VertexAttribute { binding: 1, format: vk::Format::R32G32B32A32_SFLOAT, offset: 12 },
        VertexAttribute { binding: 1, format: vk::Format::R32G32_SFLOAT, offset: 28 },
    ];
    let descriptions = vertex_attribute_descriptions(&attributes);

    assert_eq!(descriptions.len(), 4);
    for (i, description) in descriptions.iter().enumerate() {
        assert_eq!(description.location, i as u32);
        assert_eq!(description.binding, attributes[i].binding);
        assert_eq!(description.offset, attributes[i].offset);
    }
}

#[test]
fn test_binding_takes_matching_stride() {
    let bindings = vertex_binding_descriptions(&[12, 36]);
    assert_eq!(bindings.len(), 2);
    assert_eq!((bindings[0].binding, bindings[0].stride), (0, 12));
    assert_eq!((bindings[1].binding, bindings[1].stride), (1, 36));
    assert!(bindings.iter().all(|b| b.input_rate == vk::VertexInputRate::VERTEX));
}

#[test]
fn test_pool_sized_to_binding_count() {
    let bindings = [
        image_binding(),
        image_binding(),
        DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX, vk::Buffer::null()),
        image_binding(),
    ];
    let sizes = descriptor_pool_sizes(&bindings);

    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[0].ty, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
    assert_eq!(sizes[0].descriptor_count, 3);
    assert_eq!(sizes[1].ty, vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(sizes[1].descriptor_count, 1);

    let total: u32 = sizes.iter().map(|s| s.descriptor_count).sum();
    assert_eq!(total as usize, bindings.len());
}

#[test]
fn test_no_bindings_no_pool_sizes() {
    assert!(descriptor_pool_sizes(&[]).is_empty());
}

#[test]
fn test_bound_resource_kinds() {
    match image_binding().resource {
        BoundResource::Image(info) => assert_eq!(info.image_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        BoundResource::Buffer(_) => panic!("expected image resource"),
    }
    match DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX, vk::Buffer::null()).resource {
        BoundResource::Buffer(info) => assert_eq!(info.range, vk::WHOLE_SIZE),
        BoundResource::Image(_) => panic!("expected buffer resource"),
    }
}

#[test]
fn test_push_constant_checks() {
    assert!(check_push_constant_size(192, Some(192)).is_ok());
    assert!(check_push_constant_size(192, Some(64)).is_ok());
    assert!(check_push_constant_size(64, None).is_ok());
    assert!(check_push_constant_size(0, None).is_ok());

    assert!(matches!(check_push_constant_size(64, Some(128)), Err(Error::InvalidResource(_))));
    assert!(matches!(
        check_push_constant_size(MAX_PUSH_CONSTANT_SIZE + 4, None),
        Err(Error::InvalidResource(_))
    ));
}
