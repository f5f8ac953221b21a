use super::*;

#[test]
fn test_material_sampler_is_anisotropic_trilinear() {
    let info = sampler_create_info(SamplerKind::Material, 16.0);
    assert_eq!(info.anisotropy_enable, vk::TRUE);
    assert_eq!(info.max_anisotropy, 16.0);
    assert_eq!(info.min_filter, vk::Filter::LINEAR);
    assert_eq!(info.mipmap_mode, vk::SamplerMipmapMode::LINEAR);
    assert_eq!(info.address_mode_u, vk::SamplerAddressMode::REPEAT);
    assert_eq!(info.compare_enable, vk::FALSE);
}

#[test]
fn test_material_anisotropy_capped_by_adapter() {
    assert_eq!(sampler_create_info(SamplerKind::Material, 4.0).max_anisotropy, 4.0);
    assert_eq!(sampler_create_info(SamplerKind::Material, 64.0).max_anisotropy, 16.0);
}

#[test]
fn test_shadow_sampler_compares() {
    let info = sampler_create_info(SamplerKind::Shadow, 16.0);
    assert_eq!(info.compare_enable, vk::TRUE);
    assert_eq!(info.compare_op, vk::CompareOp::LESS_OR_EQUAL);
    assert_eq!(info.address_mode_u, vk::SamplerAddressMode::CLAMP_TO_BORDER);
    assert_eq!(info.address_mode_v, vk::SamplerAddressMode::CLAMP_TO_BORDER);
    assert_eq!(info.border_color, vk::BorderColor::FLOAT_OPAQUE_WHITE);
    assert_eq!(info.anisotropy_enable, vk::FALSE);
}
