/// Samplers used by the color pass
///
/// Only two are ever needed: an anisotropic trilinear sampler for the
/// material textures and a depth-compare sampler for the shadow map.

use umbra_engine::umbra::Result;
use umbra_engine::engine_err;
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Sampler flavors the renderer creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    /// Trilinear, repeat, anisotropic
    Material,
    /// `LESS_OR_EQUAL` compare, clamp to an opaque white border
    Shadow,
}

/// Create info for `kind`; anisotropy is capped at `max_anisotropy`
pub fn sampler_create_info(kind: SamplerKind, max_anisotropy: f32) -> vk::SamplerCreateInfo<'static> {
    let (filter, mipmap, address, anisotropy, border, compare) = match kind {
        SamplerKind::Material => (
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::LINEAR,
            vk::SamplerAddressMode::REPEAT,
            Some(max_anisotropy.min(16.0)),
            vk::BorderColor::FLOAT_OPAQUE_BLACK,
            false,
        ),
        SamplerKind::Shadow => (
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::NEAREST,
            vk::SamplerAddressMode::CLAMP_TO_BORDER,
            None,
            vk::BorderColor::FLOAT_OPAQUE_WHITE,
            true,
        ),
    };

    let mut create_info = vk::SamplerCreateInfo::default()
        .mag_filter(filter)
        .min_filter(filter)
        .mipmap_mode(mipmap)
        .address_mode_u(address)
        .address_mode_v(address)
        .address_mode_w(address)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .border_color(border)
        .unnormalized_coordinates(false);

    if compare {
        create_info = create_info
            .compare_enable(true)
            .compare_op(vk::CompareOp::LESS_OR_EQUAL);
    } else {
        create_info = create_info
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS);
    }

    if let Some(max_aniso) = anisotropy {
        create_info = create_info
            .anisotropy_enable(true)
            .max_anisotropy(max_aniso);
    } else {
        create_info = create_info
            .anisotropy_enable(false)
            .max_anisotropy(1.0);
    }

    create_info
}

/// Owned VkSampler
pub struct Sampler {
    ctx: Arc<GpuContext>,
    sampler: vk::Sampler,
}

impl Sampler {
    pub fn new(ctx: Arc<GpuContext>, kind: SamplerKind) -> Result<Self> {
        let create_info = sampler_create_info(kind, ctx.adapter.max_anisotropy);
        let sampler = unsafe {
            ctx.device
                .create_sampler(&create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create {:?} sampler: {:?}", kind, e))?
        };
        Ok(Self { ctx, sampler })
    }

    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_sampler(self.sampler, None) };
    }
}

#[cfg(test)]
#[path = "vulkan_sampler_tests.rs"]
mod tests;
