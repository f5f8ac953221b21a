/// Shader modules and SPIR-V push-constant reflection

use umbra_engine::umbra::asset::ShaderCode;
use umbra_engine::umbra::Result;
use umbra_engine::engine_err;
use ash::vk;

/// Shader module alive for the duration of pipeline construction
pub(crate) struct ShaderModule<'a> {
    device: &'a ash::Device,
    pub(crate) module: vk::ShaderModule,
}

impl<'a> ShaderModule<'a> {
    pub(crate) fn new(device: &'a ash::Device, code: &ShaderCode) -> Result<Self> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(code.words());
        let module = unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create shader module: {:?}", e))?
        };
        Ok(Self { device, module })
    }
}

impl Drop for ShaderModule<'_> {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Largest push-constant block declared by any entry point of `code`, in bytes.
///
/// `None` when the module declares no push constants.
pub fn reflect_push_constant_size(code: &ShaderCode) -> Result<Option<u32>> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code.words())
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!("umbra::vulkan", "SPIR-V reflection failed: {:?}", e))?;

    let mut size = None;
    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            if let spirq::var::Variable::PushConstant { ty, .. } = var {
                let nbyte = ty.nbyte().unwrap_or(0) as u32;
                size = Some(size.map_or(nbyte, |current: u32| current.max(nbyte)));
            }
        }
    }
    Ok(size)
}
