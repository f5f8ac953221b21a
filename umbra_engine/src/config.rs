//! Compile-time configuration
//!
//! Umbra has no configuration files: every tunable is a constant here, and the
//! few runtime switches live in [`RendererConfig`].

/// Initial window width in pixels
pub const WINDOW_WIDTH: u32 = 1280;

/// Initial window height in pixels
pub const WINDOW_HEIGHT: u32 = 720;

/// Window title
pub const WINDOW_TITLE: &str = "Umbra";

/// Shadow map resolution (square)
pub const SHADOW_MAP_SIZE: u32 = 512;

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Highest MSAA sample count ever requested
pub const MAX_MSAA_SAMPLES: u32 = 8;

/// Scratch arena capacity in bytes
pub const SCRATCH_ARENA_CAPACITY: usize = 32 * 1024 * 1024;

/// Shader bytecode is padded to this many bytes before pipeline creation
pub const SHADER_CODE_ALIGNMENT: usize = 32;

/// Push constant ceiling guaranteed by every Vulkan implementation we target
pub const MAX_PUSH_CONSTANT_SIZE: u32 = 256;

/// Mesh asset path (glTF)
pub const MESH_PATH: &str = "assets/scene.gltf";

/// Base color texture path
pub const ALBEDO_TEXTURE_PATH: &str = "assets/albedo.png";

/// Normal map texture path
pub const NORMAL_TEXTURE_PATH: &str = "assets/normal.png";

/// Compiled shader paths (SPIR-V)
pub const SHADOW_VERTEX_SHADER_PATH: &str = "shaders/shadow.vert.spv";
pub const SCENE_VERTEX_SHADER_PATH: &str = "shaders/scene.vert.spv";
pub const SCENE_FRAGMENT_SHADER_PATH: &str = "shaders/scene.frag.spv";

/// How chatty the validation layers are allowed to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Runtime renderer switches
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name reported to the driver
    pub app_name: String,

    /// Enable VK_LAYER_KHRONOS_validation (only honored with the `vulkan-validation` feature)
    pub enable_validation: bool,

    /// Severity filter for validation messages
    pub debug_severity: DebugSeverity,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: WINDOW_TITLE.to_string(),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
        }
    }
}
