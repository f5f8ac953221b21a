/*!
# Umbra Engine

Backend-independent half of the Umbra renderer: a shadow-mapped, MSAA forward
renderer that draws one textured mesh lit by one directional light.

## Contents

- **ScratchArena**: fixed-capacity bump allocator for transient byte buffers
- **Assets**: glTF mesh validation, RGBA8 textures with mip math, SPIR-V loading
- **Camera**: camera and light transforms plus the push-constant layouts
- **WindowHost**: the two callbacks the renderer needs from the windowing layer
- **Logging / errors**: the `engine_*` macros and the shared `Error` type

The Vulkan backend lives in `umbra_renderer_vulkan`.
*/

// Internal modules
mod error;
pub mod arena;
pub mod asset;
pub mod camera;
pub mod config;
pub mod host;
pub mod log;

// Main umbra namespace module
pub mod umbra {
    // Error types
    pub use crate::error::{Error, Result};

    // Scratch memory
    pub use crate::arena::{ArenaMark, ScratchArena};

    // Window host
    pub use crate::host::{FixedExtentHost, WindowHost};

    // Logging sub-module (macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{log, log_detailed, reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Asset sub-module
    pub mod asset {
        pub use crate::asset::*;
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Configuration sub-module
    pub mod config {
        pub use crate::config::*;
    }
}

// Re-export math library at crate root
pub use glam;
