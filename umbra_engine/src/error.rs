//! Error types for the Umbra renderer
//!
//! This module defines the error types used throughout the renderer,
//! covering setup, asset loading, scratch memory and per-frame failures.

use std::fmt;

/// Result type for Umbra operations
pub type Result<T> = std::result::Result<T, Error>;

/// Umbra errors
///
/// Every variant carries a human-readable message; none of them is retried.
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan call failed at setup or during a frame)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, shader, pipeline description, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, adapter, device, swapchain)
    InitializationFailed(String),

    /// Asset could not be loaded or did not have the expected shape
    AssetLoadFailed(String),

    /// Scratch arena capacity exceeded
    ArenaExhausted { requested: usize, remaining: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AssetLoadFailed(msg) => write!(f, "Asset load failed: {}", msg),
            Error::ArenaExhausted { requested, remaining } => write!(
                f,
                "Scratch arena exhausted: requested {} bytes, {} remaining",
                requested, remaining
            ),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
