//! Window host abstraction
//!
//! The renderer never touches the windowing system directly. Swapchain
//! recreation asks the host for the current framebuffer size and, while the
//! window is minimized, blocks on the host's event queue until it is restored.

/// Callbacks the renderer needs from whoever owns the window
pub trait WindowHost {
    /// Current framebuffer size in pixels (`(0, 0)` while minimized)
    fn framebuffer_extent(&self) -> (u32, u32);

    /// Block until at least one window event was processed
    fn wait_events(&mut self);
}

/// Host with a fixed extent, for offscreen callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedExtentHost {
    pub width: u32,
    pub height: u32,
}

impl WindowHost for FixedExtentHost {
    fn framebuffer_extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn wait_events(&mut self) {}
}

/// True when the extent has no drawable area
pub fn is_degenerate_extent((width, height): (u32, u32)) -> bool {
    width == 0 || height == 0
}
