#![allow(dead_code)]
//! GPU test utilities - hidden test window and window hosts
//!
//! winit allows one event loop per process, so every GPU test file holds a
//! single test and creates its window through [`create_test_window`].

use std::path::PathBuf;
use std::time::Duration;

use umbra_engine::umbra::WindowHost;
use umbra_renderer_vulkan::umbra::ShaderPaths;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::window::{Window, WindowId};

#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;
#[cfg(target_os = "linux")]
use winit::platform::x11::EventLoopBuilderExtX11;

pub const TEST_WIDTH: u32 = 320;
pub const TEST_HEIGHT: u32 = 240;

/// Create a hidden window whose event loop may live off the main thread
#[allow(deprecated)]
pub fn create_test_window() -> (Window, EventLoop<()>) {
    let mut builder = EventLoop::builder();
    #[cfg(any(target_os = "windows", target_os = "linux"))]
    builder.with_any_thread(true);
    let event_loop = builder.build().unwrap();

    let window_attrs = Window::default_attributes()
        .with_title("Umbra GPU Test")
        .with_inner_size(winit::dpi::PhysicalSize::new(TEST_WIDTH, TEST_HEIGHT))
        .with_visible(false);

    let window = event_loop.create_window(window_attrs).unwrap();
    (window, event_loop)
}

struct Drain;

impl ApplicationHandler for Drain {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _window_id: WindowId, _event: WindowEvent) {}
}

/// Host backed by the real test window
pub struct TestHost<'a> {
    pub window: &'a Window,
    pub event_loop: &'a mut EventLoop<()>,
}

impl WindowHost for TestHost<'_> {
    fn framebuffer_extent(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn wait_events(&mut self) {
        let _ = self.event_loop.pump_app_events(Some(Duration::from_millis(5)), &mut Drain);
    }
}

/// Host that reports a 0x0 framebuffer for a number of pumps, then `extent`
pub struct MinimizedHost {
    pub extent: (u32, u32),
    pub zero_pumps_left: u32,
    pub pumps: u32,
}

impl WindowHost for MinimizedHost {
    fn framebuffer_extent(&self) -> (u32, u32) {
        if self.zero_pumps_left > 0 { (0, 0) } else { self.extent }
    }

    fn wait_events(&mut self) {
        self.pumps += 1;
        self.zero_pumps_left = self.zero_pumps_left.saturating_sub(1);
    }
}

/// Compiled scene shaders, or `None` if they have not been built
pub fn compiled_shaders() -> Option<ShaderPaths> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../shaders");
    let paths = ShaderPaths {
        shadow_vertex: dir.join("shadow.vert.spv"),
        scene_vertex: dir.join("scene.vert.spv"),
        scene_fragment: dir.join("scene.frag.spv"),
    };
    let present = [&paths.shadow_vertex, &paths.scene_vertex, &paths.scene_fragment]
        .iter()
        .all(|path| path.is_file());
    if present {
        Some(paths)
    } else {
        eprintln!("Skipping: compile shaders/*.vert and shaders/*.frag to SPIR-V first (see shaders/README.md)");
        None
    }
}
