//! Umbra demo: one shadowed, textured mesh and a fly camera.
//!
//! Controls: WASD to move, Space/LeftShift up/down, arrow keys to look,
//! Escape to quit. Assets and compiled shaders are read from the paths in
//! `umbra_engine::config`, relative to the working directory.

mod fly_camera;

use std::process::ExitCode;
use std::time::{Duration, Instant};

use glam::Vec3;
use umbra_engine::umbra::asset::{load_mesh, load_texture};
use umbra_engine::umbra::camera::aspect_ratio;
use umbra_engine::umbra::config::{
    RendererConfig, ALBEDO_TEXTURE_PATH, MESH_PATH, NORMAL_TEXTURE_PATH, WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH,
};
use umbra_engine::umbra::{Error, Result, ScratchArena, WindowHost};
use umbra_engine::{engine_error, engine_info};
use umbra_renderer_vulkan::umbra::{SceneAssets, ShaderPaths};
use umbra_renderer_vulkan::VulkanRenderer;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use fly_camera::{FlyCamera, FlyInput};

/// Keyboard state and window flags collected from the event pump
#[derive(Default)]
struct InputState {
    held: Vec<KeyCode>,
    resized: bool,
    close_requested: bool,
}

impl InputState {
    fn axis(&self, positive: KeyCode, negative: KeyCode) -> f32 {
        let mut value = 0.0;
        if self.held.contains(&positive) {
            value += 1.0;
        }
        if self.held.contains(&negative) {
            value -= 1.0;
        }
        value
    }

    fn fly_input(&self) -> FlyInput {
        FlyInput {
            forward: self.axis(KeyCode::KeyW, KeyCode::KeyS),
            right: self.axis(KeyCode::KeyD, KeyCode::KeyA),
            up: self.axis(KeyCode::Space, KeyCode::ShiftLeft),
            yaw: self.axis(KeyCode::ArrowRight, KeyCode::ArrowLeft),
            pitch: self.axis(KeyCode::ArrowUp, KeyCode::ArrowDown),
        }
    }

    fn key(&mut self, code: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed if !self.held.contains(&code) => self.held.push(code),
            ElementState::Released => self.held.retain(|held| *held != code),
            _ => {}
        }
    }
}

impl ApplicationHandler for InputState {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::Resized(_) => self.resized = true,
            WindowEvent::Focused(false) => self.held.clear(),
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state, .. },
                ..
            } => {
                if code == KeyCode::Escape {
                    self.close_requested = true;
                } else {
                    self.key(code, state);
                }
            }
            _ => {}
        }
    }
}

/// The renderer's view of the window: size queries and a blocking pump
struct DemoHost<'a> {
    window: &'a Window,
    event_loop: &'a mut EventLoop<()>,
    input: &'a mut InputState,
}

impl WindowHost for DemoHost<'_> {
    fn framebuffer_extent(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn wait_events(&mut self) {
        if let PumpStatus::Exit(_) = self.event_loop.pump_app_events(None, &mut *self.input) {
            self.input.close_requested = true;
        }
    }
}

#[allow(deprecated)]
fn create_window(event_loop: &EventLoop<()>) -> Result<Window> {
    let attributes = Window::default_attributes()
        .with_title(WINDOW_TITLE)
        .with_inner_size(PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
    event_loop
        .create_window(attributes)
        .map_err(|e| Error::InitializationFailed(format!("Failed to create window: {}", e)))
}

fn run() -> Result<()> {
    let mut event_loop =
        EventLoop::new().map_err(|e| Error::InitializationFailed(format!("Failed to create event loop: {}", e)))?;
    let window = create_window(&event_loop)?;

    let mesh = load_mesh(MESH_PATH)?;
    let albedo = load_texture(ALBEDO_TEXTURE_PATH)?;
    let normal = load_texture(NORMAL_TEXTURE_PATH)?;

    let mut arena = ScratchArena::new()?;
    let size = window.inner_size();
    let mut renderer = VulkanRenderer::new(
        &window,
        (size.width, size.height),
        &RendererConfig::default(),
        &mut arena,
        SceneAssets { mesh: &mesh, albedo: &albedo, normal: &normal, shaders: ShaderPaths::default() },
    )?;

    let mut input = InputState::default();
    let mut camera = FlyCamera::new(Vec3::new(0.0, 1.0, 4.0));
    let mut last_frame = Instant::now();

    while !input.close_requested {
        if let PumpStatus::Exit(_) = event_loop.pump_app_events(Some(Duration::ZERO), &mut input) {
            break;
        }
        if std::mem::take(&mut input.resized) {
            renderer.notify_resized();
        }

        let now = Instant::now();
        let dt = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;
        camera.update(input.fly_input(), dt);

        let extent = renderer.swapchain_extent();
        let transform = camera.transform(aspect_ratio(extent.width, extent.height));
        let mut host = DemoHost { window: &window, event_loop: &mut event_loop, input: &mut input };
        renderer.draw_frame(&mut host, &transform)?;
    }

    engine_info!("umbra::demo", "Exiting after {} frame(s)", renderer.frame_count());
    Ok(())
}

fn main() -> ExitCode {
    let result = run();

    #[cfg(feature = "vulkan-validation")]
    umbra_renderer_vulkan::umbra::print_validation_stats_report();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            engine_error!("umbra::demo", "{}", e);
            ExitCode::FAILURE
        }
    }
}
