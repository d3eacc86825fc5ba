//! Application shell: window + event loop, live input state, per-frame
//! orchestration and the shutdown teardown sequence.

use crate::camera::{Camera, CameraInput};
use crate::config::{self, Config};
use crate::core::gfx::TerrainScene;
use crate::core::gfx::context::GlContext;
use crate::core::gfx::renderer::FrameUniforms;
use glam::{Mat3, Mat4, Vec3};
use glow::HasContext;
use log::{error, info};
use std::{error::Error, sync::Arc, time::Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

/// Live key/mouse state, updated by events and queried fresh each frame.
#[derive(Default)]
struct InputState {
    move_forward: bool,
    move_backward: bool,
    move_left: bool,
    move_right: bool,
    /// Wireframe while W is held; a query, not a mode.
    wireframe_held: bool,
    /// Set on S release, consumed by the next frame.
    reload_requested: bool,
    mouse_dx: f32,
    mouse_dy: f32,
}

struct Graphics {
    context: GlContext,
    scene: TerrainScene,
}

pub struct App {
    config: Config,
    window: Option<Arc<Window>>,
    graphics: Option<Graphics>,
    input: InputState,
    camera: Camera,
    last_frame: Instant,
    frame_count: u32,
    last_title_update: Instant,
    init_error: Option<Box<dyn Error>>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            graphics: None,
            input: InputState::default(),
            camera: Camera::new(),
            last_frame: Instant::now(),
            frame_count: 0,
            last_title_update: Instant::now(),
            init_error: None,
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn Error>> {
        let window_attributes = Window::default_attributes()
            .with_title("relief")
            .with_inner_size(PhysicalSize::new(config::WINDOW_WIDTH, config::WINDOW_HEIGHT));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        // Mouse-look wants a captured, hidden cursor; not every platform
        // supports locking, so fall back to confinement.
        if window.set_cursor_grab(CursorGrabMode::Locked).is_err() {
            let _ = window.set_cursor_grab(CursorGrabMode::Confined);
        }
        window.set_cursor_visible(false);

        let context = GlContext::new(&window)?;
        let gl = &context.gl;
        unsafe {
            gl.clear_color(0.7, 0.8, 1.0, 0.0);
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LESS);
            gl.enable(glow::CULL_FACE);
        }

        let scene = TerrainScene::create(gl, &self.config)?;

        let size = window.inner_size();
        context.resize(size.width, size.height);

        self.window = Some(window);
        self.graphics = Some(Graphics { context, scene });
        self.last_frame = Instant::now();
        self.last_title_update = Instant::now();
        info!("Starting render loop...");
        Ok(())
    }

    fn handle_key_event(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let pressed = event.state == ElementState::Pressed;
        match code {
            KeyCode::Escape if pressed => {
                info!("Exit requested.");
                event_loop.exit();
            }
            KeyCode::KeyW => self.input.wireframe_held = pressed,
            KeyCode::KeyS => {
                // Reload fires on release so one keypress triggers once.
                if !pressed {
                    self.input.reload_requested = true;
                }
            }
            KeyCode::ArrowUp => self.input.move_forward = pressed,
            KeyCode::ArrowDown => self.input.move_backward = pressed,
            KeyCode::ArrowLeft => self.input.move_left = pressed,
            KeyCode::ArrowRight => self.input.move_right = pressed,
            _ => {}
        }
    }

    fn render_frame(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if std::mem::take(&mut self.input.reload_requested) {
            graphics.scene.reload_shaders(&graphics.context.gl);
        }

        let camera_input = CameraInput {
            forward: self.input.move_forward,
            backward: self.input.move_backward,
            strafe_left: self.input.move_left,
            strafe_right: self.input.move_right,
            mouse_dx: std::mem::take(&mut self.input.mouse_dx),
            mouse_dy: std::mem::take(&mut self.input.mouse_dy),
        };
        self.camera.update(&camera_input, dt);

        let size = window.inner_size();
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let projection = self.camera.projection_matrix(aspect);
        let view = self.camera.view_matrix();
        let model = Mat4::IDENTITY;
        let frame = FrameUniforms {
            mvp: projection * view * model,
            model,
            view,
            normal_matrix: Mat3::from_mat4(view * model),
            light_pos_world: Vec3::from(config::LIGHT_POSITION_WORLD),
        };

        let gl = &graphics.context.gl;
        unsafe {
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
        graphics.scene.draw(gl, &frame, self.input.wireframe_held);

        if let Err(e) = graphics.context.swap_buffers() {
            error!("Failed to swap buffers: {e}");
        }

        self.update_fps_title(&window, now);
    }

    fn update_fps_title(&mut self, window: &Window, now: Instant) {
        self.frame_count += 1;
        let elapsed = now.duration_since(self.last_title_update);
        if elapsed.as_secs_f32() >= 1.0 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            window.set_title(&format!("relief | {fps:.1} FPS"));
            self.frame_count = 0;
            self.last_title_update = now;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init_graphics(event_loop) {
                error!("Failed to initialize graphics: {e}");
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Window close requested.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(graphics) = &self.graphics {
                    graphics.context.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key_event(event_loop, event),
            WindowEvent::RedrawRequested => self.render_frame(),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.mouse_dx += delta.0 as f32;
            self.input.mouse_dy += delta.1 as f32;
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(graphics) = &mut self.graphics {
            graphics.scene.destroy(&graphics.context.gl);
            info!("GPU resources released.");
        }
    }
}

pub fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    // A failed startup still drains the event loop; surface it here so the
    // process exits nonzero.
    match app.init_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
