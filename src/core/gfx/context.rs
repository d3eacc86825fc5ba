//! OpenGL context plumbing: glutin display, window surface and a current
//! 4.1 core context, wrapped with resize and swap helpers.

use glow::HasContext;
use glutin::{
    config::ConfigTemplateBuilder,
    context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version},
    display::{Display, DisplayApiPreference},
    prelude::*,
    surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface},
};
use log::{info, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::{error::Error, ffi::CStr, num::NonZeroU32};
use winit::window::Window;

pub struct GlContext {
    pub gl: glow::Context,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
}

impl GlContext {
    pub fn new(window: &Window) -> Result<Self, Box<dyn Error>> {
        let display_handle = window.display_handle()?.as_raw();

        #[cfg(target_os = "windows")]
        let preference = {
            info!("Using WGL for the OpenGL context.");
            DisplayApiPreference::Wgl(None)
        };
        #[cfg(target_os = "macos")]
        let preference = {
            info!("Using CGL for the OpenGL context.");
            DisplayApiPreference::Cgl
        };
        #[cfg(all(unix, not(target_os = "macos")))]
        let preference = {
            info!("Using EGL for the OpenGL context.");
            DisplayApiPreference::Egl
        };

        let display = unsafe { Display::new(display_handle, preference)? };

        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(0)
            .with_depth_size(24)
            .with_transparency(false)
            .build();
        let config = unsafe { display.find_configs(template)?.next() }
            .ok_or("failed to find a suitable GL config")?;

        let (width, height): (u32, u32) = window.inner_size().into();
        let raw_window_handle = window.window_handle()?.as_raw();
        let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window_handle,
            NonZeroU32::new(width).ok_or("zero-width window")?,
            NonZeroU32::new(height).ok_or("zero-height window")?,
        );
        let surface = unsafe { display.create_window_surface(&config, &surface_attributes)? };

        // Tessellation stages require at least a 4.0 context; ask for the
        // 4.1 core profile.
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(4, 1))))
            .with_profile(GlProfile::Core)
            .build(Some(raw_window_handle));
        let context = unsafe { display.create_context(&config, &context_attributes)? }
            .make_current(&surface)?;

        if let Err(e) = surface.set_swap_interval(
            &context,
            SwapInterval::Wait(NonZeroU32::new(1).ok_or("bad swap interval")?),
        ) {
            warn!("Failed to set swap interval (VSync): {e:?}");
        }

        let gl =
            unsafe { glow::Context::from_loader_function_cstr(|s: &CStr| display.get_proc_address(s)) };
        unsafe {
            info!(
                "OpenGL {} on {}",
                gl.get_parameter_string(glow::VERSION),
                gl.get_parameter_string(glow::RENDERER)
            );
        }

        Ok(Self {
            gl,
            surface,
            context,
        })
    }

    pub fn resize(&self, width: u32, height: u32) {
        let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
            warn!("Ignoring resize to zero dimensions.");
            return;
        };
        self.surface.resize(&self.context, w, h);
        unsafe {
            self.gl.viewport(0, 0, width as i32, height as i32);
        }
    }

    pub fn swap_buffers(&self) -> Result<(), Box<dyn Error>> {
        self.surface.swap_buffers(&self.context)?;
        Ok(())
    }
}
