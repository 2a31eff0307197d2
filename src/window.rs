//! winit window with a pixels surface, driven by pumping the event loop.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ab_glyph::FontVec;
use anyhow::{Context, Result, anyhow};
use pixels::{Pixels, SurfaceTexture};
use recall_core::{DisplayMode, Key, Screen};
use recall_experiment::{Display, DisplayError, ExperimentConfig};
use recall_render::{ImageScale, RenderError, SkiaRenderer};
use recall_timing::{HighPrecisionTimer, Timer};
use tracing::{debug, info};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key as WinitKey, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowId};

/// Maps a logical key to the keys the experiment understands.
pub fn map_key(key: &WinitKey) -> Option<Key> {
    match key {
        WinitKey::Named(NamedKey::Space) => Some(Key::Space),
        WinitKey::Named(NamedKey::Enter) => Some(Key::Return),
        WinitKey::Named(NamedKey::Backspace) => Some(Key::Backspace),
        WinitKey::Named(NamedKey::ArrowUp) => Some(Key::Up),
        WinitKey::Named(NamedKey::ArrowDown) => Some(Key::Down),
        WinitKey::Named(NamedKey::Escape) => Some(Key::Escape),
        WinitKey::Character(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(' '), None) => Some(Key::Space),
                (Some(c), None) => Some(Key::Char(c)),
                _ => None,
            }
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct WindowSettings {
    pub title: String,
    pub fullscreen: bool,
    pub size: (u32, u32),
    pub mode: DisplayMode,
}

impl WindowSettings {
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            title: config.experiment.name.clone(),
            fullscreen: config.display.fullscreen,
            size: (config.display.width, config.display.height),
            mode: config.display.mode,
        }
    }
}

/// Event-loop side of the display: owns the window and buffers input.
struct WindowState {
    settings: WindowSettings,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    keys: Vec<Key>,
    resized: Option<PhysicalSize<u32>>,
    redraw: bool,
    failure: Option<anyhow::Error>,
    closed: bool,
}

impl WindowState {
    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut attributes = Window::default_attributes()
            .with_title(self.settings.title.clone())
            .with_resizable(false);
        if self.settings.fullscreen {
            let monitor = event_loop
                .primary_monitor()
                .or_else(|| event_loop.available_monitors().next())
                .ok_or_else(|| anyhow!("no monitor available"))?;
            if let Some(rate) = monitor.refresh_rate_millihertz() {
                info!(hz = rate as f64 / 1000.0, "monitor refresh rate");
            }
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
        } else {
            let (w, h) = self.settings.size;
            attributes = attributes.with_inner_size(LogicalSize::new(w, h));
        }

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale = window.scale_factor(),
            fullscreen = self.settings.fullscreen,
            "window created"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        window.set_cursor_visible(false);
        self.window = Some(window);
        Ok(())
    }

    fn size(&self) -> Option<PhysicalSize<u32>> {
        self.window.as_ref().map(|w| w.inner_size())
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create_window_and_surface(event_loop) {
            self.failure = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.closed = true;
                self.keys.push(Key::Escape);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                if let Some(key) = map_key(&event.logical_key) {
                    self.keys.push(key);
                }
            }
            WindowEvent::Resized(size) => {
                self.resized = Some(size);
                self.redraw = true;
            }
            WindowEvent::RedrawRequested => self.redraw = true,
            _ => {}
        }
    }
}

/// Production [`Display`]: renders with tiny-skia and presents through
/// pixels.
pub struct WinitDisplay {
    event_loop: EventLoop<()>,
    state: WindowState,
    renderer: SkiaRenderer,
    mode: DisplayMode,
    timer: HighPrecisionTimer,
}

const OPEN_ATTEMPTS: usize = 200;

impl WinitDisplay {
    pub fn open(settings: WindowSettings, font: FontVec, timer: HighPrecisionTimer) -> Result<Self> {
        let mut event_loop = EventLoop::new().context("failed to create the event loop")?;
        let mode = settings.mode;
        let mut state = WindowState {
            settings,
            window: None,
            pixels: None,
            keys: Vec::new(),
            resized: None,
            redraw: false,
            failure: None,
            closed: false,
        };

        // The window is created from `resumed`, which arrives on the first pumps.
        for _ in 0..OPEN_ATTEMPTS {
            let status = event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut state);
            if let Some(e) = state.failure.take() {
                return Err(e.context("failed to open the experiment window"));
            }
            if state.window.is_some() {
                break;
            }
            if let PumpStatus::Exit(code) = status {
                return Err(anyhow!("event loop exited with code {code} before the window opened"));
            }
        }
        let size = state.size().ok_or_else(|| anyhow!("the window never opened"))?;

        let scale = ImageScale::for_mode(mode, size.width);
        debug!(fraction = scale.fraction(), "image scale");
        let renderer = SkiaRenderer::new(size.width, size.height, font, scale)?;
        Ok(Self {
            event_loop,
            state,
            renderer,
            mode,
            timer,
        })
    }

    fn apply_resize(&mut self) -> Result<(), DisplayError> {
        let Some(size) = self.state.resized.take() else {
            return Ok(());
        };
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        if let Some(pixels) = self.state.pixels.as_mut() {
            let present = |e: pixels::TextureError| DisplayError::Present(e.to_string());
            pixels.resize_surface(size.width, size.height).map_err(present)?;
            pixels.resize_buffer(size.width, size.height).map_err(present)?;
        }
        self.renderer
            .resize(size.width, size.height)
            .map_err(|e| DisplayError::Present(e.to_string()))?;
        self.renderer
            .set_image_scale(ImageScale::for_mode(self.mode, size.width));
        info!(width = size.width, height = size.height, "window resized");
        Ok(())
    }

    fn pump(&mut self, timeout: Duration) {
        let status = self.event_loop.pump_app_events(Some(timeout), &mut self.state);
        if let PumpStatus::Exit(_) = status {
            if !self.state.closed {
                self.state.closed = true;
                self.state.keys.push(Key::Escape);
            }
        }
    }
}

impl Display for WinitDisplay {
    fn present(&mut self, screen: &Screen<'_>) -> Result<u64, DisplayError> {
        self.pump(Duration::ZERO);
        self.apply_resize()?;
        self.renderer.draw(screen).map_err(display_error)?;
        let pixels = self
            .state
            .pixels
            .as_mut()
            .ok_or_else(|| DisplayError::Present("window is closed".to_string()))?;
        self.renderer.copy_to_frame(pixels.frame_mut());
        pixels
            .render()
            .map_err(|e| DisplayError::Present(e.to_string()))?;
        let onset = self.timer.now();
        self.state.redraw = false;
        Ok(onset)
    }

    fn poll_keys(&mut self, timeout: Duration) -> Vec<Key> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            self.pump(remaining);
            if !self.state.keys.is_empty() || remaining.is_zero() {
                break;
            }
        }
        if self.state.closed && self.state.keys.is_empty() {
            return vec![Key::Escape];
        }
        std::mem::take(&mut self.state.keys)
    }

    fn preload(&mut self, image: &Path) -> Result<(), DisplayError> {
        self.renderer.preload(image).map_err(display_error)
    }

    fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.state.redraw)
    }
}

fn display_error(error: RenderError) -> DisplayError {
    match error {
        RenderError::ImageLoad { path, source } => DisplayError::ImageLoad {
            path,
            message: source.to_string(),
        },
        other => DisplayError::Present(other.to_string()),
    }
}

impl Drop for WinitDisplay {
    fn drop(&mut self) {
        if let Some(window) = &self.state.window {
            window.set_cursor_visible(true);
        }
    }
}
