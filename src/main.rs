use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use log::info;
use pollster::block_on;
use rand::rngs::ThreadRng;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use firefly_forest::config::{WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH};
use firefly_forest::firefly::SWARM_SIZE;
use firefly_forest::input::{self, Key, KeyCommand, KeyboardState};
use firefly_forest::{FireflySwarm, Overlay, ProgramState, Renderer, ResourcePaths};

/// Pixel scroll deltas (touchpads) are converted to wheel lines with this.
const PIXELS_PER_LINE: f32 = 20.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(-1);
    }
}

fn run() -> Result<()> {
    let paths = ResourcePaths::from_env();
    info!("loading resources from {}", paths.root().display());

    let mut state = ProgramState::load(&paths);
    let mut rng = rand::rng();
    FireflySwarm::populate(&mut state.point_lights, SWARM_SIZE, &mut rng);
    info!("swarm of {} point lights", state.point_lights.len());

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        swarm: FireflySwarm::new(state.point_lights.len()),
        paths,
        state,
        keys: KeyboardState::new(),
        rng,
        graphics: None,
        focused: true,
        last_frame: None,
        last_error: None,
    };
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.last_error {
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
#[error("failed to initialize {stage}: {message}")]
struct WindowInitError {
    stage: &'static str,
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &'static str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            stage,
            message: panic_message(panic),
        }
    }

    fn from_error(stage: &'static str, err: impl fmt::Display) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

struct Graphics {
    renderer: Renderer,
    overlay: Overlay,
}

struct App {
    paths: ResourcePaths,
    state: ProgramState,
    keys: KeyboardState,
    swarm: FireflySwarm,
    rng: ThreadRng,
    graphics: Option<Graphics>,
    focused: bool,
    last_frame: Option<Instant>,
    last_error: Option<anyhow::Error>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.last_error = Some(err);
        event_loop.exit();
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<Graphics> {
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        let renderer = block_on(Renderer::new(Arc::clone(&window), &self.paths))?;
        let overlay = Overlay::new(
            &window,
            &renderer.context().device,
            renderer.context().format(),
        );
        set_cursor_captured(&window, self.state.camera_mouse_update_enabled);
        Ok(Graphics { renderer, overlay })
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(key) = map_keycode(code) else {
            return;
        };
        match event.state {
            ElementState::Pressed => {
                self.keys.set_key_down(key);
                if !event.repeat {
                    if let Some(command) = key.command() {
                        self.run_command(event_loop, command);
                    }
                }
            }
            ElementState::Released => self.keys.set_key_up(key),
        }
    }

    fn run_command(&mut self, event_loop: &ActiveEventLoop, command: KeyCommand) {
        match command {
            KeyCommand::Quit => event_loop.exit(),
            KeyCommand::ToggleOverlay => {
                let visible = input::toggle_overlay(&mut self.state);
                log::debug!("overlay {}", if visible { "shown" } else { "hidden" });
                if let Some(graphics) = &self.graphics {
                    set_cursor_captured(graphics.renderer.window(), !visible);
                }
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let delta_time = self
            .last_frame
            .replace(now)
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());

        input::process_input(&mut self.state, &self.keys, delta_time);
        self.swarm
            .update(&mut self.state.point_lights, delta_time, &mut self.rng);

        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };
        if self.state.overlay_enabled {
            graphics
                .overlay
                .prepare(graphics.renderer.window(), &mut self.state);
        }
        let overlay = self.state.overlay_enabled.then_some(&mut graphics.overlay);
        match graphics.renderer.render(&self.state, overlay) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                graphics.renderer.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("surface reported out of memory");
                self.fail(event_loop, anyhow!("GPU is out of memory"));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                info!("Surface timeout; retrying next frame");
            }
            Err(err) => log::warn!("skipping frame: {err}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }
        match self.init_graphics(event_loop) {
            Ok(graphics) => self.graphics = Some(graphics),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        if self.state.overlay_enabled {
            if let Some(graphics) = self.graphics.as_mut() {
                let consumed = graphics
                    .overlay
                    .on_window_event(graphics.renderer.window(), &event);
                // Releases still reach the key set so nothing stays held.
                let is_release = matches!(
                    &event,
                    WindowEvent::KeyboardInput { event, .. }
                        if event.state == ElementState::Released
                );
                if consumed && !is_release {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(graphics) = self.graphics.as_mut() {
                    graphics.renderer.resize(size);
                    let targets = graphics.renderer.target_size();
                    if targets != size {
                        log::debug!(
                            "surface is {}x{}, offscreen targets stay {}x{}",
                            size.width,
                            size.height,
                            targets.width,
                            targets.height
                        );
                    }
                }
            }
            WindowEvent::Focused(focused) => {
                self.focused = focused;
                if !focused {
                    self.keys.release_all();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                input::process_scroll(&mut self.state, lines);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.focused {
                input::process_mouse_motion(&mut self.state, dx as f32, dy as f32);
            }
        }
    }

    fn about_to_wait(&mut self, _: &ActiveEventLoop) {
        if let Some(graphics) = &self.graphics {
            graphics.renderer.window().request_redraw();
        }
    }
}

/// Locks the pointer for mouse look, or frees it for the overlay.
fn set_cursor_captured(window: &Window, captured: bool) {
    let grab = if captured {
        window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
    } else {
        window.set_cursor_grab(CursorGrabMode::None)
    };
    if let Err(err) = grab {
        log::warn!("cursor grab failed: {err}");
    }
    window.set_cursor_visible(!captured);
}

fn map_keycode(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::Space => Key::Space,
        KeyCode::ControlLeft => Key::LeftCtrl,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::Escape => Key::Escape,
        KeyCode::F1 => Key::F1,
        _ => return None,
    })
}
