use anyhow::{Context, Result};
use log::{error, info};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::SceneConfig,
    gfx::{rendering::RenderEngine, scene::SceneComposer},
    input::{Key, KeyAction, LoopControl},
};

/// Callbacks the windowing driver invokes on the scene
///
/// The driver owns the event loop; the implementation owns everything else.
pub trait FrameLifecycle {
    /// Creates GPU resources. Called once, after the window exists.
    fn initialize(&mut self) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32);

    fn paint(&mut self);

    fn keyboard(&mut self, key: Key, action: KeyAction) -> LoopControl;

    /// Fixed-rate simulation tick
    fn timer(&mut self);

    /// One-line summary shown in the window title
    fn status(&self) -> String;
}

pub struct OrreryApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: SceneConfig,
    window: Option<Arc<Window>>,
    scene: Option<Box<dyn FrameLifecycle>>,
    tick_interval: Duration,
    next_tick: Instant,
    title: String,
    fatal: Option<anyhow::Error>,
}

impl OrreryApp {
    pub fn new(config: SceneConfig) -> Result<Self> {
        config.validate().context("invalid scene configuration")?;
        let event_loop = EventLoop::new().context("cannot create event loop")?;
        let tick_interval = Duration::from_secs_f32(1.0 / config.window.timer_hz);

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                title: config.window.title.clone(),
                config,
                window: None,
                scene: None,
                tick_interval,
                next_tick: Instant::now(),
                fatal: None,
            },
        })
    }

    /// Runs the event loop until the window closes or a fatal error occurs
    pub fn run(mut self) -> Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.app_state.next_tick));
        event_loop
            .run_app(&mut self.app_state)
            .context("event loop terminated abnormally")?;

        // Release GPU resources before the window goes away
        self.app_state.scene = None;
        match self.app_state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn create_scene(&self, window: Arc<Window>) -> Result<Box<dyn FrameLifecycle>> {
        let PhysicalSize { width, height } = window.inner_size();
        let engine = pollster::block_on(RenderEngine::new(window, width, height))
            .context("cannot create the render engine")?;

        let mut scene = SceneComposer::new(engine, self.config.clone())?;
        scene.initialize()?;
        scene.resize(width, height);
        Ok(Box::new(scene))
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn refresh_title(&mut self) {
        let (Some(window), Some(scene)) = (self.window.as_ref(), self.scene.as_ref()) else {
            return;
        };
        let status = scene.status();
        if status != self.title {
            window.set_title(&status);
            self.title = status;
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = match event_loop.create_window(window) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                let err = anyhow::Error::new(err).context("cannot create window");
                return self.fail(event_loop, err);
            }
        };

        match self.create_scene(window.clone()) {
            Ok(scene) => {
                info!("Window ready");
                self.scene = Some(scene);
                self.window = Some(window);
                self.next_tick = Instant::now() + self.tick_interval;
                self.refresh_title();
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => scene.resize(width, height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let Some(key) = map_key(code) else {
                    return;
                };
                let action = match (state, repeat) {
                    (ElementState::Released, _) => KeyAction::Release,
                    (ElementState::Pressed, true) => KeyAction::Repeat,
                    (ElementState::Pressed, false) => KeyAction::Press,
                };
                if scene.keyboard(key, action) == LoopControl::Exit {
                    event_loop.exit();
                    return;
                }
                self.refresh_title();
                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                scene.paint();
                self.refresh_title();
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(scene)) = (self.window.as_ref(), self.scene.as_mut()) else {
            return;
        };

        let now = Instant::now();
        if now >= self.next_tick {
            scene.timer();
            window.request_redraw();
            self.next_tick += self.tick_interval;
            if self.next_tick < now {
                // Fell behind; drop the missed ticks
                self.next_tick = now + self.tick_interval;
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::Digit0 => Key::Digit(0),
        KeyCode::Digit1 => Key::Digit(1),
        KeyCode::Digit2 => Key::Digit(2),
        KeyCode::Digit3 => Key::Digit(3),
        KeyCode::Digit4 => Key::Digit(4),
        KeyCode::Digit5 => Key::Digit(5),
        KeyCode::Digit6 => Key::Digit(6),
        KeyCode::Digit7 => Key::Digit(7),
        KeyCode::Digit8 => Key::Digit(8),
        KeyCode::Digit9 => Key::Digit(9),
        KeyCode::KeyA => Key::A,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyW => Key::W,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::Space => Key::Space,
        KeyCode::Equal => Key::Equal,
        KeyCode::Minus => Key::Minus,
        KeyCode::NumpadAdd => Key::NumpadAdd,
        KeyCode::NumpadSubtract => Key::NumpadSubtract,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_codes_map_to_scene_keys() {
        assert_eq!(map_key(KeyCode::Digit7), Some(Key::Digit(7)));
        assert_eq!(map_key(KeyCode::ArrowUp), Some(Key::Up));
        assert_eq!(map_key(KeyCode::NumpadSubtract), Some(Key::NumpadSubtract));
        assert_eq!(map_key(KeyCode::KeyZ), None);
    }
}
