//! winit front end: one undecorated window showing the controller's frame.

use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Instant;

use anyhow::Result;
use softbuffer::{Context, Surface};
use svdcontrol::{DeviceDiscovery, SonosDevice, SonosPlayer, SsdpDiscovery, find_by_name};
use svdconfig::Config;
use tracing::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::monitor::MonitorHandle;
use winit::window::{Window, WindowId};

use crate::backlight::{Backlight, ShellBacklight};
use crate::controller::{DisplayController, PollDelays};
use crate::errors::DisplayError;
use crate::render::{TextRenderer, effective_size, frame_to_xrgb};
use crate::settings::DisplaySettings;

const WINDOW_TITLE: &str = "SonosDisplay";

type Controller = DisplayController<SonosPlayer, ShellBacklight, TextRenderer>;

/// Finds the zone player to display, by room name.
pub fn find_speaker<D: DeviceDiscovery>(discovery: &D, name: &str) -> Result<SonosDevice> {
    let devices = discovery.discover()?;
    find_by_name(devices, name).ok_or_else(|| DisplayError::SpeakerNotFound(name.to_string()).into())
}

/// Discovers `device_name` and runs the display until the window closes.
///
/// No window is opened when the speaker cannot be found.
pub fn run(config: &Config, device_name: &str) -> Result<()> {
    let settings = DisplaySettings::from_config(config);

    let device = find_speaker(&SsdpDiscovery::new(settings.discovery), device_name)?;
    let player = SonosPlayer::new(device, settings.discovery.http_timeout);
    info!(
        "Found sonos {} ({} at {})",
        player.device().room_name,
        player.device().model_name,
        player.device().location
    );

    let event_loop = EventLoop::new().map_err(window_error)?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = DisplayApp::new(settings, player);
    event_loop.run_app(&mut app).map_err(window_error)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// The primary monitor, or the first one listed when the platform has no
/// notion of primary monitor (Wayland).
fn screen_size<I>(primary: Option<(u32, u32)>, available: I) -> Option<(u32, u32)>
where
    I: IntoIterator<Item = (u32, u32)>,
{
    primary.or_else(|| available.into_iter().next())
}

fn window_error(err: impl std::fmt::Display) -> DisplayError {
    DisplayError::Window(err.to_string())
}

struct Running {
    window: Rc<Window>,
    _context: Context<Rc<Window>>,
    surface: Surface<Rc<Window>, Rc<Window>>,
    controller: Controller,
    next_poll: Instant,
}

impl Running {
    fn present(&mut self) -> Result<(), DisplayError> {
        let Some(frame) = self.controller.frame() else {
            return Ok(());
        };
        let size = self.window.inner_size();
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return Ok(());
        };

        self.surface.resize(width, height).map_err(window_error)?;
        let mut buffer = self.surface.buffer_mut().map_err(window_error)?;
        frame_to_xrgb(frame, width.get(), height.get(), &mut buffer);
        buffer.present().map_err(window_error)
    }

    fn poll_if_due(&mut self, now: Instant) -> Result<()> {
        if now < self.next_poll {
            return Ok(());
        }
        if self.controller.tick(now)? {
            self.window.request_redraw();
        }
        self.next_poll = now + self.controller.delay();
        Ok(())
    }
}

enum AppState {
    Pending(SonosPlayer),
    Running(Box<Running>),
    Closed,
}

struct DisplayApp {
    settings: DisplaySettings,
    state: AppState,
    error: Option<anyhow::Error>,
}

impl DisplayApp {
    fn new(settings: DisplaySettings, player: SonosPlayer) -> Self {
        Self {
            settings,
            state: AppState::Pending(player),
            error: None,
        }
    }

    fn open(&self, event_loop: &ActiveEventLoop, player: SonosPlayer) -> Result<Running> {
        let monitor_size = |m: MonitorHandle| {
            let size = m.size();
            (size.width, size.height)
        };
        let screen = screen_size(
            event_loop.primary_monitor().map(monitor_size),
            event_loop.available_monitors().map(monitor_size),
        );
        match screen {
            Some((w, h)) => info!("Screen is {} x {}", w, h),
            None => warn!("Screen size unknown"),
        }

        let configured = (self.settings.width, self.settings.height);
        let (width, height) = effective_size(configured, screen, self.settings.fullscreen);
        if (width, height) != configured {
            info!("Full screen mode activated");
        }

        let composer = TextRenderer::from_file(
            &self.settings.font_path,
            width,
            height,
            self.settings.volume_font_size,
            self.settings.status_font_size,
        )?;

        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_decorations(false)
            .with_resizable(false)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_position(PhysicalPosition::new(0, 0));
        let window = Rc::new(event_loop.create_window(attributes).map_err(window_error)?);
        window.set_cursor_visible(false);

        let context = Context::new(window.clone()).map_err(window_error)?;
        let surface = Surface::new(&context, window.clone()).map_err(window_error)?;

        let backlight = Backlight::new(
            ShellBacklight::new(&self.settings.backlight),
            self.settings.backlight.enabled,
            self.settings.backlight.off_after,
        );
        let delays = PollDelays {
            active: self.settings.delay_active,
            idle: self.settings.delay_idle,
        };
        let mut controller = DisplayController::new(player, backlight, composer, delays);

        let now = Instant::now();
        controller.start(now)?;
        window.request_redraw();

        Ok(Running {
            next_poll: now + controller.delay(),
            window,
            _context: context,
            surface,
            controller,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.error = Some(err);
        self.state = AppState::Closed;
        event_loop.exit();
    }
}

impl ApplicationHandler for DisplayApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, AppState::Pending(_)) {
            return;
        }
        let AppState::Pending(player) = std::mem::replace(&mut self.state, AppState::Closed) else {
            return;
        };

        match self.open(event_loop, player) {
            Ok(running) => {
                event_loop.set_control_flow(ControlFlow::WaitUntil(running.next_poll));
                self.state = AppState::Running(Box::new(running));
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let AppState::Running(running) = &mut self.state else {
            return;
        };

        let result = match event {
            WindowEvent::CloseRequested => {
                info!("Window closed");
                self.state = AppState::Closed;
                event_loop.exit();
                return;
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                info!("Escape pressed, leaving");
                self.state = AppState::Closed;
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => {
                debug!("Window resized to {}x{}", size.width, size.height);
                running.window.request_redraw();
                Ok(())
            }
            WindowEvent::RedrawRequested => running.present(),
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.fail(event_loop, err.into());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Running(running) = &mut self.state else {
            return;
        };

        match running.poll_if_due(Instant::now()) {
            Ok(()) => event_loop.set_control_flow(ControlFlow::WaitUntil(running.next_poll)),
            Err(err) => self.fail(event_loop, err),
        }
    }
}
