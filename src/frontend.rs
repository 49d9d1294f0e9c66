//! Window front end: a borderless fullscreen winit window presenting
//! `SkiaCanvas` frames through pixels, with the mouse standing in for the
//! joystick. The experiment loop owns the thread and pumps window events
//! after every presented frame.

use crate::cli::Cli;
use anyhow::{anyhow, Result};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vmex_core::{AbortSignal, DeviceError, Point, PointingDevice, Screen, TargetPose};
use vmex_experiment::{
    ExperimentConfig, Schedule, SessionContext, SessionSummary, SessionWriter, SubjectInfo,
};
use vmex_render::{load_font, CanvasGeometry, FontVec, SkiaCanvas};
use vmex_timing::{HighPrecisionTimer, Timer};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowId},
};

const START_PROMPT: &str = "Press space bar to start";
const START_PROMPT_POS: Point = Point { x: -7.0, y: 0.0 };
const START_PROMPT_HEIGHT: f64 = 1.4;
const WARMUP_FRAMES: usize = 10;
const CALIBRATION_FRAMES: usize = 120;
const FALLBACK_FRAME_RATE: f64 = 60.0;

/// Latched window input, shared by the screen, the mouse device and the
/// abort key.
#[derive(Debug, Default)]
struct InputState {
    cursor: Option<PhysicalPosition<f64>>,
    size: PhysicalSize<u32>,
    start_requested: bool,
    abort_requested: bool,
    closed: bool,
}

struct WindowApp {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    refresh_rate: Option<f64>,
    input: Rc<RefCell<InputState>>,
    failure: Option<anyhow::Error>,
}

impl WindowApp {
    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let window_attributes = Window::default_attributes()
            .with_title("Visuomotor task")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor.clone()))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();

        info!(
            width = physical_size.width,
            height = physical_size.height,
            scale_factor = window.scale_factor(),
            refresh_rate = ?self.refresh_rate,
            "display configured"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);
        self.input.borrow_mut().size = physical_size;

        window.set_cursor_visible(false);
        self.window = Some(window);
        Ok(())
    }

    fn handle_input(&mut self, key: PhysicalKey) {
        let PhysicalKey::Code(keycode) = key else {
            return;
        };
        let mut input = self.input.borrow_mut();
        match keycode {
            KeyCode::Space => input.start_requested = true,
            KeyCode::Escape | KeyCode::KeyQ => {
                if !input.abort_requested {
                    info!("abort requested; stopping after the current trial");
                }
                input.abort_requested = true;
            }
            _ => {}
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                warn!(error = %e, "failed to resize surface");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                warn!(error = %e, "failed to resize buffer");
            }
        }
        self.input.borrow_mut().size = new_size;
        debug!(width = new_size.width, height = new_size.height, "display resized");
    }
}

impl ApplicationHandler for WindowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.input.borrow_mut().closed = true;
                event_loop.exit();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.borrow_mut().cursor = Some(position);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_input(event.physical_key);
            }
            WindowEvent::Resized(sz) => self.handle_resize(sz),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }
}

/// Fullscreen display. Each committed frame is presented (vsync-paced by
/// pixels) and followed by one non-blocking pump of the event loop.
pub struct WindowScreen {
    event_loop: EventLoop<()>,
    app: WindowApp,
    canvas: SkiaCanvas,
    input: Rc<RefCell<InputState>>,
}

impl WindowScreen {
    pub fn open(config: &ExperimentConfig, font: Option<FontVec>) -> Result<Self> {
        let mut event_loop = EventLoop::new()?;
        let input = Rc::new(RefCell::new(InputState::default()));
        let mut app = WindowApp {
            window: None,
            pixels: None,
            refresh_rate: None,
            input: Rc::clone(&input),
            failure: None,
        };

        // The window is created on the first resume.
        while app.window.is_none() {
            let status = event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut app);
            if let PumpStatus::Exit(code) = status {
                return Err(app.failure.take().unwrap_or_else(|| {
                    anyhow!("event loop exited with code {code} before the window opened")
                }));
            }
        }

        let size = input.borrow().size;
        let monitor = config.monitor_settings;
        let pixels_per_degree =
            monitor.pixels_per_degree() * size.width as f64 / monitor.resolution().0 as f64;
        let geometry = CanvasGeometry {
            width: size.width,
            height: size.height,
            pixels_per_degree: pixels_per_degree as f32,
        };
        let mut canvas = SkiaCanvas::new(geometry, config.cue_radius)?;
        match font {
            Some(font) => canvas = canvas.with_font(font),
            None => warn!("no font given; on-screen prompts will not be drawn"),
        }
        debug!(pixels_per_degree, "canvas ready");

        Ok(Self {
            event_loop,
            app,
            canvas,
            input,
        })
    }

    pub fn device(&self) -> MouseDevice {
        MouseDevice {
            input: Rc::clone(&self.input),
        }
    }

    pub fn abort_key(&self) -> AbortKey {
        AbortKey {
            input: Rc::clone(&self.input),
        }
    }

    pub fn refresh_rate(&self) -> Option<f64> {
        self.app.refresh_rate
    }

    fn pump(&mut self) {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.app);
        if let PumpStatus::Exit(_) = status {
            self.input.borrow_mut().closed = true;
        }

        let size = self.input.borrow().size;
        let geometry = self.canvas.geometry();
        if size.width > 0
            && size.height > 0
            && (size.width, size.height) != (geometry.width, geometry.height)
        {
            if let Err(e) = self.canvas.resize(size.width, size.height) {
                warn!(error = %e, "failed to resize canvas");
            }
        }
    }

    fn present(&mut self) -> Result<()> {
        let Some(pixels) = self.app.pixels.as_mut() else {
            return Ok(());
        };
        self.canvas.copy_into(pixels.frame_mut())?;
        pixels.render()?;
        Ok(())
    }

    /// Shows the start prompt until Space is pressed. Returns `false` when
    /// the operator aborts or closes the window instead.
    pub fn wait_for_start(&mut self) -> bool {
        loop {
            {
                let input = self.input.borrow();
                if input.start_requested {
                    return true;
                }
                if input.abort_requested || input.closed {
                    return false;
                }
            }
            self.draw_text(START_PROMPT, START_PROMPT_POS, START_PROMPT_HEIGHT);
            self.commit_frame();
        }
    }

    /// Presents blank frames for at least `delay`, recording frame intervals
    /// into `timer` after a short warm-up. Returns the measured rate rounded
    /// to whole hertz.
    pub fn blank_pause(&mut self, delay: Duration, timer: &mut HighPrecisionTimer) -> Option<f64> {
        timer.frame_times.clear();
        let started = timer.now();
        let mut last = started;
        let mut frames = 0usize;
        while timer.elapsed(started) < delay || frames < WARMUP_FRAMES + CALIBRATION_FRAMES {
            if self.input.borrow().closed {
                break;
            }
            self.commit_frame();
            let now = timer.now();
            if frames >= WARMUP_FRAMES {
                timer.record_frame(Duration::from_nanos(now - last));
            }
            last = now;
            frames += 1;
        }

        let stats = timer.calibration_stats();
        info!(
            effective_fps = stats.effective_fps,
            jitter_ms = stats.jitter_ns / 1e6,
            min_ms = stats.min_frame_time_ns / 1e6,
            max_ms = stats.max_frame_time_ns / 1e6,
            "frame timing measured"
        );
        stats.rounded_fps()
    }
}

impl Screen for WindowScreen {
    fn draw_cursor(&mut self, position: Point) {
        self.canvas.draw_cursor(position);
    }

    fn draw_target(&mut self, pose: &TargetPose) {
        self.canvas.draw_target(pose);
    }

    fn draw_text(&mut self, text: &str, position: Point, height: f64) {
        self.canvas.draw_text(text, position, height);
    }

    fn commit_frame(&mut self) {
        if let Err(e) = self.present() {
            warn!(error = %e, "frame not presented");
        }
        self.canvas.clear();
        self.pump();
    }
}

impl Drop for WindowScreen {
    fn drop(&mut self) {
        if let Some(window) = &self.app.window {
            window.set_cursor_visible(true);
        }
    }
}

/// Mouse position over the window, mapped to [-1, 1] per axis with y up.
pub struct MouseDevice {
    input: Rc<RefCell<InputState>>,
}

impl PointingDevice for MouseDevice {
    fn position(&mut self) -> std::result::Result<(f64, f64), DeviceError> {
        let input = self.input.borrow();
        if input.closed {
            return Err(DeviceError::Disconnected);
        }
        let Some(cursor) = input.cursor else {
            return Ok((0.0, 0.0));
        };
        window_to_device(cursor, input.size)
    }
}

fn window_to_device(
    cursor: PhysicalPosition<f64>,
    size: PhysicalSize<u32>,
) -> std::result::Result<(f64, f64), DeviceError> {
    if size.width == 0 || size.height == 0 {
        return Err(DeviceError::Unavailable("window has no area".into()));
    }
    let x = 2.0 * cursor.x / size.width as f64 - 1.0;
    let y = 1.0 - 2.0 * cursor.y / size.height as f64;
    Ok((x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0)))
}

/// `q` or `Escape`, latched until the next trial boundary looks at it.
pub struct AbortKey {
    input: Rc<RefCell<InputState>>,
}

impl AbortSignal for AbortKey {
    fn poll_abort(&mut self) -> bool {
        self.input.borrow().abort_requested
    }
}

pub fn run(
    cli: &Cli,
    config: ExperimentConfig,
    subject: SubjectInfo,
    schedule: &mut dyn Schedule,
    sink: &mut SessionWriter,
    rng: StdRng,
) -> Result<SessionSummary> {
    let font = cli.font.as_deref().map(load_font).transpose()?;
    let mut screen = WindowScreen::open(&config, font)?;
    let device = screen.device();
    let mut abort = screen.abort_key();

    if !screen.wait_for_start() {
        info!("session cancelled before the first trial");
        return Ok(SessionSummary {
            completed: 0,
            aborted: true,
        });
    }

    let mut timer = HighPrecisionTimer::new();
    let delay = Duration::from_secs_f64(cli.start_delay.max(0.0));
    let measured = screen.blank_pause(delay, &mut timer);
    let frame_rate = cli
        .frame_rate
        .or(measured)
        .or(screen.refresh_rate().map(f64::round))
        .unwrap_or(FALLBACK_FRAME_RATE);
    info!(frame_rate, measured = ?measured, "frame rate selected");

    let mut ctx = SessionContext::new(config, subject, frame_rate, device, screen, timer, rng);
    Ok(ctx.run_session(schedule, &mut abort, sink)?)
}
