use crate::keyboard::KeyboardStation;
use anyhow::{Context, Result};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use rigex_core::{Station, TrialRecord};
use rigex_experiment::{Session, SessionSummary, Step, TrialRun};
use rigex_render::Viewing;
use std::path::PathBuf;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{Fullscreen, Window, WindowId},
};

pub struct AppOptions {
    pub trials: u64,
    /// Used when the monitor does not report its refresh rate.
    pub fallback_refresh_hz: f64,
    pub viewing: Viewing,
    pub output: Option<PathBuf>,
}

/// Runs a session in a fullscreen window, one trial frame per redraw.
pub struct App {
    options: AppOptions,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    station: Option<KeyboardStation>,
    session: Session<'static>,
    trial: Option<TrialRun>,
    summary: SessionSummary,
    rng: StdRng,
    should_exit: bool,
    closed: bool,
}

impl App {
    pub fn new(session: Session<'static>, rng: StdRng, options: AppOptions) -> Self {
        Self {
            options,
            window: None,
            pixels: None,
            station: None,
            session,
            trial: None,
            summary: SessionSummary::default(),
            rng,
            should_exit: false,
            closed: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        tracing::info!(
            component = "app",
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "A/S/D: left/center/right port, Space: response port, Esc: quit"
        );
        event_loop.run_app(&mut self)?;
        self.write_report()
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .context("no monitor available")?;
        let refresh_hz = monitor
            .refresh_rate_millihertz()
            .map(|mhz| mhz as f64 / 1000.0)
            .unwrap_or(self.options.fallback_refresh_hz);

        let attributes = Window::default_attributes()
            .with_title("Rigex")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();

        tracing::info!(
            component = "app",
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            refresh_hz,
            "display configured"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        self.station = Some(KeyboardStation::new(
            size.width,
            size.height,
            refresh_hz,
            self.options.viewing,
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// Renders one frame of the running trial, starting the next trial
    /// when none is live.
    fn advance(&mut self) -> Result<()> {
        let Self {
            options,
            station,
            session,
            trial,
            summary,
            rng,
            should_exit,
            ..
        } = self;
        let station = station.as_mut().context("station not created")?;

        if trial.is_none() {
            if summary.quit || summary.trials >= options.trials || station.quit_requested() {
                *should_exit = true;
                return Ok(());
            }
            let record = TrialRecord::new(session.next_trial_number());
            let manager = session.manager();
            match manager.prepare_trial(
                &*station,
                session.subject(),
                record,
                session.compiled(),
                rng,
            ) {
                Ok((phases, record)) => *trial = Some(TrialRun::begin(phases, record, station)),
                Err(record) => {
                    summary.count(session.complete(record));
                    summary.quit = true;
                    return Ok(());
                }
            }
        }

        if let Some(run) = trial.as_mut() {
            if run.step(station) == Step::Finished {
                if let Some(run) = trial.take() {
                    let (record, quit) = run.finish(station);
                    station.release();
                    summary.count(session.complete(record));
                    summary.quit |= quit;
                }
            }
        }
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        self.advance()?;
        let (Some(pixels), Some(station)) = (self.pixels.as_mut(), self.station.as_ref()) else {
            return Ok(());
        };
        station.present(pixels.frame_mut())?;
        pixels.render()?;
        if let Some(window) = &self.window {
            window.request_redraw();
        }
        Ok(())
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        if let Some(pixels) = &mut self.pixels {
            pixels.resize_surface(size.width, size.height)?;
            pixels.resize_buffer(size.width, size.height)?;
        }
        if let Some(station) = &mut self.station {
            station.resize(size.width, size.height)?;
        }
        tracing::info!(component = "app", width = size.width, height = size.height, "display resized");
        Ok(())
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.exit();
        if self.closed {
            return;
        }
        self.closed = true;
        if let (Some(run), Some(station)) = (self.trial.take(), self.station.as_mut()) {
            let (record, quit) = run.finish(station);
            station.release();
            self.summary.count(self.session.complete(record));
            self.summary.quit |= quit;
        }
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        if let Some(station) = &self.station {
            let stats = station.calibration_stats();
            tracing::info!(
                component = "app",
                frames = station.frames(),
                effective_fps = stats.effective_fps,
                jitter_ns = stats.jitter_ns,
                "frame timing"
            );
        }
        tracing::info!(
            component = "app",
            trials = self.summary.trials,
            correct = self.summary.correct,
            incorrect = self.summary.incorrect,
            errored_out = self.summary.errored_out,
            manual_quit = self.summary.manual_quit,
            "session finished"
        );
    }

    fn write_report(&self) -> Result<()> {
        let Some(path) = &self.options.output else {
            return Ok(());
        };
        let text = self.session.compiled().to_json()?;
        std::fs::write(path, text)
            .with_context(|| format!("writing compiled record to {}", path.display()))
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                tracing::error!(component = "app", "failed to create window and surface: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    tracing::error!(component = "app", "frame failed: {e:#}");
                    self.cleanup_and_exit(event_loop);
                }
            }
            WindowEvent::KeyboardInput { event, .. } if !event.repeat => {
                if let (PhysicalKey::Code(code), Some(station)) =
                    (event.physical_key, self.station.as_mut())
                {
                    station.handle_key(code, event.state.is_pressed());
                }
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = self.handle_resize(size) {
                    tracing::error!(component = "app", "resize failed: {e:#}");
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            self.cleanup_and_exit(event_loop);
        }
    }
}
