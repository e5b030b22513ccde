use anyhow::{Context, Result, ensure};
use bytemuck::cast_slice_mut;
use rigex_core::{GratingParams, Mask, Stimulus};
use rigex_timing::{HighPrecisionTimer, Timer};
use std::f64::consts::TAU;
use std::time::Duration;
use tiny_skia::{Color, Pixmap};

const SINE_TABLE_LEN: usize = 4096;

/// Gaussian apertures reach the edge at this many standard deviations.
const GAUSSIAN_EDGE_SD: f64 = 3.0;

/// Maps visual degrees onto screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewing {
    pub pixels_per_degree: f64,
}

impl Default for Viewing {
    fn default() -> Self {
        Self {
            pixels_per_degree: 20.0,
        }
    }
}

pub struct FrameStats {
    pub raster: Duration,
    pub copy: Duration,
    pub total: Duration,
    /// Pixels whose value was computed rather than cleared.
    pub modulated: usize,
}

/// Rasterises grating and blank stimuli into an opaque RGBA canvas.
pub struct GratingRenderer {
    width: u32,
    height: u32,
    viewing: Viewing,
    canvas: Pixmap,
    sine: Vec<f32>,
    timer: HighPrecisionTimer,
}

impl GratingRenderer {
    pub fn new(width: u32, height: u32, viewing: Viewing) -> Result<Self> {
        let canvas = Pixmap::new(width, height)
            .with_context(|| format!("cannot allocate a {width}x{height} canvas"))?;
        let sine = (0..SINE_TABLE_LEN)
            .map(|i| (TAU * i as f64 / SINE_TABLE_LEN as f64).sin() as f32)
            .collect();

        let mut renderer = Self {
            width,
            height,
            viewing,
            canvas,
            sine,
            timer: HighPrecisionTimer::new(),
        };
        renderer.fill_grey(0.0);
        Ok(renderer)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.canvas = Pixmap::new(width, height)
            .with_context(|| format!("cannot allocate a {width}x{height} canvas"))?;
        self.width = width;
        self.height = height;
        self.fill_grey(0.0);
        tracing::debug!(component = "render", width, height, "canvas resized");
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    /// Draw `stimulus` and copy the result into `frame` (RGBA8, same size).
    pub fn render_frame(&mut self, stimulus: &Stimulus, frame: &mut [u8]) -> Result<FrameStats> {
        let start = self.timer.now();
        let modulated = self.draw(stimulus);
        let raster = self.timer.elapsed(start);

        let copy_start = self.timer.now();
        self.copy_to(frame)?;
        let copy = self.timer.elapsed(copy_start);

        Ok(FrameStats {
            raster,
            copy,
            total: self.timer.elapsed(start),
            modulated,
        })
    }

    /// Rasterise `stimulus` into the canvas. Returns the number of pixels
    /// that carry grating modulation.
    pub fn draw(&mut self, stimulus: &Stimulus) -> usize {
        match stimulus {
            Stimulus::Blank { luminance } => {
                self.fill_grey(*luminance);
                0
            }
            Stimulus::Grating(g) => self.draw_grating(g),
        }
    }

    pub fn copy_to(&self, frame: &mut [u8]) -> Result<()> {
        let src = self.canvas.data();
        ensure!(
            frame.len() == src.len(),
            "frame buffer holds {} bytes, canvas needs {}",
            frame.len(),
            src.len()
        );
        frame.copy_from_slice(src);
        Ok(())
    }

    fn fill_grey(&mut self, luminance: f64) {
        let v = grey_level(luminance) as f32 / 255.0;
        self.canvas.fill(Color::from_rgba(v, v, v, 1.0).unwrap_or(Color::BLACK));
    }

    fn draw_grating(&mut self, g: &GratingParams) -> usize {
        self.fill_grey(0.0);

        let ppd = self.viewing.pixels_per_degree;
        let period_px = g.deg_per_cycle * ppd;
        if !(period_px > 0.0) || g.contrast == 0.0 {
            return 0;
        }

        let cx = g.location.0 * self.width as f64;
        let cy = g.location.1 * self.height as f64;
        let radius_px = g.radius * ppd;

        let (x0, y0, x1, y1) = match g.mask {
            Mask::None => (0, 0, self.width as usize, self.height as usize),
            Mask::Circular | Mask::Gaussian => {
                let clamp_x = |v: f64| v.clamp(0.0, self.width as f64) as usize;
                let clamp_y = |v: f64| v.clamp(0.0, self.height as f64) as usize;
                (
                    clamp_x((cx - radius_px).floor()),
                    clamp_y((cy - radius_px).floor()),
                    clamp_x((cx + radius_px).ceil()),
                    clamp_y((cy + radius_px).ceil()),
                )
            }
        };
        if x1 <= x0 || y1 <= y0 {
            return 0;
        }

        // Orientation 0 gives vertical bars; positive angles rotate clockwise.
        let theta = g.orientation.to_radians();
        let (sin_t, cos_t) = theta.sin_cos();
        let cycles_per_px = 1.0 / period_px;
        let sigma = radius_px / GAUSSIAN_EDGE_SD;
        let r2_max = radius_px * radius_px;
        let contrast = g.contrast.clamp(-1.0, 1.0);

        let stride = self.width as usize;
        let sine = &self.sine;
        let dst: &mut [u32] = cast_slice_mut(self.canvas.data_mut());
        let mut modulated = 0;

        for y in y0..y1 {
            let dy = y as f64 + 0.5 - cy;
            let row = y * stride;
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - cx;
                let envelope = match g.mask {
                    Mask::None => 1.0,
                    Mask::Circular => {
                        if dx * dx + dy * dy > r2_max {
                            continue;
                        }
                        1.0
                    }
                    Mask::Gaussian => {
                        let r2 = dx * dx + dy * dy;
                        if r2 > r2_max {
                            continue;
                        }
                        (-r2 / (2.0 * sigma * sigma)).exp()
                    }
                };

                let along = dx * cos_t - dy * sin_t;
                let cycles = (along * cycles_per_px + g.phase).rem_euclid(1.0);
                let idx = ((cycles * SINE_TABLE_LEN as f64) as usize).min(SINE_TABLE_LEN - 1);
                let lum = contrast * envelope * sine[idx] as f64;

                dst[row + x] = pack_grey(grey_level(lum));
                modulated += 1;
            }
        }
        modulated
    }
}

/// Luminance in [-1, 1] to an 8-bit grey level with 0 at mid grey.
fn grey_level(luminance: f64) -> u8 {
    (127.5 + 127.5 * luminance.clamp(-1.0, 1.0)).round() as u8
}

fn pack_grey(v: u8) -> u32 {
    let v = v as u32;
    (255 << 24) | (v << 16) | (v << 8) | v
}
