use serde::{Deserialize, Serialize};

/// Aperture applied to a grating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mask {
    #[default]
    None,
    /// Hard circular edge.
    Circular,
    /// Gaussian fall-off towards the radius.
    Gaussian,
}

impl Mask {
    pub fn label(&self) -> &'static str {
        match self {
            Mask::None => "None",
            Mask::Circular => "Circular",
            Mask::Gaussian => "Gaussian",
        }
    }
}

/// Display geometry a trial is rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub height: u32,
    pub width: u32,
    pub refresh_hz: f64,
}

impl Resolution {
    /// Frames needed to cover `seconds`, `None` for an unbounded duration.
    pub fn frames_for(&self, seconds: f64) -> Option<u64> {
        if seconds.is_finite() {
            Some((self.refresh_hz * seconds).round().max(0.0) as u64)
        } else {
            None
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            height: 1080,
            width: 1920,
            refresh_hz: 60.0,
        }
    }
}

/// One sampled grating configuration.
///
/// Angles are in degrees, `phase` is in cycles, `drift_frequency` in Hz and
/// `duration` in seconds (`f64::INFINITY` for a response-terminated
/// stimulus). `location` is the normalised screen position of the centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GratingParams {
    pub deg_per_cycle: f64,
    pub orientation: f64,
    pub drift_frequency: f64,
    pub phase: f64,
    pub contrast: f64,
    pub duration: f64,
    pub radius: f64,
    pub location: (f64, f64),
    pub mask: Mask,
    pub height: u32,
    pub width: u32,
    pub refresh_hz: f64,
}

impl GratingParams {
    pub fn resolution(&self) -> Resolution {
        Resolution {
            height: self.height,
            width: self.width,
            refresh_hz: self.refresh_hz,
        }
    }
}

/// Semantic category of a Go/No-Go stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Go,
    NoGo,
}

/// The stimulus configuration recorded on a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenStimulus {
    pub grating: GratingParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_frames: Option<u64>,
}

/// Something the station can draw for one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Stimulus {
    Grating(GratingParams),
    /// Uniform field; luminance in [-1, 1] with 0 at mean grey.
    Blank { luminance: f64 },
}

impl Stimulus {
    pub fn is_grating(&self) -> bool {
        matches!(self, Stimulus::Grating(_))
    }
}

/// Per-frame rule applied to a phase's stimulus after it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum UpdateRule {
    #[default]
    Hold,
    /// Advance grating phase by `drift_frequency / refresh_hz` cycles.
    Drift,
}

impl UpdateRule {
    pub fn apply(&self, stimulus: &mut Stimulus) {
        if let (UpdateRule::Drift, Stimulus::Grating(g)) = (self, stimulus) {
            if g.drift_frequency != 0.0 && g.refresh_hz > 0.0 {
                g.phase += g.drift_frequency / g.refresh_hz;
            }
        }
    }

    /// Grating phase after `frames` applications, starting from `initial`.
    pub fn phase_after(&self, initial: &GratingParams, frames: u64) -> f64 {
        match self {
            UpdateRule::Hold => initial.phase,
            UpdateRule::Drift if initial.drift_frequency == 0.0 || initial.refresh_hz <= 0.0 => {
                initial.phase
            }
            UpdateRule::Drift => {
                initial.phase + frames as f64 * initial.drift_frequency / initial.refresh_hz
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grating(drift: f64) -> GratingParams {
        GratingParams {
            deg_per_cycle: 10.0,
            orientation: 45.0,
            drift_frequency: drift,
            phase: 0.0,
            contrast: 1.0,
            duration: 1.0,
            radius: 40.0,
            location: (0.5, 0.5),
            mask: Mask::None,
            height: 1080,
            width: 1920,
            refresh_hz: 60.0,
        }
    }

    #[test]
    fn drift_advances_phase_per_frame() {
        let mut stim = Stimulus::Grating(grating(2.0));
        for _ in 0..30 {
            UpdateRule::Drift.apply(&mut stim);
        }
        let Stimulus::Grating(g) = stim else {
            unreachable!()
        };
        assert!((g.phase - 1.0).abs() < 1e-9);
        assert!((UpdateRule::Drift.phase_after(&grating(2.0), 30) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn static_grating_never_moves() {
        let mut stim = Stimulus::Grating(grating(0.0));
        UpdateRule::Drift.apply(&mut stim);
        assert_eq!(stim, Stimulus::Grating(grating(0.0)));
    }

    #[test]
    fn frames_for_rounds_and_handles_infinity() {
        let res = Resolution::default();
        assert_eq!(res.frames_for(2.0), Some(120));
        assert_eq!(res.frames_for(0.05), Some(3));
        assert_eq!(res.frames_for(f64::INFINITY), None);
    }
}
