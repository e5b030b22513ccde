use rand::{Rng, RngCore};
use rand::seq::IndexedRandom;
use rigex_core::{ConfigError, GratingParams, Mask, Resolution};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// `n` evenly spaced values from `start` to `stop`, both ends included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Candidate values for each grating parameter. One value per list is drawn
/// for every trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GratingParamLists {
    pub deg_per_cycs: Vec<f64>,
    pub orientations: Vec<f64>,
    pub drift_frequencies: Vec<f64>,
    pub phases: Vec<f64>,
    pub contrasts: Vec<f64>,
    pub durations: Vec<f64>,
    pub radii: Vec<f64>,
    pub locations: Vec<(f64, f64)>,
}

impl Default for GratingParamLists {
    fn default() -> Self {
        Self {
            deg_per_cycs: vec![10.0],
            orientations: vec![45.0],
            drift_frequencies: vec![0.0],
            phases: linspace(-PI, PI, 8),
            contrasts: vec![1.0],
            durations: vec![1.0],
            radii: vec![40.0],
            locations: vec![(0.5, 0.5)],
        }
    }
}

impl GratingParamLists {
    pub fn with_orientations(mut self, orientations: Vec<f64>) -> Self {
        self.orientations = orientations;
        self
    }

    pub fn with_durations(mut self, durations: Vec<f64>) -> Self {
        self.durations = durations;
        self
    }

    fn lengths(&self) -> [(&'static str, usize); 8] {
        [
            ("deg_per_cycs", self.deg_per_cycs.len()),
            ("orientations", self.orientations.len()),
            ("drift_frequencies", self.drift_frequencies.len()),
            ("phases", self.phases.len()),
            ("contrasts", self.contrasts.len()),
            ("durations", self.durations.len()),
            ("radii", self.radii.len()),
            ("locations", self.locations.len()),
        ]
    }

    /// Checks every list is non-empty, that durations are positive (and
    /// finite when `finite_durations`), and that all lists have equal length
    /// when parameters are drawn jointly.
    pub fn validate(
        &self,
        owner: &str,
        do_combos: bool,
        finite_durations: bool,
    ) -> Result<(), ConfigError> {
        for (field, len) in self.lengths() {
            if len == 0 {
                return Err(ConfigError::EmptyList {
                    owner: owner.to_string(),
                    field,
                });
            }
        }
        if !do_combos {
            let expected = self.deg_per_cycs.len();
            if let Some((field, found)) = self.lengths().into_iter().find(|(_, n)| *n != expected) {
                return Err(ConfigError::LengthMismatch {
                    owner: owner.to_string(),
                    field,
                    expected,
                    found,
                });
            }
        }
        for &value in &self.durations {
            let ok = value > 0.0 && (value.is_finite() || !finite_durations);
            if !ok {
                return Err(ConfigError::InvalidDuration {
                    owner: owner.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Draws one grating. With `do_combos` every parameter is drawn
    /// independently, otherwise a single index selects all of them.
    pub fn sample(
        &self,
        rng: &mut dyn RngCore,
        do_combos: bool,
        resolution: Resolution,
        mask: Mask,
    ) -> GratingParams {
        let joint = if do_combos {
            None
        } else {
            Some(rng.random_range(0..self.deg_per_cycs.len().max(1)))
        };
        let mut pick = |list: &[f64]| pick_from(list, joint, rng);
        let deg_per_cycle = pick(&self.deg_per_cycs);
        let orientation = pick(&self.orientations);
        let drift_frequency = pick(&self.drift_frequencies);
        let phase = pick(&self.phases);
        let contrast = pick(&self.contrasts);
        let duration = pick(&self.durations);
        let radius = pick(&self.radii);
        let location = pick_from(&self.locations, joint, rng);
        GratingParams {
            deg_per_cycle,
            orientation,
            drift_frequency,
            phase,
            contrast,
            duration,
            radius,
            location,
            mask,
            height: resolution.height,
            width: resolution.width,
            refresh_hz: resolution.refresh_hz,
        }
    }
}

fn pick_from<T: Copy + Default>(list: &[T], joint: Option<usize>, rng: &mut dyn RngCore) -> T {
    match joint {
        Some(i) => list.get(i).copied().unwrap_or_default(),
        None => list.choose(rng).copied().unwrap_or_default(),
    }
}
