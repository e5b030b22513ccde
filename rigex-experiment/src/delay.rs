use rand::{Rng, RngCore};
use rigex_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Distribution the pre-stimulus delay of a go-only trial is drawn from, in
/// seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DelayDistribution {
    Constant { seconds: f64 },
    /// Absolute value of a uniform draw on `[lo, hi)`.
    Uniform { lo: f64, hi: f64 },
    /// Absolute value of a normal draw.
    Gaussian { mu: f64, sd: f64 },
    /// `fixed + Exponential(mean = -value / ln(1 - percentile))`, clamped to
    /// `max`.
    FlatHazard {
        percentile: f64,
        value: f64,
        fixed: f64,
        max: f64,
    },
}

impl Default for DelayDistribution {
    fn default() -> Self {
        DelayDistribution::Constant { seconds: 2.0 }
    }
}

impl DelayDistribution {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = |vals: &[f64]| vals.iter().all(|v| v.is_finite());
        match *self {
            DelayDistribution::Constant { seconds } if !(finite(&[seconds]) && seconds >= 0.0) => {
                Err(ConfigError::InvalidDelay(format!(
                    "constant delay must be finite and non-negative, found {seconds}"
                )))
            }
            DelayDistribution::Uniform { lo, hi } if !(finite(&[lo, hi]) && lo <= hi) => Err(
                ConfigError::InvalidDelay(format!("uniform bounds [{lo}, {hi}) are not ordered")),
            ),
            DelayDistribution::Gaussian { mu, sd } if !(finite(&[mu, sd]) && sd >= 0.0) => Err(
                ConfigError::InvalidDelay(format!("gaussian needs finite mu and sd >= 0, found ({mu}, {sd})")),
            ),
            DelayDistribution::FlatHazard {
                percentile,
                value,
                fixed,
                max,
            } => {
                if !(percentile > 0.0 && percentile < 1.0) {
                    return Err(ConfigError::InvalidDelay(format!(
                        "flat hazard percentile must lie in (0, 1), found {percentile}"
                    )));
                }
                if !(finite(&[value, fixed, max]) && value > 0.0 && fixed <= max) {
                    return Err(ConfigError::InvalidDelay(format!(
                        "flat hazard needs value > 0 and fixed <= max, found value={value} fixed={fixed} max={max}"
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        match *self {
            DelayDistribution::Constant { seconds } => seconds,
            DelayDistribution::Uniform { lo, hi } => {
                if lo < hi {
                    rng.random_range(lo..hi).abs()
                } else {
                    lo.abs()
                }
            }
            DelayDistribution::Gaussian { mu, sd } => (mu + sd * standard_normal(rng)).abs(),
            DelayDistribution::FlatHazard {
                percentile,
                value,
                fixed,
                max,
            } => {
                let mean = -value / (1.0 - percentile).ln();
                (fixed + exponential(rng, mean)).min(max)
            }
        }
    }

    /// Sampled delay converted to frames at `refresh_hz`.
    pub fn sample_frames(&self, rng: &mut dyn RngCore, refresh_hz: f64) -> u64 {
        (self.sample(rng) * refresh_hz).round().max(0.0) as u64
    }
}

fn exponential(rng: &mut dyn RngCore, mean: f64) -> f64 {
    let u: f64 = rng.random();
    -mean * (1.0 - u).ln()
}

// Box-Muller; u1 lies in (0, 1] so the log stays finite.
fn standard_normal(rng: &mut dyn RngCore) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn flat_hazard_never_exceeds_max() {
        let dist = DelayDistribution::FlatHazard {
            percentile: 0.5,
            value: 1.0,
            fixed: 0.0,
            max: 5.0,
        };
        dist.validate().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let d = dist.sample(&mut rng);
            assert!((0.0..=5.0).contains(&d), "delay {d} out of range");
        }
    }

    #[test]
    fn flat_hazard_mean_matches_percentile() {
        // With percentile 0.5 the median of the exponential part equals `value`.
        let dist = DelayDistribution::FlatHazard {
            percentile: 0.5,
            value: 1.0,
            fixed: 0.0,
            max: f64::MAX,
        };
        let mut rng = StdRng::seed_from_u64(9);
        let mut draws: Vec<f64> = (0..20_001).map(|_| dist.sample(&mut rng)).collect();
        draws.sort_by(f64::total_cmp);
        let median = draws[draws.len() / 2];
        assert!((median - 1.0).abs() < 0.05, "median {median}");
    }

    #[test]
    fn uniform_and_gaussian_are_absolute() {
        let mut rng = StdRng::seed_from_u64(3);
        let uni = DelayDistribution::Uniform { lo: -2.0, hi: -1.0 };
        let gauss = DelayDistribution::Gaussian { mu: 0.0, sd: 1.0 };
        for _ in 0..1000 {
            let u = uni.sample(&mut rng);
            assert!((1.0..=2.0).contains(&u));
            assert!(gauss.sample(&mut rng) >= 0.0);
        }
    }

    #[test]
    fn constant_delay_in_frames() {
        let mut rng = StdRng::seed_from_u64(0);
        let dist = DelayDistribution::default();
        assert_eq!(dist.sample_frames(&mut rng, 60.0), 120);
    }

    #[test]
    fn rejects_degenerate_parameters() {
        let bad = [
            DelayDistribution::Constant { seconds: -1.0 },
            DelayDistribution::Uniform { lo: 2.0, hi: 1.0 },
            DelayDistribution::Gaussian { mu: 0.0, sd: -1.0 },
            DelayDistribution::FlatHazard {
                percentile: 1.0,
                value: 1.0,
                fixed: 0.0,
                max: 5.0,
            },
        ];
        for d in bad {
            assert!(matches!(d.validate(), Err(ConfigError::InvalidDelay(_))), "{d:?}");
        }
    }
}
