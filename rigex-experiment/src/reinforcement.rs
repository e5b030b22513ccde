use crate::subject::Subject;
use rand::{Rng, RngCore};
use rigex_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Reinforcement magnitudes for one trial, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementOutcome {
    pub reward_ms: f64,
    pub request_reward_ms: f64,
    pub penalty_ms: f64,
    pub reward_sound_ms: f64,
    pub penalty_sound_ms: f64,
}

/// [`ReinforcementOutcome`] converted to frame counts at a refresh rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReinforcementFrames {
    pub reward: u64,
    pub request_reward: u64,
    pub penalty: u64,
}

impl ReinforcementOutcome {
    /// `round(ms / 1000 * refresh_hz)`, never negative.
    pub fn to_frames(ms: f64, refresh_hz: f64) -> u64 {
        (ms / 1000.0 * refresh_hz).round().max(0.0) as u64
    }

    pub fn frames(&self, refresh_hz: f64) -> ReinforcementFrames {
        ReinforcementFrames {
            reward: Self::to_frames(self.reward_ms, refresh_hz),
            request_reward: Self::to_frames(self.request_reward_ms, refresh_hz),
            penalty: Self::to_frames(self.penalty_ms, refresh_hz),
        }
    }

    pub fn reward_sound_s(&self) -> f64 {
        self.reward_sound_ms / 1000.0
    }

    pub fn penalty_sound_s(&self) -> f64 {
        self.penalty_sound_ms / 1000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantReinforcement {
    pub reward_ms: f64,
    pub request_reward_ms: f64,
    pub penalty_ms: f64,
    pub fraction_reward_sound_on: f64,
    pub fraction_penalty_sound_on: f64,
}

impl Default for ConstantReinforcement {
    fn default() -> Self {
        Self {
            reward_ms: 20.0,
            request_reward_ms: 0.0,
            penalty_ms: 1000.0,
            fraction_reward_sound_on: 1.0,
            fraction_penalty_sound_on: 1.0,
        }
    }
}

impl ConstantReinforcement {
    fn outcome(&self, subject: &Subject) -> ReinforcementOutcome {
        let reward_ms = subject.reward_ms.unwrap_or(self.reward_ms);
        let penalty_ms = subject.timeout_ms.unwrap_or(self.penalty_ms);
        ReinforcementOutcome {
            reward_ms,
            request_reward_ms: self.request_reward_ms,
            penalty_ms,
            reward_sound_ms: self.fraction_reward_sound_on * reward_ms,
            penalty_sound_ms: self.fraction_penalty_sound_on * penalty_ms,
        }
    }

    fn validate(&self, owner: &str) -> Result<(), ConfigError> {
        for (field, value) in [
            ("fraction_reward_sound_on", self.fraction_reward_sound_on),
            ("fraction_penalty_sound_on", self.fraction_penalty_sound_on),
        ] {
            check_probability(owner, field, value)?;
        }
        for value in [self.reward_ms, self.request_reward_ms, self.penalty_ms] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidDuration {
                    owner: owner.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Constant reinforcement whose reward is only given with `probability`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomReinforcement {
    pub probability: f64,
    pub reward_ms: f64,
    pub request_reward_ms: f64,
    pub penalty_ms: f64,
    pub fraction_reward_sound_on: f64,
    pub fraction_penalty_sound_on: f64,
}

impl Default for RandomReinforcement {
    fn default() -> Self {
        let base = ConstantReinforcement::default();
        Self {
            probability: 0.5,
            reward_ms: base.reward_ms,
            request_reward_ms: base.request_reward_ms,
            penalty_ms: base.penalty_ms,
            fraction_reward_sound_on: base.fraction_reward_sound_on,
            fraction_penalty_sound_on: base.fraction_penalty_sound_on,
        }
    }
}

impl RandomReinforcement {
    fn base(&self) -> ConstantReinforcement {
        ConstantReinforcement {
            reward_ms: self.reward_ms,
            request_reward_ms: self.request_reward_ms,
            penalty_ms: self.penalty_ms,
            fraction_reward_sound_on: self.fraction_reward_sound_on,
            fraction_penalty_sound_on: self.fraction_penalty_sound_on,
        }
    }
}

/// Policy mapping subject state to reward and punishment magnitudes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reinforcement {
    #[default]
    None,
    Constant(ConstantReinforcement),
    Random(RandomReinforcement),
}

impl Reinforcement {
    pub fn name(&self) -> &'static str {
        match self {
            Reinforcement::None => "NoReinforcement",
            Reinforcement::Constant(_) => "ConstantReinforcement",
            Reinforcement::Random(_) => "RandomReinforcement",
        }
    }

    pub fn constant() -> Self {
        Reinforcement::Constant(ConstantReinforcement::default())
    }

    pub fn validate(&self, owner: &str) -> Result<(), ConfigError> {
        match self {
            Reinforcement::None => Ok(()),
            Reinforcement::Constant(c) => c.validate(owner),
            Reinforcement::Random(r) => {
                check_probability(owner, "probability", r.probability)?;
                r.base().validate(owner)
            }
        }
    }

    /// Pure given the state of `rng`; only the random policy draws from it.
    pub fn calculate(&self, subject: &Subject, rng: &mut dyn RngCore) -> ReinforcementOutcome {
        match self {
            Reinforcement::None => ReinforcementOutcome::default(),
            Reinforcement::Constant(c) => c.outcome(subject),
            Reinforcement::Random(r) => {
                let mut outcome = r.base().outcome(subject);
                if !rng.random_bool(r.probability.clamp(0.0, 1.0)) {
                    outcome.reward_ms = 0.0;
                    outcome.reward_sound_ms = 0.0;
                }
                outcome
            }
        }
    }
}

pub(crate) fn check_probability(
    owner: &str,
    field: &'static str,
    value: f64,
) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability {
            owner: owner.to_string(),
            field,
            value,
        })
    }
}
