use super::{StimulusDraw, TrialManager, blank, check_interval, compile_trial};
use crate::builder::{PhaseTemplate, build_phases};
use crate::compiled::{CompiledDetails, CompiledRecord};
use crate::delay::DelayDistribution;
use crate::params::GratingParamLists;
use crate::reinforcement::Reinforcement;
use crate::subject::Subject;
use rand::RngCore;
use rigex_core::{
    ChosenStimulus, ConfigError, Mask, PhaseEffect, PhaseKind, PhaseSpec, PortId, PortRoles,
    Station, StationTag, Stimulus, TrialRecord, ValveId, names,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoOnlyConfig {
    pub name: String,
    pub stimulus: GratingParamLists,
    pub mask: Mask,
    pub do_combos: bool,
    pub delay: DelayDistribution,
    pub iti: f64,
    pub itl: f64,
    pub reinforcement: Reinforcement,
}

impl Default for GoOnlyConfig {
    fn default() -> Self {
        Self {
            name: "DemoGratingsGoOnlyTrialManager".to_string(),
            stimulus: GratingParamLists::default()
                .with_orientations(vec![-45.0])
                .with_durations(vec![2.0]),
            mask: Mask::None,
            do_combos: true,
            delay: DelayDistribution::default(),
            iti: 1.0,
            itl: 0.0,
            reinforcement: Reinforcement::constant(),
        }
    }
}

/// Go-only with a sampled delay: after the delay a go cue opens a response
/// window on the lick port. A lick is rewarded, silence is punished.
#[derive(Debug, Clone)]
pub struct GratingsGoOnly {
    config: GoOnlyConfig,
    response_port: PortId,
}

impl GratingsGoOnly {
    pub fn new(config: GoOnlyConfig) -> Result<Self, ConfigError> {
        let owner = config.name.as_str();
        config.stimulus.validate(owner, config.do_combos, true)?;
        config.delay.validate()?;
        check_interval(owner, config.iti)?;
        config.reinforcement.validate(owner)?;
        Ok(Self {
            config,
            response_port: PortId::new(names::RESPONSE_PORT),
        })
    }

    pub fn config(&self) -> &GoOnlyConfig {
        &self.config
    }
}

impl TrialManager for GratingsGoOnly {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn class_name(&self) -> &'static str {
        "GratingsGoOnly"
    }

    fn accepted_stations(&self) -> &'static [StationTag] {
        &[StationTag::Keyboard, StationTag::VisionHeadfix]
    }

    fn reinforcement(&self) -> &Reinforcement {
        &self.config.reinforcement
    }

    fn calc_stim(
        &self,
        record: &mut TrialRecord,
        station: &dyn Station,
        rng: &mut dyn RngCore,
    ) -> StimulusDraw {
        let resolution = self.choose_resolution(station);
        let grating =
            self.config
                .stimulus
                .sample(rng, self.config.do_combos, resolution, self.config.mask);
        let frames = resolution.frames_for(grating.duration);
        let delay_frames = self.config.delay.sample_frames(rng, resolution.refresh_hz);
        let roles = PortRoles {
            request: None,
            targets: vec![self.response_port.clone()],
            distractors: Vec::new(),
        };
        record.chosen_stim = Some(ChosenStimulus {
            grating: grating.clone(),
            category: None,
            delay_frames: Some(delay_frames),
        });
        record.port_roles = roles.clone();
        StimulusDraw {
            grating,
            resolution,
            frames,
            roles,
        }
    }

    fn setup_phases(
        &self,
        record: &mut TrialRecord,
        station: &dyn Station,
        subject: &Subject,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<PhaseSpec>, ConfigError> {
        let draw = self.calc_stim(record, station, rng);
        let delay_frames = record
            .chosen_stim
            .as_ref()
            .and_then(|s| s.delay_frames)
            .unwrap_or_default();
        let hz = draw.resolution.refresh_hz;
        let outcome = self.config.reinforcement.calculate(subject, rng);
        let frames = outcome.frames(hz);
        let itl = self.config.itl;

        build_phases(
            vec![
                PhaseTemplate::new("delay", PhaseKind::Delay)
                    .show(blank(itl))
                    .frames(delay_frames)
                    .on_timeout("response-window"),
                PhaseTemplate::new("response-window", PhaseKind::Stimulus)
                    .show(Stimulus::Grating(draw.grating))
                    .frames_opt(draw.frames)
                    .sound(names::GO_SOUND, 0.1)
                    .on_port(&self.response_port, "reward")
                    .on_timeout("punishment"),
                PhaseTemplate::new("reward", PhaseKind::Reward)
                    .show(blank(itl))
                    .frames(frames.reward)
                    .effect(PhaseEffect::Reward {
                        valve: ValveId::new(names::REWARD_VALVE),
                    })
                    .sound(names::REWARD_SOUND, outcome.reward_sound_s())
                    .on_timeout("inter-trial"),
                PhaseTemplate::new("punishment", PhaseKind::Punishment)
                    .show(blank(itl))
                    .frames(frames.penalty)
                    .effect(PhaseEffect::Punishment)
                    .sound(names::PUNISHMENT_SOUND, outcome.penalty_sound_s())
                    .on_timeout("inter-trial"),
                PhaseTemplate::new("inter-trial", PhaseKind::InterTrial)
                    .show(blank(itl))
                    .frames((self.config.iti * hz).round() as u64),
            ],
            hz,
        )
    }

    fn trial_compiler<'c>(
        &self,
        compiled: &'c mut CompiledRecord,
        record: &TrialRecord,
    ) -> &'c CompiledDetails {
        compile_trial(
            compiled,
            self.class_name(),
            || CompiledDetails::default().with_delays().with_responses(),
            record,
            Some(&self.response_port),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rigex_core::FrameBudget;
    use rigex_station::{SimulatedStation, StationConfig, StationKind};

    #[test]
    fn delay_phase_uses_sampled_frames() {
        let tm = GratingsGoOnly::new(GoOnlyConfig {
            delay: DelayDistribution::Constant { seconds: 0.5 },
            ..Default::default()
        })
        .unwrap();
        let st = SimulatedStation::new(StationConfig {
            kind: StationKind::VisionHeadfix,
            ..StationConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(4);
        let mut record = TrialRecord::new(1);
        let phases = tm
            .setup_phases(&mut record, &st, &Subject::default(), &mut rng)
            .unwrap();
        assert_eq!(phases[0].kind, PhaseKind::Delay);
        assert_eq!(phases[0].budget, FrameBudget::Frames(30));
        assert_eq!(phases[1].budget, FrameBudget::Frames(120));
        assert_eq!(record.chosen_stim.unwrap().delay_frames, Some(30));
        assert_eq!(
            phases[1].transitions.port_target(&PortId::new(names::RESPONSE_PORT)),
            Some(2)
        );
        assert_eq!(phases[1].transitions.timeout_target(), Some(3));
    }

    #[test]
    fn rejects_three_port_rigs() {
        let tm = GratingsGoOnly::new(GoOnlyConfig::default()).unwrap();
        let st = SimulatedStation::new(StationConfig::default());
        assert!(!tm.station_ok(&st));
    }

    #[test]
    fn invalid_delay_is_a_config_error() {
        let err = GratingsGoOnly::new(GoOnlyConfig {
            delay: DelayDistribution::Uniform { lo: 3.0, hi: 1.0 },
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDelay(_)));
    }
}
