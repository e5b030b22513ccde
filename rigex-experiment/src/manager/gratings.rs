use super::{
    StimulusDraw, TrialManager, blank, check_interval, compile_trial, free_reward_valve,
};
use crate::builder::{PhaseTemplate, build_phases};
use crate::compiled::{CompiledDetails, CompiledRecord};
use crate::params::GratingParamLists;
use crate::reinforcement::Reinforcement;
use crate::subject::Subject;
use rand::RngCore;
use rigex_core::{
    ChosenStimulus, ConfigError, Mask, PhaseEffect, PhaseKind, PhaseSpec, PortRoles, Station,
    StationTag, Stimulus, TrialRecord, names,
};
use serde::{Deserialize, Serialize};

/// Frames between the end of the stimulus and the reward, so the reward
/// sound does not overlap the stimulus sound.
const PRE_REWARD_FRAMES: u64 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GratingsConfig {
    pub name: String,
    pub stimulus: GratingParamLists,
    pub mask: Mask,
    pub do_combos: bool,
    /// Inter-trial interval, seconds.
    pub iti: f64,
    /// Inter-trial luminance.
    pub itl: f64,
    pub reinforcement: Reinforcement,
}

impl Default for GratingsConfig {
    fn default() -> Self {
        Self {
            name: "DemoGratingsTrialManager".to_string(),
            stimulus: GratingParamLists {
                radii: vec![400.0],
                ..GratingParamLists::default()
            },
            mask: Mask::None,
            do_combos: true,
            iti: 1.0,
            itl: 0.0,
            reinforcement: Reinforcement::None,
        }
    }
}

/// Passive display of one grating per trial, optionally followed by a free
/// reward. No port gates any transition.
#[derive(Debug, Clone)]
pub struct Gratings {
    config: GratingsConfig,
}

impl Gratings {
    pub fn new(config: GratingsConfig) -> Result<Self, ConfigError> {
        let owner = config.name.as_str();
        config.stimulus.validate(owner, config.do_combos, true)?;
        check_interval(owner, config.iti)?;
        config.reinforcement.validate(owner)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GratingsConfig {
        &self.config
    }
}

impl TrialManager for Gratings {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn class_name(&self) -> &'static str {
        "Gratings"
    }

    fn accepted_stations(&self) -> &'static [StationTag] {
        &[
            StationTag::VisionBehavior,
            StationTag::VisionHeadfix,
            StationTag::Keyboard,
        ]
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
        let roles = PortRoles {
            request: None,
            targets: Vec::new(),
            distractors: station.ports().to_vec(),
        };
        record.chosen_stim = Some(ChosenStimulus {
            grating: grating.clone(),
            category: None,
            delay_frames: None,
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
        let hz = draw.resolution.refresh_hz;
        let outcome = self.config.reinforcement.calculate(subject, rng);
        let reward_frames = outcome.frames(hz).reward;
        let itl = self.config.itl;

        let mut stim = PhaseTemplate::new("stim", PhaseKind::Stimulus)
            .show(Stimulus::Grating(draw.grating))
            .frames_opt(draw.frames)
            .sound(names::TRIAL_START_SOUND, 0.1);
        let mut phases = Vec::with_capacity(4);
        if reward_frames > 0 {
            stim = stim.on_timeout("pre-reward");
            phases.push(stim);
            phases.push(
                PhaseTemplate::new("pre-reward", PhaseKind::PreReward)
                    .show(blank(itl))
                    .frames(PRE_REWARD_FRAMES)
                    .on_timeout("reward"),
            );
            phases.push(
                PhaseTemplate::new("reward", PhaseKind::Reward)
                    .show(blank(itl))
                    .frames(reward_frames)
                    .effect(PhaseEffect::FreeReward {
                        valve: free_reward_valve(station),
                    })
                    .sound(names::REWARD_SOUND, 0.1)
                    .on_timeout("inter-trial"),
            );
        } else {
            phases.push(stim.on_timeout("inter-trial"));
        }
        phases.push(
            PhaseTemplate::new("inter-trial", PhaseKind::InterTrial)
                .show(blank(itl))
                .frames((self.config.iti * hz).round() as u64),
        );
        build_phases(phases, hz)
    }

    fn trial_compiler<'c>(
        &self,
        compiled: &'c mut CompiledRecord,
        record: &TrialRecord,
    ) -> &'c CompiledDetails {
        compile_trial(
            compiled,
            self.class_name(),
            CompiledDetails::default,
            record,
            None,
        )
    }
}
