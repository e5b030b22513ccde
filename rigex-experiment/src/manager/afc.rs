use super::choice::ChoiceTopology;
use super::{StimulusDraw, TrialManager, check_interval, compile_trial};
use crate::compiled::{CompiledDetails, CompiledRecord};
use crate::params::GratingParamLists;
use crate::reinforcement::{Reinforcement, check_probability};
use crate::subject::Subject;
use rand::{Rng, RngCore};
use rigex_core::{
    ChosenStimulus, ConfigError, Mask, PhaseSpec, PortId, PortRoles, Station, StationTag,
    TrialRecord, names,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RadiusType {
    #[default]
    Circular,
    Gaussian,
}

impl From<RadiusType> for Mask {
    fn from(r: RadiusType) -> Self {
        match r {
            RadiusType::Circular => Mask::Circular,
            RadiusType::Gaussian => Mask::Gaussian,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gratings2AfcConfig {
    pub name: String,
    /// Parameters shown when the left port is the target.
    pub left: GratingParamLists,
    /// Parameters shown when the right port is the target.
    pub right: GratingParamLists,
    pub radius_type: RadiusType,
    pub left_port_probability: f64,
    pub catch_trial_probability: f64,
    pub do_combos: bool,
    pub iti: f64,
    pub itl: f64,
    pub reinforcement: Reinforcement,
}

impl Default for Gratings2AfcConfig {
    fn default() -> Self {
        let side = |orientation: f64| {
            GratingParamLists::default()
                .with_orientations(vec![orientation])
                .with_durations(vec![f64::INFINITY])
        };
        Self {
            name: "DemoGratings2AFCTrialManager".to_string(),
            left: side(-45.0),
            right: side(45.0),
            radius_type: RadiusType::Circular,
            left_port_probability: 0.5,
            catch_trial_probability: 0.2,
            do_combos: true,
            iti: 1.0,
            itl: 0.0,
            reinforcement: Reinforcement::None,
        }
    }
}

/// Two-alternative forced choice: a center-port request starts the grating,
/// and the subject answers on the left or right port.
#[derive(Debug, Clone)]
pub struct Gratings2Afc {
    config: Gratings2AfcConfig,
    request: PortId,
    left: PortId,
    right: PortId,
}

impl Gratings2Afc {
    pub fn new(config: Gratings2AfcConfig) -> Result<Self, ConfigError> {
        let owner = config.name.as_str();
        config.left.validate(&format!("{owner} (left_port)"), config.do_combos, false)?;
        config.right.validate(&format!("{owner} (right_port)"), config.do_combos, false)?;
        check_probability(owner, "left_port_probability", config.left_port_probability)?;
        check_probability(owner, "catch_trial_probability", config.catch_trial_probability)?;
        check_interval(owner, config.iti)?;
        config.reinforcement.validate(owner)?;
        Ok(Self {
            config,
            request: PortId::new(names::CENTER_PORT),
            left: PortId::new(names::LEFT_PORT),
            right: PortId::new(names::RIGHT_PORT),
        })
    }

    pub fn config(&self) -> &Gratings2AfcConfig {
        &self.config
    }
}

impl TrialManager for Gratings2Afc {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn class_name(&self) -> &'static str {
        "Gratings2AFC"
    }

    fn accepted_stations(&self) -> &'static [StationTag] {
        &[StationTag::VisionBehavior, StationTag::Keyboard]
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
        let target_left = rng.random_bool(self.config.left_port_probability);
        let (target, distractor, lists) = if target_left {
            (&self.left, &self.right, &self.config.left)
        } else {
            (&self.right, &self.left, &self.config.right)
        };
        let grating = lists.sample(
            rng,
            self.config.do_combos,
            resolution,
            self.config.radius_type.into(),
        );
        let frames = resolution.frames_for(grating.duration);
        let roles = PortRoles {
            request: Some(self.request.clone()),
            targets: vec![target.clone()],
            distractors: vec![distractor.clone()],
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
        let outcome = self.config.reinforcement.calculate(subject, rng);
        ChoiceTopology {
            grating: &draw.grating,
            stim_frames: draw.frames,
            request: &self.request,
            target: &draw.roles.targets[0],
            distractor: &draw.roles.distractors[0],
            outcome,
            refresh_hz: draw.resolution.refresh_hz,
            itl: self.config.itl,
            iti: self.config.iti,
        }
        .build()
    }

    fn trial_compiler<'c>(
        &self,
        compiled: &'c mut CompiledRecord,
        record: &TrialRecord,
    ) -> &'c CompiledDetails {
        compile_trial(
            compiled,
            self.class_name(),
            || CompiledDetails::default().with_responses(),
            record,
            Some(&self.request),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rigex_core::{FrameBudget, PhaseKind};
    use rigex_station::{SimulatedStation, StationConfig};

    fn phases_for(config: Gratings2AfcConfig, seed: u64) -> (Vec<PhaseSpec>, TrialRecord) {
        let tm = Gratings2Afc::new(config).unwrap();
        let st = SimulatedStation::new(StationConfig::default());
        let mut rng = StdRng::seed_from_u64(seed);
        let mut record = TrialRecord::new(1);
        let phases = tm
            .setup_phases(&mut record, &st, &Subject::default(), &mut rng)
            .unwrap();
        (phases, record)
    }

    #[test]
    fn unbounded_stimulus_skips_post_stim() {
        let (phases, record) = phases_for(Gratings2AfcConfig::default(), 5);
        let order: Vec<&str> = phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            order,
            ["pre-request", "stim", "reward", "punishment", "inter-trial"]
        );
        assert_eq!(phases[1].budget, FrameBudget::Infinite);
        let roles = &record.port_roles;
        assert_eq!(phases[1].transitions.port_target(&roles.targets[0]), Some(2));
        assert_eq!(phases[1].transitions.port_target(&roles.distractors[0]), Some(3));
        assert_eq!(phases[0].transitions.port_target(&PortId::new(names::CENTER_PORT)), Some(1));
    }

    #[test]
    fn finite_stimulus_times_out_to_post_stim() {
        let mut config = Gratings2AfcConfig::default();
        config.left = config.left.with_durations(vec![0.5]);
        config.right = config.right.with_durations(vec![0.5]);
        let (phases, _) = phases_for(config, 6);
        assert_eq!(phases[1].budget, FrameBudget::Frames(30));
        let post = phases[1].transitions.timeout_target().unwrap();
        assert_eq!(phases[post].kind, PhaseKind::PostStimulus);
        assert_eq!(phases[post].budget, FrameBudget::Infinite);
        assert!(phases[post].transitions.has_port_transition());
    }

    #[test]
    fn target_side_follows_left_port_probability() {
        for (p, side) in [(1.0, names::LEFT_PORT), (0.0, names::RIGHT_PORT)] {
            let (phases, record) = phases_for(
                Gratings2AfcConfig {
                    left_port_probability: p,
                    ..Default::default()
                },
                7,
            );
            assert_eq!(record.port_roles.targets[0].as_str(), side);
            let reward = phases.iter().find(|ph| ph.kind == PhaseKind::Reward).unwrap();
            let expected = PortId::new(side).paired_valve().unwrap();
            assert_eq!(
                reward.effect,
                rigex_core::PhaseEffect::Reward { valve: expected }
            );
        }
    }

    #[test]
    fn joint_draw_requires_equal_lengths_per_side() {
        let err = Gratings2Afc::new(Gratings2AfcConfig {
            do_combos: false,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::LengthMismatch { field: "phases", .. }));
    }
}
