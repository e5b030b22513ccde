use super::choice::ChoiceTopology;
use super::{StimulusDraw, TrialManager, check_interval, compile_trial};
use crate::compiled::{CompiledDetails, CompiledRecord};
use crate::params::GratingParamLists;
use crate::reinforcement::{Reinforcement, check_probability};
use crate::subject::Subject;
use rand::{Rng, RngCore};
use rigex_core::{
    Category, ChosenStimulus, ConfigError, Mask, PhaseSpec, PortId, PortRoles, Station,
    StationTag, TrialRecord, names,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoNoGoConfig {
    pub name: String,
    pub go: GratingParamLists,
    pub nogo: GratingParamLists,
    pub go_probability: f64,
    pub mask: Mask,
    pub do_combos: bool,
    pub iti: f64,
    pub itl: f64,
    pub reinforcement: Reinforcement,
}

impl Default for GoNoGoConfig {
    fn default() -> Self {
        let category = |orientation: f64| {
            GratingParamLists::default()
                .with_orientations(vec![orientation])
                .with_durations(vec![1.0])
        };
        Self {
            name: "DemoGratingsGoNoGoTrialManager".to_string(),
            go: category(-45.0),
            nogo: category(45.0),
            go_probability: 0.5,
            mask: Mask::Circular,
            do_combos: true,
            iti: 1.0,
            itl: 0.0,
            reinforcement: Reinforcement::constant(),
        }
    }
}

/// Go/No-Go gratings on the choice topology. The sampled category picks the
/// grating parameters and is recorded with the stimulus.
#[derive(Debug, Clone)]
pub struct GratingsGoNoGo {
    config: GoNoGoConfig,
    request: PortId,
    response_ports: [PortId; 2],
}

impl GratingsGoNoGo {
    pub fn new(config: GoNoGoConfig) -> Result<Self, ConfigError> {
        let owner = config.name.as_str();
        config.go.validate(&format!("{owner} (Go)"), config.do_combos, true)?;
        config.nogo.validate(&format!("{owner} (NoGo)"), config.do_combos, true)?;
        check_probability(owner, "go_probability", config.go_probability)?;
        check_interval(owner, config.iti)?;
        config.reinforcement.validate(owner)?;
        Ok(Self {
            config,
            request: PortId::new(names::CENTER_PORT),
            response_ports: [
                PortId::new(names::LEFT_PORT),
                PortId::new(names::RIGHT_PORT),
            ],
        })
    }

    pub fn config(&self) -> &GoNoGoConfig {
        &self.config
    }
}

impl TrialManager for GratingsGoNoGo {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn class_name(&self) -> &'static str {
        "GratingsGoNoGo"
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
        let (category, lists) = if rng.random_bool(self.config.go_probability) {
            (Category::Go, &self.config.go)
        } else {
            (Category::NoGo, &self.config.nogo)
        };
        let t = rng.random_range(0..self.response_ports.len());
        let target = self.response_ports[t].clone();
        let distractor = self.response_ports[1 - t].clone();
        let grating = lists.sample(rng, self.config.do_combos, resolution, self.config.mask);
        let frames = resolution.frames_for(grating.duration);
        let roles = PortRoles {
            request: Some(self.request.clone()),
            targets: vec![target],
            distractors: vec![distractor],
        };
        record.chosen_stim = Some(ChosenStimulus {
            grating: grating.clone(),
            category: Some(category),
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
            || CompiledDetails::default().with_responses().with_categories(),
            record,
            Some(&self.request),
        )
    }
}
