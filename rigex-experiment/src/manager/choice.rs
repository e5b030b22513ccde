use super::{blank, reward_valve_for};
use crate::builder::{PhaseTemplate, build_phases};
use crate::reinforcement::ReinforcementOutcome;
use rigex_core::{
    ConfigError, GratingParams, PhaseEffect, PhaseKind, PhaseSpec, PortId, Stimulus, names,
};

/// Request / choose / reinforce topology shared by the 2AFC and Go/No-Go
/// paradigms.
///
/// ```text
/// pre-request --request--> stim --target--> reward ------> inter-trial
///                           |  --distractor--> punishment -^
///                           +--timeout--> post-stim (finite stimuli only)
/// ```
pub(crate) struct ChoiceTopology<'a> {
    pub grating: &'a GratingParams,
    pub stim_frames: Option<u64>,
    pub request: &'a PortId,
    pub target: &'a PortId,
    pub distractor: &'a PortId,
    pub outcome: ReinforcementOutcome,
    pub refresh_hz: f64,
    pub itl: f64,
    pub iti: f64,
}

impl ChoiceTopology<'_> {
    pub fn build(&self) -> Result<Vec<PhaseSpec>, ConfigError> {
        let hz = self.refresh_hz;
        let frames = self.outcome.frames(hz);
        let iti_frames = (self.iti * hz).round().max(0.0) as u64;

        let mut stim = PhaseTemplate::new("stim", PhaseKind::Stimulus)
            .show(Stimulus::Grating(self.grating.clone()))
            .frames_opt(self.stim_frames)
            .sound(names::STIM_START_SOUND, 0.05)
            .on_port(self.target, "reward")
            .on_port(self.distractor, "punishment");
        if self.stim_frames.is_some() {
            stim = stim.on_timeout("post-stim");
        }

        let mut phases = vec![
            PhaseTemplate::new("pre-request", PhaseKind::PreRequest)
                .show(blank(self.itl))
                .sound(names::TRIAL_START_SOUND, 0.05)
                .on_port(self.request, "stim"),
            stim,
        ];
        if self.stim_frames.is_some() {
            phases.push(
                PhaseTemplate::new("post-stim", PhaseKind::PostStimulus)
                    .show(blank(self.itl))
                    .on_port(self.target, "reward")
                    .on_port(self.distractor, "punishment"),
            );
        }
        phases.extend([
            PhaseTemplate::new("reward", PhaseKind::Reward)
                .show(blank(self.itl))
                .frames(frames.reward)
                .effect(PhaseEffect::Reward {
                    valve: reward_valve_for(self.target),
                })
                .sound(names::CORRECT_SOUND, self.outcome.reward_sound_s())
                .on_timeout("inter-trial"),
            PhaseTemplate::new("punishment", PhaseKind::Punishment)
                .show(blank(0.0))
                .frames(frames.penalty)
                .effect(PhaseEffect::Punishment)
                .sound(names::PUNISHMENT_SOUND, self.outcome.penalty_sound_s())
                .on_timeout("inter-trial"),
            PhaseTemplate::new("inter-trial", PhaseKind::InterTrial)
                .show(blank(self.itl))
                .frames(iti_frames)
                .sound(names::TRIAL_END_SOUND, 0.05),
        ]);
        build_phases(phases, hz)
    }
}
