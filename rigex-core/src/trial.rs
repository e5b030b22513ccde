use crate::ident::PortId;
use crate::phase::PhaseKind;
use crate::stimulus::ChosenStimulus;
use serde::{Deserialize, Serialize};

/// A port activation logged during a phase; `time` is seconds since trial
/// start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub port: PortId,
    pub time: f64,
}

/// Data collected while one phase was active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseData {
    pub phase_name: String,
    pub phase_number: usize,
    pub phase_type: PhaseKind,
    pub enter_time: f64,
    pub exit_time: Option<f64>,
    pub frames: u64,
    pub responses: Vec<Response>,
}

impl PhaseData {
    pub fn response_times_on(&self, port: &PortId) -> Vec<f64> {
        self.responses
            .iter()
            .filter(|r| &r.port == port)
            .map(|r| r.time)
            .collect()
    }

    pub fn response_times_off(&self, port: &PortId) -> Vec<f64> {
        self.responses
            .iter()
            .filter(|r| &r.port != port)
            .map(|r| r.time)
            .collect()
    }
}

/// Roles the trial manager assigned to the station's ports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortRoles {
    pub request: Option<PortId>,
    pub targets: Vec<PortId>,
    pub distractors: Vec<PortId>,
}

/// How a trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    Correct,
    Incorrect,
    /// Ran to completion without a correctness judgement.
    Completed,
    ErroredOut,
    ManualQuit,
}

/// Everything recorded about one trial. Owned by the phase runner while the
/// trial executes and handed back to the caller at the end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_number: u64,
    pub trial_manager: String,
    pub trial_manager_class: String,
    pub reinforcement_manager: String,
    pub chosen_stim: Option<ChosenStimulus>,
    pub port_roles: PortRoles,
    pub phase_data: Vec<PhaseData>,
    pub correct: Option<bool>,
    pub reward_delivered: bool,
    pub errored_out: bool,
    pub manual_quit: bool,
}

impl TrialRecord {
    pub fn new(trial_number: u64) -> Self {
        Self {
            trial_number,
            ..Default::default()
        }
    }

    pub fn mark_errored_out(&mut self) {
        self.errored_out = true;
        self.correct = None;
    }

    pub fn mark_manual_quit(&mut self) {
        self.manual_quit = true;
        self.correct = None;
    }

    pub fn disposition(&self) -> Disposition {
        if self.errored_out {
            Disposition::ErroredOut
        } else if self.manual_quit {
            Disposition::ManualQuit
        } else {
            match self.correct {
                Some(true) => Disposition::Correct,
                Some(false) => Disposition::Incorrect,
                None => Disposition::Completed,
            }
        }
    }

    /// First phase of the given category that ran in this trial.
    pub fn phase_of_type(&self, kind: PhaseKind) -> Option<&PhaseData> {
        self.phase_data.iter().find(|p| p.phase_type == kind)
    }

    /// First reward or punishment phase that ran in this trial.
    pub fn reinforcement_phase(&self) -> Option<&PhaseData> {
        self.phase_data.iter().find(|p| p.phase_type.is_reinforcement())
    }
}
