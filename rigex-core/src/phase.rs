use crate::ident::{PortId, SoundId, ValveId};
use crate::station::Station;
use crate::stimulus::{Stimulus, UpdateRule};
use crate::trial::TrialRecord;
use serde::{Deserialize, Serialize};

/// Category tag of a phase, used by compilers to locate phases in
/// `phase_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseKind {
    PreRequest,
    Delay,
    Stimulus,
    PostStimulus,
    PreReward,
    Reward,
    Punishment,
    InterTrial,
}

impl PhaseKind {
    pub fn is_reinforcement(&self) -> bool {
        matches!(self, PhaseKind::Reward | PhaseKind::Punishment)
    }
}

/// Input symbol looked up in a transition table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResponseSymbol {
    /// Fired when the frame budget runs out.
    NoInput,
    Port(PortId),
}

/// Mapping from response symbol to the index of the next phase. An empty
/// table marks a terminal phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transitions(Vec<(ResponseSymbol, usize)>);

impl Transitions {
    pub fn terminal() -> Self {
        Self::default()
    }

    pub fn on_timeout(mut self, next: usize) -> Self {
        self.set(ResponseSymbol::NoInput, next);
        self
    }

    pub fn on_port(mut self, port: PortId, next: usize) -> Self {
        self.set(ResponseSymbol::Port(port), next);
        self
    }

    /// Later entries for the same symbol replace earlier ones.
    pub fn set(&mut self, symbol: ResponseSymbol, next: usize) {
        match self.0.iter_mut().find(|(s, _)| *s == symbol) {
            Some(entry) => entry.1 = next,
            None => self.0.push((symbol, next)),
        }
    }

    pub fn target(&self, symbol: &ResponseSymbol) -> Option<usize> {
        self.0.iter().find(|(s, _)| s == symbol).map(|(_, n)| *n)
    }

    pub fn timeout_target(&self) -> Option<usize> {
        self.target(&ResponseSymbol::NoInput)
    }

    pub fn port_target(&self, port: &PortId) -> Option<usize> {
        self.0.iter().find_map(|(s, n)| match s {
            ResponseSymbol::Port(p) if p == port => Some(*n),
            _ => None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_port_transition(&self) -> bool {
        self.0.iter().any(|(s, _)| matches!(s, ResponseSymbol::Port(_)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ResponseSymbol, usize)> {
        self.0.iter()
    }
}

/// Frames a phase renders before its timeout transition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBudget {
    Frames(u64),
    Infinite,
}

impl FrameBudget {
    pub fn from_frames(frames: Option<u64>) -> Self {
        frames.map_or(FrameBudget::Infinite, FrameBudget::Frames)
    }

    /// A phase always renders at least one frame, so a zero budget expires
    /// after the first.
    pub fn expired(&self, rendered: u64) -> bool {
        match self {
            FrameBudget::Frames(n) => rendered >= (*n).max(1),
            FrameBudget::Infinite => false,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, FrameBudget::Infinite)
    }
}

/// A sound started on the first frame of a phase and stopped after
/// `duration_s`.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundCue {
    pub sound: SoundId,
    pub duration_s: f64,
}

impl SoundCue {
    pub fn new(sound: &str, duration_s: f64) -> Self {
        Self {
            sound: SoundId::new(sound),
            duration_s,
        }
    }

    /// Rendered frames after which the cue is stopped.
    pub fn frames_at(&self, refresh_hz: f64) -> u64 {
        (self.duration_s.max(0.0) * refresh_hz).round() as u64
    }
}

/// Side effect a phase performs on entry and exit.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseEffect {
    Plain,
    /// Opens the valve once on entry and closes it on exit, so the valve is
    /// open for the phase's frame budget.
    Reward { valve: ValveId },
    /// Like `Reward` but ungraded: passive displays hand out water without
    /// judging a response.
    FreeReward { valve: ValveId },
    /// Timeout with no actuator; marks the trial incorrect.
    Punishment,
}

/// One atomic state of a trial.
#[derive(Debug, Clone)]
pub struct PhaseSpec {
    pub number: usize,
    pub name: String,
    pub kind: PhaseKind,
    pub stimulus: Option<Stimulus>,
    pub update: UpdateRule,
    pub transitions: Transitions,
    pub budget: FrameBudget,
    pub auto_trigger: bool,
    pub effect: PhaseEffect,
    pub sounds: Vec<SoundCue>,
    pub refresh_hz: f64,
}

impl PhaseSpec {
    pub fn is_last_phase(&self) -> bool {
        self.transitions.is_terminal()
    }

    pub fn on_enter(&self, record: &mut TrialRecord, station: &mut dyn Station) {
        match &self.effect {
            PhaseEffect::Plain => {}
            PhaseEffect::Reward { valve } | PhaseEffect::FreeReward { valve } => {
                if matches!(self.effect, PhaseEffect::Reward { .. }) {
                    record.correct = Some(true);
                }
                record.reward_delivered = true;
                if let Err(e) = station.open_valve(valve) {
                    tracing::warn!(
                        component = "phase",
                        condition = "valve_unavailable",
                        phase = %self.name,
                        "{e}"
                    );
                }
            }
            PhaseEffect::Punishment => {
                record.correct = Some(false);
            }
        }
        for cue in &self.sounds {
            if let Some(sound) = station.sound(&cue.sound) {
                sound.seek(0.0);
            }
        }
    }

    pub fn on_frame(&self, _record: &mut TrialRecord, _station: &mut dyn Station) {}

    pub fn on_exit(&self, _record: &mut TrialRecord, station: &mut dyn Station) {
        if let PhaseEffect::Reward { valve } | PhaseEffect::FreeReward { valve } = &self.effect {
            station.close_valve(valve);
        }
        for cue in &self.sounds {
            if let Some(sound) = station.sound(&cue.sound) {
                sound.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_lookup() {
        let left = PortId::new("left_port");
        let t = Transitions::default()
            .on_timeout(2)
            .on_port(left.clone(), 3)
            .on_port(PortId::new("right_port"), 4);
        assert_eq!(t.timeout_target(), Some(2));
        assert_eq!(t.port_target(&left), Some(3));
        assert_eq!(t.port_target(&PortId::new("center_port")), None);
        assert!(t.has_port_transition());
        assert!(!t.is_terminal());
        assert!(Transitions::terminal().is_terminal());
    }

    #[test]
    fn zero_budget_expires_after_one_frame() {
        assert!(!FrameBudget::Frames(0).expired(0));
        assert!(FrameBudget::Frames(0).expired(1));
        assert!(!FrameBudget::Frames(3).expired(2));
        assert!(FrameBudget::Frames(3).expired(3));
        assert!(!FrameBudget::Infinite.expired(u64::MAX));
    }

    #[test]
    fn sound_cue_frames() {
        assert_eq!(SoundCue::new("go_sound", 0.1).frames_at(60.0), 6);
        assert_eq!(SoundCue::new("go_sound", 0.05).frames_at(60.0), 3);
    }
}
