use rigex_core::{
    ConfigError, FrameBudget, PhaseEffect, PhaseKind, PhaseSpec, PortId, ResponseSymbol,
    SoundCue, Stimulus, Transitions, UpdateRule,
};

/// Input that moves a trial out of a phase.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Timeout,
    Port(PortId),
}

/// A phase described by name, with transitions pointing at other templates
/// by name. [`build_phases`] resolves names to indices.
#[derive(Debug, Clone)]
pub struct PhaseTemplate {
    pub name: &'static str,
    pub kind: PhaseKind,
    pub stimulus: Option<Stimulus>,
    pub update: UpdateRule,
    pub frames: Option<u64>,
    pub auto_trigger: bool,
    pub effect: PhaseEffect,
    pub sounds: Vec<SoundCue>,
    pub next: Vec<(Trigger, &'static str)>,
}

impl PhaseTemplate {
    /// A plain phase with an unbounded frame budget and no transitions.
    pub fn new(name: &'static str, kind: PhaseKind) -> Self {
        Self {
            name,
            kind,
            stimulus: None,
            update: UpdateRule::Hold,
            frames: None,
            auto_trigger: false,
            effect: PhaseEffect::Plain,
            sounds: Vec::new(),
            next: Vec::new(),
        }
    }

    pub fn show(mut self, stimulus: Stimulus) -> Self {
        if stimulus.is_grating() {
            self.update = UpdateRule::Drift;
        }
        self.stimulus = Some(stimulus);
        self
    }

    pub fn frames(mut self, frames: u64) -> Self {
        self.frames = Some(frames);
        self
    }

    /// `None` leaves the phase unbounded.
    pub fn frames_opt(mut self, frames: Option<u64>) -> Self {
        self.frames = frames;
        self
    }

    pub fn effect(mut self, effect: PhaseEffect) -> Self {
        self.effect = effect;
        self
    }

    pub fn sound(mut self, name: &str, duration_s: f64) -> Self {
        self.sounds.push(SoundCue::new(name, duration_s));
        self
    }

    pub fn on_timeout(mut self, target: &'static str) -> Self {
        self.next.push((Trigger::Timeout, target));
        self
    }

    pub fn on_port(mut self, port: &PortId, target: &'static str) -> Self {
        self.next.push((Trigger::Port(port.clone()), target));
        self
    }
}

/// Numbers the templates in order, resolves transition targets and checks
/// the result with [`validate_phases`].
pub fn build_phases(
    templates: Vec<PhaseTemplate>,
    refresh_hz: f64,
) -> Result<Vec<PhaseSpec>, ConfigError> {
    let names: Vec<&'static str> = templates.iter().map(|t| t.name).collect();
    let mut phases = Vec::with_capacity(templates.len());
    for (number, t) in templates.into_iter().enumerate() {
        let mut transitions = Transitions::terminal();
        for (trigger, target) in &t.next {
            let Some(index) = names.iter().position(|n| n == target) else {
                return Err(ConfigError::UnknownTarget {
                    phase: t.name.to_string(),
                    target: target.to_string(),
                });
            };
            let symbol = match trigger {
                Trigger::Timeout => ResponseSymbol::NoInput,
                Trigger::Port(p) => ResponseSymbol::Port(p.clone()),
            };
            transitions.set(symbol, index);
        }
        phases.push(PhaseSpec {
            number,
            name: t.name.to_string(),
            kind: t.kind,
            stimulus: t.stimulus,
            update: t.update,
            transitions,
            budget: FrameBudget::from_frames(t.frames),
            auto_trigger: t.auto_trigger,
            effect: t.effect,
            sounds: t.sounds,
            refresh_hz,
        });
    }
    validate_phases(&phases)?;
    Ok(phases)
}

/// Rejects sequences the runner could get stuck in: an unbounded phase must
/// be left by a response, a bounded non-terminal phase needs a timeout
/// target, and every target must exist.
pub fn validate_phases(phases: &[PhaseSpec]) -> Result<(), ConfigError> {
    if phases.is_empty() {
        return Err(ConfigError::NoPhases);
    }
    for phase in phases {
        if let Some((_, target)) = phase.transitions.iter().find(|(_, n)| *n >= phases.len()) {
            return Err(ConfigError::UnknownTarget {
                phase: phase.name.clone(),
                target: target.to_string(),
            });
        }
        if phase.budget.is_infinite() && !phase.transitions.has_port_transition() {
            return Err(ConfigError::UnboundedPhase {
                phase: phase.name.clone(),
            });
        }
        if !phase.budget.is_infinite()
            && !phase.is_last_phase()
            && phase.transitions.timeout_target().is_none()
        {
            return Err(ConfigError::MissingTimeout {
                phase: phase.name.clone(),
            });
        }
    }
    Ok(())
}
