//! Frame-synchronous execution of one trial's phase sequence.
//!
//! A [`TrialRun`] owns the phases and the trial record while the trial is
//! live. Each [`TrialRun::step`] renders exactly one frame: it services the
//! entry sounds, draws and updates the stimulus, polls the ports once,
//! applies the transition table, checks for manual quit and flips. Ambiguous
//! input and manual quit end the trial without presenting the frame.
//! Windowed front ends call `step` from their redraw callback; headless
//! callers use [`run_trial`].

use rigex_core::{PhaseData, PhaseSpec, PortId, Response, Station, Stimulus, TrialRecord};
use std::collections::BTreeSet;
use std::time::Duration;

/// Result of advancing a trial by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Finished,
}

#[derive(Debug, Clone, Copy, Default)]
struct CueState {
    started: bool,
    stopped: bool,
}

/// Mutable state of the phase being executed.
struct ActivePhase {
    index: usize,
    stimulus: Option<Stimulus>,
    rendered: u64,
    was_on: BTreeSet<PortId>,
    cues: Vec<CueState>,
    data: PhaseData,
}

pub struct TrialRun {
    phases: Vec<PhaseSpec>,
    record: TrialRecord,
    active: Option<ActivePhase>,
    trial_start: Duration,
    quit: bool,
    frames: u64,
}

impl TrialRun {
    /// Raises the trial pin and enters the first phase.
    pub fn begin(phases: Vec<PhaseSpec>, record: TrialRecord, station: &mut dyn Station) -> Self {
        let mut run = Self {
            phases,
            record,
            active: None,
            trial_start: station.now(),
            quit: false,
            frames: 0,
        };
        station.set_trial_pin(true);
        if run.phases.is_empty() {
            tracing::warn!(component = "runner", condition = "no_phases", trial = run.record.trial_number);
            run.record.mark_errored_out();
        } else {
            run.enter(0, station);
        }
        run
    }

    pub fn record(&self) -> &TrialRecord {
        &self.record
    }

    pub fn current_phase(&self) -> Option<&PhaseSpec> {
        self.active.as_ref().and_then(|a| self.phases.get(a.index))
    }

    /// Frames rendered so far in this trial.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.active.is_none()
    }

    fn elapsed(&self, station: &dyn Station) -> f64 {
        station.now().saturating_sub(self.trial_start).as_secs_f64()
    }

    fn enter(&mut self, index: usize, station: &mut dyn Station) {
        let phase = &self.phases[index];
        let data = PhaseData {
            phase_name: phase.name.clone(),
            phase_number: phase.number,
            phase_type: phase.kind,
            enter_time: self.elapsed(station),
            exit_time: None,
            frames: 0,
            responses: Vec::new(),
        };
        tracing::debug!(
            component = "runner",
            trial = self.record.trial_number,
            phase = %phase.name,
            budget = ?phase.budget,
            "enter phase"
        );
        phase.on_enter(&mut self.record, station);
        self.active = Some(ActivePhase {
            index,
            stimulus: phase.stimulus.clone(),
            rendered: 0,
            was_on: BTreeSet::new(),
            cues: vec![CueState::default(); phase.sounds.len()],
            data,
        });
    }

    /// Runs the exit hook, stops every cue of the phase and files its data.
    fn exit(&mut self, station: &mut dyn Station) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let phase = &self.phases[active.index];
        phase.on_exit(&mut self.record, station);
        active.data.exit_time = Some(self.elapsed(station));
        active.data.frames = active.rendered;
        self.record.phase_data.push(active.data);
    }

    /// Renders one frame of the current phase.
    pub fn step(&mut self, station: &mut dyn Station) -> Step {
        let now = self.elapsed(station);
        let Some(active) = self.active.as_mut() else {
            return Step::Finished;
        };
        let phase = &self.phases[active.index];

        for (cue, state) in phase.sounds.iter().zip(active.cues.iter_mut()) {
            if let Some(sound) = station.sound(&cue.sound) {
                if !state.started {
                    sound.play();
                    state.started = true;
                } else if !state.stopped && active.rendered >= cue.frames_at(phase.refresh_hz) {
                    sound.stop();
                    state.stopped = true;
                }
            }
        }

        if let Some(stimulus) = active.stimulus.as_mut() {
            station.draw(stimulus);
            phase.update.apply(stimulus);
        }
        phase.on_frame(&mut self.record, station);

        let ports = station.read_ports();
        let mut next = None;
        let mut responded = false;
        if ports.len() > 1 {
            tracing::warn!(
                component = "runner",
                condition = "ambiguous_input",
                trial = self.record.trial_number,
                phase = %phase.name,
                ports = ?ports,
            );
            self.record.mark_errored_out();
        } else {
            active.was_on.retain(|p| ports.contains(p));
            if let Some(port) = ports.first() {
                if active.was_on.insert(port.clone()) {
                    active.data.responses.push(Response {
                        port: port.clone(),
                        time: now,
                    });
                }
                if let Some(target) = phase.transitions.port_target(port) {
                    next = Some(target);
                    responded = true;
                }
            }
        }

        active.rendered += 1;
        self.frames += 1;
        let timed_out = !responded && phase.budget.expired(active.rendered);
        if timed_out {
            next = phase.transitions.timeout_target();
        }

        if station.check_manual_quit() {
            tracing::info!(
                component = "runner",
                condition = "manual_quit",
                trial = self.record.trial_number,
                phase = %phase.name,
            );
            self.record.mark_manual_quit();
            self.quit = true;
        }

        if self.record.errored_out || self.quit {
            self.exit(station);
            return Step::Finished;
        }

        station.flip();
        if responded || timed_out {
            self.exit(station);
            match next {
                Some(index) => self.enter(index, station),
                None => return Step::Finished,
            }
        }
        Step::Continue
    }

    /// Lowers the trial pin and hands the record back with the quit flag.
    /// Finishing while a phase is still live aborts the trial as a manual
    /// quit.
    pub fn finish(mut self, station: &mut dyn Station) -> (TrialRecord, bool) {
        if let Some(phase) = self.current_phase() {
            tracing::info!(
                component = "runner",
                condition = "aborted",
                trial = self.record.trial_number,
                phase = %phase.name,
            );
            self.record.mark_manual_quit();
            self.quit = true;
        }
        self.exit(station);
        station.set_trial_pin(false);
        tracing::debug!(
            component = "runner",
            trial = self.record.trial_number,
            frames = self.frames,
            disposition = ?self.record.disposition(),
            "trial finished"
        );
        (self.record, self.quit)
    }
}

/// Returns the station to idle on every exit path, unwinding included.
struct StationGuard<'a>(&'a mut dyn Station);

impl Drop for StationGuard<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Runs a whole trial against `station`, blocking on each frame flip.
pub fn run_trial(
    phases: Vec<PhaseSpec>,
    record: TrialRecord,
    station: &mut dyn Station,
) -> (TrialRecord, bool) {
    let mut guard = StationGuard(station);
    let mut run = TrialRun::begin(phases, record, &mut *guard.0);
    while run.step(&mut *guard.0) == Step::Continue {}
    run.finish(&mut *guard.0)
}
