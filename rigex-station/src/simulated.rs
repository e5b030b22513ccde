use crate::config::StationConfig;
use crate::script::PortScript;
use rigex_core::{
    Capabilities, PortId, Resolution, Sound, SoundId, SoundStatus, Station, StationError,
    Stimulus, ValveId, names,
};
use rigex_timing::{CalibrationStats, FramePacer, VirtualClock};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

/// Oldest events are dropped once the log holds this many.
pub const MAX_EVENTS: usize = 4096;

/// Actuator activity observed by a [`SimulatedStation`], stamped with the
/// station frame it happened on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StationEvent {
    ValveOpened { frame: u64, valve: ValveId },
    ValveClosed { frame: u64, valve: ValveId },
    TrialPin { frame: u64, on: bool },
    Released { frame: u64 },
}

/// In-memory sound that tracks its playback state.
#[derive(Debug, Clone, Default)]
pub struct SimSound {
    status: SoundStatus,
    position: f64,
    plays: u32,
}

impl SimSound {
    pub fn plays(&self) -> u32 {
        self.plays
    }

    pub fn position(&self) -> f64 {
        self.position
    }
}

impl Sound for SimSound {
    fn play(&mut self) {
        self.status = SoundStatus::Playing;
        self.plays += 1;
    }

    fn stop(&mut self) {
        if self.status == SoundStatus::Playing {
            self.status = SoundStatus::Stopped;
        }
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds;
    }

    fn status(&self) -> SoundStatus {
        self.status
    }
}

/// Station with a virtual clock and scripted port input.
///
/// Each flip advances the clock by one frame period. Scripts are consumed one
/// per trial when the trial pin rises; trials without a queued script use the
/// default script.
pub struct SimulatedStation {
    config: StationConfig,
    capabilities: Capabilities,
    ports: Vec<PortId>,
    valves: BTreeSet<ValveId>,
    open_valves: BTreeSet<ValveId>,
    sounds: BTreeMap<SoundId, SimSound>,
    pacer: FramePacer<VirtualClock>,
    frame: u64,
    trial_frame: u64,
    trial_pin: bool,
    script: PortScript,
    queued: VecDeque<PortScript>,
    default_script: PortScript,
    events: VecDeque<StationEvent>,
    drawn: Option<Stimulus>,
    draws: u64,
}

impl SimulatedStation {
    pub fn new(config: StationConfig) -> Self {
        let kind = config.kind;
        let sounds = names::ALL_SOUNDS
            .iter()
            .map(|s| (SoundId::new(s), SimSound::default()))
            .collect();
        let pacer = FramePacer::new(VirtualClock::new(), config.refresh_hz);
        Self {
            capabilities: Capabilities::new([kind.tag()]),
            ports: kind.ports(),
            valves: kind.valves().into_iter().collect(),
            open_valves: BTreeSet::new(),
            sounds,
            pacer,
            frame: 0,
            trial_frame: 0,
            trial_pin: false,
            script: PortScript::default(),
            queued: VecDeque::new(),
            default_script: PortScript::default(),
            events: VecDeque::with_capacity(MAX_EVENTS),
            drawn: None,
            draws: 0,
            config,
        }
    }

    pub fn queue_script(&mut self, script: PortScript) {
        self.queued.push_back(script);
    }

    pub fn set_default_script(&mut self, script: PortScript) {
        self.default_script = script;
    }

    /// The most recent events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &StationEvent> {
        self.events.iter()
    }

    pub fn take_events(&mut self) -> Vec<StationEvent> {
        self.events.drain(..).collect()
    }

    fn log(&mut self, event: StationEvent) {
        if self.events.len() >= MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn trial_frame(&self) -> u64 {
        self.trial_frame
    }

    pub fn trial_pin(&self) -> bool {
        self.trial_pin
    }

    pub fn open_valves(&self) -> impl Iterator<Item = &ValveId> {
        self.open_valves.iter()
    }

    pub fn sim_sound(&self, name: &str) -> Option<&SimSound> {
        self.sounds.get(&SoundId::new(name))
    }

    pub fn last_drawn(&self) -> Option<&Stimulus> {
        self.drawn.as_ref()
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn calibration_stats(&self) -> CalibrationStats {
        self.pacer.calibration_stats()
    }

    /// Frames the valve stayed open, paired from the event log.
    pub fn valve_open_frames(&self, valve: &ValveId) -> Vec<u64> {
        let mut opened = None;
        let mut spans = Vec::new();
        for event in &self.events {
            match event {
                StationEvent::ValveOpened { frame, valve: v } if v == valve => {
                    opened = Some(*frame)
                }
                StationEvent::ValveClosed { frame, valve: v } if v == valve => {
                    if let Some(start) = opened.take() {
                        spans.push(frame - start);
                    }
                }
                _ => {}
            }
        }
        spans
    }
}

impl Station for SimulatedStation {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn ports(&self) -> &[PortId] {
        &self.ports
    }

    fn read_ports(&mut self) -> Vec<PortId> {
        self.script
            .active_at(self.trial_frame)
            .into_iter()
            .filter(|p| self.ports.contains(p))
            .collect()
    }

    fn check_manual_quit(&mut self) -> bool {
        self.trial_pin && self.script.quits_at(self.trial_frame)
    }

    fn set_trial_pin(&mut self, on: bool) {
        if on && !self.trial_pin {
            self.trial_frame = 0;
            self.script = self
                .queued
                .pop_front()
                .unwrap_or_else(|| self.default_script.clone());
        }
        if on != self.trial_pin {
            self.log(StationEvent::TrialPin {
                frame: self.frame,
                on,
            });
        }
        self.trial_pin = on;
    }

    fn resolution(&self) -> Resolution {
        self.config.resolution()
    }

    fn now(&self) -> Duration {
        self.pacer.now()
    }

    fn sound(&mut self, id: &SoundId) -> Option<&mut dyn Sound> {
        self.sounds.get_mut(id).map(|s| s as &mut dyn Sound)
    }

    fn open_valve(&mut self, id: &ValveId) -> Result<(), StationError> {
        if !self.valves.contains(id) {
            return Err(StationError::UnknownValve(id.to_string()));
        }
        if self.open_valves.insert(id.clone()) {
            self.log(StationEvent::ValveOpened {
                frame: self.frame,
                valve: id.clone(),
            });
        }
        Ok(())
    }

    fn close_valve(&mut self, id: &ValveId) {
        if self.open_valves.remove(id) {
            self.log(StationEvent::ValveClosed {
                frame: self.frame,
                valve: id.clone(),
            });
        }
    }

    fn draw(&mut self, stimulus: &Stimulus) {
        self.drawn = Some(stimulus.clone());
        self.draws += 1;
    }

    fn flip(&mut self) {
        self.pacer.wait_for_frame();
        self.frame += 1;
        if self.trial_pin {
            self.trial_frame += 1;
        }
    }

    fn release(&mut self) {
        let open: Vec<ValveId> = self.open_valves.iter().cloned().collect();
        for valve in &open {
            self.close_valve(valve);
        }
        for sound in self.sounds.values_mut() {
            sound.stop();
        }
        self.set_trial_pin(false);
        if !open.is_empty() {
            tracing::debug!(
                component = "station",
                condition = "valves_released",
                count = open.len(),
            );
        }
        self.log(StationEvent::Released { frame: self.frame });
    }
}

impl Drop for SimulatedStation {
    fn drop(&mut self) {
        if !self.open_valves.is_empty() || self.trial_pin {
            self.release();
        }
    }
}
