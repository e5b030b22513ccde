use anyhow::Result;
use rigex_core::{
    Capabilities, PortId, Resolution, Sound, SoundId, SoundStatus, Station, StationError,
    Stimulus, ValveId, names,
};
use rigex_render::{GratingRenderer, Viewing};
use rigex_station::StationKind;
use rigex_timing::{CalibrationStats, HighPrecisionTimer, Timer};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use winit::keyboard::KeyCode;

/// Port a key stands in for.
pub fn key_port(key: KeyCode) -> Option<&'static str> {
    match key {
        KeyCode::KeyA => Some(names::LEFT_PORT),
        KeyCode::KeyS => Some(names::CENTER_PORT),
        KeyCode::KeyD => Some(names::RIGHT_PORT),
        KeyCode::Space => Some(names::RESPONSE_PORT),
        _ => None,
    }
}

/// Sound cue without an audio device; playback is logged.
#[derive(Debug)]
struct LoggedSound {
    id: SoundId,
    status: SoundStatus,
    position: f64,
}

impl Sound for LoggedSound {
    fn play(&mut self) {
        self.status = SoundStatus::Playing;
        tracing::debug!(component = "keyboard_station", sound = %self.id, from = self.position, "play");
    }

    fn stop(&mut self) {
        if self.status == SoundStatus::Playing {
            self.status = SoundStatus::Stopped;
            tracing::debug!(component = "keyboard_station", sound = %self.id, "stop");
        }
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds;
    }

    fn status(&self) -> SoundStatus {
        self.status
    }
}

/// Station driven by a window: held keys are ports, Escape is the manual
/// quit, valves are logged and stimuli are rasterised into a canvas that the
/// window presents after every flip.
pub struct KeyboardStation {
    capabilities: Capabilities,
    ports: Vec<PortId>,
    valves: BTreeSet<ValveId>,
    open_valves: BTreeSet<ValveId>,
    sounds: BTreeMap<SoundId, LoggedSound>,
    held: BTreeSet<PortId>,
    quit_requested: bool,
    trial_pin: bool,
    refresh_hz: f64,
    renderer: GratingRenderer,
    timer: HighPrecisionTimer,
    last_flip: Option<Duration>,
    frames: u64,
}

impl KeyboardStation {
    pub fn new(width: u32, height: u32, refresh_hz: f64, viewing: Viewing) -> Result<Self> {
        let kind = StationKind::Keyboard;
        let sounds = names::ALL_SOUNDS
            .iter()
            .map(|name| {
                let id = SoundId::new(name);
                let sound = LoggedSound {
                    id: id.clone(),
                    status: SoundStatus::NotStarted,
                    position: 0.0,
                };
                (id, sound)
            })
            .collect();

        Ok(Self {
            capabilities: Capabilities::new([kind.tag()]),
            ports: kind.ports(),
            valves: kind.valves().into_iter().collect(),
            open_valves: BTreeSet::new(),
            sounds,
            held: BTreeSet::new(),
            quit_requested: false,
            trial_pin: false,
            refresh_hz,
            renderer: GratingRenderer::new(width, height, viewing)?,
            timer: HighPrecisionTimer::new(),
            last_flip: None,
            frames: 0,
        })
    }

    /// Feed a key transition from the window. Returns true if it was used.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        if key == KeyCode::Escape {
            if pressed {
                self.quit_requested = true;
            }
            return true;
        }
        let Some(port) = key_port(key) else {
            return false;
        };
        let port = PortId::new(port);
        if pressed {
            self.held.insert(port);
        } else {
            self.held.remove(&port);
        }
        true
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.renderer.resize(width, height)
    }

    /// Copy the last drawn frame into the window's pixel buffer.
    pub fn present(&self, frame: &mut [u8]) -> Result<()> {
        self.renderer.copy_to(frame)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn calibration_stats(&self) -> CalibrationStats {
        self.timer.calibration_stats()
    }
}

impl Station for KeyboardStation {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn ports(&self) -> &[PortId] {
        &self.ports
    }

    fn read_ports(&mut self) -> Vec<PortId> {
        self.held.iter().cloned().collect()
    }

    fn check_manual_quit(&mut self) -> bool {
        self.quit_requested
    }

    fn set_trial_pin(&mut self, on: bool) {
        if self.trial_pin != on {
            tracing::debug!(component = "keyboard_station", on, frame = self.frames, "trial pin");
        }
        self.trial_pin = on;
    }

    fn resolution(&self) -> Resolution {
        Resolution {
            height: self.renderer.height(),
            width: self.renderer.width(),
            refresh_hz: self.refresh_hz,
        }
    }

    fn now(&self) -> Duration {
        self.timer.now()
    }

    fn sound(&mut self, id: &SoundId) -> Option<&mut dyn Sound> {
        self.sounds.get_mut(id).map(|s| s as &mut dyn Sound)
    }

    fn open_valve(&mut self, id: &ValveId) -> Result<(), StationError> {
        if !self.valves.contains(id) {
            return Err(StationError::UnknownValve(id.to_string()));
        }
        if self.open_valves.insert(id.clone()) {
            tracing::info!(component = "keyboard_station", valve = %id, frame = self.frames, "valve open");
        }
        Ok(())
    }

    fn close_valve(&mut self, id: &ValveId) {
        if self.open_valves.remove(id) {
            tracing::info!(component = "keyboard_station", valve = %id, frame = self.frames, "valve closed");
        }
    }

    fn draw(&mut self, stimulus: &Stimulus) {
        self.renderer.draw(stimulus);
    }

    /// Frames are paced by the window's redraw loop, so flipping only
    /// records the frame interval.
    fn flip(&mut self) {
        let now = self.timer.now();
        if let Some(last) = self.last_flip {
            self.timer.record_frame(now.saturating_sub(last));
        }
        self.last_flip = Some(now);
        self.frames += 1;
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> KeyboardStation {
        KeyboardStation::new(32, 16, 60.0, Viewing::default()).expect("small canvas")
    }

    #[test]
    fn held_keys_are_active_ports() {
        let mut st = station();
        assert!(st.handle_key(KeyCode::KeyA, true));
        assert!(st.handle_key(KeyCode::KeyD, true));
        assert_eq!(
            st.read_ports(),
            vec![PortId::new(names::LEFT_PORT), PortId::new(names::RIGHT_PORT)]
        );
        st.handle_key(KeyCode::KeyA, false);
        assert_eq!(st.read_ports(), vec![PortId::new(names::RIGHT_PORT)]);
        assert!(!st.handle_key(KeyCode::KeyQ, true));
    }

    #[test]
    fn escape_requests_manual_quit() {
        let mut st = station();
        assert!(!st.check_manual_quit());
        st.handle_key(KeyCode::Escape, true);
        assert!(st.check_manual_quit());
    }

    #[test]
    fn release_closes_valves_and_stops_sounds() {
        let mut st = station();
        let valve = ValveId::new(names::CENTER_VALVE);
        st.open_valve(&valve).unwrap();
        assert!(st.open_valve(&ValveId::new("spout")).is_err());
        let cue = SoundId::new(names::GO_SOUND);
        st.sound(&cue).unwrap().play();
        st.set_trial_pin(true);

        st.release();
        assert!(st.open_valves.is_empty());
        assert_eq!(st.sound(&cue).unwrap().status(), SoundStatus::Stopped);
        assert!(!st.trial_pin);
    }

    #[test]
    fn drawn_frames_reach_the_window_buffer() {
        let mut st = station();
        st.draw(&Stimulus::Blank { luminance: 1.0 });
        st.flip();
        let mut frame = vec![0u8; 32 * 16 * 4];
        st.present(&mut frame).unwrap();
        assert!(frame.iter().all(|&b| b == 255));
        assert_eq!(st.frames(), 1);
        assert_eq!(st.resolution().width, 32);
    }
}
