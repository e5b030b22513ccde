use crate::error::StationError;
use crate::ident::{PortId, SoundId, ValveId};
use crate::stimulus::{Resolution, Stimulus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Capability tag attached to a station configuration. Trial managers keep
/// a whitelist of tags they can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StationTag {
    VisionBehavior,
    VisionHeadfix,
    Keyboard,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities(BTreeSet<StationTag>);

impl Capabilities {
    pub fn new(tags: impl IntoIterator<Item = StationTag>) -> Self {
        Self(tags.into_iter().collect())
    }

    pub fn contains(&self, tag: StationTag) -> bool {
        self.0.contains(&tag)
    }

    /// True when any of this station's tags is on the whitelist.
    pub fn accepted_by(&self, whitelist: &[StationTag]) -> bool {
        whitelist.iter().any(|t| self.0.contains(t))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationTag> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SoundStatus {
    #[default]
    NotStarted,
    Playing,
    Stopped,
}

/// Playback handle owned by a station.
pub trait Sound {
    fn play(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, seconds: f64);
    fn status(&self) -> SoundStatus;
}

/// Physical I/O surface consumed by the phase runner.
///
/// A station is exclusively owned by the running trial. `flip` is the only
/// call allowed to block: it presents the drawn frame and returns at the
/// next frame boundary.
pub trait Station {
    fn capabilities(&self) -> &Capabilities;

    /// Every port this station can report.
    fn ports(&self) -> &[PortId];

    /// Ports active right now. More than one entry is ambiguous input.
    fn read_ports(&mut self) -> Vec<PortId>;

    fn check_manual_quit(&mut self) -> bool;

    fn set_trial_pin(&mut self, on: bool);

    fn resolution(&self) -> Resolution;

    fn refresh_hz(&self) -> f64 {
        self.resolution().refresh_hz
    }

    /// Time since the station clock started.
    fn now(&self) -> Duration;

    fn sound(&mut self, id: &SoundId) -> Option<&mut dyn Sound>;

    fn open_valve(&mut self, id: &ValveId) -> Result<(), StationError>;

    fn close_valve(&mut self, id: &ValveId);

    fn draw(&mut self, stimulus: &Stimulus);

    fn flip(&mut self);

    /// Return every actuator to its idle state. Must be idempotent.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_matches_by_membership() {
        let caps = Capabilities::new([StationTag::VisionHeadfix]);
        assert!(caps.accepted_by(&[StationTag::Keyboard, StationTag::VisionHeadfix]));
        assert!(!caps.accepted_by(&[StationTag::Keyboard, StationTag::VisionBehavior]));
        assert!(!Capabilities::default().accepted_by(&[StationTag::Keyboard]));
    }
}
