use rigex_core::{names, PortId, Resolution, StationTag, ValveId};
use serde::{Deserialize, Serialize};

/// Rig layouts a station can be configured as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StationKind {
    /// Freely moving rig with left, center and right nose-poke ports.
    #[default]
    VisionBehavior,
    /// Head-fixed rig with a single lick port.
    VisionHeadfix,
    /// Desk setup where keys stand in for every port.
    Keyboard,
}

impl StationKind {
    pub fn tag(&self) -> StationTag {
        match self {
            StationKind::VisionBehavior => StationTag::VisionBehavior,
            StationKind::VisionHeadfix => StationTag::VisionHeadfix,
            StationKind::Keyboard => StationTag::Keyboard,
        }
    }

    pub fn ports(&self) -> Vec<PortId> {
        let side = [names::LEFT_PORT, names::CENTER_PORT, names::RIGHT_PORT];
        match self {
            StationKind::VisionBehavior => side.iter().map(|p| PortId::new(p)).collect(),
            StationKind::VisionHeadfix => vec![PortId::new(names::RESPONSE_PORT)],
            StationKind::Keyboard => side
                .iter()
                .chain(std::iter::once(&names::RESPONSE_PORT))
                .map(|p| PortId::new(p))
                .collect(),
        }
    }

    /// Valves wired to this layout's ports.
    pub fn valves(&self) -> Vec<ValveId> {
        self.ports().iter().filter_map(PortId::paired_valve).collect()
    }
}

/// Station section of a session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub kind: StationKind,
    pub height: u32,
    pub width: u32,
    pub refresh_hz: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        let res = Resolution::default();
        Self {
            kind: StationKind::default(),
            height: res.height,
            width: res.width,
            refresh_hz: res.refresh_hz,
        }
    }
}

impl StationConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution {
            height: self.height,
            width: self.width,
            refresh_hz: self.refresh_hz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headfix_rig_has_single_lick_port_and_reward_valve() {
        let kind = StationKind::VisionHeadfix;
        assert_eq!(kind.ports(), vec![PortId::new(names::RESPONSE_PORT)]);
        assert_eq!(kind.valves(), vec![ValveId::new(names::REWARD_VALVE)]);
    }

    #[test]
    fn keyboard_rig_exposes_all_ports() {
        assert_eq!(StationKind::Keyboard.ports().len(), 4);
        assert_eq!(StationKind::Keyboard.valves().len(), 4);
    }
}
