use rigex_core::PortId;
use serde::{Deserialize, Serialize};

/// A port held active for the trial frames `from..to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortPress {
    pub port: PortId,
    pub from: u64,
    pub to: u64,
}

/// Scripted subject behaviour for one trial. Frame numbers count flips since
/// the trial pin went high.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortScript {
    #[serde(default)]
    pub presses: Vec<PortPress>,
    #[serde(default)]
    pub quit_at: Option<u64>,
}

impl PortScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `port` for `frames` frames starting at `from`.
    pub fn press(mut self, port: &str, from: u64, frames: u64) -> Self {
        self.presses.push(PortPress {
            port: PortId::new(port),
            from,
            to: from.saturating_add(frames),
        });
        self
    }

    pub fn quit_at(mut self, frame: u64) -> Self {
        self.quit_at = Some(frame);
        self
    }

    pub fn active_at(&self, frame: u64) -> Vec<PortId> {
        let mut ports: Vec<PortId> = self
            .presses
            .iter()
            .filter(|p| p.from <= frame && frame < p.to)
            .map(|p| p.port.clone())
            .collect();
        ports.dedup();
        ports
    }

    pub fn quits_at(&self, frame: u64) -> bool {
        self.quit_at.is_some_and(|q| frame >= q)
    }
}
