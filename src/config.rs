use anyhow::{Context, Result, bail};
use rigex_core::PortId;
use rigex_experiment::{ManagerConfig, Subject};
use rigex_station::{PortPress, PortScript, StationConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything needed to run a session, as read from a TOML file.
///
/// ```toml
/// trials = 20
/// seed = 7
///
/// [subject]
/// id = "m042"
/// reward_ms = 40.0
///
/// [station]
/// kind = "vision-headfix"
///
/// [manager]
/// paradigm = "go-only"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub trials: u64,
    pub seed: Option<u64>,
    pub subject: Subject,
    pub station: StationConfig,
    pub manager: ManagerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            trials: 10,
            seed: None,
            subject: Subject::new("demo"),
            station: StationConfig::default(),
            manager: ManagerConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading session config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Parses `frame:port[:hold]` entries separated by commas into a script
/// replayed on every trial. Frames count from trial start, `hold` defaults
/// to one frame, and a bare side name such as `left` means `left_port`.
pub fn parse_responses(text: &str) -> Result<PortScript> {
    let mut script = PortScript::new();
    for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let fields: Vec<&str> = entry.split(':').collect();
        let (frame, port, hold) = match fields.as_slice() {
            [frame, port] => (*frame, *port, "1"),
            [frame, port, hold] => (*frame, *port, *hold),
            _ => bail!("response `{entry}` is not frame:port[:hold]"),
        };
        let from: u64 = frame
            .parse()
            .with_context(|| format!("bad frame in response `{entry}`"))?;
        let hold: u64 = hold
            .parse()
            .with_context(|| format!("bad hold in response `{entry}`"))?;
        if hold == 0 {
            bail!("response `{entry}` holds the port for zero frames");
        }
        let port = if port.ends_with("_port") {
            PortId::new(port)
        } else {
            PortId::new(&format!("{port}_port"))
        };
        script.presses.push(PortPress {
            port,
            from,
            to: from.saturating_add(hold),
        });
    }
    Ok(script)
}
