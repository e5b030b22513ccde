mod config;
mod script;
mod simulated;

pub use config::{StationConfig, StationKind};
pub use script::{PortPress, PortScript};
pub use simulated::{MAX_EVENTS, SimSound, SimulatedStation, StationEvent};
