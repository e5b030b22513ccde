pub mod error;
pub mod ident;
pub mod phase;
pub mod station;
pub mod stimulus;
pub mod trial;

pub use error::{ConfigError, StationError};
pub use ident::{names, PortId, SoundId, ValveId};
pub use phase::{FrameBudget, PhaseEffect, PhaseKind, PhaseSpec, ResponseSymbol, SoundCue, Transitions};
pub use station::{Capabilities, Sound, SoundStatus, Station, StationTag};
pub use stimulus::{Category, ChosenStimulus, GratingParams, Mask, Resolution, Stimulus, UpdateRule};
pub use trial::{Disposition, PhaseData, PortRoles, Response, TrialRecord};
