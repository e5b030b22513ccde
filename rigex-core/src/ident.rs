use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
pub use string_cache::DefaultAtom as Atom;

/// Hardware names used across a rig. Stations and trial managers agree on
/// these spellings; stations may declare additional ports of their own.
pub mod names {
    pub const LEFT_PORT: &str = "left_port";
    pub const CENTER_PORT: &str = "center_port";
    pub const RIGHT_PORT: &str = "right_port";
    pub const RESPONSE_PORT: &str = "response_port";

    pub const LEFT_VALVE: &str = "left_valve";
    pub const CENTER_VALVE: &str = "center_valve";
    pub const RIGHT_VALVE: &str = "right_valve";
    pub const REWARD_VALVE: &str = "reward_valve";

    pub const TRIAL_START_SOUND: &str = "trial_start_sound";
    pub const STIM_START_SOUND: &str = "stim_start_sound";
    pub const CORRECT_SOUND: &str = "correct_sound";
    pub const PUNISHMENT_SOUND: &str = "punishment_sound";
    pub const TRIAL_END_SOUND: &str = "trial_end_sound";
    pub const GO_SOUND: &str = "go_sound";
    pub const REWARD_SOUND: &str = "reward_sound";

    pub const ALL_SOUNDS: [&str; 7] = [
        TRIAL_START_SOUND,
        STIM_START_SOUND,
        CORRECT_SOUND,
        PUNISHMENT_SOUND,
        TRIAL_END_SOUND,
        GO_SOUND,
        REWARD_SOUND,
    ];
}

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Atom);

        impl $name {
            pub fn new(name: &str) -> Self {
                Self(Atom::from(name))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self::new(name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::new(&s))
            }
        }
    };
}

interned_id!(
    /// An input channel polled for subject responses (lick sensor, key).
    PortId
);
interned_id!(
    /// A reinforcement actuator.
    ValveId
);
interned_id!(SoundId);

impl PortId {
    /// Valve that rewards a response on this port, following the rig's
    /// `<side>_port -> <side>_valve` wiring.
    pub fn paired_valve(&self) -> Option<ValveId> {
        match self.as_str() {
            names::LEFT_PORT => Some(ValveId::new(names::LEFT_VALVE)),
            names::CENTER_PORT => Some(ValveId::new(names::CENTER_VALVE)),
            names::RIGHT_PORT => Some(ValveId::new(names::RIGHT_VALVE)),
            names::RESPONSE_PORT => Some(ValveId::new(names::REWARD_VALVE)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_interns_to_equal_ids() {
        let a = PortId::new("left_port");
        let b = PortId::from(names::LEFT_PORT);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "left_port");
    }

    #[test]
    fn ports_pair_with_side_valves() {
        assert_eq!(
            PortId::new(names::RIGHT_PORT).paired_valve(),
            Some(ValveId::new(names::RIGHT_VALVE))
        );
        assert_eq!(PortId::new("lever").paired_valve(), None);
    }
}
