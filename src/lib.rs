pub mod config;

pub use config::{SessionConfig, parse_responses};
