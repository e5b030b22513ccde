mod timer;

pub use timer::{CalibrationStats, FramePacer, HighPrecisionTimer, Timer, VirtualClock};
