pub mod render;

pub use render::{FrameStats, GratingRenderer, Viewing};
