pub mod builder;
pub mod compiled;
pub mod config;
pub mod delay;
pub mod manager;
pub mod params;
pub mod reinforcement;
pub mod runner;
pub mod session;
pub mod subject;

pub use builder::{PhaseTemplate, Trigger, build_phases, validate_phases};
pub use compiled::{CompiledDetails, CompiledRecord, ResponseColumns};
pub use config::ManagerConfig;
pub use delay::DelayDistribution;
pub use manager::{
    GoNoGoConfig, GoOnlyConfig, Gratings, Gratings2Afc, Gratings2AfcConfig, GratingsConfig,
    GratingsGoNoGo, GratingsGoOnly, RadiusType, StimulusDraw, TrialManager,
};
pub use params::{GratingParamLists, linspace};
pub use reinforcement::{
    ConstantReinforcement, RandomReinforcement, Reinforcement, ReinforcementFrames,
    ReinforcementOutcome,
};
pub use runner::{Step, TrialRun, run_trial};
pub use session::{Session, SessionSummary};
pub use subject::Subject;
