//! Trial managers: one strategy per experimental paradigm.
//!
//! A manager samples the stimulus for the next trial, compiles the phase
//! sequence for its paradigm and folds finished trials into the session's
//! [`CompiledRecord`]. Phase execution itself is shared (see
//! [`crate::runner`]).

mod afc;
mod choice;
mod go_nogo;
mod go_only;
mod gratings;

pub use afc::{Gratings2Afc, Gratings2AfcConfig, RadiusType};
pub use go_nogo::{GoNoGoConfig, GratingsGoNoGo};
pub use go_only::{GoOnlyConfig, GratingsGoOnly};
pub use gratings::{Gratings, GratingsConfig};

use crate::compiled::{CompiledDetails, CompiledRecord};
use crate::reinforcement::Reinforcement;
use crate::runner::run_trial;
use crate::subject::Subject;
use rand::RngCore;
use rigex_core::{
    ConfigError, GratingParams, PhaseSpec, PortId, PortRoles, Resolution, Station, StationTag,
    Stimulus, TrialRecord, ValveId, names,
};

/// Everything `calc_stim` decided for one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct StimulusDraw {
    pub grating: GratingParams,
    pub resolution: Resolution,
    /// `round(refresh_hz * duration)`, `None` for an unbounded stimulus.
    pub frames: Option<u64>,
    pub roles: PortRoles,
}

pub trait TrialManager {
    fn name(&self) -> &str;

    /// Key under which trials are compiled.
    fn class_name(&self) -> &'static str;

    /// Station capability tags this paradigm can run on.
    fn accepted_stations(&self) -> &'static [StationTag];

    fn reinforcement(&self) -> &Reinforcement;

    fn station_ok(&self, station: &dyn Station) -> bool {
        station.capabilities().accepted_by(self.accepted_stations())
    }

    fn choose_resolution(&self, station: &dyn Station) -> Resolution {
        station.resolution()
    }

    /// Samples the stimulus and port roles for the next trial and stores
    /// them on `record`.
    fn calc_stim(
        &self,
        record: &mut TrialRecord,
        station: &dyn Station,
        rng: &mut dyn RngCore,
    ) -> StimulusDraw;

    fn setup_phases(
        &self,
        record: &mut TrialRecord,
        station: &dyn Station,
        subject: &Subject,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<PhaseSpec>, ConfigError>;

    /// Stamps the manager names on `record`, checks the station and builds
    /// the phases. A station this paradigm cannot run on, or a phase
    /// sequence that fails validation, comes back as `Err` with the record
    /// already marked errored out; the session should stop.
    fn prepare_trial(
        &self,
        station: &dyn Station,
        subject: &Subject,
        mut record: TrialRecord,
        compiled: &CompiledRecord,
        rng: &mut dyn RngCore,
    ) -> Result<(Vec<PhaseSpec>, TrialRecord), TrialRecord> {
        record.trial_manager = self.name().to_string();
        record.trial_manager_class = self.class_name().to_string();
        record.reinforcement_manager = self.reinforcement().name().to_string();

        if !self.station_ok(station) {
            tracing::error!(
                component = self.class_name(),
                condition = "station_not_ok",
                trial = record.trial_number,
                capabilities = ?station.capabilities(),
            );
            record.mark_errored_out();
            return Err(record);
        }

        tracing::debug!(
            component = self.class_name(),
            trial = record.trial_number,
            compiled = compiled.trials(self.class_name()),
            "setting up phases"
        );
        match self.setup_phases(&mut record, station, subject, rng) {
            Ok(phases) => Ok((phases, record)),
            Err(e) => {
                tracing::error!(
                    component = self.class_name(),
                    condition = "bad_phase_sequence",
                    trial = record.trial_number,
                    "{e}"
                );
                record.mark_errored_out();
                Err(record)
            }
        }
    }

    /// Runs one trial. Returns the filled record and whether the session
    /// should stop. A quit already raised by the caller is passed straight
    /// through: the station is left alone and the record is a manual quit.
    fn do_trial(
        &self,
        station: &mut dyn Station,
        subject: &Subject,
        mut record: TrialRecord,
        compiled: &CompiledRecord,
        quit: bool,
        rng: &mut dyn RngCore,
    ) -> (TrialRecord, bool) {
        if quit {
            tracing::debug!(
                component = self.class_name(),
                condition = "quit_before_trial",
                trial = record.trial_number,
            );
            record.trial_manager = self.name().to_string();
            record.trial_manager_class = self.class_name().to_string();
            record.mark_manual_quit();
            return (record, true);
        }
        match self.prepare_trial(station, subject, record, compiled, rng) {
            Ok((phases, record)) => run_trial(phases, record, station),
            Err(record) => (record, true),
        }
    }

    /// Appends this trial to the class's details, creating them on first
    /// use.
    fn trial_compiler<'c>(
        &self,
        compiled: &'c mut CompiledRecord,
        record: &TrialRecord,
    ) -> &'c CompiledDetails;
}

/// Shared compiler body: stimulus columns always, response columns when a
/// request port is given. Trials that never drew a stimulus are skipped so
/// the columns stay aligned.
pub(crate) fn compile_trial<'c>(
    compiled: &'c mut CompiledRecord,
    class: &'static str,
    init: impl FnOnce() -> CompiledDetails,
    record: &TrialRecord,
    request: Option<&PortId>,
) -> &'c CompiledDetails {
    let details = compiled.details_mut(class, init);
    match &record.chosen_stim {
        Some(stim) => {
            details.push_stimulus(record, stim);
            if let Some(port) = request {
                details.push_responses(record, port);
            }
            tracing::debug!(component = class, trials = details.len(), "compiled trial");
        }
        None => tracing::debug!(
            component = class,
            condition = "no_stimulus",
            trial = record.trial_number,
            "trial not compiled"
        ),
    }
    details
}

pub(crate) fn blank(luminance: f64) -> Stimulus {
    Stimulus::Blank { luminance }
}

/// Valve rewarding a response on `port`, falling back to the generic reward
/// valve for ports without a paired valve.
pub(crate) fn reward_valve_for(port: &PortId) -> ValveId {
    port.paired_valve()
        .unwrap_or_else(|| ValveId::new(names::REWARD_VALVE))
}

/// Valve used by paradigms that reward without a response: the lick port's
/// valve on head-fixed rigs, otherwise the center valve.
pub(crate) fn free_reward_valve(station: &dyn Station) -> ValveId {
    let ports = station.ports();
    [names::RESPONSE_PORT, names::CENTER_PORT]
        .iter()
        .map(|p| PortId::new(p))
        .find(|p| ports.contains(p))
        .or_else(|| ports.first().cloned())
        .map_or_else(|| ValveId::new(names::REWARD_VALVE), |p| reward_valve_for(&p))
}

pub(crate) fn check_interval(owner: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration {
            owner: owner.to_string(),
            value,
        })
    }
}
