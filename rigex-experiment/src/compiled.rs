use rigex_core::{Category, ChosenStimulus, PhaseKind, PortId, TrialRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Latency and lick-timing columns of response-bearing paradigms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseColumns {
    /// Trial start to stimulus onset.
    pub request_time: Vec<Option<f64>>,
    /// Stimulus onset to reinforcement onset.
    pub response_time: Vec<Option<f64>>,
    /// Request-port licks during the stimulus phase.
    pub request_lick_timings: Vec<Vec<f64>>,
    /// Non-request licks during the pre-request phase.
    pub response_lick_timings_prev_trial: Vec<Vec<f64>>,
}

impl ResponseColumns {
    fn push(&mut self, record: &TrialRecord, request: &PortId) {
        let pre = record.phase_of_type(PhaseKind::PreRequest);
        let stim = record.phase_of_type(PhaseKind::Stimulus);
        let reinf = record.reinforcement_phase();

        self.request_time.push(stim.map(|s| s.enter_time));
        self.response_time.push(match (stim, reinf) {
            (Some(s), Some(r)) => Some(r.enter_time - s.enter_time),
            _ => None,
        });
        self.request_lick_timings
            .push(stim.map(|s| s.response_times_on(request)).unwrap_or_default());
        self.response_lick_timings_prev_trial
            .push(pre.map(|p| p.response_times_off(request)).unwrap_or_default());
    }
}

/// Per-paradigm session columns. Every populated column has one entry per
/// compiled trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledDetails {
    pub trial_number: Vec<u64>,
    pub deg_per_cyc: Vec<f64>,
    pub orientation: Vec<f64>,
    pub drift_frequency: Vec<f64>,
    pub phase: Vec<f64>,
    pub contrast: Vec<f64>,
    pub duration: Vec<f64>,
    pub radius: Vec<f64>,
    pub radius_type: Vec<String>,
    pub location: Vec<(f64, f64)>,
    pub height: Vec<u32>,
    pub width: Vec<u32>,
    pub refresh_hz: Vec<f64>,
    pub correct: Vec<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Vec<Option<Category>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_frames: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<ResponseColumns>,
}

impl CompiledDetails {
    pub fn len(&self) -> usize {
        self.trial_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trial_number.is_empty()
    }

    pub fn with_responses(mut self) -> Self {
        self.responses = Some(ResponseColumns::default());
        self
    }

    pub fn with_categories(mut self) -> Self {
        self.category = Some(Vec::new());
        self
    }

    pub fn with_delays(mut self) -> Self {
        self.delay_frames = Some(Vec::new());
        self
    }

    /// Appends the stimulus columns for one trial.
    pub fn push_stimulus(&mut self, record: &TrialRecord, stim: &ChosenStimulus) {
        let g = &stim.grating;
        self.trial_number.push(record.trial_number);
        self.deg_per_cyc.push(g.deg_per_cycle);
        self.orientation.push(g.orientation);
        self.drift_frequency.push(g.drift_frequency);
        self.phase.push(g.phase);
        self.contrast.push(g.contrast);
        self.duration.push(g.duration);
        self.radius.push(g.radius);
        self.radius_type.push(g.mask.label().to_string());
        self.location.push(g.location);
        self.height.push(g.height);
        self.width.push(g.width);
        self.refresh_hz.push(g.refresh_hz);
        self.correct.push(record.correct);
        if let Some(col) = self.category.as_mut() {
            col.push(stim.category);
        }
        if let Some(col) = self.delay_frames.as_mut() {
            col.push(stim.delay_frames.unwrap_or_default());
        }
    }

    pub fn push_responses(&mut self, record: &TrialRecord, request: &PortId) {
        if let Some(cols) = self.responses.as_mut() {
            cols.push(record, request);
        }
    }

    /// True when every populated column has the same length.
    pub fn is_consistent(&self) -> bool {
        let n = self.len();
        let mut lens = vec![
            self.deg_per_cyc.len(),
            self.orientation.len(),
            self.drift_frequency.len(),
            self.phase.len(),
            self.contrast.len(),
            self.duration.len(),
            self.radius.len(),
            self.radius_type.len(),
            self.location.len(),
            self.height.len(),
            self.width.len(),
            self.refresh_hz.len(),
            self.correct.len(),
        ];
        lens.extend(self.category.as_ref().map(Vec::len));
        lens.extend(self.delay_frames.as_ref().map(Vec::len));
        if let Some(r) = &self.responses {
            lens.extend([
                r.request_time.len(),
                r.response_time.len(),
                r.request_lick_timings.len(),
                r.response_lick_timings_prev_trial.len(),
            ]);
        }
        lens.into_iter().all(|l| l == n)
    }
}

/// Session accumulator of [`CompiledDetails`] keyed by trial-manager class.
/// Columns are only ever appended to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledRecord {
    pub compiled_details: BTreeMap<String, CompiledDetails>,
}

impl CompiledRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class: &str) -> Option<&CompiledDetails> {
        self.compiled_details.get(class)
    }

    /// Details for `class`, created with `init` on first use.
    pub fn details_mut(
        &mut self,
        class: &str,
        init: impl FnOnce() -> CompiledDetails,
    ) -> &mut CompiledDetails {
        self.compiled_details
            .entry(class.to_string())
            .or_insert_with(init)
    }

    /// Number of trials compiled under `class`.
    pub fn trials(&self, class: &str) -> usize {
        self.get(class).map_or(0, CompiledDetails::len)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
