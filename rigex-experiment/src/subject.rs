use serde::{Deserialize, Serialize};

/// Read-only view of the animal or participant being run.
///
/// `reward_ms` and `timeout_ms` are per-subject overrides consumed by
/// constant reinforcement; `history` holds correctness of recent graded
/// trials, newest last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    pub id: String,
    pub reward_ms: Option<f64>,
    pub timeout_ms: Option<f64>,
    pub history: Vec<bool>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Fraction correct over the last `window` graded trials.
    pub fn recent_performance(&self, window: usize) -> Option<f64> {
        if window == 0 || self.history.is_empty() {
            return None;
        }
        let recent = &self.history[self.history.len().saturating_sub(window)..];
        let hits = recent.iter().filter(|c| **c).count();
        Some(hits as f64 / recent.len() as f64)
    }

    pub fn record_outcome(&mut self, correct: Option<bool>) {
        if let Some(c) = correct {
            self.history.push(c);
        }
    }
}
