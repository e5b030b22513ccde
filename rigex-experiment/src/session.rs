use crate::compiled::CompiledRecord;
use crate::manager::TrialManager;
use crate::subject::Subject;
use rand::RngCore;
use rigex_core::{Disposition, Station, TrialRecord};
use serde::Serialize;

/// Tally of trial dispositions for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub trials: u64,
    pub correct: u64,
    pub incorrect: u64,
    pub completed: u64,
    pub errored_out: u64,
    pub manual_quit: u64,
    /// Set when a trial asked the session to stop.
    pub quit: bool,
}

impl SessionSummary {
    pub fn count(&mut self, disposition: Disposition) {
        self.trials += 1;
        match disposition {
            Disposition::Correct => self.correct += 1,
            Disposition::Incorrect => self.incorrect += 1,
            Disposition::Completed => self.completed += 1,
            Disposition::ErroredOut => self.errored_out += 1,
            Disposition::ManualQuit => self.manual_quit += 1,
        }
    }
}

/// Runs trials back to back: `do_trial` then `trial_compiler`, numbering
/// trials from 1 and stopping early when a trial requests quit.
pub struct Session<'a> {
    manager: &'a dyn TrialManager,
    subject: Subject,
    compiled: CompiledRecord,
    records: Vec<TrialRecord>,
}

impl<'a> Session<'a> {
    pub fn new(manager: &'a dyn TrialManager, subject: Subject) -> Self {
        Self {
            manager,
            subject,
            compiled: CompiledRecord::new(),
            records: Vec::new(),
        }
    }

    pub fn run(
        &mut self,
        station: &mut dyn Station,
        trials: u64,
        rng: &mut dyn RngCore,
    ) -> SessionSummary {
        let mut summary = SessionSummary::default();
        let first = self.next_trial_number();
        tracing::info!(
            component = "session",
            manager = self.manager.name(),
            subject = %self.subject.id,
            trials,
            "session started"
        );
        for trial_number in first..first + trials {
            let record = TrialRecord::new(trial_number);
            let (record, quit) = self.manager.do_trial(
                station,
                &self.subject,
                record,
                &self.compiled,
                summary.quit,
                rng,
            );
            summary.count(self.complete(record));
            if quit {
                summary.quit = true;
                tracing::info!(component = "session", condition = "quit", trial = trial_number);
                break;
            }
        }
        summary
    }

    /// Number the next trial will carry.
    pub fn next_trial_number(&self) -> u64 {
        self.records.len() as u64 + 1
    }

    pub fn manager(&self) -> &'a dyn TrialManager {
        self.manager
    }

    /// Files a finished trial: compiles it, updates the subject's history
    /// and keeps the record.
    pub fn complete(&mut self, record: TrialRecord) -> Disposition {
        self.manager.trial_compiler(&mut self.compiled, &record);
        self.subject.record_outcome(record.correct);
        let disposition = record.disposition();
        tracing::info!(
            component = "session",
            trial = record.trial_number,
            disposition = ?disposition,
            phases = record.phase_data.len(),
        );
        self.records.push(record);
        disposition
    }

    pub fn compiled(&self) -> &CompiledRecord {
        &self.compiled
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn into_parts(self) -> (CompiledRecord, Vec<TrialRecord>) {
        (self.compiled, self.records)
    }
}
