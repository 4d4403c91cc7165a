//! Deployment run record

use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::deploy::buffer::OutputBuffer;
use crate::errors::DeployError;

/// Terminal classification of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Outcome {
    /// No run has finished yet
    #[default]
    None,
    Success,
    Failed,
    Error,
}

impl Outcome {
    /// Wire representation, `None` for [`Outcome::None`]
    pub fn as_status(&self) -> Option<&'static str> {
        match self {
            Outcome::None => None,
            Outcome::Success => Some("success"),
            Outcome::Failed => Some("failed"),
            Outcome::Error => Some("error"),
        }
    }

    /// Outcome for the result of a supervised run
    pub fn from_result(result: &Result<(), DeployError>) -> (Self, Option<String>) {
        match result {
            Ok(()) => (Outcome::Success, None),
            Err(e @ DeployError::ProcessFailed { .. }) => (Outcome::Failed, Some(e.to_string())),
            Err(e) => (Outcome::Error, Some(e.to_string())),
        }
    }
}

/// The single mutable deployment record.
///
/// Created once at startup and mutated in place for every run. Only the
/// supervisor holds it, behind a mutex.
#[derive(Debug, Clone, Default)]
pub struct DeploymentRun {
    running: bool,
    run_id: Option<Uuid>,
    started_at: Option<DateTime<Local>>,
    finished_at: Option<DateTime<Local>>,
    outcome: Outcome,
    error: Option<String>,
    output: OutputBuffer,
}

impl DeploymentRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    /// Check-and-set of the running flag.
    ///
    /// Clears the previous run's output, error and finish time. The previous
    /// outcome stays visible until the new run finishes.
    pub fn begin(&mut self, run_id: Uuid, now: DateTime<Local>) -> Result<(), DeployError> {
        if self.running {
            return Err(DeployError::AlreadyRunning);
        }
        self.running = true;
        self.run_id = Some(run_id);
        self.started_at = Some(now);
        self.finished_at = None;
        self.error = None;
        self.output.clear();
        Ok(())
    }

    /// Append an output line for the run identified by `run_id`.
    ///
    /// Lines from a run that is no longer current are dropped.
    pub fn push_line(&mut self, run_id: Uuid, line: String) {
        if self.running && self.run_id == Some(run_id) {
            self.output.push(line);
        }
    }

    /// Record the terminal state of the run identified by `run_id`.
    ///
    /// Returns false when that run already finished.
    pub fn finish(
        &mut self,
        run_id: Uuid,
        outcome: Outcome,
        error: Option<String>,
        now: DateTime<Local>,
    ) -> bool {
        if !self.running || self.run_id != Some(run_id) {
            return false;
        }
        self.running = false;
        self.outcome = outcome;
        self.error = error;
        self.finished_at = Some(now);
        true
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            running: self.running,
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            outcome: self.outcome,
            error: self.error.clone(),
            output: self.output.to_vec(),
        }
    }
}

/// Point-in-time copy of the deployment record
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub running: bool,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
    pub outcome: Outcome,
    pub error: Option<String>,
    pub output: Vec<String>,
}

impl RunSnapshot {
    pub fn output_lines(&self) -> usize {
        self.output.len()
    }

    /// The last `n` output lines, oldest first
    pub fn last_output(&self, n: usize) -> &[String] {
        let start = self.output.len().saturating_sub(n);
        &self.output[start..]
    }
}
