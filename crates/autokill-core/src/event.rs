//! Job completion events delivered to the evaluator.

use std::sync::{Mutex, PoisonError};

use crate::machine::Machine;
use crate::severity::ResultSeverity;

/// The job's own log sink.
pub trait JobListener: Send + Sync {
    fn error(&self, message: &str);
}

/// Listener that keeps every message, for tests and simulations.
#[derive(Debug, Default)]
pub struct RecordingListener {
    errors: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl JobListener for RecordingListener {
    fn error(&self, message: &str) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// One finished job. Lives only for the duration of a single evaluation.
pub struct CompletionEvent<'a> {
    /// Display name of the job, e.g. `"nightly #42"`.
    pub job: String,
    pub result: ResultSeverity,
    /// The machine that executed the job, if any.
    pub machine: Option<&'a dyn Machine>,
    pub listener: &'a dyn JobListener,
}

impl<'a> CompletionEvent<'a> {
    pub fn new(
        job: impl Into<String>,
        result: ResultSeverity,
        machine: Option<&'a dyn Machine>,
        listener: &'a dyn JobListener,
    ) -> Self {
        Self {
            job: job.into(),
            result,
            machine,
            listener,
        }
    }

    /// Name of the executing machine; `None` if there is no machine or it is unnamed.
    pub fn machine_name(&self) -> Option<String> {
        self.machine.and_then(|m| m.name())
    }

    pub fn report_error(&self, message: &str) {
        self.listener.error(message);
    }
}

impl std::fmt::Debug for CompletionEvent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionEvent")
            .field("job", &self.job)
            .field("result", &self.result)
            .field("machine", &self.machine_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::FleetMachine;

    #[test]
    fn test_machine_name_absent_without_machine() {
        let listener = RecordingListener::new();
        let event = CompletionEvent::new("job", ResultSeverity::Failure, None, &listener);
        assert!(event.machine_name().is_none());
    }

    #[test]
    fn test_machine_name_absent_for_unnamed_machine() {
        let listener = RecordingListener::new();
        let machine = FleetMachine::unnamed();
        let event = CompletionEvent::new("job", ResultSeverity::Failure, Some(&machine), &listener);
        assert!(event.machine_name().is_none());
    }

    #[test]
    fn test_report_error_reaches_listener() {
        let listener = RecordingListener::new();
        let machine = FleetMachine::new("agent-1");
        let event = CompletionEvent::new("job", ResultSeverity::Success, Some(&machine), &listener);
        event.report_error("boom");
        assert_eq!(listener.errors(), vec!["boom".to_string()]);
    }
}
