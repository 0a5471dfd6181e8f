//! Completion evaluation: decide whether a job's machine goes offline.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{PolicyConfig, PolicySnapshot};
use crate::event::CompletionEvent;
use crate::machine::OfflineCause;
use crate::obs;

/// Why an evaluation ended without action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    BetterThanThreshold,
    NoMachine,
    NoPattern,
    NoMatch,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Disabled => "disabled",
            SkipReason::BetterThanThreshold => "better_than_threshold",
            SkipReason::NoMachine => "no_machine",
            SkipReason::NoPattern => "no_pattern",
            SkipReason::NoMatch => "no_match",
        }
    }
}

/// Outcome of evaluating one completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Evaluation {
    NoAction { skipped: SkipReason },
    /// The configured pattern does not compile. Nothing was taken offline.
    ConfigError { message: String },
    ActionTaken { reason: String },
}

impl Evaluation {
    pub fn is_action_taken(&self) -> bool {
        matches!(self, Evaluation::ActionTaken { .. })
    }

    pub fn is_no_action(&self) -> bool {
        matches!(self, Evaluation::NoAction { .. })
    }
}

/// Job-completion handler bound to the process-wide policy.
///
/// Register [`CompletionEvaluator::on_completed`] with whatever delivers job
/// completions. It runs synchronously on the caller's thread.
#[derive(Debug, Clone)]
pub struct CompletionEvaluator {
    config: Arc<PolicyConfig>,
}

impl CompletionEvaluator {
    pub fn new(config: Arc<PolicyConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<PolicyConfig> {
        &self.config
    }

    pub fn on_completed(&self, event: &CompletionEvent<'_>) -> Evaluation {
        evaluate(event, &self.config)
    }
}

/// Evaluate `event` against the current policy.
pub fn evaluate(event: &CompletionEvent<'_>, config: &PolicyConfig) -> Evaluation {
    evaluate_snapshot(event, &config.snapshot())
}

/// Evaluate `event` against one fixed policy snapshot.
pub fn evaluate_snapshot(event: &CompletionEvent<'_>, policy: &PolicySnapshot) -> Evaluation {
    if !policy.is_enabled() {
        return Evaluation::NoAction {
            skipped: SkipReason::Disabled,
        };
    }

    let threshold = policy.threshold();
    if event.result.is_better_than(threshold) {
        return skip(event, SkipReason::BetterThanThreshold);
    }

    let Some((machine, machine_name)) = event
        .machine
        .and_then(|m| m.name().map(|name| (m, name)))
    else {
        return skip(event, SkipReason::NoMachine);
    };

    let pattern = match policy.compiled_pattern() {
        Ok(Some(pattern)) => pattern,
        Ok(None) => return skip(event, SkipReason::NoPattern),
        Err(e) => {
            let message = format!(
                "autokill policy pattern is invalid, not evaluating {machine_name}: {e}"
            );
            obs::emit_pattern_invalid(&event.job, &machine_name, &e);
            event.report_error(&message);
            return Evaluation::ConfigError { message };
        }
    };

    if !pattern.is_match(&machine_name) {
        return skip(event, SkipReason::NoMatch);
    }

    let reason = format!(
        "Machine {machine_name} matched autokill pattern {} after {} finished {}; taking it offline.",
        pattern.as_str(),
        event.job,
        event.result,
    );
    obs::emit_machine_offlined(&event.job, &machine_name, event.result, &reason);
    event.report_error(&reason);
    machine.set_offline(OfflineCause::new(reason.clone(), event.job.clone(), event.result));

    Evaluation::ActionTaken { reason }
}

fn skip(event: &CompletionEvent<'_>, reason: SkipReason) -> Evaluation {
    obs::emit_evaluation_skipped(&event.job, event.result, reason);
    Evaluation::NoAction { skipped: reason }
}
