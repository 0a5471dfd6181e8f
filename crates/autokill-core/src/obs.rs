//! Structured observability hooks for policy changes and offline decisions.
//!
//! Every event carries an `event = "<area>.<what>"` field so log pipelines can
//! filter on it. Verbosity follows `RUST_LOG`; see [`crate::init_tracing`].

use tracing::{debug, info, warn};

use crate::config::PolicySettings;
use crate::error::PatternError;
use crate::evaluator::SkipReason;
use crate::severity::ResultSeverity;

/// Emit event: policy loaded from the store at startup.
pub fn emit_policy_loaded(settings: &PolicySettings) {
    info!(
        event = "policy.loaded",
        enabled = settings.enabled,
        pattern = settings.pattern.as_deref().unwrap_or(""),
        threshold = %settings.threshold(),
    );
}

/// Emit event: a reconfiguration was accepted and is now live.
pub fn emit_policy_reconfigured(settings: &PolicySettings) {
    info!(
        event = "policy.reconfigured",
        enabled = settings.enabled,
        pattern = settings.pattern.as_deref().unwrap_or(""),
        threshold = %settings.threshold(),
    );
}

/// Emit event: a reconfiguration was refused because its pattern is invalid.
pub fn emit_reconfigure_rejected(error: &PatternError) {
    warn!(event = "policy.reconfigure_rejected", pattern = %error.pattern, error = %error.source);
}

/// Emit event: a machine is being taken offline. `reason` is the full message.
pub fn emit_machine_offlined(job: &str, machine: &str, result: ResultSeverity, reason: &str) {
    warn!(
        event = "machine.offlined",
        job = %job,
        machine = %machine,
        result = %result,
        "{reason}"
    );
}

/// Emit event: the stored pattern failed to compile during an evaluation.
pub fn emit_pattern_invalid(job: &str, machine: &str, error: &PatternError) {
    warn!(
        event = "policy.pattern_invalid",
        job = %job,
        machine = %machine,
        pattern = %error.pattern,
        error = %error.source,
    );
}

/// Emit event: an enabled policy looked at a completion and did nothing.
pub fn emit_evaluation_skipped(job: &str, result: ResultSeverity, reason: SkipReason) {
    debug!(
        event = "evaluation.skipped",
        job = %job,
        result = %result,
        reason = reason.as_str(),
    );
}
