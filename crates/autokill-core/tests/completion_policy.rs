//! End-to-end decision tests for the completion evaluator.

use std::sync::Arc;

use autokill_core::{
    evaluate, AutokillError, CompletionEvaluator, CompletionEvent, Evaluation, FleetMachine,
    Machine, MemoryConfigStore, PolicyConfig, PolicySettings, RecordingListener, ResultSeverity,
    SkipReason,
};

fn policy(enabled: bool, pattern: Option<&str>, worse_than: Option<&str>) -> PolicyConfig {
    PolicyConfig::new(
        PolicySettings::new(enabled, pattern, worse_than),
        Arc::new(MemoryConfigStore::new()),
    )
}

/// Run one completion on a fresh machine and return the outcome plus the machine.
fn complete(
    config: &PolicyConfig,
    machine_name: &str,
    result: ResultSeverity,
) -> (Evaluation, FleetMachine, RecordingListener) {
    let machine = FleetMachine::new(machine_name);
    let listener = RecordingListener::new();
    let outcome = {
        let event = CompletionEvent::new("pipeline #1", result, Some(&machine), &listener);
        evaluate(&event, config)
    };
    (outcome, machine, listener)
}

// -------------------------------------------------------------------------
// Threshold comparison
// -------------------------------------------------------------------------

#[test]
fn test_results_better_than_threshold_never_act() {
    for threshold in ResultSeverity::ALL {
        let config = policy(true, Some(".*"), Some(threshold.as_str()));
        for result in ResultSeverity::ALL.into_iter().filter(|r| r.is_better_than(threshold)) {
            let (outcome, machine, listener) = complete(&config, "worker-1", result);
            assert_eq!(
                outcome,
                Evaluation::NoAction {
                    skipped: SkipReason::BetterThanThreshold
                },
                "{result} vs threshold {threshold}"
            );
            assert_eq!(machine.offline_requests(), 0);
            assert!(listener.errors().is_empty());
        }
    }
}

#[test]
fn test_results_at_or_worse_than_threshold_act_once() {
    for threshold in ResultSeverity::ALL {
        let config = policy(true, Some("worker"), Some(threshold.as_str()));
        for result in ResultSeverity::ALL
            .into_iter()
            .filter(|r| r.is_worse_or_equal(threshold))
        {
            let (outcome, machine, listener) = complete(&config, "worker-1", result);
            assert!(
                outcome.is_action_taken(),
                "{result} vs threshold {threshold}: {outcome:?}"
            );
            assert_eq!(machine.offline_requests(), 1);
            assert!(machine.is_offline());
            assert_eq!(listener.errors().len(), 1);
        }
    }
}

#[test]
fn test_unknown_threshold_name_behaves_as_failure() {
    let config = policy(true, Some("worker"), Some("CATASTROPHIC"));
    assert_eq!(config.threshold(), ResultSeverity::Failure);

    let (outcome, _, _) = complete(&config, "worker-1", ResultSeverity::Unstable);
    assert!(outcome.is_no_action());
    let (outcome, _, _) = complete(&config, "worker-1", ResultSeverity::Failure);
    assert!(outcome.is_action_taken());
}

// -------------------------------------------------------------------------
// Disabled, missing machine, missing pattern
// -------------------------------------------------------------------------

#[test]
fn test_disabled_policy_never_acts() {
    for pattern in [Some("worker"), Some("(broken"), None] {
        let config = policy(false, pattern, Some("SUCCESS"));
        for result in ResultSeverity::ALL {
            for name in ["worker-1", "unrelated"] {
                let (outcome, machine, listener) = complete(&config, name, result);
                assert_eq!(
                    outcome,
                    Evaluation::NoAction {
                        skipped: SkipReason::Disabled
                    }
                );
                assert_eq!(machine.offline_requests(), 0);
                assert!(listener.errors().is_empty());
            }
        }
    }
}

#[test]
fn test_no_machine_never_acts() {
    let config = policy(true, Some(".*"), Some("SUCCESS"));
    let listener = RecordingListener::new();
    for result in ResultSeverity::ALL {
        let event = CompletionEvent::new("flyweight task", result, None, &listener);
        assert_eq!(
            evaluate(&event, &config),
            Evaluation::NoAction {
                skipped: SkipReason::NoMachine
            }
        );
    }
    assert!(listener.errors().is_empty());
}

#[test]
fn test_no_pattern_is_no_action_not_config_error() {
    for pattern in [None, Some(""), Some("  ")] {
        let config = policy(true, pattern, Some("SUCCESS"));
        for result in ResultSeverity::ALL {
            let (outcome, machine, _) = complete(&config, "worker-1", result);
            assert_eq!(
                outcome,
                Evaluation::NoAction {
                    skipped: SkipReason::NoPattern
                }
            );
            assert!(!machine.is_offline());
        }
    }
}

// -------------------------------------------------------------------------
// Concrete scenarios
// -------------------------------------------------------------------------

#[test]
fn test_worker_failure_matches_anchored_pattern() {
    let config = policy(true, Some(r"^worker-\d+$"), Some("FAILURE"));
    let (outcome, machine, listener) = complete(&config, "worker-42", ResultSeverity::Failure);

    match outcome {
        Evaluation::ActionTaken { reason } => {
            assert!(reason.contains("worker-42"));
            assert!(reason.contains(r"^worker-\d+$"));
            assert_eq!(listener.errors(), vec![reason]);
        }
        other => panic!("expected ActionTaken, got {other:?}"),
    }
    assert!(machine.is_offline());
}

#[test]
fn test_unstable_is_better_than_failure_threshold() {
    let config = policy(true, Some(r"^worker-\d+$"), Some("FAILURE"));
    let (outcome, machine, _) = complete(&config, "worker-42", ResultSeverity::Unstable);
    assert!(outcome.is_no_action());
    assert!(!machine.is_offline());
}

#[test]
fn test_aborted_is_worse_than_unstable_threshold() {
    let config = policy(true, Some("agent-.*"), Some("UNSTABLE"));
    let (outcome, machine, _) = complete(&config, "agent-builder-7", ResultSeverity::Aborted);
    assert!(outcome.is_action_taken());
    assert!(machine.is_offline());
}

#[test]
fn test_anchors_in_pattern_are_respected() {
    let config = policy(true, Some(r"^agent-\d+$"), Some("SUCCESS"));
    let (outcome, machine, _) = complete(&config, "agent-builder-7", ResultSeverity::Aborted);
    assert_eq!(
        outcome,
        Evaluation::NoAction {
            skipped: SkipReason::NoMatch
        }
    );
    assert!(!machine.is_offline());
}

#[test]
fn test_unanchored_pattern_matches_anywhere_in_name() {
    let config = policy(true, Some("builder"), Some("FAILURE"));
    let (outcome, _, _) = complete(&config, "agent-builder-7", ResultSeverity::Failure);
    assert!(outcome.is_action_taken());
}

// -------------------------------------------------------------------------
// Repetition and reconfiguration
// -------------------------------------------------------------------------

#[test]
fn test_repeated_evaluation_gives_same_outcome() {
    let config = Arc::new(policy(true, Some("worker"), Some("FAILURE")));
    let evaluator = CompletionEvaluator::new(config);
    let machine = FleetMachine::new("worker-3");
    let listener = RecordingListener::new();
    let event = CompletionEvent::new("job", ResultSeverity::Failure, Some(&machine), &listener);

    let first = evaluator.on_completed(&event);
    let second = evaluator.on_completed(&event);

    assert!(first.is_action_taken());
    assert_eq!(first, second);
    assert_eq!(machine.offline_requests(), 2);
    assert!(machine.is_offline());
}

#[tokio::test]
async fn test_rejected_reconfigure_keeps_previous_policy() {
    let store = Arc::new(MemoryConfigStore::new());
    let config = PolicyConfig::load(store.clone()).await.unwrap();
    config
        .reconfigure(true, Some(r"^worker-\d+$"), Some("UNSTABLE"))
        .await
        .unwrap();
    let before = config.settings();

    let err = config
        .reconfigure(false, Some("*invalid"), Some("ABORTED"))
        .await
        .unwrap_err();
    assert!(matches!(err, AutokillError::Configuration(_)));

    assert!(config.is_enabled());
    assert_eq!(config.threshold(), ResultSeverity::Unstable);
    assert_eq!(
        config.compiled_pattern().unwrap().unwrap().as_str(),
        r"^worker-\d+$"
    );
    assert_eq!(config.settings(), before);
    assert_eq!(store.saved(), Some(before));

    let (outcome, _, _) = complete(&config, "worker-9", ResultSeverity::Unstable);
    assert!(outcome.is_action_taken());
}

#[tokio::test]
async fn test_invalid_persisted_pattern_is_config_error() {
    let store = Arc::new(MemoryConfigStore::with_settings(PolicySettings::new(
        true,
        Some("worker-(\\d+"),
        Some("FAILURE"),
    )));
    let config = PolicyConfig::load(store).await.unwrap();

    let (outcome, machine, listener) = complete(&config, "worker-1", ResultSeverity::Failure);
    assert!(matches!(outcome, Evaluation::ConfigError { .. }));
    assert!(!machine.is_offline());
    assert_eq!(listener.errors().len(), 1);

    // Below the threshold the pattern is never consulted.
    let (outcome, _, listener) = complete(&config, "worker-1", ResultSeverity::Success);
    assert!(outcome.is_no_action());
    assert!(listener.errors().is_empty());
}
