mod common;

use common::{drain_events, TestHarness};
use std::sync::Arc;

use carrier_migration::config::MigrationConfig;
use carrier_migration::events::{AbortReason, RunEvent};
use carrier_migration::orchestration::{JobController, StartOutcome};
use carrier_migration::test_utils::ScriptedMigrationStore;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_starts_accept_exactly_one() {
    let harness = TestHarness::manual();
    let controller = Arc::new(harness.controller);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.start_run(&format!("CARR{i}")) })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
    let conflicts = outcomes
        .iter()
        .filter(|o| **o == StartOutcome::Conflict)
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(conflicts, 7);
    assert!(controller.status().active);

    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_conflict_leaves_state_untouched_mid_run() {
    let harness = TestHarness::manual();
    harness.store.push_source_updates(&[0]);
    harness.controller.start_run("CARR2");
    harness.tick().await;
    let before = harness.controller.status();
    assert_eq!(before.step_flags, [true, false, false]);

    assert_eq!(harness.controller.start_run("CARR3"), StartOutcome::Conflict);

    assert_eq!(harness.controller.status(), before);
    harness.controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_start_publishes_run_started_with_fresh_run_id() {
    let harness = TestHarness::manual();
    let mut rx = harness.subscribe();

    harness.controller.start_run("CARR1");
    let first_id = harness.controller.status().run_id;
    harness.controller.shutdown();
    harness.controller.start_run("CARR1");
    let second_id = harness.controller.status().run_id;
    harness.controller.shutdown();

    assert!(first_id.is_some());
    assert_ne!(first_id, second_id);

    let events = drain_events(&mut rx);
    let started: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::RunStarted { run_id, carrier } => Some((Some(*run_id), carrier.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        started,
        vec![(first_id, "CARR1".to_string()), (second_id, "CARR1".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_with_cancelled_reason() {
    let harness = TestHarness::manual();
    let mut rx = harness.subscribe();
    harness.controller.start_run("CARR1");

    assert!(harness.controller.shutdown());

    assert!(harness.controller.status().is_idle());
    assert!(!harness.controller.processor().scheduler().is_armed());
    let last = drain_events(&mut rx).pop();
    assert!(matches!(
        last,
        Some(RunEvent::RunAborted {
            reason: AbortReason::Cancelled,
            ..
        })
    ));
}

#[test]
fn test_start_without_runtime_reports_internal_error() {
    let controller =
        JobController::from_config(&MigrationConfig::default(), ScriptedMigrationStore::shared());

    let outcome = controller.start_run("CARR1");

    assert!(matches!(outcome, StartOutcome::InternalError(_)));
    assert_eq!(outcome.status_code(), 500);
    assert!(controller.status().is_idle());
    // A later start is not blocked by the failed one
    assert!(matches!(
        controller.start_run("CARR1"),
        StartOutcome::InternalError(_)
    ));
}
