mod common;

use common::strategies::*;
use common::TestHarness;
use proptest::prelude::*;

use carrier_migration::error::MigrationError;
use carrier_migration::orchestration::{StartOutcome, TickOutcome};
use carrier_migration::test_utils::StoreCall;

fn to_result(result: &Result<u64, String>) -> Result<u64, MigrationError> {
    result.clone().map_err(MigrationError::DatabaseError)
}

fn flags_dominate(next: [bool; 3], prev: [bool; 3]) -> bool {
    next.iter().zip(prev.iter()).all(|(n, p)| *n || !*p)
}

fn flags_are_prefix(flags: [bool; 3]) -> bool {
    flags.windows(2).all(|w| w[0] || !w[1])
}

proptest! {
    /// Property: within a run, completion flags never go back to false and
    /// always form a prefix; once the run ends the state stays idle
    #[test]
    fn flags_progress_monotonically(
        carrier in carrier_strategy(),
        results in faulty_sequence_strategy(),
    ) {
        tokio_test::block_on(async {
            let harness = TestHarness::manual();
            for result in &results {
                harness.store.push_source_update(to_result(result));
                harness.store.push_source_history_copy(to_result(result));
                harness.store.push_secondary_update(to_result(result));
                harness.store.push_secondary_history_copy(to_result(result));
            }
            prop_assert_eq!(harness.controller.start_run(&carrier), StartOutcome::Accepted);

            let mut prev = harness.controller.status();
            for _ in 0..(results.len() * 4 + 4) {
                let outcome = harness.tick().await;
                let next = harness.controller.status();

                prop_assert!(flags_are_prefix(next.step_flags));
                if next.active {
                    prop_assert!(prev.active);
                    prop_assert!(flags_dominate(next.step_flags, prev.step_flags));
                    prop_assert_eq!(next.carrier.as_deref(), Some(carrier.as_str()));
                } else {
                    prop_assert!(next.is_idle());
                    if !prev.active {
                        prop_assert_eq!(outcome, TickOutcome::Idle);
                    }
                }
                prev = next;
            }

            for call in harness.store.calls() {
                match call {
                    StoreCall::UpdateSource(c) | StoreCall::UpdateSecondary(c) => {
                        prop_assert_eq!(c, carrier.clone());
                    }
                    _ => {}
                }
            }
            harness.controller.shutdown();
            Ok(())
        })?;
    }

    /// Property: the source update repeats exactly until it reports zero rows,
    /// and the history copy follows on the next tick
    #[test]
    fn source_update_repeats_until_empty(chunks in chunk_sequence_strategy()) {
        tokio_test::block_on(async {
            let harness = TestHarness::manual();
            harness.store.push_source_updates(&chunks);
            harness.controller.start_run("CARR1");

            let expected_updates = chunks
                .iter()
                .position(|&rows| rows == 0)
                .map_or(chunks.len() + 1, |i| i + 1);

            for _ in 0..=expected_updates {
                harness.tick().await;
            }

            let calls = harness.store.calls();
            prop_assert_eq!(calls.len(), expected_updates + 1);
            prop_assert!(calls[..expected_updates]
                .iter()
                .all(|c| matches!(c, StoreCall::UpdateSource(_))));
            prop_assert_eq!(&calls[expected_updates], &StoreCall::CopySourceHistory);
            prop_assert_eq!(harness.controller.status().step_flags, [true, true, false]);

            harness.controller.shutdown();
            Ok(())
        })?;
    }
}
