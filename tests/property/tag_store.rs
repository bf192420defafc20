//! Properties of the tag store: purging is bounded, idempotent and persisted

use modal_route::config::ModalRouteConfig;
use modal_route::history::{HistoryAdapter, MemoryHistory};
use modal_route::storage::{MemoryStorage, SessionStorage};
use modal_route::time_machine::{HistoryTag, TimeMachine};
use proptest::prelude::*;
use std::sync::Arc;

fn machine(storage: Arc<MemoryStorage>) -> Arc<TimeMachine> {
    let adapter = HistoryAdapter::shared(Arc::new(MemoryHistory::new("/")));
    TimeMachine::load(adapter, storage, &ModalRouteConfig::default()).unwrap()
}

/// Purging drops exactly the tags at or beyond the position, once
#[test]
fn test_purge_is_bounded_and_idempotent() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(prop::collection::vec(0i64..32, 0..16), 0i64..32),
            |(positions, cut)| {
                let storage = Arc::new(MemoryStorage::new());
                let machine = machine(storage.clone());
                for (index, position) in positions.iter().enumerate() {
                    machine.tag(&format!("modal-{}", index), Some(*position)).unwrap();
                }

                let expected_removed = positions.iter().filter(|p| **p >= cut).count();
                let removed = machine.purge_from(cut).unwrap();
                prop_assert_eq!(removed, expected_removed);
                prop_assert!(machine.tags().iter().all(|t| t.position < cut));

                // a second purge at the same position is a no-op
                prop_assert_eq!(machine.purge_from(cut).unwrap(), 0);

                let persisted: Vec<HistoryTag> =
                    serde_json::from_value(storage.get("modal-route:tags").unwrap().unwrap())
                        .unwrap();
                prop_assert_eq!(persisted, machine.tags());
                Ok(())
            },
        )
        .unwrap();
}

/// The newest tag for a name wins, whatever was written before
#[test]
fn test_last_tag_wins() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::vec((0usize..4, 0i64..32), 1..24),
            |writes| {
                let machine = machine(Arc::new(MemoryStorage::new()));
                for (name, position) in &writes {
                    machine.tag(&format!("modal-{}", name), Some(*position)).unwrap();
                }
                for name in 0..4usize {
                    let last = writes
                        .iter()
                        .rev()
                        .find(|(n, _)| *n == name)
                        .map(|(_, p)| *p);
                    prop_assert_eq!(machine.position_by_tag(&format!("modal-{}", name)), last);
                }
                let mut names: Vec<String> = machine.tags().into_iter().map(|t| t.name).collect();
                let count = names.len();
                names.sort();
                names.dedup();
                prop_assert_eq!(names.len(), count);
                Ok(())
            },
        )
        .unwrap();
}
