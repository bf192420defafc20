//! Properties of query modal bases

use modal_route::history::{HistoryAdapter, MemoryHistory};
use modal_route::location::{Location, Query};
use modal_route::registry::ModalMeta;
use modal_route::router::{RouteTable, Router};
use modal_route::strategy::{QueryStrategy, RouteStrategy};
use modal_route::RouteRecord;
use proptest::prelude::*;
use std::sync::Arc;

const MODALS: [&str; 4] = ["confirm", "picker", "share", "login"];

fn setup() -> (Arc<Router>, QueryStrategy) {
    let adapter = HistoryAdapter::shared(Arc::new(MemoryHistory::new("/home")));
    let table = RouteTable::new(vec![RouteRecord::new("home", "/home")]).unwrap();
    let strategy = QueryStrategy::new(
        "m-",
        MODALS
            .iter()
            .map(|name| (name.to_string(), ModalMeta::default()))
            .collect(),
    );
    (Router::new(adapter, table), strategy)
}

/// The base of a query modal keeps every modal opened before it and every
/// caller key, and drops the modal and everything opened after it.
#[test]
fn test_base_cuts_the_stack_at_the_modal() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let strategy_input = (Just(MODALS.to_vec()).prop_shuffle(), 1usize..=4, 0usize..4);

    runner
        .run(&strategy_input, |(order, open, plain)| {
            let (router, strategy) = setup();
            let opened = &order[..open];
            let mut query = Query::new();
            for (index, name) in opened.iter().enumerate() {
                query.insert(strategy.key(name), "");
                if index < plain {
                    query.insert(format!("p{}", index), "v");
                }
            }
            let route = router
                .resolve(&Location::new("/home").with_query(query.clone()).into())
                .unwrap();
            prop_assert_eq!(strategy.active_in(route.query()), opened.to_vec());

            for (cut, name) in opened.iter().enumerate() {
                let base = strategy.find_base(&router, name, &route).unwrap().unwrap();
                prop_assert_eq!(strategy.active_in(&base.query), opened[..cut].to_vec());
                for key in query.keys().filter(|k| k.starts_with('p')) {
                    prop_assert!(base.query.contains(key));
                }
                prop_assert_eq!(base.path.as_str(), "/home");
            }

            let stripped = strategy.strip(&query);
            prop_assert!(strategy.active_in(&stripped).is_empty());
            prop_assert_eq!(stripped.len(), query.len() - open);
            Ok(())
        })
        .unwrap();
}
