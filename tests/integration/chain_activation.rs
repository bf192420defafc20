//! Nested modal chains, activation data, setup and published state

use super::test_utils::Tab;
use modal_route::history::MemoryHistory;
use modal_route::registry::ModalOptions;
use modal_route::storage::MemoryStorage;
use modal_route::{ModalController, ModalError, ModalResult, OpenOptions, RouteRecord, SetupScope};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

#[tokio::test]
async fn test_opening_a_nested_modal_activates_its_chain() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let handle = controller
        .open_modal("edit", OpenOptions::new())
        .await
        .unwrap();
    assert_eq!(handle.activated(), vec!["profile", "edit"]);
    assert_eq!(
        tab.entries(),
        vec!["/home", "/home/profile", "/home/profile/edit"]
    );
    let time_machine = controller.time_machine();
    assert_eq!(time_machine.position_by_tag("profile"), Some(0));
    assert_eq!(time_machine.position_by_tag("edit"), Some(1));

    controller.close_modal("edit").await.unwrap();
    assert_eq!(tab.index(), 1);
    assert!(controller.is_active("profile"));
    assert!(!controller.is_active("edit"));

    controller.close_modal("profile").await.unwrap();
    assert_eq!(tab.index(), 0);
    assert_eq!(handle.wait().await, ModalResult::Single(None));
}

#[tokio::test]
async fn test_plain_route_below_a_modal_resolves_with_the_modal_value() {
    let history = Arc::new(MemoryHistory::new("/home"));
    let controller = ModalController::builder()
        .routes(vec![RouteRecord::new("home", "/home").child(
            RouteRecord::modal("account", "account")
                .child(RouteRecord::new("account-info", "info")),
        )])
        .history(history.clone())
        .storage(Arc::new(MemoryStorage::new()))
        .build()
        .unwrap();
    controller.start().await.unwrap();

    let handle = controller
        .open_modal("account-info", OpenOptions::new())
        .await
        .unwrap();
    assert_eq!(handle.name(), "account-info");
    assert_eq!(handle.activated(), vec!["account"]);
    assert_eq!(history.entries(), vec!["/home", "/home/account/info"]);
    assert!(controller.is_active("account"));

    controller
        .close_modal_with("account", json!("done"))
        .await
        .unwrap();
    assert_eq!(history.index(), 0);
    assert_eq!(handle.wait().await, ModalResult::Single(Some(json!("done"))));
}

#[tokio::test]
async fn test_opening_inside_an_open_parent_adds_one_entry() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    let handle = controller
        .open_modal("edit", OpenOptions::new())
        .await
        .unwrap();
    assert_eq!(handle.activated(), vec!["edit"]);
    assert_eq!(
        tab.entries(),
        vec!["/home", "/home/profile", "/home/profile/edit"]
    );
    assert_eq!(controller.time_machine().position_by_tag("edit"), Some(1));
}

#[tokio::test]
async fn test_per_modal_data_yields_a_result_per_modal() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let handle = controller
        .open_modal(
            "edit",
            OpenOptions::new()
                .data_for("profile", json!({"id": 7}))
                .data_for("edit", json!("draft"))
                .data_for("settings", json!("ignored")),
        )
        .await
        .unwrap();
    assert_eq!(controller.data("profile"), Some(json!({"id": 7})));
    assert_eq!(controller.data("edit"), Some(json!("draft")));
    assert_eq!(controller.data("settings"), None);

    controller.close_modal_with("edit", json!("saved")).await.unwrap();
    controller.close_modal_with("profile", json!(true)).await.unwrap();

    let expected = BTreeMap::from([
        ("edit".to_string(), Some(json!("saved"))),
        ("profile".to_string(), Some(json!(true))),
    ]);
    assert_eq!(handle.wait().await, ModalResult::Many(expected));
    assert_eq!(controller.data("edit"), None);
}

#[tokio::test]
async fn test_single_data_goes_to_the_deepest_modal() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("edit", OpenOptions::new().data(json!({"field": "name"})))
        .await
        .unwrap();
    assert_eq!(controller.data("edit"), Some(json!({"field": "name"})));
    assert_eq!(controller.data("profile"), None);
}

#[tokio::test]
async fn test_setup_resolves_the_single_inactive_modal() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let err = controller
        .setup_modal("edit", ModalOptions::default(), SetupScope::Root)
        .unwrap_err();
    match err {
        ModalError::MultipleModalsAmbiguous { name, candidates } => {
            assert_eq!(name, "edit");
            assert_eq!(candidates, vec!["profile", "edit"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let target = controller
        .setup_modal(
            "edit",
            ModalOptions::default(),
            SetupScope::View("profile".to_string()),
        )
        .unwrap();
    assert_eq!(target, "edit");

    let err = controller
        .setup_modal(
            "edit",
            ModalOptions::default(),
            SetupScope::View("profile".to_string()),
        )
        .unwrap_err();
    assert!(matches!(err, ModalError::AlreadySettled(name) if name == "edit"));

    assert_eq!(controller.teardown_modal("edit").unwrap(), Some(ModalOptions::default()));
    assert!(controller
        .setup_modal(
            "edit",
            ModalOptions::default(),
            SetupScope::View("profile".to_string()),
        )
        .is_ok());
}

#[tokio::test]
async fn test_setup_of_an_open_chain_targets_the_named_modal() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("edit", OpenOptions::new())
        .await
        .unwrap();
    let target = controller
        .setup_modal("edit", ModalOptions::default(), SetupScope::Root)
        .unwrap();
    assert_eq!(target, "edit");
}

#[tokio::test]
async fn test_manual_modal_stays_hidden_until_unlocked() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let options = ModalOptions {
        manual: true,
        ..ModalOptions::default()
    };
    let target = controller
        .setup_modal("profile", options, SetupScope::Root)
        .unwrap();
    assert_eq!(target, "profile");

    controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    assert!(controller.is_active("profile"));
    assert!(!controller.is_visible("profile"));
    assert!(controller.snapshot().visible.is_empty());

    controller.unlock("profile").unwrap();
    assert!(controller.is_visible("profile"));
    assert_eq!(controller.snapshot().visible, vec!["profile"]);
}

#[tokio::test]
async fn test_subscribers_see_each_settled_state() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let mut snapshots = controller.subscribe();
    {
        let initial = snapshots.borrow_and_update();
        assert_eq!(initial.full_path, "/home");
        assert_eq!(initial.route.as_deref(), Some("home"));
        assert!(initial.active.is_empty());
    }

    controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    assert!(snapshots.has_changed().unwrap());
    assert_eq!(snapshots.borrow_and_update().active, vec!["profile"]);

    controller.close_modal("profile").await.unwrap();
    assert!(snapshots.has_changed().unwrap());
    let closed = snapshots.borrow_and_update().clone();
    assert!(closed.active.is_empty());
    assert_eq!(closed.full_path, "/home");

    // nothing settled, nothing published
    controller.router().push("/home/profile").await.unwrap();
    assert!(!snapshots.has_changed().unwrap());
}
