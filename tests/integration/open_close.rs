//! Opening and closing path modals against the session history

use super::test_utils::Tab;
use modal_route::router::NavigationFailure;
use modal_route::{ModalError, ModalResult, OpenOptions};
use serde_json::json;

#[tokio::test]
async fn test_open_then_close_is_one_history_step() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let handle = controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    assert_eq!(handle.activated(), vec!["profile"]);
    assert!(controller.is_active("profile"));
    assert_eq!(tab.entries(), vec!["/home", "/home/profile"]);
    assert_eq!(tab.index(), 1);
    assert_eq!(controller.time_machine().position_by_tag("profile"), Some(0));

    controller.close_modal("profile").await.unwrap();
    assert!(!controller.is_active("profile"));
    assert_eq!(tab.index(), 0);
    assert_eq!(controller.router().current().full_path(), "/home");
    assert_eq!(handle.wait().await, ModalResult::Single(None));
}

#[tokio::test]
async fn test_round_trips_return_to_the_same_position() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    for _ in 0..3 {
        controller
            .open_modal("profile", OpenOptions::new())
            .await
            .unwrap();
        assert_eq!(tab.index(), 1);
        controller.close_modal("profile").await.unwrap();
        assert_eq!(tab.index(), 0);
        assert_eq!(tab.entries().len(), 2);
    }
}

#[tokio::test]
async fn test_close_with_value_resolves_the_handle() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let handle = controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    controller
        .close_modal_with("profile", json!({"saved": true}))
        .await
        .unwrap();

    assert_eq!(
        handle.wait().await,
        ModalResult::Single(Some(json!({"saved": true})))
    );
    assert_eq!(controller.return_value("profile"), Some(json!({"saved": true})));
}

#[tokio::test]
async fn test_reopen_keeps_last_return_value_but_resolves_fresh() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    controller.close_modal_with("profile", json!(1)).await.unwrap();
    let handle = controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    assert_eq!(controller.return_value("profile"), Some(json!(1)));
    controller.close_modal("profile").await.unwrap();
    assert_eq!(handle.wait().await, ModalResult::Single(None));
    assert_eq!(controller.return_value("profile"), Some(json!(1)));
}

#[tokio::test]
async fn test_open_and_close_errors() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let err = controller.close_modal("profile").await.unwrap_err();
    assert!(matches!(err, ModalError::NotOpen(name) if name == "profile"));
    let err = controller.close_modal("nope").await.unwrap_err();
    assert!(matches!(err, ModalError::NotFound(_)));
    let err = controller
        .open_modal("nope", OpenOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ModalError::NotFound(_)));

    controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    let err = controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ModalError::AlreadyOpen(name) if name == "profile"));
    assert_eq!(tab.entries().len(), 2);
}

#[tokio::test]
async fn test_back_button_closes_the_modal() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let handle = controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    controller.router().back().await.unwrap();

    assert!(!controller.is_active("profile"));
    assert_eq!(controller.router().current().full_path(), "/home");
    assert!(controller.time_machine().tags().is_empty());
    assert_eq!(handle.wait().await, ModalResult::Single(None));
}

#[tokio::test]
async fn test_forward_cannot_reopen_a_closed_modal() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    controller.close_modal("profile").await.unwrap();

    controller.router().forward().await.unwrap();
    assert_eq!(tab.index(), 0);
    assert!(!controller.is_active("profile"));
    assert_eq!(controller.router().current().full_path(), "/home");
    assert_eq!(controller.router().adapter().position(), 0);
}

#[tokio::test]
async fn test_imperative_push_into_a_modal_is_denied() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let failure = controller.router().push("/home/profile").await.unwrap();
    assert_eq!(failure, Some(NavigationFailure::Aborted));
    assert_eq!(tab.entries(), vec!["/home"]);
    assert!(!controller.is_active("profile"));

    // plain page navigation is untouched
    assert_eq!(controller.router().push("/about").await.unwrap(), None);
    assert_eq!(tab.entries(), vec!["/home", "/about"]);
}

#[tokio::test]
async fn test_leaving_a_modal_by_navigation_rewinds_past_it() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let handle = controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    controller.router().push("/about").await.unwrap();

    assert_eq!(tab.entries(), vec!["/home", "/about"]);
    assert_eq!(tab.index(), 1);
    assert_eq!(controller.router().current().full_path(), "/about");
    assert!(!controller.is_active("profile"));
    assert_eq!(handle.wait().await, ModalResult::Single(None));
}
