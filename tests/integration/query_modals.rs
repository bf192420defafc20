//! Query modals: stacking, base computation and load stripping

use super::test_utils::Tab;
use modal_route::{ModalError, ModalResult, OpenOptions};
use serde_json::json;

#[tokio::test]
async fn test_open_query_modal_tags_the_entry_below() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("confirm", OpenOptions::new())
        .await
        .unwrap();
    assert!(controller.is_active("confirm"));
    assert_eq!(tab.entries(), vec!["/home", "/home?m-confirm"]);
    assert_eq!(controller.time_machine().position_by_tag("confirm"), Some(0));
}

#[tokio::test]
async fn test_query_modals_stack_and_close_lifo() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let confirm = controller
        .open_modal("confirm", OpenOptions::new())
        .await
        .unwrap();
    let picker = controller
        .open_modal("picker", OpenOptions::new().data(json!(["a", "b"])))
        .await
        .unwrap();
    assert_eq!(
        controller.router().current().full_path(),
        "/home?m-confirm&m-picker"
    );
    assert_eq!(controller.data("picker"), Some(json!(["a", "b"])));

    let current = controller.router().current();
    let base = controller
        .pipeline()
        .find_base(controller.router(), "picker", &current)
        .unwrap()
        .unwrap();
    assert_eq!(base.full_path(), "/home?m-confirm");

    // closing the lower modal closes everything opened after it
    controller.close_modal("confirm").await.unwrap();
    assert_eq!(tab.index(), 0);
    assert!(!controller.is_active("confirm"));
    assert!(!controller.is_active("picker"));
    assert_eq!(confirm.wait().await, ModalResult::Single(None));
    assert_eq!(picker.wait().await, ModalResult::Single(None));
}

#[tokio::test]
async fn test_closing_the_top_query_modal_keeps_the_lower_one() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("confirm", OpenOptions::new())
        .await
        .unwrap();
    controller
        .open_modal("picker", OpenOptions::new())
        .await
        .unwrap();
    controller.close_modal("picker").await.unwrap();

    assert_eq!(tab.index(), 1);
    assert!(controller.is_active("confirm"));
    assert!(!controller.is_active("picker"));
    assert_eq!(controller.router().current().full_path(), "/home?m-confirm");
}

#[tokio::test]
async fn test_caller_query_is_kept_around_the_modal_key() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("confirm", OpenOptions::new().query("tab", "2"))
        .await
        .unwrap();
    assert_eq!(controller.router().current().full_path(), "/home?tab=2&m-confirm");

    controller.close_modal("confirm").await.unwrap();
    assert_eq!(controller.router().current().full_path(), "/home");
}

#[tokio::test]
async fn test_caller_values_cannot_inject_modal_keys() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("confirm", OpenOptions::new().query("q", "a&m-picker"))
        .await
        .unwrap();
    assert_eq!(tab.entries(), vec!["/home", "/home?q=a%26m-picker&m-confirm"]);
    assert!(controller.is_active("confirm"));
    assert!(!controller.is_active("picker"));
    assert_eq!(controller.router().current().query().get("q"), Some("a&m-picker"));

    // the written URL reads back the same value on a fresh load
    let fresh = Tab::new("/home?q=a%26m-picker&m-confirm");
    let reloaded = fresh.load().await;
    let current = reloaded.router().current();
    assert_eq!(current.query().get("q"), Some("a&m-picker"));
    assert!(!current.query().contains("m-picker"));
    assert!(!reloaded.is_active("picker"));
    assert_eq!(fresh.entries(), vec!["/home?q=a%26m-picker"]);
}

#[tokio::test]
async fn test_query_modals_are_stripped_on_load() {
    let tab = Tab::new("/home?m-confirm&tab=2");
    let controller = tab.load().await;

    assert_eq!(controller.router().current().full_path(), "/home?tab=2");
    assert_eq!(tab.entries(), vec!["/home?tab=2"]);
    assert!(!controller.is_active("confirm"));
}

#[tokio::test]
async fn test_reserved_query_key_is_rejected_before_activation() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let err = controller
        .open_modal("profile", OpenOptions::new().query("m-sneaky", "1"))
        .await
        .unwrap_err();
    match err {
        ModalError::ReservedQueryKey { key, prefix } => {
            assert_eq!(key, "m-sneaky");
            assert_eq!(prefix, "m-");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(controller.pipeline().registry().activated().is_empty());
    assert_eq!(tab.entries(), vec!["/home"]);
}

#[tokio::test]
async fn test_query_modal_over_path_modal() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    controller
        .open_modal("confirm", OpenOptions::new())
        .await
        .unwrap();
    assert_eq!(
        controller.router().current().full_path(),
        "/home/profile?m-confirm"
    );
    assert_eq!(controller.snapshot().active, vec!["profile", "confirm"]);

    controller.close_modal("confirm").await.unwrap();
    assert!(controller.is_active("profile"));
    controller.close_modal("profile").await.unwrap();
    assert_eq!(tab.index(), 0);
}
