//! Global modals mounted under the synthetic segment of the hosting page

use super::test_utils::Tab;
use modal_route::{ModalResult, OpenOptions};

#[tokio::test]
async fn test_global_modal_opens_on_the_current_page() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    let handle = controller
        .open_modal("help", OpenOptions::new())
        .await
        .unwrap();
    let global = &controller.pipeline().strategies().global;
    assert_eq!(global.attached_base().as_deref(), Some("home"));
    assert_eq!(controller.router().current().full_path(), "/home/_modal/help");
    assert_eq!(tab.entries(), vec!["/home", "/home/_modal/help"]);
    assert_eq!(controller.time_machine().position_by_tag("help"), Some(0));

    controller.close_modal("help").await.unwrap();
    assert_eq!(controller.router().current().full_path(), "/home");
    assert_eq!(tab.index(), 0);
    assert_eq!(handle.wait().await, ModalResult::Single(None));
}

#[tokio::test]
async fn test_global_modal_follows_the_page() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("help", OpenOptions::new())
        .await
        .unwrap();
    controller.close_modal("help").await.unwrap();
    controller.router().push("/about").await.unwrap();

    controller
        .open_modal("help", OpenOptions::new())
        .await
        .unwrap();
    let router = controller.router();
    assert_eq!(router.current().full_path(), "/about/_modal/help");
    assert_eq!(
        controller.pipeline().strategies().global.attached_base().as_deref(),
        Some("about")
    );
    assert!(router.resolve(&"/home/_modal/help".into()).unwrap().matched.is_empty());
    assert_eq!(tab.entries(), vec!["/home", "/about", "/about/_modal/help"]);
}

#[tokio::test]
async fn test_direct_global_modal_is_bootstrapped_on_load() {
    let tab = Tab::new("/about/_modal/console");
    let controller = tab.load().await;

    assert!(controller.is_active("console"));
    assert_eq!(controller.router().current().full_path(), "/about/_modal/console");
    assert_eq!(
        controller.pipeline().strategies().global.attached_base().as_deref(),
        Some("about")
    );
}

#[tokio::test]
async fn test_non_direct_global_modal_loads_its_host_page() {
    let tab = Tab::new("/about/_modal/help");
    let controller = tab.load().await;

    assert!(!controller.is_active("help"));
    assert_eq!(controller.router().current().full_path(), "/about");
    assert_eq!(tab.entries(), vec!["/about"]);
}

#[tokio::test]
async fn test_global_modal_over_path_modal() {
    let tab = Tab::new("/home");
    let controller = tab.load().await;

    controller
        .open_modal("profile", OpenOptions::new())
        .await
        .unwrap();
    controller
        .open_modal("help", OpenOptions::new())
        .await
        .unwrap();
    assert_eq!(
        controller.router().current().full_path(),
        "/home/profile/_modal/help"
    );
    assert_eq!(controller.snapshot().active, vec!["profile", "help"]);

    controller.close_modal("help").await.unwrap();
    assert!(controller.is_active("profile"));
    assert_eq!(controller.router().current().full_path(), "/home/profile");
}
