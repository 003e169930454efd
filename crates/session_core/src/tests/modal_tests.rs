use super::*;
use crate::page::MemoryPage;

const OPEN_DELAY: Duration = Duration::from_millis(10);
const CLOSE_DELAY: Duration = Duration::from_millis(300);

fn dialog_page() -> MemoryPage {
    let page = MemoryPage::with_elements(["profileModal", "closeProfileModal"]);
    page.insert_child("profileModal", "profileModalContent");
    page.insert_child("profileModalContent", "profileEmail");
    page
}

fn coordinator(page: &MemoryPage) -> Arc<ModalCoordinator> {
    ModalCoordinator::new(
        Arc::new(page.clone()),
        "profileModal",
        OPEN_DELAY,
        CLOSE_DELAY,
    )
}

fn has_show_class(page: &MemoryPage) -> bool {
    page.snapshot("profileModal")
        .expect("modal")
        .classes
        .contains(SHOW_CLASS)
}

#[tokio::test(start_paused = true)]
async fn open_displays_first_and_animates_after_delay() {
    let page = dialog_page();
    let modal = coordinator(&page);
    assert!(modal.attach(Some("closeProfileModal")));
    assert!(!page.is_visible("profileModal"));

    modal.open();
    assert_eq!(
        modal.visibility(),
        ModalVisibility {
            displayed: true,
            animating_in: false
        }
    );
    assert!(page.is_visible("profileModal"));
    assert!(!has_show_class(&page));

    tokio::time::sleep(Duration::from_millis(15)).await;
    assert!(modal.visibility().animating_in);
    assert!(has_show_class(&page));
}

#[tokio::test(start_paused = true)]
async fn backdrop_click_hides_only_after_close_delay() {
    let page = dialog_page();
    let modal = coordinator(&page);
    modal.attach(Some("closeProfileModal"));
    modal.open();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(page.click("profileModal"));
    assert_eq!(
        modal.visibility(),
        ModalVisibility {
            displayed: true,
            animating_in: false
        }
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(modal.visibility().displayed);
    assert!(page.is_visible("profileModal"));

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(modal.visibility(), ModalVisibility::default());
    assert!(!page.is_visible("profileModal"));
}

#[tokio::test(start_paused = true)]
async fn clicks_inside_the_dialog_do_not_close_it() {
    let page = dialog_page();
    let modal = coordinator(&page);
    modal.attach(Some("closeProfileModal"));
    modal.open();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(page.click("profileEmail"));
    assert!(page.click("profileModalContent"));
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(
        modal.visibility(),
        ModalVisibility {
            displayed: true,
            animating_in: true
        }
    );
}

#[tokio::test(start_paused = true)]
async fn close_control_closes_the_dialog() {
    let page = dialog_page();
    let modal = coordinator(&page);
    modal.attach(Some("closeProfileModal"));
    modal.open();
    tokio::time::sleep(Duration::from_millis(20)).await;

    page.click("closeProfileModal");
    tokio::time::sleep(Duration::from_millis(350)).await;

    assert!(!modal.visibility().displayed);
}

#[tokio::test(start_paused = true)]
async fn reopening_during_close_keeps_dialog_displayed() {
    let page = dialog_page();
    let modal = coordinator(&page);
    modal.attach(None);
    modal.open();
    tokio::time::sleep(Duration::from_millis(20)).await;

    modal.close();
    tokio::time::sleep(Duration::from_millis(100)).await;
    modal.open();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(
        modal.visibility(),
        ModalVisibility {
            displayed: true,
            animating_in: true
        }
    );
}

#[tokio::test(start_paused = true)]
async fn close_right_after_open_cancels_the_animation() {
    let page = dialog_page();
    let modal = coordinator(&page);
    modal.attach(None);
    modal.open();
    modal.close();
    tokio::time::sleep(Duration::from_millis(350)).await;

    assert_eq!(modal.visibility(), ModalVisibility::default());
    assert!(!has_show_class(&page));
}

#[tokio::test(start_paused = true)]
async fn page_without_dialog_tolerates_open_and_close() {
    let page = MemoryPage::new();
    let modal = coordinator(&page);
    assert!(!modal.attach(Some("closeProfileModal")));

    modal.open();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(modal.visibility().animating_in);

    modal.close();
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(!modal.visibility().displayed);
}
