use super::*;
use crate::test_support::{element, input, MockDriver};
use pagehand_protocols::surface::BoundingBox;
use pagehand_protocols::surface::ReadyState;

const SURFACE: &str = "tab-1";

fn page() -> Vec<RawElement> {
    let mut sign_in = element(1, "button", "Sign In");
    sign_in.attributes.id = Some("login".to_string());
    let mut icon = element(2, "button", "");
    icon.attributes.aria_label = Some("Open menu".to_string());
    let mut hidden = element(3, "a", "Hidden link");
    hidden.visible = false;
    let mut offscreen = element(4, "a", "Footer");
    offscreen.bounding_box = BoundingBox::new(0.0, 5000.0, 100.0, 20.0);
    let mut collapsed = element(5, "a", "Zero");
    collapsed.bounding_box = BoundingBox::new(0.0, 0.0, 0.0, 0.0);
    let mut text = element(6, "p", "Just text");
    text.interactive = false;
    vec![sign_in, icon, hidden, offscreen, collapsed, text, input(7, "Email address")]
}

fn setup() -> (Arc<MockDriver>, Executor) {
    let driver = Arc::new(MockDriver::new(page()));
    let executor = Executor::new(driver.clone());
    (driver, executor)
}

#[tokio::test]
async fn test_capture_filters_to_interactive_on_screen_elements() {
    let (_, executor) = setup();
    let snapshot = executor.capture_snapshot(SURFACE).await.unwrap();

    let ids: Vec<&str> = snapshot.elements.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["el_0", "el_1", "el_2"]);
    assert_eq!(snapshot.elements[0].text, "Sign In");
    assert_eq!(snapshot.elements[2].tag, "input");
    assert_eq!(snapshot.url, "https://example.com/");
    assert_eq!(snapshot.content_summary, "Welcome to Example");
}

#[tokio::test]
async fn test_capture_truncates_text() {
    let long = "word ".repeat(100);
    let driver = Arc::new(MockDriver::new(vec![element(1, "a", &long)]));
    *driver.body_text.lock() = "x".repeat(5000);
    let executor = Executor::new(driver);

    let snapshot = executor.capture_snapshot(SURFACE).await.unwrap();
    assert_eq!(snapshot.elements[0].text.chars().count(), ELEMENT_TEXT_LIMIT);
    assert_eq!(snapshot.content_summary.chars().count(), CONTENT_SUMMARY_LIMIT);
}

#[tokio::test]
async fn test_click_by_snapshot_id() {
    let (driver, executor) = setup();
    executor.capture_snapshot(SURFACE).await.unwrap();

    let action = GeneratedAction::new(ActionKind::Click).with_target("el_1");
    let outcome = executor.execute(&action, SURFACE).await;
    assert!(outcome.success);
    assert_eq!(driver.ops(), vec!["click 2"]);
}

#[tokio::test]
async fn test_ids_from_older_snapshot_stop_resolving() {
    let (driver, executor) = setup();
    executor.capture_snapshot(SURFACE).await.unwrap();
    driver.elements.lock().retain(|e| e.handle.0 != 1);
    executor.capture_snapshot(SURFACE).await.unwrap();

    // el_2 existed in the first snapshot only
    let action = GeneratedAction::new(ActionKind::Click).with_target("el_2");
    let outcome = executor.execute(&action, SURFACE).await;
    assert!(!outcome.success);
    assert!(outcome.requires_retry);
}

#[tokio::test]
async fn test_handles_dropped_with_session() {
    use crate::session::{SessionLimits, SessionStore};

    let (_, executor) = setup();
    let store = SessionStore::new(SessionLimits {
        max_sessions: 1,
        ..Default::default()
    });
    store.on_evict(executor.eviction_listener());

    drop(store.acquire("tab-a").await);
    executor.capture_snapshot("tab-a").await.unwrap();
    assert!(executor.has_handles("tab-a"));

    drop(store.acquire("tab-b").await);
    executor.capture_snapshot("tab-b").await.unwrap();
    assert!(!store.contains("tab-a"));
    assert!(!executor.has_handles("tab-a"));
    assert!(executor.has_handles("tab-b"));

    store.remove("tab-b");
    assert!(!executor.has_handles("tab-b"));
}

#[tokio::test]
async fn test_click_by_css_then_text() {
    let (driver, executor) = setup();

    let by_css = GeneratedAction::new(ActionKind::Click).with_target("#login");
    assert!(executor.execute(&by_css, SURFACE).await.success);

    let by_text = GeneratedAction::new(ActionKind::Click).with_target("menu");
    assert!(executor.execute(&by_text, SURFACE).await.success);

    assert_eq!(driver.ops(), vec!["click 1", "click 2"]);
}

#[tokio::test]
async fn test_click_unresolved_is_retryable() {
    let (driver, executor) = setup();
    let action = GeneratedAction::new(ActionKind::Click).with_target("Checkout");
    let outcome = executor.execute(&action, SURFACE).await;
    assert!(!outcome.success);
    assert!(outcome.requires_retry);
    assert_eq!(outcome.error.as_deref(), Some("Could not find element: Checkout"));
    assert!(driver.ops().is_empty());
}

#[tokio::test]
async fn test_fill_resolves_text_inputs_only() {
    let (driver, executor) = setup();
    let action = GeneratedAction::new(ActionKind::Fill)
        .with_target("email")
        .with_payload("me@example.com");
    let outcome = executor.execute(&action, SURFACE).await;
    assert!(outcome.success);
    assert_eq!(driver.ops(), vec!["fill 7 me@example.com"]);

    let action = GeneratedAction::new(ActionKind::Fill)
        .with_target("Sign In")
        .with_payload("x");
    assert!(!executor.execute(&action, SURFACE).await.success);
}

#[tokio::test]
async fn test_scroll_payloads() {
    let (driver, executor) = setup();
    for payload in ["down", "up:200", "top", "right 50", "down:page"] {
        let action = GeneratedAction::new(ActionKind::Scroll).with_payload(payload);
        assert!(executor.execute(&action, SURFACE).await.success, "{}", payload);
    }
    assert_eq!(
        driver.ops(),
        vec!["scroll 0 400", "scroll 0 -200", "scroll top", "scroll 50 0", "scroll 0 648"]
    );

    let action = GeneratedAction::new(ActionKind::Scroll).with_payload("sideways");
    let outcome = executor.execute(&action, SURFACE).await;
    assert!(!outcome.success);
    assert!(!outcome.requires_retry);
}

#[tokio::test]
async fn test_navigate_normalizes_url() {
    let (driver, executor) = setup();
    let action = GeneratedAction::new(ActionKind::Navigate).with_payload("rust-lang.org");
    let outcome = executor.execute(&action, SURFACE).await;
    assert!(outcome.success);
    assert_eq!(driver.ops(), vec!["navigate https://rust-lang.org/"]);
}

#[test]
fn test_normalize_url() {
    assert_eq!(normalize_url("example.com").as_deref(), Some("https://example.com/"));
    assert_eq!(
        normalize_url("http://example.com/a?b=1").as_deref(),
        Some("http://example.com/a?b=1")
    );
    assert!(normalize_url("").is_none());
    assert!(normalize_url("ftp://example.com").is_none());
}

#[tokio::test]
async fn test_extract_element_and_body() {
    let (_, executor) = setup();
    executor.capture_snapshot(SURFACE).await.unwrap();

    let action = GeneratedAction::new(ActionKind::Extract).with_target("el_0");
    let outcome = executor.execute(&action, SURFACE).await;
    assert_eq!(outcome.message.as_deref(), Some("Sign In"));

    let action = GeneratedAction::new(ActionKind::Extract);
    let outcome = executor.execute(&action, SURFACE).await;
    assert_eq!(outcome.message.as_deref(), Some("Welcome to Example"));
}

#[tokio::test]
async fn test_modify_presets_and_raw_css() {
    let (driver, executor) = setup();
    let payloads = ["largerText", r#"{"preset": "high-contrast"}"#, r#"{"css": "p { color: red; }"}"#, "h1 { margin: 0 }"];
    for payload in payloads {
        let action = GeneratedAction::new(ActionKind::Modify).with_payload(payload);
        assert!(executor.execute(&action, SURFACE).await.success);
    }
    let ops = driver.ops();
    assert_eq!(ops[0], format!("style {}", LARGER_TEXT_CSS));
    assert_eq!(ops[1], format!("style {}", HIGH_CONTRAST_CSS));
    assert_eq!(ops[2], "style p { color: red; }");
    assert_eq!(ops[3], "style h1 { margin: 0 }");
}

#[tokio::test]
async fn test_unknown_kind_runs_sanitized_in_sandbox() {
    let (driver, executor) = setup();
    let action = GeneratedAction::new(ActionKind::Other("highlight".to_string()))
        .with_payload("document.title; fetch('/x')");
    let outcome = executor.execute(&action, SURFACE).await;
    assert!(outcome.success);
    let ops = driver.ops();
    assert!(ops[0].starts_with("sandbox "));
    assert!(!ops[0].contains("fetch("));
}

#[tokio::test]
async fn test_fast_path_scroll_down() {
    let (driver, executor) = setup();
    let mut params = HashMap::new();
    params.insert("direction".to_string(), "down".to_string());
    params.insert("amount".to_string(), "400".to_string());

    let outcome = executor.execute_fast_path(FastPathAction::Scroll, &params, SURFACE).await;
    assert!(outcome.success);
    assert_eq!(driver.ops(), vec!["scroll 0 400"]);
}

#[tokio::test]
async fn test_fast_path_click_by_text_exact_match() {
    let (driver, executor) = setup();
    let mut params = HashMap::new();
    params.insert("text".to_string(), "open MENU".to_string());
    let outcome = executor.execute_fast_path(FastPathAction::ClickByText, &params, SURFACE).await;
    assert!(outcome.success);
    assert_eq!(driver.ops(), vec!["click 2"]);
}

#[tokio::test]
async fn test_fast_path_click_by_text_not_found() {
    let driver = Arc::new(MockDriver::new(vec![element(1, "button", "Sign In now")]));
    let executor = Executor::new(driver.clone());
    let mut params = HashMap::new();
    params.insert("text".to_string(), "Sign In".to_string());

    let outcome = executor.execute_fast_path(FastPathAction::ClickByText, &params, SURFACE).await;
    assert!(!outcome.success);
    assert!(!outcome.requires_retry);
    assert_eq!(outcome.error.as_deref(), Some("Could not find element with text \"Sign In\""));
    assert!(driver.ops().is_empty());
}

#[tokio::test]
async fn test_fast_path_history_and_navigate() {
    let (driver, executor) = setup();
    let empty = HashMap::new();
    executor.execute_fast_path(FastPathAction::Back, &empty, SURFACE).await;
    executor.execute_fast_path(FastPathAction::Reload, &empty, SURFACE).await;
    let mut params = HashMap::new();
    params.insert("url".to_string(), "github.com".to_string());
    executor.execute_fast_path(FastPathAction::Navigate, &params, SURFACE).await;

    assert_eq!(driver.ops(), vec!["history back", "history reload", "navigate https://github.com/"]);
    assert_eq!(driver.info.lock().ready_state, ReadyState::Complete);
}

#[tokio::test]
async fn test_driver_errors_map_to_outcomes() {
    let (driver, executor) = setup();
    driver.fail_clicks_with(SurfaceError::ElementGone(1));
    let action = GeneratedAction::new(ActionKind::Click).with_target("#login");
    let outcome = executor.execute(&action, SURFACE).await;
    assert!(!outcome.success);
    assert!(outcome.requires_retry);

    driver.fail_clicks_with(SurfaceError::NotFound(SURFACE.to_string()));
    let outcome = executor.execute(&action, SURFACE).await;
    assert!(!outcome.success);
    assert!(!outcome.requires_retry);
}
