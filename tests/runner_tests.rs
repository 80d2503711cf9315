//! Runner behavior tests
//!
//! These tests drive the runner through a scripted in-memory driver to
//! pin down its contract: strict step ordering, halt at first failure,
//! best-effort failure evidence, and exactly-once session teardown.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use veriweb::error::{Error, Result, StepError};
use veriweb::flows;
use veriweb::runner::{RunnerConfig, VerificationRunner};
use veriweb::step::Step;
use veriweb::StepDriver;

/// Scripted page state for a mock run.
#[derive(Default, Clone)]
struct MockBehavior {
    /// Selectors that never become visible; waits for them to appear
    /// time out, waits for them to vanish succeed.
    never_visible: HashSet<String>,
    /// Selectors no element matches; fill/click/upload/text fail.
    missing: HashSet<String>,
    /// Text content by selector.
    texts: HashMap<String, String>,
    /// Every screenshot attempt fails.
    fail_screenshots: bool,
    /// Console errors the page reported.
    console_errors: Vec<String>,
}

impl MockBehavior {
    fn never_visible(mut self, css: &str) -> Self {
        self.never_visible.insert(css.to_string());
        self
    }

    fn missing(mut self, css: &str) -> Self {
        self.missing.insert(css.to_string());
        self
    }

    fn text(mut self, css: &str, text: &str) -> Self {
        self.texts.insert(css.to_string(), text.to_string());
        self
    }

    fn fail_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    fn console_error(mut self, msg: &str) -> Self {
        self.console_errors.push(msg.to_string());
        self
    }
}

/// In-memory driver recording every operation the runner dispatches.
struct MockDriver {
    behavior: MockBehavior,
    log: Arc<Mutex<Vec<String>>>,
    close_count: Arc<AtomicUsize>,
    fail_close: bool,
}

impl MockDriver {
    fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            log: Arc::new(Mutex::new(Vec::new())),
            close_count: Arc::new(AtomicUsize::new(0)),
            fail_close: false,
        }
    }

    fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.log.clone()
    }

    fn close_count_handle(&self) -> Arc<AtomicUsize> {
        self.close_count.clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl StepDriver for MockDriver {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn wait_for_visibility(
        &mut self,
        css: &str,
        visible: bool,
        timeout: Duration,
    ) -> Result<()> {
        self.record(format!(
            "wait {} {} {}ms",
            if visible { "visible" } else { "hidden" },
            css,
            timeout.as_millis()
        ));
        let is_visible = !self.behavior.never_visible.contains(css);
        if is_visible == visible {
            Ok(())
        } else {
            Err(StepError::Timeout {
                selector: css.to_string(),
                condition: if visible { "visible" } else { "hidden" }.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }
            .into())
        }
    }

    async fn fill(&mut self, css: &str, value: &str) -> Result<()> {
        self.record(format!("fill {} {}", css, value));
        if self.behavior.missing.contains(css) {
            return Err(StepError::ElementNotFound(css.to_string()).into());
        }
        Ok(())
    }

    async fn click(&mut self, css: &str) -> Result<()> {
        self.record(format!("click {}", css));
        if self.behavior.missing.contains(css) {
            return Err(StepError::ElementNotFound(css.to_string()).into());
        }
        Ok(())
    }

    async fn upload_file(&mut self, css: &str, path: &Path) -> Result<()> {
        self.record(format!("upload {} {}", css, path.display()));
        if !path.exists() {
            return Err(StepError::FileNotFound(path.to_path_buf()).into());
        }
        if self.behavior.missing.contains(css) {
            return Err(StepError::ElementNotFound(css.to_string()).into());
        }
        Ok(())
    }

    async fn text_content(&mut self, css: &str) -> Result<String> {
        self.record(format!("text {}", css));
        self.behavior
            .texts
            .get(css)
            .cloned()
            .ok_or_else(|| StepError::ElementNotFound(css.to_string()).into())
    }

    async fn is_visible(&mut self, css: &str) -> Result<bool> {
        self.record(format!("is_visible {}", css));
        Ok(!self.behavior.never_visible.contains(css))
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        self.record(format!("screenshot {}", path.display()));
        if self.behavior.fail_screenshots {
            return Err(StepError::Capture("no render surface".to_string()).into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::from)?;
        }
        std::fs::write(path, b"\x89PNG").map_err(Error::from)?;
        Ok(())
    }

    async fn console_errors(&mut self) -> Vec<String> {
        self.behavior.console_errors.clone()
    }

    async fn close(&mut self) -> Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.record("close".to_string());
        if self.fail_close {
            return Err(Error::cdp("browser already gone"));
        }
        Ok(())
    }
}

fn runner_with_artifacts(dir: &Path) -> VerificationRunner {
    VerificationRunner::new(RunnerConfig::builder().artifact_dir(dir).build())
}

/// Scenario A: the login flow against a healthy application succeeds.
#[tokio::test]
async fn login_flow_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(MockBehavior::default());

    let result = runner
        .run_with_driver(driver, &flows::login_as_librarian())
        .await;

    assert!(result.success);
    assert_eq!(result.failed_step_index, None);
    assert!(result.error.is_none());
    assert_eq!(result.steps_executed, 7);
}

/// Scenario B: wrong password — the wait for main-content times out,
/// the run fails at that index with a TimeoutError.
#[tokio::test]
async fn failed_login_times_out_on_main_content() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(
        MockBehavior::default().never_visible("[data-test='main-content']"),
    );

    let steps = vec![
        Step::navigate("/"),
        Step::click("menu-login"),
        Step::fill("login-username", "librarian"),
        Step::fill("login-password", "wrong"),
        Step::click("login-submit"),
        Step::wait_for_visible("main-content").with_timeout_ms(10_000),
    ];
    let result = runner.run_with_driver(driver, &steps).await;

    assert!(!result.success);
    assert_eq!(result.failed_step_index, Some(5));
    assert!(matches!(
        result.error,
        Some(StepError::Timeout { ref selector, timeout_ms: 10_000, .. })
            if selector.contains("main-content")
    ));
    assert_eq!(result.steps_executed, 5);
}

/// Scenario C: an upload with a nonexistent local path fails with
/// FileNotFoundError and nothing after it runs.
#[tokio::test]
async fn upload_of_missing_file_halts_run() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(MockBehavior::default());
    let log = driver.log_handle();

    let steps = vec![
        Step::navigate("/"),
        Step::upload_file("photo-input", "/nonexistent.jpg"),
        Step::click("save-btn"),
        Step::assert_visible("photo-thumbnail"),
    ];
    let result = runner.run_with_driver(driver, &steps).await;

    assert!(!result.success);
    assert_eq!(result.failed_step_index, Some(1));
    assert!(matches!(result.error, Some(StepError::FileNotFound(_))));

    // Nothing after the failing step may touch the application; only the
    // failure screenshot and teardown follow.
    let log = log.lock().unwrap();
    assert!(!log.iter().any(|entry| entry.starts_with("click")));
    assert!(!log.iter().any(|entry| entry.starts_with("is_visible")));
}

#[tokio::test]
async fn steps_execute_in_declared_order() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(MockBehavior::default());
    let log = driver.log_handle();

    let steps = vec![
        Step::navigate("/"),
        Step::click("menu-authors"),
        Step::wait_for_visible("authors-section"),
        Step::fill("new-author-name", "Test Author"),
        Step::click("add-author-btn"),
    ];
    runner.run_with_driver(driver, &steps).await;

    let log = log.lock().unwrap();
    assert_eq!(
        *log,
        vec![
            "navigate http://localhost:8080/".to_string(),
            "click [data-test='menu-authors']".to_string(),
            "wait visible [data-test='authors-section'] 10000ms".to_string(),
            "fill [data-test='new-author-name'] Test Author".to_string(),
            "click [data-test='add-author-btn']".to_string(),
            "close".to_string(),
        ]
    );
}

#[tokio::test]
async fn session_closed_exactly_once_on_success_and_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());

    let driver = MockDriver::new(MockBehavior::default());
    let closes = driver.close_count_handle();
    let result = runner.run_with_driver(driver, &[Step::navigate("/")]).await;
    assert!(result.success);
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    let driver = MockDriver::new(MockBehavior::default().missing("[data-test='gone']"));
    let closes = driver.close_count_handle();
    let result = runner.run_with_driver(driver, &[Step::click("gone")]).await;
    assert!(!result.success);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn teardown_failure_is_reported_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let mut driver = MockDriver::new(MockBehavior::default());
    driver.fail_close = true;

    let result = runner.run_with_driver(driver, &[Step::navigate("/")]).await;

    assert!(result.success);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("teardown failed")));
}

#[tokio::test]
async fn failure_screenshot_is_attempted_and_recorded() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(MockBehavior::default().missing("[data-test='gone']"));

    let result = runner.run_with_driver(driver, &[Step::click("gone")]).await;

    assert!(!result.success);
    assert_eq!(result.artifact_paths.len(), 1);
    let path = &result.artifact_paths[0];
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("failure-"));
    assert!(path.exists());
}

#[tokio::test]
async fn failure_screenshot_failure_is_best_effort() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(
        MockBehavior::default()
            .missing("[data-test='gone']")
            .fail_screenshots(),
    );

    let result = runner.run_with_driver(driver, &[Step::click("gone")]).await;

    // The original failure wins; the missing evidence becomes a warning.
    assert!(!result.success);
    assert!(matches!(result.error, Some(StepError::ElementNotFound(_))));
    assert!(result.artifact_paths.is_empty());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("failure screenshot")));
}

#[tokio::test]
async fn non_final_capture_failure_does_not_abort() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = VerificationRunner::new(
        RunnerConfig::builder()
            .artifact_dir(tmp.path())
            .failure_screenshot(false)
            .build(),
    );
    let driver = MockDriver::new(MockBehavior::default().fail_screenshots());
    let log = driver.log_handle();

    let steps = vec![
        Step::navigate("/"),
        Step::screenshot("mid.png"),
        Step::click("menu-books"),
    ];
    let result = runner.run_with_driver(driver, &steps).await;

    assert!(result.success);
    assert!(result.warnings.iter().any(|w| w.contains("mid.png")));
    assert!(log
        .lock()
        .unwrap()
        .iter()
        .any(|entry| entry.starts_with("click")));
}

#[tokio::test]
async fn final_capture_failure_fails_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = VerificationRunner::new(
        RunnerConfig::builder()
            .artifact_dir(tmp.path())
            .failure_screenshot(false)
            .build(),
    );
    let driver = MockDriver::new(MockBehavior::default().fail_screenshots());

    let steps = vec![Step::navigate("/"), Step::screenshot("verification.png")];
    let result = runner.run_with_driver(driver, &steps).await;

    assert!(!result.success);
    assert_eq!(result.failed_step_index, Some(1));
    assert!(matches!(result.error, Some(StepError::Capture(_))));
}

#[tokio::test]
async fn screenshots_land_in_artifact_dir_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(MockBehavior::default());

    let steps = vec![
        Step::navigate("/"),
        Step::screenshot("before.png"),
        Step::click("menu-books"),
        Step::screenshot("after.png"),
    ];
    let result = runner.run_with_driver(driver, &steps).await;

    assert!(result.success);
    assert_eq!(
        result.artifact_paths,
        vec![tmp.path().join("before.png"), tmp.path().join("after.png")]
    );
    assert!(result.artifact_paths.iter().all(|p| p.exists()));
}

#[tokio::test]
async fn assert_text_carries_expected_and_observed() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(
        MockBehavior::default().text("[data-test='applied-table']", "Approved"),
    );

    let steps = vec![Step::assert_text("applied-table", "Pending")];
    let result = runner.run_with_driver(driver, &steps).await;

    assert!(!result.success);
    match result.error {
        Some(StepError::Assertion {
            expected, observed, ..
        }) => {
            assert!(expected.contains("Pending"));
            assert_eq!(observed, "Approved");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn assert_text_passes_on_containment() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(
        MockBehavior::default().text("[data-test='book-table']", "Test Book for Photo"),
    );

    let steps = vec![Step::assert_text("book-table", "Test Book")];
    let result = runner.run_with_driver(driver, &steps).await;
    assert!(result.success);
}

#[tokio::test]
async fn assert_visible_reports_hidden_element() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(
        MockBehavior::default().never_visible("[data-test='book-table']"),
    );

    let result = runner
        .run_with_driver(driver, &[Step::assert_visible("book-table")])
        .await;

    assert!(!result.success);
    assert!(matches!(result.error, Some(StepError::Assertion { .. })));
}

#[tokio::test]
async fn wait_for_hidden_succeeds_when_element_absent() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(MockBehavior::default().never_visible("#librarian-section"));

    let steps = flows::apply_for_card("Reader", "reader@example.com");
    let result = runner.run_with_driver(driver, &steps).await;
    assert!(result.success);
}

#[tokio::test]
async fn per_step_timeout_overrides_default() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = VerificationRunner::new(
        RunnerConfig::builder()
            .artifact_dir(tmp.path())
            .default_timeout_ms(5_000)
            .build(),
    );
    let driver = MockDriver::new(MockBehavior::default());
    let log = driver.log_handle();

    let steps = vec![
        Step::wait_for_visible("login-form"),
        Step::wait_for_visible("main-content").with_timeout_ms(60_000),
    ];
    runner.run_with_driver(driver, &steps).await;

    let log = log.lock().unwrap();
    assert_eq!(log[0], "wait visible [data-test='login-form'] 5000ms");
    assert_eq!(log[1], "wait visible [data-test='main-content'] 60000ms");
}

#[tokio::test]
async fn identical_sequences_yield_identical_result_shapes() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let steps = vec![
        Step::navigate("/"),
        Step::click("menu-login"),
        Step::wait_for_visible("main-content"),
    ];
    let behavior = MockBehavior::default().never_visible("[data-test='main-content']");

    let first = runner
        .run_with_driver(MockDriver::new(behavior.clone()), &steps)
        .await;
    let second = runner
        .run_with_driver(MockDriver::new(behavior), &steps)
        .await;

    assert_eq!(first.success, second.success);
    assert_eq!(first.failed_step_index, second.failed_step_index);
    assert_eq!(first.steps_executed, second.steps_executed);
}

#[tokio::test]
async fn page_console_errors_surface_in_result() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner_with_artifacts(tmp.path());
    let driver = MockDriver::new(
        MockBehavior::default().console_error("Uncaught (in promise) TypeError"),
    );

    let result = runner.run_with_driver(driver, &[Step::navigate("/")]).await;

    // Collection alone does not fail the run.
    assert!(result.success);
    assert_eq!(result.console_errors.len(), 1);
}

#[tokio::test]
async fn fail_on_page_errors_turns_console_errors_into_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = VerificationRunner::new(
        RunnerConfig::builder()
            .artifact_dir(tmp.path())
            .fail_on_page_errors(true)
            .build(),
    );
    let driver = MockDriver::new(
        MockBehavior::default().console_error("Uncaught (in promise) TypeError"),
    );

    let result = runner.run_with_driver(driver, &[Step::navigate("/")]).await;

    assert!(!result.success);
    assert_eq!(result.failed_step_index, None);
    assert!(matches!(result.error, Some(StepError::PageErrors(1))));
}

#[tokio::test]
async fn relative_navigation_resolves_against_base_url() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = VerificationRunner::new(
        RunnerConfig::builder()
            .artifact_dir(tmp.path())
            .base_url(url::Url::parse("http://localhost:3000").unwrap())
            .build(),
    );
    let driver = MockDriver::new(MockBehavior::default());
    let log = driver.log_handle();

    runner
        .run_with_driver(driver, &[Step::navigate("/apply-for-card.html")])
        .await;

    assert_eq!(
        log.lock().unwrap()[0],
        "navigate http://localhost:3000/apply-for-card.html"
    );
}
