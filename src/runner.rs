//! The verification runner
//!
//! Executes a declared ordered sequence of [`Step`]s inside one browser
//! session and produces a [`RunResult`]. Steps run strictly in order; the
//! first failure halts the run, a best-effort failure screenshot is
//! attempted, and the session is torn down exactly once on both the
//! success and the failure path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::browser::{Session, SessionConfig};
use crate::driver::StepDriver;
use crate::error::{Error, Result, StepError};
use crate::selector::{Selector, DEFAULT_TEST_ATTRIBUTE};
use crate::step::Step;

/// Configuration for a verification run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base address of the application under verification
    pub base_url: Url,
    /// Default timeout for navigation and visibility waits, in ms
    pub default_timeout_ms: u64,
    /// Directory receiving screenshot artifacts
    pub artifact_dir: PathBuf,
    /// Attribute carrying per-element test identifiers
    pub test_attribute: String,
    /// Fail the run when the page reported console errors or uncaught
    /// exceptions (default: false)
    pub fail_on_page_errors: bool,
    /// Attempt a screenshot of the failure state before teardown
    /// (default: true)
    pub failure_screenshot: bool,
    /// Browser session configuration
    pub session: SessionConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:8080").expect("static URL"),
            default_timeout_ms: 10_000,
            artifact_dir: PathBuf::from("artifacts"),
            test_attribute: DEFAULT_TEST_ATTRIBUTE.to_string(),
            fail_on_page_errors: false,
            failure_screenshot: true,
            session: SessionConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Create a new config builder
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::default()
    }
}

/// Builder for RunnerConfig
#[derive(Default)]
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    /// Set the base URL of the application under verification
    pub fn base_url(mut self, url: Url) -> Self {
        self.config.base_url = url;
        self
    }

    /// Set the default step timeout in milliseconds
    pub fn default_timeout_ms(mut self, ms: u64) -> Self {
        self.config.default_timeout_ms = ms;
        self
    }

    /// Set the artifact output directory
    pub fn artifact_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.artifact_dir = dir.into();
        self
    }

    /// Set the test-identification attribute name
    pub fn test_attribute<S: Into<String>>(mut self, attr: S) -> Self {
        self.config.test_attribute = attr.into();
        self
    }

    /// Fail runs whose page reported console errors
    pub fn fail_on_page_errors(mut self, fail: bool) -> Self {
        self.config.fail_on_page_errors = fail;
        self
    }

    /// Enable/disable the best-effort failure screenshot
    pub fn failure_screenshot(mut self, enabled: bool) -> Self {
        self.config.failure_screenshot = enabled;
        self
    }

    /// Set the browser session configuration
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    /// Build the config
    pub fn build(self) -> RunnerConfig {
        self.config
    }
}

/// The outcome record of executing a Step sequence.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Whether every step succeeded
    pub success: bool,
    /// Index of the first failing step, when any
    pub failed_step_index: Option<usize>,
    /// The failure that halted the run, when any
    pub error: Option<StepError>,
    /// Number of steps that completed
    pub steps_executed: usize,
    /// Screenshot files produced, in capture order
    pub artifact_paths: Vec<PathBuf>,
    /// Non-fatal problems observed during the run
    pub warnings: Vec<String>,
    /// Error-level console entries and uncaught exceptions the page
    /// reported
    pub console_errors: Vec<String>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

/// Executes ordered step sequences against one application instance.
pub struct VerificationRunner {
    config: RunnerConfig,
}

impl VerificationRunner {
    /// Create a runner with the given configuration
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Create a runner with default configuration
    /// (`http://localhost:8080`, 10s timeouts, `artifacts/` output)
    pub fn with_defaults() -> Self {
        Self::new(RunnerConfig::default())
    }

    /// The runner's configuration
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Launch a browser session, execute the steps, tear the session
    /// down, and return the run's outcome.
    ///
    /// Errors are returned only for session launch failures; step
    /// failures are reported through the [`RunResult`].
    #[instrument(skip(self, steps), fields(steps = steps.len()))]
    pub async fn run(&self, steps: &[Step]) -> Result<RunResult> {
        let session = Session::launch_with(self.config.session.clone()).await?;
        Ok(self.run_with_driver(session, steps).await)
    }

    /// Execute the steps through an already-constructed driver.
    ///
    /// Takes the driver by value: the runner owns teardown and calls
    /// [`StepDriver::close`] exactly once, whatever the outcome.
    pub async fn run_with_driver<D: StepDriver>(&self, mut driver: D, steps: &[Step]) -> RunResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = std::time::Instant::now();

        info!("Run {} started: {} step(s)", run_id, steps.len());

        let mut artifact_paths = Vec::new();
        let mut warnings = Vec::new();
        let mut failed_step_index = None;
        let mut error: Option<StepError> = None;
        let mut steps_executed = 0;

        for (index, step) in steps.iter().enumerate() {
            debug!("Step {}: {}", index, step.kind());
            let is_final = index + 1 == steps.len();
            match self
                .execute_step(&mut driver, step, is_final, &mut artifact_paths, &mut warnings)
                .await
            {
                Ok(()) => steps_executed += 1,
                Err(e) => {
                    let step_error = classify(step, e);
                    warn!("Step {} ({}) failed: {}", index, step.kind(), step_error);
                    failed_step_index = Some(index);
                    error = Some(step_error);
                    break;
                }
            }
        }

        let console_errors = driver.console_errors().await;
        if error.is_none() && self.config.fail_on_page_errors && !console_errors.is_empty() {
            warn!("Page reported {} console error(s)", console_errors.len());
            error = Some(StepError::PageErrors(console_errors.len()));
        }

        // Best-effort evidence of the failure state, before teardown.
        if error.is_some() && self.config.failure_screenshot {
            let path = self
                .config
                .artifact_dir
                .join(format!("failure-{}.png", run_id));
            match driver.screenshot(&path).await {
                Ok(()) => artifact_paths.push(path),
                Err(e) => {
                    warn!("Failure screenshot not captured: {}", e);
                    warnings.push(format!("failure screenshot not captured: {}", e));
                }
            }
        }

        if let Err(e) = driver.close().await {
            warn!("Session teardown failed: {}", e);
            warnings.push(format!("session teardown failed: {}", e));
        }

        let success = error.is_none();
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Run {} finished: success={} in {}ms",
            run_id, success, duration_ms
        );

        RunResult {
            run_id,
            success,
            failed_step_index,
            error,
            steps_executed,
            artifact_paths,
            warnings,
            console_errors,
            started_at,
            duration_ms,
        }
    }

    /// Execute one step against the driver.
    async fn execute_step<D: StepDriver>(
        &self,
        driver: &mut D,
        step: &Step,
        is_final: bool,
        artifact_paths: &mut Vec<PathBuf>,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        match step {
            Step::Navigate { target, timeout_ms } => {
                let url = self.resolve_url(target)?;
                driver.navigate(url.as_str(), self.timeout(*timeout_ms)).await
            }
            Step::WaitForVisible { target, timeout_ms } => {
                driver
                    .wait_for_visibility(&self.css(target), true, self.timeout(*timeout_ms))
                    .await
            }
            Step::WaitForHidden { target, timeout_ms } => {
                driver
                    .wait_for_visibility(&self.css(target), false, self.timeout(*timeout_ms))
                    .await
            }
            Step::Fill { target, value } => driver.fill(&self.css(target), value).await,
            Step::Click { target } => driver.click(&self.css(target)).await,
            Step::UploadFile { target, value } => {
                driver.upload_file(&self.css(target), value).await
            }
            Step::AssertText { target, value } => {
                let css = self.css(target);
                let observed = driver.text_content(&css).await?;
                if observed.contains(value.as_str()) {
                    Ok(())
                } else {
                    Err(StepError::Assertion {
                        selector: css,
                        expected: format!("text containing {:?}", value),
                        observed: observed.trim().to_string(),
                    }
                    .into())
                }
            }
            Step::AssertVisible { target } => {
                let css = self.css(target);
                if driver.is_visible(&css).await? {
                    Ok(())
                } else {
                    Err(StepError::Assertion {
                        selector: css,
                        expected: "visible".to_string(),
                        observed: "hidden or absent".to_string(),
                    }
                    .into())
                }
            }
            Step::Screenshot { value } => {
                let path = self.artifact_path(value);
                match driver.screenshot(&path).await {
                    Ok(()) => {
                        artifact_paths.push(path);
                        Ok(())
                    }
                    // A mid-run capture failure is reported, not fatal;
                    // the final evidentiary capture must succeed.
                    Err(e) if !is_final => {
                        warn!("Screenshot {} failed, continuing: {}", path.display(), e);
                        warnings.push(format!("screenshot {} failed: {}", path.display(), e));
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Resolve a navigation target against the configured base URL.
    /// Absolute URLs pass through untouched.
    fn resolve_url(&self, target: &str) -> Result<Url> {
        match Url::parse(target) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.config.base_url.join(target).map_err(|e| {
                    StepError::Navigation {
                        url: target.to_string(),
                        reason: format!("invalid address: {}", e),
                    }
                    .into()
                })
            }
            Err(e) => Err(StepError::Navigation {
                url: target.to_string(),
                reason: format!("invalid address: {}", e),
            }
            .into()),
        }
    }

    /// Render a selector against the configured test attribute.
    fn css(&self, selector: &Selector) -> String {
        selector.to_css(&self.config.test_attribute)
    }

    /// Per-step timeout, falling back to the configured default.
    fn timeout(&self, step_timeout_ms: Option<u64>) -> Duration {
        Duration::from_millis(step_timeout_ms.unwrap_or(self.config.default_timeout_ms))
    }

    /// Place relative screenshot paths inside the artifact directory.
    fn artifact_path(&self, requested: &Path) -> PathBuf {
        if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.config.artifact_dir.join(requested)
        }
    }
}

/// Fold an execution error into the step failure taxonomy. Step-level
/// errors pass through; transport-level errors are attributed to the
/// step that tripped them.
fn classify(step: &Step, err: Error) -> StepError {
    match err {
        Error::Step(e) => e,
        other => match step {
            Step::Navigate { target, .. } => StepError::Navigation {
                url: target.clone(),
                reason: other.to_string(),
            },
            Step::Screenshot { .. } => StepError::Capture(other.to_string()),
            _ => StepError::Driver(other.to_string()),
        },
    }
}
