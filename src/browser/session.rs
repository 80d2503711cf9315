//! Browser session lifecycle
//!
//! This module handles browser launch, page creation, console capture,
//! and shutdown. One [`Session`] backs exactly one verification run and
//! is torn down unconditionally when the run ends.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EventConsoleApiCalled, EventExceptionThrown,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::browser::actions::PageActions;
use crate::browser::capture::{CaptureOptions, PageCapture};
use crate::browser::navigation::PageNavigator;
use crate::driver::StepDriver;
use crate::error::{BrowserError, Error, Result};

/// Configuration for the browser session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width (default: 1280)
    pub width: u32,
    /// Browser window height (default: 720)
    pub height: u32,
    /// Enable sandbox (default: true)
    pub sandbox: bool,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1280,
            height: 720,
            sandbox: true,
            chrome_path: None,
            extra_args: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Create a new config builder
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for SessionConfig
#[derive(Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

/// One isolated browser execution context, used for a single run.
///
/// Owns the launched browser, its CDP event-handler task, the single page
/// all steps run against, and the page's collected console errors.
pub struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    console_errors: Arc<Mutex<Vec<String>>>,
    listener_tasks: Vec<JoinHandle<()>>,
    closed: bool,
}

impl Session {
    /// Launch a browser and open the run's page with default config
    #[instrument]
    pub async fn launch() -> Result<Self> {
        Self::launch_with(SessionConfig::default()).await
    }

    /// Launch a browser and open the run's page with custom config
    #[instrument(skip(config))]
    pub async fn launch_with(config: SessionConfig) -> Result<Self> {
        info!("Launching browser: headless={}", config.headless);

        let mut builder = CdpBrowserConfig::builder();

        builder = builder.viewport(chromiumoxide::handler::viewport::Viewport {
            width: config.width,
            height: config.height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        });

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.arg("--no-sandbox");
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        for arg in &config.extra_args {
            builder = builder.arg(arg);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| BrowserError::ConfigError(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!("Browser handler event error");
                    break;
                }
            }
            debug!("Browser handler finished");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        let console_errors = Arc::new(Mutex::new(Vec::new()));
        let listener_tasks = Self::spawn_console_listeners(&page, console_errors.clone()).await?;

        info!("Browser session ready");

        Ok(Self {
            browser,
            handler: handler_task,
            page,
            console_errors,
            listener_tasks,
            closed: false,
        })
    }

    /// Subscribe to console-API and uncaught-exception events so run
    /// results can surface page-side failures.
    async fn spawn_console_listeners(
        page: &Page,
        sink: Arc<Mutex<Vec<String>>>,
    ) -> Result<Vec<JoinHandle<()>>> {
        let mut console_events = page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;
        let console_sink = sink.clone();
        let console_task = tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                if event.r#type != ConsoleApiCalledType::Error {
                    continue;
                }
                let message = event
                    .args
                    .iter()
                    .filter_map(|arg| {
                        arg.value
                            .as_ref()
                            .map(|v| v.to_string())
                            .or_else(|| arg.description.clone())
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                debug!("Page console error: {}", message);
                console_sink.lock().await.push(message);
            }
        });

        let mut exception_events = page
            .event_listener::<EventExceptionThrown>()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;
        let exception_task = tokio::spawn(async move {
            while let Some(event) = exception_events.next().await {
                let details = &event.exception_details;
                let message = details
                    .exception
                    .as_ref()
                    .and_then(|e| e.description.clone())
                    .unwrap_or_else(|| details.text.clone());
                debug!("Page exception: {}", message);
                sink.lock().await.push(message);
            }
        });

        Ok(vec![console_task, exception_task])
    }

    /// The page this session's steps run against
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Shut the browser down and join its handler task.
    ///
    /// Idempotent: a second call returns `AlreadyClosed` instead of
    /// touching the browser again.
    #[instrument(skip(self))]
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Err(BrowserError::AlreadyClosed.into());
        }
        self.closed = true;

        info!("Closing browser session");

        for task in self.listener_tasks.drain(..) {
            task.abort();
        }

        self.browser
            .close()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;

        let _ = tokio::time::timeout(Duration::from_secs(5), &mut self.handler).await;

        info!("Browser session closed");
        Ok(())
    }
}

#[async_trait]
impl StepDriver for Session {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        PageNavigator::goto(&self.page, url, timeout).await
    }

    async fn wait_for_visibility(
        &mut self,
        css: &str,
        visible: bool,
        timeout: Duration,
    ) -> Result<()> {
        PageActions::wait_for_visibility(&self.page, css, visible, timeout).await
    }

    async fn fill(&mut self, css: &str, value: &str) -> Result<()> {
        PageActions::fill(&self.page, css, value).await
    }

    async fn click(&mut self, css: &str) -> Result<()> {
        PageActions::click(&self.page, css).await
    }

    async fn upload_file(&mut self, css: &str, path: &Path) -> Result<()> {
        PageActions::upload_file(&self.page, css, path).await
    }

    async fn text_content(&mut self, css: &str) -> Result<String> {
        PageActions::text_content(&self.page, css).await
    }

    async fn is_visible(&mut self, css: &str) -> Result<bool> {
        PageActions::is_visible(&self.page, css).await
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        PageCapture::capture_to_file(&self.page, path, &CaptureOptions::default()).await?;
        Ok(())
    }

    async fn console_errors(&mut self) -> Vec<String> {
        self.console_errors.lock().await.clone()
    }

    async fn close(&mut self) -> Result<()> {
        self.shutdown().await
    }
}
