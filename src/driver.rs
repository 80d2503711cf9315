//! The step execution seam
//!
//! The runner dispatches steps through [`StepDriver`] rather than calling
//! CDP directly. [`Session`](crate::browser::Session) is the production
//! implementation; tests drive the runner with a scripted in-memory
//! implementation to pin down ordering, halting, and teardown behavior.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Low-level operations a verification run needs from a browser.
///
/// All selector arguments arrive already rendered to CSS; the driver
/// does not know about the test-attribute convention.
#[async_trait]
pub trait StepDriver: Send {
    /// Drive the page to `url` and wait for it to reach a loaded state.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Poll until the element matching `css` is visible (`visible=true`)
    /// or hidden/absent (`visible=false`), failing when `timeout` elapses.
    async fn wait_for_visibility(&mut self, css: &str, visible: bool, timeout: Duration)
        -> Result<()>;

    /// Set the value of the input matching `css`.
    async fn fill(&mut self, css: &str, value: &str) -> Result<()>;

    /// Click the element matching `css`.
    async fn click(&mut self, css: &str) -> Result<()>;

    /// Attach a local file to the file input matching `css`.
    async fn upload_file(&mut self, css: &str, path: &Path) -> Result<()>;

    /// Text content of the element matching `css`.
    async fn text_content(&mut self, css: &str) -> Result<String>;

    /// Whether the element matching `css` is currently visible.
    async fn is_visible(&mut self, css: &str) -> Result<bool>;

    /// Capture the rendered page to `path`.
    async fn screenshot(&mut self, path: &Path) -> Result<()>;

    /// Error-level console entries and uncaught exceptions the page has
    /// reported so far. Drivers without console access return empty.
    async fn console_errors(&mut self) -> Vec<String> {
        Vec::new()
    }

    /// Release the underlying browser resource. Called exactly once per
    /// run, on both the success and the failure path.
    async fn close(&mut self) -> Result<()>;
}
