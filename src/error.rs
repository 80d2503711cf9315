//! Error types for veriweb
//!
//! This module provides the error type hierarchy using `thiserror`:
//! a top-level [`Error`] wrapping browser lifecycle errors and the
//! per-step failure taxonomy surfaced in run results.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// The main error type for veriweb operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser lifecycle and session errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Step execution errors
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle and session errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// Session already closed
    #[error("Session already closed")]
    AlreadyClosed,
}

/// Failure of a single verification step.
///
/// These are the errors that halt a run and end up in the
/// [`RunResult`](crate::runner::RunResult); they carry enough detail
/// (selector, expected vs. observed) to diagnose a failure from the
/// report alone.
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "error", content = "detail", rename_all = "snake_case")]
pub enum StepError {
    /// Target unreachable, invalid, or did not finish loading in time
    #[error("Navigation to {url} failed: {reason}")]
    Navigation {
        /// The resolved URL the page was driven to
        url: String,
        /// What went wrong
        reason: String,
    },

    /// Visibility condition unmet within the step timeout
    #[error("Timed out after {timeout_ms}ms waiting for {selector} to become {condition}")]
    Timeout {
        /// The selector that never satisfied the condition
        selector: String,
        /// The awaited condition ("visible" or "hidden")
        condition: String,
        /// The timeout that elapsed
        timeout_ms: u64,
    },

    /// No element matches the selector
    #[error("No element matches selector {0}")]
    ElementNotFound(String),

    /// Element matched but cannot receive the interaction
    #[error("Element {selector} is not interactable: {reason}")]
    ElementNotInteractable {
        /// The selector that matched
        selector: String,
        /// Why the interaction is impossible (hidden, disabled, ...)
        reason: String,
    },

    /// Local upload path does not exist
    #[error("Upload file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Observed DOM state diverges from the expectation
    #[error("Assertion failed on {selector}: expected {expected}, observed {observed}")]
    Assertion {
        /// The selector the assertion ran against
        selector: String,
        /// What the step expected
        expected: String,
        /// What the DOM actually held
        observed: String,
    },

    /// Screenshot capture mechanism failure
    #[error("Screenshot capture failed: {0}")]
    Capture(String),

    /// Underlying automation transport failed mid-step
    #[error("Browser driver failure: {0}")]
    Driver(String),

    /// Page-side console errors failed the run
    #[error("Page reported {0} console error(s)")]
    PageErrors(usize),
}

/// Result type alias for veriweb operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// The step-level failure inside this error, if it is one.
    pub fn as_step_error(&self) -> Option<&StepError> {
        match self {
            Error::Step(e) => Some(e),
            _ => None,
        }
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}
