//! Veriweb - Declarative UI-Flow Verification Runner
//!
//! This crate executes ordered sequences of data-described UI steps
//! against a locally served web application through a headless Chromium
//! instance (CDP via ChromiumOxide), and records pass/fail plus
//! screenshot evidence.
//!
//! # Features
//!
//! - **Declarative steps**: navigate, fill, click, wait, upload, assert,
//!   capture — serializable to JSON and replayable
//! - **One session per run**: a browser context created at run start and
//!   torn down unconditionally at run end
//! - **Evidence**: screenshot artifacts per run, best-effort capture of
//!   the failure state
//! - **Canned flows**: the recurring login/section/record flows of the
//!   library application as reusable builders
//!
//! # Architecture
//!
//! ```text
//! Step sequence ──▶ VerificationRunner ──▶ StepDriver (trait)
//!                        │                      │
//!                        ▼                      ▼
//!                    RunResult            Session (CDP)
//!                 pass/fail, index,     navigate, interact,
//!                 artifact paths        wait, screenshot
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use veriweb::flows;
//! use veriweb::runner::VerificationRunner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let steps = flows::with_screenshot(flows::login_as_librarian(), "verification.png");
//!
//!     let runner = VerificationRunner::with_defaults();
//!     let result = runner.run(&steps).await?;
//!
//!     assert!(result.success, "login flow failed: {:?}", result.error);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod driver;
pub mod error;
pub mod flows;
pub mod runner;
pub mod selector;
pub mod step;

// Re-exports for convenience
pub use browser::{Session, SessionConfig};
pub use driver::StepDriver;
pub use error::{Error, Result, StepError};
pub use runner::{RunResult, RunnerConfig, VerificationRunner};
pub use selector::Selector;
pub use step::Step;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
