//! Declarative verification steps
//!
//! A run is an ordered sequence of [`Step`]s: navigate, interact, wait,
//! assert, capture. Representing each UI interaction as data rather than
//! an inline call is what makes sequences replayable from JSON files and
//! uniformly loggable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::selector::Selector;

/// One declarative UI action or assertion in a verification sequence.
///
/// Steps serialize tagged by `kind`, so a stored sequence reads the way
/// it executes:
///
/// ```json
/// [
///   {"kind": "navigate", "target": "/"},
///   {"kind": "click", "target": "menu-login"},
///   {"kind": "fill", "target": "login-username", "value": "librarian"},
///   {"kind": "wait_for_visible", "target": "main-content", "timeout_ms": 10000}
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Load an absolute or base-relative address
    Navigate {
        /// URL or path, resolved against the runner's base URL
        target: String,
        /// Overrides the default load timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Poll until the element is visible
    WaitForVisible {
        /// Element to wait on
        target: Selector,
        /// Overrides the default wait timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Poll until the element is hidden (or gone)
    WaitForHidden {
        /// Element to wait on
        target: Selector,
        /// Overrides the default wait timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Set an input's value, dispatching input/change events
    Fill {
        /// Element to fill
        target: Selector,
        /// The value to set
        value: String,
    },
    /// Native click on a visible, enabled element
    Click {
        /// Element to click
        target: Selector,
    },
    /// Attach a local file to a file input
    UploadFile {
        /// The file input element
        target: Selector,
        /// Local path of the file to attach
        value: PathBuf,
    },
    /// Assert the element's text contains the expected fragment
    AssertText {
        /// Element whose text is inspected
        target: Selector,
        /// Expected text fragment
        value: String,
    },
    /// Assert the element is currently visible
    AssertVisible {
        /// Element expected to be visible
        target: Selector,
    },
    /// Capture the rendered page to an image file
    Screenshot {
        /// Output path, relative paths land in the artifact directory
        value: PathBuf,
    },
}

impl Step {
    /// Navigate to a URL or base-relative path
    pub fn navigate<S: Into<String>>(target: S) -> Self {
        Step::Navigate {
            target: target.into(),
            timeout_ms: None,
        }
    }

    /// Wait for an element to become visible
    pub fn wait_for_visible<S: Into<Selector>>(target: S) -> Self {
        Step::WaitForVisible {
            target: target.into(),
            timeout_ms: None,
        }
    }

    /// Wait for an element to become hidden
    pub fn wait_for_hidden<S: Into<Selector>>(target: S) -> Self {
        Step::WaitForHidden {
            target: target.into(),
            timeout_ms: None,
        }
    }

    /// Fill an input with a value
    pub fn fill<S: Into<Selector>, V: Into<String>>(target: S, value: V) -> Self {
        Step::Fill {
            target: target.into(),
            value: value.into(),
        }
    }

    /// Click an element
    pub fn click<S: Into<Selector>>(target: S) -> Self {
        Step::Click {
            target: target.into(),
        }
    }

    /// Attach a local file to a file input
    pub fn upload_file<S: Into<Selector>, P: Into<PathBuf>>(target: S, path: P) -> Self {
        Step::UploadFile {
            target: target.into(),
            value: path.into(),
        }
    }

    /// Assert an element's text contains a fragment
    pub fn assert_text<S: Into<Selector>, V: Into<String>>(target: S, value: V) -> Self {
        Step::AssertText {
            target: target.into(),
            value: value.into(),
        }
    }

    /// Assert an element is visible
    pub fn assert_visible<S: Into<Selector>>(target: S) -> Self {
        Step::AssertVisible {
            target: target.into(),
        }
    }

    /// Capture a screenshot to the given path
    pub fn screenshot<P: Into<PathBuf>>(path: P) -> Self {
        Step::Screenshot { value: path.into() }
    }

    /// Attach a per-step timeout. Only meaningful on steps that wait
    /// (`navigate`, `wait_for_visible`, `wait_for_hidden`); a no-op on
    /// the rest.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        match &mut self {
            Step::Navigate { timeout_ms, .. }
            | Step::WaitForVisible { timeout_ms, .. }
            | Step::WaitForHidden { timeout_ms, .. } => *timeout_ms = Some(ms),
            _ => {}
        }
        self
    }

    /// Short machine-readable name of the step kind, used in logs and
    /// run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::WaitForVisible { .. } => "wait_for_visible",
            Step::WaitForHidden { .. } => "wait_for_hidden",
            Step::Fill { .. } => "fill",
            Step::Click { .. } => "click",
            Step::UploadFile { .. } => "upload_file",
            Step::AssertText { .. } => "assert_text",
            Step::AssertVisible { .. } => "assert_visible",
            Step::Screenshot { .. } => "screenshot",
        }
    }

    /// The selector this step addresses, when it addresses one.
    pub fn target(&self) -> Option<&Selector> {
        match self {
            Step::WaitForVisible { target, .. }
            | Step::WaitForHidden { target, .. }
            | Step::Fill { target, .. }
            | Step::Click { target }
            | Step::UploadFile { target, .. }
            | Step::AssertText { target, .. }
            | Step::AssertVisible { target } => Some(target),
            Step::Navigate { .. } | Step::Screenshot { .. } => None,
        }
    }
}

/// Load a step sequence from a JSON file.
pub fn load_steps(path: &std::path::Path) -> crate::error::Result<Vec<Step>> {
    let data = std::fs::read_to_string(path)?;
    let steps: Vec<Step> = serde_json::from_str(&data)?;
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_step_kind_names() {
        assert_eq!(Step::navigate("/").kind(), "navigate");
        assert_eq!(Step::click("menu-login").kind(), "click");
        assert_eq!(Step::screenshot("out.png").kind(), "screenshot");
        assert_eq!(
            Step::upload_file("photo-input", "/tmp/x.jpg").kind(),
            "upload_file"
        );
    }

    #[test]
    fn test_step_deserialize_tagged() {
        let json = r#"{"kind": "fill", "target": "login-username", "value": "librarian"}"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step, Step::fill("login-username", "librarian"));
    }

    #[test]
    fn test_step_timeout_default_absent() {
        let json = r#"{"kind": "wait_for_visible", "target": "main-content"}"#;
        let step: Step = serde_json::from_str(json).unwrap();
        match step {
            Step::WaitForVisible { timeout_ms, .. } => assert!(timeout_ms.is_none()),
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_with_timeout_only_on_waiting_steps() {
        let step = Step::wait_for_visible("main-content").with_timeout_ms(10_000);
        match step {
            Step::WaitForVisible { timeout_ms, .. } => assert_eq!(timeout_ms, Some(10_000)),
            other => panic!("unexpected step: {:?}", other),
        }

        // No timeout slot on fill; the builder leaves it untouched.
        let step = Step::fill("login-username", "librarian").with_timeout_ms(5_000);
        assert_eq!(step, Step::fill("login-username", "librarian"));
    }

    #[test]
    fn test_step_sequence_deserialize() {
        let json = r#"[
            {"kind": "navigate", "target": "/"},
            {"kind": "click", "target": "menu-login"},
            {"kind": "wait_for_visible", "target": "css:#login-form", "timeout_ms": 5000}
        ]"#;
        let steps: Vec<Step> = serde_json::from_str(json).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].kind(), "navigate");
        assert_eq!(
            steps[2].target(),
            Some(&crate::selector::Selector::css("#login-form"))
        );
    }

    #[test]
    fn test_target_accessor() {
        assert!(Step::navigate("/").target().is_none());
        assert!(Step::screenshot("x.png").target().is_none());
        assert!(Step::assert_visible("book-table").target().is_some());
    }
}
