//! Element addressing
//!
//! Interactive elements are addressed through a stable test-identification
//! attribute (`data-test="menu-login"` and friends), decoupled from visual
//! layout. Raw CSS remains available as an escape hatch for pages that
//! predate the convention.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute carrying the per-element test identifier, unless overridden
/// in [`RunnerConfig`](crate::runner::RunnerConfig).
pub const DEFAULT_TEST_ATTRIBUTE: &str = "data-test";

/// A stable reference to one element on the page.
///
/// The string form used in step files keeps the common case terse: a bare
/// string is a test id, a `css:` prefix passes raw CSS through.
///
/// ```
/// use veriweb::selector::Selector;
///
/// assert_eq!(
///     Selector::from("menu-login").to_css("data-test"),
///     "[data-test='menu-login']"
/// );
/// assert_eq!(Selector::from("css:#librarian-section").to_css("data-test"), "#librarian-section");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selector {
    /// Value of the test-identification attribute
    TestId(String),
    /// Raw CSS selector
    Css(String),
}

impl Selector {
    /// Create a test-id selector
    pub fn test_id<S: Into<String>>(id: S) -> Self {
        Selector::TestId(id.into())
    }

    /// Create a raw CSS selector
    pub fn css<S: Into<String>>(css: S) -> Self {
        Selector::Css(css.into())
    }

    /// Render as a CSS selector string against the given test attribute.
    pub fn to_css(&self, test_attribute: &str) -> String {
        match self {
            Selector::TestId(id) => {
                format!("[{}='{}']", test_attribute, escape_quotes(id))
            }
            Selector::Css(css) => css.clone(),
        }
    }
}

/// Escape quote characters so a value can sit inside a single-quoted
/// CSS attribute selector that is itself embedded in injected JavaScript.
pub(crate) fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        match s.strip_prefix("css:") {
            Some(css) => Selector::Css(css.to_string()),
            None => Selector::TestId(s),
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Selector::from(s.to_string())
    }
}

impl From<Selector> for String {
    fn from(sel: Selector) -> Self {
        match sel {
            Selector::TestId(id) => id,
            Selector::Css(css) => format!("css:{}", css),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::TestId(id) => write!(f, "[{}='{}']", DEFAULT_TEST_ATTRIBUTE, id),
            Selector::Css(css) => write!(f, "{}", css),
        }
    }
}
