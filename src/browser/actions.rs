//! Page interaction primitives
//!
//! Fill, click, upload, visibility polling, and text inspection against
//! the current page. Selectors arrive as rendered CSS; interaction
//! preconditions (element present, visible, enabled) map onto the step
//! error taxonomy.

use std::path::Path;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::Page;
use tracing::{debug, instrument};

use crate::error::{Error, Result, StepError};
use crate::selector::escape_quotes;

/// Polling interval for visibility waits, in milliseconds
const POLL_INTERVAL_MS: u64 = 100;

/// JS helper deciding element visibility: attached, not display:none or
/// visibility:hidden, and occupying layout space.
const VISIBLE_FN: &str = r#"
    const visible = (el) => {
        if (!el) return false;
        const style = window.getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden') return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    };
"#;

/// DOM interaction against a single page
pub struct PageActions;

impl PageActions {
    /// Poll until the element matching `css` is visible (`visible=true`)
    /// or hidden/absent (`visible=false`). Succeeds as soon as the
    /// condition holds; fails with [`StepError::Timeout`] once `timeout`
    /// elapses, never before.
    #[instrument(skip(page))]
    pub async fn wait_for_visibility(
        page: &Page,
        css: &str,
        visible: bool,
        timeout: Duration,
    ) -> Result<()> {
        let timeout_ms = timeout.as_millis() as u64;
        let condition = if visible { "visible" } else { "hidden" };
        let script = format!(
            r#"
                new Promise(resolve => {{
                    {VISIBLE_FN}
                    const deadline = Date.now() + {timeout_ms};
                    const check = () => {{
                        const el = document.querySelector('{css}');
                        if (visible(el) === {want}) {{
                            resolve(true);
                        }} else if (Date.now() >= deadline) {{
                            resolve(false);
                        }} else {{
                            setTimeout(check, {POLL_INTERVAL_MS});
                        }}
                    }};
                    check();
                }})
            "#,
            css = escape_quotes(css),
            want = visible,
        );

        let timeout_error = || StepError::Timeout {
            selector: css.to_string(),
            condition: condition.to_string(),
            timeout_ms,
        };

        // Outer guard in case the page stops evaluating entirely.
        let outer = Duration::from_millis(timeout_ms + 1000);
        let satisfied: bool = tokio::time::timeout(outer, page.evaluate(script))
            .await
            .map_err(|_| timeout_error())?
            .map_err(|e| Error::cdp(e.to_string()))?
            .into_value()
            .map_err(|e| Error::cdp(e.to_string()))?;

        if satisfied {
            debug!("Element {} became {}", css, condition);
            Ok(())
        } else {
            Err(timeout_error().into())
        }
    }

    /// Set the value of the input matching `css`, dispatching the
    /// `input` and `change` events the application listens for.
    #[instrument(skip(page, value))]
    pub async fn fill(page: &Page, css: &str, value: &str) -> Result<()> {
        let script = format!(
            r#"
                (() => {{
                    const el = document.querySelector('{css}');
                    if (!el) return false;
                    el.focus();
                    el.value = '{value}';
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return true;
                }})()
            "#,
            css = escape_quotes(css),
            value = escape_js_string(value),
        );

        let found: bool = page
            .evaluate(script)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .into_value()
            .map_err(|e| Error::cdp(e.to_string()))?;

        if found {
            debug!("Filled {}", css);
            Ok(())
        } else {
            Err(StepError::ElementNotFound(css.to_string()).into())
        }
    }

    /// Click the element matching `css` with a native input event.
    /// Requires the element to be visible and enabled.
    #[instrument(skip(page))]
    pub async fn click(page: &Page, css: &str) -> Result<()> {
        match Self::interactable_state(page, css).await?.as_str() {
            "ok" => {}
            "missing" => return Err(StepError::ElementNotFound(css.to_string()).into()),
            reason => {
                return Err(StepError::ElementNotInteractable {
                    selector: css.to_string(),
                    reason: reason.to_string(),
                }
                .into())
            }
        }

        let element = page
            .find_element(css)
            .await
            .map_err(|_| StepError::ElementNotFound(css.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;

        debug!("Clicked {}", css);
        Ok(())
    }

    /// Probe whether the element can receive a click: "ok", "missing",
    /// "hidden", or "disabled".
    async fn interactable_state(page: &Page, css: &str) -> Result<String> {
        let script = format!(
            r#"
                (() => {{
                    {VISIBLE_FN}
                    const el = document.querySelector('{css}');
                    if (!el) return 'missing';
                    if (!visible(el)) return 'hidden';
                    if (el.disabled) return 'disabled';
                    return 'ok';
                }})()
            "#,
            css = escape_quotes(css),
        );

        page.evaluate(script)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .into_value()
            .map_err(|e| Error::cdp(e.to_string()))
    }

    /// Attach a local file to the file input matching `css`.
    ///
    /// The path must exist locally; CDP receives it as an absolute path.
    #[instrument(skip(page))]
    pub async fn upload_file(page: &Page, css: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(StepError::FileNotFound(path.to_path_buf()).into());
        }
        let absolute = path
            .canonicalize()
            .map_err(|_| StepError::FileNotFound(path.to_path_buf()))?;

        let element = page
            .find_element(css)
            .await
            .map_err(|_| StepError::ElementNotFound(css.to_string()))?;

        let params = SetFileInputFilesParams::builder()
            .files(vec![absolute.to_string_lossy().to_string()])
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(Error::generic)?;

        page.execute(params)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;

        debug!("Attached {} to {}", absolute.display(), css);
        Ok(())
    }

    /// Text content of the element matching `css`.
    #[instrument(skip(page))]
    pub async fn text_content(page: &Page, css: &str) -> Result<String> {
        let script = format!(
            r#"
                (() => {{
                    const el = document.querySelector('{css}');
                    return el ? el.textContent : null;
                }})()
            "#,
            css = escape_quotes(css),
        );

        let text: Option<String> = page
            .evaluate(script)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .into_value()
            .map_err(|e| Error::cdp(e.to_string()))?;

        text.ok_or_else(|| StepError::ElementNotFound(css.to_string()).into())
    }

    /// Whether the element matching `css` is currently visible.
    /// An absent element counts as not visible rather than an error.
    #[instrument(skip(page))]
    pub async fn is_visible(page: &Page, css: &str) -> Result<bool> {
        let script = format!(
            r#"
                (() => {{
                    {VISIBLE_FN}
                    return visible(document.querySelector('{css}'));
                }})()
            "#,
            css = escape_quotes(css),
        );

        page.evaluate(script)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .into_value()
            .map_err(|e| Error::cdp(e.to_string()))
    }
}

/// Escape a value for embedding in a single-quoted JS string literal.
fn escape_js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}
