//! Page navigation
//!
//! Single-attempt URL navigation with a bounded load wait. A navigation
//! either reaches the loaded state within its timeout or fails the step;
//! there is no retry policy.

use std::time::Duration;

use chromiumoxide::Page;
use tracing::{debug, info, instrument};

use crate::error::{Result, StepError};

/// Drives the page to URLs and waits for load completion
pub struct PageNavigator;

impl PageNavigator {
    /// Navigate to an absolute URL and wait for the document to finish
    /// loading. Fails with [`StepError::Navigation`] if the page does not
    /// reach a loaded state within `timeout`.
    #[instrument(skip(page))]
    pub async fn goto(page: &Page, url: &str, timeout: Duration) -> Result<()> {
        info!("Navigating to: {}", url);
        let start = std::time::Instant::now();

        let nav = tokio::time::timeout(timeout, page.goto(url))
            .await
            .map_err(|_| StepError::Navigation {
                url: url.to_string(),
                reason: format!("did not load within {}ms", timeout.as_millis()),
            })?;
        nav.map_err(|e| StepError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        // goto resolves when the navigation commits; the load event may
        // still be pending, and steps assume a settled document.
        let remaining = timeout.saturating_sub(start.elapsed());
        Self::wait_for_load(page, url, remaining).await?;

        debug!("Navigation complete in {}ms", start.elapsed().as_millis());
        Ok(())
    }

    /// Wait for the document's load event within the remaining budget.
    async fn wait_for_load(page: &Page, url: &str, timeout: Duration) -> Result<()> {
        let script = r#"
            new Promise(resolve => {
                if (document.readyState === 'complete') {
                    resolve(true);
                } else {
                    window.addEventListener('load', () => resolve(true));
                }
            })
        "#;

        let wait = tokio::time::timeout(timeout, page.evaluate(script))
            .await
            .map_err(|_| StepError::Navigation {
                url: url.to_string(),
                reason: format!("load event not fired within {}ms", timeout.as_millis()),
            })?;
        wait.map_err(|e| StepError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}
