//! Evidence capture
//!
//! Screenshot capture for run artifacts: the rendered page goes to an
//! image file at the end of a flow, and best-effort on failure.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{Result, StepError};

/// Image format for screenshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// PNG screenshot
    #[default]
    Png,
    /// JPEG screenshot
    Jpeg,
}

impl CaptureFormat {
    /// File extension for the format
    pub fn extension(&self) -> &'static str {
        match self {
            CaptureFormat::Png => "png",
            CaptureFormat::Jpeg => "jpg",
        }
    }

    /// MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            CaptureFormat::Png => "image/png",
            CaptureFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Options for screenshot capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Capture format
    #[serde(default)]
    pub format: CaptureFormat,
    /// JPEG quality (0-100)
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Capture full page (not just viewport)
    #[serde(default = "default_true")]
    pub full_page: bool,
}

fn default_quality() -> u8 {
    85
}

fn default_true() -> bool {
    true
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            format: CaptureFormat::Png,
            quality: 85,
            full_page: true,
        }
    }
}

impl CaptureOptions {
    /// Options for a PNG screenshot
    pub fn png() -> Self {
        Self::default()
    }

    /// Options for a JPEG screenshot
    pub fn jpeg(quality: u8) -> Self {
        Self {
            format: CaptureFormat::Jpeg,
            quality,
            ..Default::default()
        }
    }
}

/// Result of a capture operation
#[derive(Debug, Clone)]
pub struct CaptureResult {
    /// The captured image bytes
    pub data: Vec<u8>,
    /// The format of the capture
    pub format: CaptureFormat,
    /// Size in bytes
    pub size: usize,
}

impl CaptureResult {
    /// Image bytes as base64, for embedding in reports
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }
}

/// Page screenshot capture
pub struct PageCapture;

impl PageCapture {
    /// Capture the rendered page as image bytes.
    #[instrument(skip(page))]
    pub async fn capture(page: &Page, options: &CaptureOptions) -> Result<CaptureResult> {
        info!("Capturing screenshot");

        let format = match options.format {
            CaptureFormat::Png => CaptureScreenshotFormat::Png,
            CaptureFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
        };

        let mut params_builder = ScreenshotParams::builder()
            .format(format)
            .from_surface(true)
            .capture_beyond_viewport(options.full_page);

        if options.format == CaptureFormat::Jpeg {
            params_builder = params_builder.quality(options.quality as i64);
        }

        let data = page
            .screenshot(params_builder.build())
            .await
            .map_err(|e| StepError::Capture(e.to_string()))?;

        let size = data.len();
        debug!("Screenshot captured: {} bytes", size);

        Ok(CaptureResult {
            data,
            format: options.format,
            size,
        })
    }

    /// Capture the rendered page and write it to `path`, creating parent
    /// directories as needed.
    #[instrument(skip(page))]
    pub async fn capture_to_file(
        page: &Page,
        path: &Path,
        options: &CaptureOptions,
    ) -> Result<CaptureResult> {
        let result = Self::capture(page, options).await?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StepError::Capture(format!("{}: {}", parent.display(), e)))?;
            }
        }
        tokio::fs::write(path, &result.data)
            .await
            .map_err(|e| StepError::Capture(format!("{}: {}", path.display(), e)))?;

        info!("Screenshot written to {}", path.display());
        Ok(result)
    }
}
