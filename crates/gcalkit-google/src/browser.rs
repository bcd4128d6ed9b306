//! Opening the authorization page for the user.

use crate::error::{ApiError, ApiResult};

/// Opens a URL in a new browser tab.
pub trait BrowserBridge: Send + Sync {
    fn open_tab(&self, url: &str) -> ApiResult<()>;
}

/// Opens URLs with the desktop's default browser.
///
/// Only `http` and `https` URLs are handed to the desktop; anything else is a
/// [`ErrorCode::Browser`](crate::error::ErrorCode::Browser) error. When no
/// browser can be launched the URL is printed to stderr so the user can copy
/// it by hand; that case is not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

fn check_web_url(url: &str) -> ApiResult<()> {
    let parsed = url::Url::parse(url).map_err(|e| {
        ApiError::browser(format!("not a valid URL: {}", e)).with_source(e)
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ApiError::browser(format!(
            "refusing to open {} URL in the browser",
            other
        ))),
    }
}

#[cfg(feature = "browser")]
impl BrowserBridge for SystemBrowser {
    fn open_tab(&self, url: &str) -> ApiResult<()> {
        check_web_url(url)?;
        if let Err(e) = open::that(url) {
            tracing::warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", url);
        }
        Ok(())
    }
}

#[cfg(not(feature = "browser"))]
impl BrowserBridge for SystemBrowser {
    fn open_tab(&self, url: &str) -> ApiResult<()> {
        check_web_url(url)?;
        eprintln!("\nPlease open this URL in your browser:\n\n{}\n", url);
        Ok(())
    }
}
