use crate::config::Config;
use crate::error::{CfnError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::StreamExt;
use regex::Regex;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Rendered-text markers that mean the edge denied us instead of serving
/// the profile. "403" is matched as a standalone token so rating values
/// like 1403 cannot trip it.
const DENIAL_MARKERS: &[&str] = &["forbidden", "access denied", "blocked", "出错了", "エラーが発生しました"];

/// One screenshot job: where to go, which regions to try, and the extra
/// care the primary profile path gets (settle delay, denial scan).
pub struct CaptureRequest<'a> {
    pub url: &'a str,
    pub selector_chain: &'a [&'a str],
    pub settle_delay: Option<Duration>,
    pub scan_denial: bool,
}

/// Drives one ephemeral headless-Chrome page per capture. Nothing is
/// pooled: every request launches, captures, and tears down. Once a
/// launch succeeds the browser is closed on every exit path.
pub struct BrowserCapture {
    config: Config,
}

impl BrowserCapture {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub async fn capture(&self, request: &CaptureRequest<'_>) -> Result<Vec<u8>> {
        let (mut browser, page) = self.open().await?;

        let result = self.drive(&page, request).await;

        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }

        result
    }

    async fn open(&self) -> Result<(Browser, Page)> {
        let capture = &self.config.capture;

        let mut builder = BrowserConfig::builder()
            .window_size(capture.viewport_width, capture.viewport_height)
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", self.config.upstream.user_agent));

        if capture.headless {
            builder = builder.arg("--headless").arg("--disable-gpu");
        } else {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| CfnError::BrowserUnavailable(format!("Failed to build browser config: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CfnError::BrowserUnavailable(format!("Failed to launch browser: {}", e)))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let error_str = format!("{:?}", e);
                    // CDP event deserialization mismatches are routine noise.
                    if !error_str.contains("data did not match any variant") {
                        debug!("Browser handler error: {}", e);
                    }
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("Failed to close browser: {}", close_err);
                }
                return Err(CfnError::Browser(format!("Failed to create page: {}", e)));
            }
        };

        Ok((browser, page))
    }

    async fn drive(&self, page: &Page, request: &CaptureRequest<'_>) -> Result<Vec<u8>> {
        self.configure_identity(page).await?;
        self.inject_session_cookies(page).await?;
        self.navigate(page, request.url).await?;

        if let Some(delay) = request.settle_delay {
            debug!("Settling {}ms for dynamic content", delay.as_millis());
            tokio::time::sleep(delay).await;
        }

        if request.scan_denial {
            self.scan_for_denial(page).await?;
        }

        self.capture_region(page, request.selector_chain).await
    }

    async fn configure_identity(&self, page: &Page) -> Result<()> {
        page.execute(SetUserAgentOverrideParams::new(
            self.config.upstream.user_agent.clone(),
        ))
        .await
        .map_err(|e| CfnError::Browser(format!("Failed to set user agent: {}", e)))?;

        let headers = json!({
            "Accept": "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            "Accept-Language": self.config.upstream.accept_language,
            "Accept-Encoding": "gzip, deflate, br",
            "Cache-Control": "no-cache",
            "Connection": "keep-alive",
        });
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
            .await
            .map_err(|e| CfnError::Browser(format!("Failed to set headers: {}", e)))?;

        Ok(())
    }

    async fn inject_session_cookies(&self, page: &Page) -> Result<()> {
        let Some(raw) = &self.config.upstream.session_cookie else {
            return Ok(());
        };

        for (name, value) in parse_cookie_pairs(raw) {
            match CookieParam::builder()
                .name(name.clone())
                .value(value)
                .domain(self.config.upstream.cookie_domain.clone())
                .build()
            {
                Ok(param) => {
                    if let Err(e) = page.set_cookie(param).await {
                        warn!("Failed to set cookie {}: {}", name, e);
                    }
                }
                Err(e) => warn!("Failed to build cookie {}: {}", name, e),
            }
        }

        Ok(())
    }

    async fn navigate(&self, page: &Page, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        let nav_timeout = Duration::from_secs(self.config.capture.nav_timeout_secs);
        match tokio::time::timeout(nav_timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(CfnError::Browser(format!("Failed to navigate: {}", e))),
            Err(_) => {
                return Err(CfnError::Timeout(format!(
                    "Navigation to {} timed out after {}s",
                    url,
                    nav_timeout.as_secs()
                )))
            }
        }

        // DOM content is enough; full network idle is not worth waiting
        // for on these pages. The caller adds a settle delay where the
        // content is known to stream in late.
        match tokio::time::timeout(Duration::from_secs(5), page.wait_for_navigation()).await {
            Ok(Ok(_)) => debug!("Navigation complete"),
            Ok(Err(e)) => debug!("Navigation wait error (continuing anyway): {}", e),
            Err(_) => debug!("Navigation wait timed out (continuing anyway)"),
        }

        Ok(())
    }

    async fn scan_for_denial(&self, page: &Page) -> Result<()> {
        let text: String = match page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
        {
            Ok(result) => result.into_value().unwrap_or_default(),
            Err(e) => {
                debug!("Could not read rendered text for denial scan: {}", e);
                return Ok(());
            }
        };

        if contains_denial_marker(&text) {
            return Err(CfnError::AuthRequired(
                "Upstream denied the rendered page; refresh the session credential".to_string(),
            ));
        }

        Ok(())
    }

    /// Try each selector in order, give each a short window to appear, and
    /// screenshot the first one that resolves. Nothing resolving is not an
    /// error: the whole page is captured instead.
    async fn capture_region(&self, page: &Page, chain: &[&str]) -> Result<Vec<u8>> {
        let wait = Duration::from_secs(self.config.capture.selector_wait_secs);

        for selector in chain {
            if !self.wait_for_selector(page, selector, wait).await {
                debug!("Selector {} did not appear within {:?}", selector, wait);
                continue;
            }
            match page.find_element(*selector).await {
                Ok(element) => match element.screenshot(CaptureScreenshotFormat::Png).await {
                    Ok(bytes) => {
                        debug!("Captured {} bytes via selector {}", bytes.len(), selector);
                        return Ok(bytes);
                    }
                    Err(e) => warn!("Element capture failed for {}: {}", selector, e),
                },
                Err(e) => debug!("Selector {} appeared but did not resolve: {}", selector, e),
            }
        }

        debug!("No selector in chain resolved, capturing full page");
        page.screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build(),
        )
        .await
        .map_err(|e| CfnError::Browser(format!("Failed to take screenshot: {}", e)))
    }

    async fn wait_for_selector(&self, page: &Page, selector: &str, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        let script = format!(
            "document.querySelector('{}') !== null",
            selector.replace('\'', "\\'")
        );

        loop {
            let found = match page.evaluate(script.as_str()).await {
                Ok(result) => result.into_value::<bool>().unwrap_or(false),
                Err(_) => false,
            };
            if found {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Split a raw `Cookie` header into name/value pairs. Only the first `=`
/// separates name from value: session tokens carry `=` padding in their
/// values. Pairs missing either half are dropped.
fn parse_cookie_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn contains_denial_marker(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if DENIAL_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return true;
    }
    Regex::new(r"\b403\b")
        .map(|re| re.is_match(&lowered))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_pairs_split_on_first_equals_only() {
        let pairs = parse_cookie_pairs("session=abc=def==; theme=dark");
        assert_eq!(
            pairs,
            vec![
                ("session".to_string(), "abc=def==".to_string()),
                ("theme".to_string(), "dark".to_string()),
            ]
        );
    }

    #[test]
    fn test_cookie_pairs_skip_empty_halves() {
        let pairs = parse_cookie_pairs("=orphanvalue; orphanname=; ok=1;;");
        assert_eq!(pairs, vec![("ok".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_cookie_pairs_trim_whitespace() {
        let pairs = parse_cookie_pairs(" a = 1 ; b=2 ");
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_denial_markers() {
        assert!(contains_denial_marker("403 Forbidden"));
        assert!(contains_denial_marker("Your request was blocked"));
        assert!(contains_denial_marker("出错了"));
        assert!(!contains_denial_marker("MR 1403 大师"));
        assert!(!contains_denial_marker("LEAGUE POINT 25000"));
    }
}
