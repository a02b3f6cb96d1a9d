use crate::config::Config;
use crate::error::{CfnError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER, USER_AGENT};
use std::time::Duration;
use tracing::debug;

/// Plain-HTTP retrieval path. One configured client, shared across
/// requests; no retries here, retry policy belongs to callers.
pub struct FetchGateway {
    client: reqwest::Client,
}

impl FetchGateway {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.upstream.user_agent)
                .map_err(|e| CfnError::Configuration(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.upstream.accept_language)
                .map_err(|e| CfnError::Configuration(format!("Invalid accept-language: {}", e)))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&config.upstream.base_url)
                .map_err(|e| CfnError::Configuration(format!("Invalid referer: {}", e)))?,
        );
        if let Some(cookie) = &config.upstream.session_cookie {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(cookie)
                    .map_err(|e| CfnError::Configuration(format!("Invalid session cookie: {}", e)))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.limits.http_timeout_secs))
            .build()
            .map_err(|e| CfnError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET `url` and hand back whatever body came down, error statuses
    /// included: the login-wall detector needs to see upstream's error
    /// and login pages, not a status-code abstraction of them.
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("Upstream returned {} for {}", status, url);
        }
        let body = response.text().await?;
        Ok(body)
    }
}
