use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub limits: LimitsConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub locale: String,
    pub user_agent: String,
    pub accept_language: String,
    /// Raw `Cookie` header value copied from an authenticated browser
    /// session. Sent verbatim on HTTP fetches and re-injected cookie by
    /// cookie on browser navigations.
    pub session_cookie: Option<String>,
    pub cookie_domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub http_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub headless: bool,
    pub nav_timeout_secs: u64,
    pub selector_wait_secs: u64,
    pub settle_delay_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig {
                base_url: std::env::var("CFN_BASE_URL")
                    .unwrap_or_else(|_| "https://www.streetfighter.com/6/buckler".to_string()),
                locale: std::env::var("CFN_LOCALE").unwrap_or_else(|_| "zh-hans".to_string()),
                user_agent: std::env::var("CFN_USER_AGENT").unwrap_or_else(|_| {
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                        .to_string()
                }),
                accept_language: std::env::var("CFN_ACCEPT_LANGUAGE")
                    .unwrap_or_else(|_| "zh-CN,zh;q=0.9,en;q=0.8".to_string()),
                session_cookie: std::env::var("CFN_SESSION_COOKIE").ok().filter(|s| !s.is_empty()),
                cookie_domain: std::env::var("CFN_COOKIE_DOMAIN")
                    .unwrap_or_else(|_| "www.streetfighter.com".to_string()),
            },
            limits: LimitsConfig {
                http_timeout_secs: env_parse("CFN_HTTP_TIMEOUT_SECS", 15),
                cache_ttl_secs: env_parse("CFN_CACHE_TTL_SECS", 600),
                cooldown_secs: env_parse("CFN_COOLDOWN_SECS", 5),
            },
            capture: CaptureConfig {
                headless: env_parse("CFN_HEADLESS", true),
                nav_timeout_secs: env_parse("CFN_NAV_TIMEOUT_SECS", 30),
                selector_wait_secs: env_parse("CFN_SELECTOR_WAIT_SECS", 3),
                settle_delay_ms: env_parse("CFN_SETTLE_DELAY_MS", 3000),
                viewport_width: env_parse("CFN_VIEWPORT_WIDTH", 1920),
                viewport_height: env_parse("CFN_VIEWPORT_HEIGHT", 1080),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load from a TOML file, then let environment variables override
    /// whatever the file said. Missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, String> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?
        } else {
            Config::default()
        };
        config.overlay_env();
        Ok(config)
    }

    fn overlay_env(&mut self) {
        let env = Config::default();
        if std::env::var("CFN_BASE_URL").is_ok() {
            self.upstream.base_url = env.upstream.base_url;
        }
        if std::env::var("CFN_LOCALE").is_ok() {
            self.upstream.locale = env.upstream.locale;
        }
        if std::env::var("CFN_USER_AGENT").is_ok() {
            self.upstream.user_agent = env.upstream.user_agent;
        }
        if std::env::var("CFN_ACCEPT_LANGUAGE").is_ok() {
            self.upstream.accept_language = env.upstream.accept_language;
        }
        if std::env::var("CFN_SESSION_COOKIE").is_ok() {
            self.upstream.session_cookie = env.upstream.session_cookie;
        }
        if std::env::var("CFN_COOKIE_DOMAIN").is_ok() {
            self.upstream.cookie_domain = env.upstream.cookie_domain;
        }
        if std::env::var("CFN_HTTP_TIMEOUT_SECS").is_ok() {
            self.limits.http_timeout_secs = env.limits.http_timeout_secs;
        }
        if std::env::var("CFN_CACHE_TTL_SECS").is_ok() {
            self.limits.cache_ttl_secs = env.limits.cache_ttl_secs;
        }
        if std::env::var("CFN_COOLDOWN_SECS").is_ok() {
            self.limits.cooldown_secs = env.limits.cooldown_secs;
        }
        if std::env::var("CFN_HEADLESS").is_ok() {
            self.capture.headless = env.capture.headless;
        }
        if std::env::var("CFN_NAV_TIMEOUT_SECS").is_ok() {
            self.capture.nav_timeout_secs = env.capture.nav_timeout_secs;
        }
        if std::env::var("CFN_SELECTOR_WAIT_SECS").is_ok() {
            self.capture.selector_wait_secs = env.capture.selector_wait_secs;
        }
        if std::env::var("CFN_SETTLE_DELAY_MS").is_ok() {
            self.capture.settle_delay_ms = env.capture.settle_delay_ms;
        }
        if std::env::var("CFN_VIEWPORT_WIDTH").is_ok() {
            self.capture.viewport_width = env.capture.viewport_width;
        }
        if std::env::var("CFN_VIEWPORT_HEIGHT").is_ok() {
            self.capture.viewport_height = env.capture.viewport_height;
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.upstream.base_url.starts_with("http://")
            && !self.upstream.base_url.starts_with("https://")
        {
            errors.push("Invalid base URL format".to_string());
        }

        if url::Url::parse(&self.upstream.base_url).is_err() {
            errors.push("Base URL does not parse".to_string());
        }

        if self.upstream.locale.is_empty() {
            errors.push("Locale must not be empty".to_string());
        }

        if self.limits.http_timeout_secs == 0 {
            errors.push("HTTP timeout must be greater than 0".to_string());
        }

        if self.limits.cache_ttl_secs == 0 {
            errors.push("Cache TTL must be greater than 0".to_string());
        }

        if self.capture.nav_timeout_secs == 0 {
            errors.push("Navigation timeout must be greater than 0".to_string());
        }

        if self.capture.viewport_width == 0 || self.capture.viewport_height == 0 {
            errors.push("Viewport dimensions must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
