use crate::browser::{BrowserCapture, CaptureRequest};
use crate::cache::{Cooldown, TtlCache};
use crate::config::Config;
use crate::error::{CfnError, Result};
use crate::extract::{extract_rank, extract_search_results, extract_win_rate, is_login_wall};
use crate::fetch::FetchGateway;
use crate::models::{RankRecord, ScreenshotKind, SearchResult, WinRateRecord};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const PROFILE_SHOT_SELECTORS: &[&str] = &[
    r#"[class*="fighter_banner"]"#,
    r#"[class*="status_inner"]"#,
    "article",
    "main",
];

const WINRATE_SHOT_SELECTORS: &[&str] = &[
    r#"[class*="play_record"]"#,
    r#"[class*="winning_rate"]"#,
    "article",
    "main",
];

const BATTLELOG_SHOT_SELECTORS: &[&str] = &[
    r#"[class*="battlelog_list"]"#,
    r#"[class*="battlelog"]"#,
    "article",
    "main",
];

const SEARCH_SHOT_SELECTORS: &[&str] = &[r#"[class*="fighterslist"]"#, "article", "main"];

/// How a cooldown key is scoped. The chat layer historically ran most
/// commands per-caller-per-command but its primary rank command
/// per-caller only; that asymmetry is a policy choice made at the call
/// site, not a rule baked in here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownScope {
    PerCaller,
    PerCallerPerCommand,
}

pub fn cooldown_key(scope: CooldownScope, command: &str, caller: &str) -> String {
    match scope {
        CooldownScope::PerCaller => caller.to_string(),
        CooldownScope::PerCallerPerCommand => format!("{}:{}", command, caller),
    }
}

/// Front door for everything the chat layer asks of upstream: cached text
/// retrieval, cached screenshots, and the cooldown gate. Owns all mutable
/// state; construct one per process and share it behind an `Arc`.
pub struct ProfileService {
    config: Config,
    fetcher: FetchGateway,
    browser: BrowserCapture,
    rank_cache: Mutex<TtlCache<String, RankRecord>>,
    winrate_cache: Mutex<TtlCache<String, WinRateRecord>>,
    search_cache: Mutex<TtlCache<String, Vec<SearchResult>>>,
    screenshot_cache: Mutex<TtlCache<(ScreenshotKind, String), Vec<u8>>>,
    cooldown: Mutex<Cooldown>,
}

impl ProfileService {
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| CfnError::Configuration(errors.join("; ")))?;

        let fetcher = FetchGateway::new(&config)?;
        let browser = BrowserCapture::new(&config);
        let ttl = Duration::from_secs(config.limits.cache_ttl_secs);
        let window = Duration::from_secs(config.limits.cooldown_secs);

        Ok(Self {
            config,
            fetcher,
            browser,
            rank_cache: Mutex::new(TtlCache::new(ttl)),
            winrate_cache: Mutex::new(TtlCache::new(ttl)),
            search_cache: Mutex::new(TtlCache::new(ttl)),
            screenshot_cache: Mutex::new(TtlCache::new(ttl)),
            cooldown: Mutex::new(Cooldown::new(window)),
        })
    }

    /// Cooldown gate, exposed so the chat layer can bail out before any
    /// network work happens.
    pub async fn admit(&self, key: &str) -> bool {
        self.cooldown.lock().await.try_admit(key)
    }

    pub async fn cooldown_remaining(&self, key: &str) -> Option<Duration> {
        self.cooldown.lock().await.remaining(key)
    }

    pub async fn get_or_fetch_rank(&self, player_id: &str) -> Result<RankRecord> {
        let key = player_id.to_string();
        if let Some(record) = self.rank_cache.lock().await.get(&key) {
            debug!("Rank cache hit for {}", player_id);
            return Ok(record);
        }

        let url = self.profile_url(player_id);
        info!("Fetching rank for {} from {}", player_id, url);
        let html = self.fetcher.fetch_html(&url).await?;

        if is_login_wall(&html) {
            warn!("Login wall served for {}", player_id);
            return Err(CfnError::AuthRequired(
                "Upstream served a login page; refresh the session credential".to_string(),
            ));
        }

        let record = extract_rank(&html, player_id, &url);
        if record.is_unresolved() {
            warn!("Rank extraction yielded nothing for {}", player_id);
            return Err(CfnError::ExtractionFailed(
                "No rank fields found; markup may have changed or the credential is stale"
                    .to_string(),
            ));
        }

        self.rank_cache.lock().await.set(key, record.clone());
        Ok(record)
    }

    pub async fn get_or_fetch_win_rate(&self, player_id: &str) -> Result<WinRateRecord> {
        let key = player_id.to_string();
        if let Some(record) = self.winrate_cache.lock().await.get(&key) {
            debug!("Win-rate cache hit for {}", player_id);
            return Ok(record);
        }

        let url = self.play_url(player_id);
        info!("Fetching win rate for {} from {}", player_id, url);
        let html = self.fetcher.fetch_html(&url).await?;

        if is_login_wall(&html) {
            warn!("Login wall served for {}", player_id);
            return Err(CfnError::AuthRequired(
                "Upstream served a login page; refresh the session credential".to_string(),
            ));
        }

        let record = extract_win_rate(&html, player_id, &url);
        if record.is_unresolved() {
            warn!("Win-rate extraction yielded nothing for {}", player_id);
            return Err(CfnError::ExtractionFailed(
                "No battle totals found; markup may have changed or the credential is stale"
                    .to_string(),
            ));
        }

        self.winrate_cache.lock().await.set(key, record.clone());
        Ok(record)
    }

    pub async fn search_players(&self, name: &str) -> Result<Vec<SearchResult>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CfnError::InvalidInput("Search name is empty".to_string()));
        }

        let key = name.to_string();
        if let Some(results) = self.search_cache.lock().await.get(&key) {
            debug!("Search cache hit for {:?}", name);
            return Ok(results);
        }

        let url = self.search_url(name);
        info!("Searching players named {:?}", name);
        let html = self.fetcher.fetch_html(&url).await?;

        if is_login_wall(&html) {
            return Err(CfnError::AuthRequired(
                "Upstream served a login page; refresh the session credential".to_string(),
            ));
        }

        let results = extract_search_results(&html, &self.config.upstream.base_url);
        self.search_cache.lock().await.set(key, results.clone());
        Ok(results)
    }

    pub async fn capture_profile_screenshot(&self, player_id: &str) -> Result<Vec<u8>> {
        // The profile page streams its rank block in after load, hence the
        // settle delay and the denial scan on this path only.
        self.capture_cached(
            ScreenshotKind::Profile,
            player_id,
            &self.profile_url(player_id),
            PROFILE_SHOT_SELECTORS,
            true,
        )
        .await
    }

    pub async fn capture_win_rate_screenshot(&self, player_id: &str) -> Result<Vec<u8>> {
        self.capture_cached(
            ScreenshotKind::WinRate,
            player_id,
            &self.play_url(player_id),
            WINRATE_SHOT_SELECTORS,
            false,
        )
        .await
    }

    pub async fn capture_battlelog_screenshot(&self, player_id: &str) -> Result<Vec<u8>> {
        self.capture_cached(
            ScreenshotKind::BattleLog,
            player_id,
            &self.battlelog_url(player_id),
            BATTLELOG_SHOT_SELECTORS,
            false,
        )
        .await
    }

    pub async fn capture_search_screenshot(&self, name: &str) -> Result<Vec<u8>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CfnError::InvalidInput("Search name is empty".to_string()));
        }
        self.capture_cached(
            ScreenshotKind::Search,
            name,
            &self.search_url(name),
            SEARCH_SHOT_SELECTORS,
            false,
        )
        .await
    }

    /// Rank text and profile screenshot for one request, failures kept
    /// apart: a dead browser must not cost the caller their text answer,
    /// and a markup change must not cost them the picture.
    pub async fn rank_with_screenshot(
        &self,
        player_id: &str,
    ) -> (Result<RankRecord>, Result<Vec<u8>>) {
        let record = self.get_or_fetch_rank(player_id).await;
        let shot = self.capture_profile_screenshot(player_id).await;
        (record, shot)
    }

    async fn capture_cached(
        &self,
        kind: ScreenshotKind,
        key: &str,
        url: &str,
        selector_chain: &[&str],
        primary: bool,
    ) -> Result<Vec<u8>> {
        let cache_key = (kind, key.to_string());
        if let Some(bytes) = self.screenshot_cache.lock().await.get(&cache_key) {
            debug!("Screenshot cache hit for {} {:?}", kind.as_str(), key);
            return Ok(bytes);
        }

        info!("Capturing {} screenshot for {:?}", kind.as_str(), key);
        let request = CaptureRequest {
            url,
            selector_chain,
            settle_delay: primary
                .then(|| Duration::from_millis(self.config.capture.settle_delay_ms)),
            scan_denial: primary,
        };
        let bytes = self.browser.capture(&request).await?;

        self.screenshot_cache.lock().await.set(cache_key, bytes.clone());
        Ok(bytes)
    }

    /// Drop every cached record and image. Wired to process shutdown.
    pub async fn clear_caches(&self) {
        self.rank_cache.lock().await.clear();
        self.winrate_cache.lock().await.clear();
        self.search_cache.lock().await.clear();
        self.screenshot_cache.lock().await.clear();
        info!("Caches cleared");
    }

    pub fn profile_url(&self, player_id: &str) -> String {
        format!(
            "{}/{}/profile/{}",
            self.config.upstream.base_url, self.config.upstream.locale, player_id
        )
    }

    pub fn play_url(&self, player_id: &str) -> String {
        format!("{}/play", self.profile_url(player_id))
    }

    pub fn battlelog_url(&self, player_id: &str) -> String {
        format!("{}/battlelog", self.profile_url(player_id))
    }

    pub fn search_url(&self, name: &str) -> String {
        format!(
            "{}/{}/fighterslist/search/result?fighter_id={}&page=1",
            self.config.upstream.base_url,
            self.config.upstream.locale,
            urlencoding::encode(name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ProfileService {
        let mut config = Config::default();
        config.upstream.base_url = "https://www.streetfighter.com/6/buckler".to_string();
        config.upstream.locale = "zh-hans".to_string();
        ProfileService::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_url_shapes() {
        let service = service();
        assert_eq!(
            service.profile_url("3425126856"),
            "https://www.streetfighter.com/6/buckler/zh-hans/profile/3425126856"
        );
        assert_eq!(
            service.play_url("3425126856"),
            "https://www.streetfighter.com/6/buckler/zh-hans/profile/3425126856/play"
        );
        assert_eq!(
            service.battlelog_url("3425126856"),
            "https://www.streetfighter.com/6/buckler/zh-hans/profile/3425126856/battlelog"
        );
        assert_eq!(
            service.search_url("Daigo Umehara"),
            "https://www.streetfighter.com/6/buckler/zh-hans/fighterslist/search/result?fighter_id=Daigo%20Umehara&page=1"
        );
    }

    #[tokio::test]
    async fn test_admit_gate() {
        let service = service();
        let key = cooldown_key(CooldownScope::PerCallerPerCommand, "rank", "qq:12345");
        assert!(service.admit(&key).await);
        assert!(!service.admit(&key).await);
        assert!(service.cooldown_remaining(&key).await.is_some());

        // Different caller, same command: independent window.
        let other = cooldown_key(CooldownScope::PerCallerPerCommand, "rank", "qq:67890");
        assert!(service.admit(&other).await);
    }

    #[tokio::test]
    async fn test_cooldown_key_scopes() {
        assert_eq!(
            cooldown_key(CooldownScope::PerCaller, "rank", "qq:1"),
            "qq:1"
        );
        assert_eq!(
            cooldown_key(CooldownScope::PerCallerPerCommand, "winrate", "qq:1"),
            "winrate:qq:1"
        );
    }

    #[tokio::test]
    async fn test_empty_search_name_rejected() {
        let service = service();
        assert!(matches!(
            service.search_players("   ").await,
            Err(CfnError::InvalidInput(_))
        ));
    }
}
