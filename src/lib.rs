//! Retrieval-and-extraction engine for a fighting game's public player
//! profiles.
//!
//! Two retrieval paths cover every request: a plain HTTP fetch whose HTML
//! goes through ordered fallback extraction into typed records, and a
//! headless-Chrome session that renders the same pages and captures a
//! region screenshot. A TTL cache and a fixed-window cooldown gate sit in
//! front of both. Upstream markup is versioned and undocumented, so every
//! extracted field degrades gracefully and login walls are detected
//! heuristically rather than assumed away.

pub mod bindings;
pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod services;

pub use bindings::{BindingStore, LocalBindingStore};
pub use browser::{BrowserCapture, CaptureRequest};
pub use cache::{Cooldown, TtlCache};
pub use config::{CaptureConfig, Config, LimitsConfig, UpstreamConfig};
pub use error::{CfnError, Result};
pub use extract::{extract_rank, extract_search_results, extract_win_rate, is_login_wall};
pub use fetch::FetchGateway;
pub use models::{
    RankRecord, ScreenshotKind, SearchResult, WinRateRecord, UNKNOWN_CHARACTER,
};
pub use services::{cooldown_key, CooldownScope, ProfileService};
