use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Character shown when the profile page did not yield one.
pub const UNKNOWN_CHARACTER: &str = "未知";

/// Rank standing scraped from a fighter's profile page.
///
/// Records are never patched in place; a refresh produces a replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankRecord {
    pub player_id: String,
    pub name: Option<String>,
    pub character: String,
    pub league_tier: String,
    pub league_points: u32,
    pub master_rating: u32,
    pub title: String,
    pub source_url: String,
    pub fetched_at: DateTime<Utc>,
}

impl RankRecord {
    /// True when every field that extraction could have filled is still at
    /// its sentinel. Upstream serves a styled shell page to logged-out or
    /// stale-markup requests, so an all-sentinel record means the scrape
    /// failed, not that the player has zero points.
    pub fn is_unresolved(&self) -> bool {
        self.league_points == 0 && self.master_rating == 0 && self.character == UNKNOWN_CHARACTER
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinRateRecord {
    pub player_id: String,
    pub name: Option<String>,
    pub wins: u32,
    pub battles: u32,
    pub rate: f64,
    pub source_url: String,
    pub fetched_at: DateTime<Utc>,
}

impl WinRateRecord {
    pub fn is_unresolved(&self) -> bool {
        self.wins == 0 && self.battles == 0 && self.rate == 0.0
    }
}

/// One row of the upstream player search listing, in upstream order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub player_id: String,
    pub name: String,
    pub profile_url: String,
}

/// Which page region a screenshot request targets. Doubles as the cache
/// partition for image bytes so screenshot entries can never collide with
/// text records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenshotKind {
    Profile,
    WinRate,
    BattleLog,
    Search,
}

impl ScreenshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenshotKind::Profile => "profile",
            ScreenshotKind::WinRate => "winrate",
            ScreenshotKind::BattleLog => "battlelog",
            ScreenshotKind::Search => "search",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_rank() -> RankRecord {
        RankRecord {
            player_id: "1111111111".to_string(),
            name: None,
            character: UNKNOWN_CHARACTER.to_string(),
            league_tier: String::new(),
            league_points: 0,
            master_rating: 0,
            title: String::new(),
            source_url: String::new(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_all_sentinel_rank_is_unresolved() {
        assert!(empty_rank().is_unresolved());
    }

    #[test]
    fn test_any_real_field_resolves_rank() {
        let mut record = empty_rank();
        record.league_points = 12345;
        assert!(!record.is_unresolved());

        let mut record = empty_rank();
        record.character = "隆".to_string();
        assert!(!record.is_unresolved());

        let mut record = empty_rank();
        record.master_rating = 1500;
        assert!(!record.is_unresolved());
    }
}
