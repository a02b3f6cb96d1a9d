use super::{
    clean_text, parse_count, plausible_name, select_first_attr, select_first_text, strip_comments,
    strip_tags,
};
use crate::models::{RankRecord, UNKNOWN_CHARACTER};
use chrono::Utc;
use regex::Regex;
use scraper::Html;

/// Extract a rank standing from a profile page. Pure: bad markup degrades
/// fields to their sentinels, it never errors. Whether the result is usable
/// is the caller's call, via `RankRecord::is_unresolved`.
pub fn extract_rank(html: &str, player_id: &str, source_url: &str) -> RankRecord {
    let doc = Html::parse_document(html);

    RankRecord {
        player_id: player_id.to_string(),
        name: extract_name(&doc, html),
        character: extract_character(&doc, html),
        league_tier: extract_league_tier(&doc, html),
        league_points: extract_league_points(&doc, html),
        master_rating: extract_master_rating(&doc, html),
        title: extract_title(&doc, html),
        source_url: source_url.to_string(),
        fetched_at: Utc::now(),
    }
}

fn extract_name(doc: &Html, html: &str) -> Option<String> {
    // Hashed status-name class, current markup.
    if let Some(name) = select_first_text(doc, &[r#"[class*="status_name"]"#]) {
        if plausible_name(&name) {
            return Some(name);
        }
    }

    // og:title meta survived the last two markup revisions.
    if let Ok(re) = Regex::new(r#"<meta[^>]+property="og:title"[^>]+content="([^"]+)""#) {
        if let Some(caps) = re.captures(html) {
            let candidate = caps[1].split(['|', '｜']).next().unwrap_or("").trim().to_string();
            if plausible_name(&candidate) {
                return Some(candidate);
            }
        }
    }

    // Last resort: first plausible token of the visible text.
    strip_tags(html)
        .lines()
        .map(str::trim)
        .find(|line| plausible_name(line))
        .map(|line| line.to_string())
}

fn extract_character(doc: &Html, html: &str) -> String {
    if let Some(character) =
        select_first_text(doc, &[r#"[class*="character_name"]"#, r#"[class*="favorite_character"]"#])
    {
        return character;
    }

    if let Ok(re) = Regex::new(r#"<img[^>]+class="[^"]*character[^"]*"[^>]+alt="([^"]+)""#) {
        if let Some(caps) = re.captures(html) {
            return clean_text(&caps[1]);
        }
    }

    if let Ok(re) = Regex::new(r"使用角色[：:]\s*([^<\s]{1,20})") {
        if let Some(caps) = re.captures(&strip_comments(html)) {
            return clean_text(&caps[1]);
        }
    }

    UNKNOWN_CHARACTER.to_string()
}

// Tier label lives in the alt text of the league badge image.
fn extract_league_tier(doc: &Html, html: &str) -> String {
    if let Some(alt) = select_first_attr(
        doc,
        &[r#"[class*="league_info"] img"#, r#"[class*="league_rank"] img"#],
        "alt",
    ) {
        return alt;
    }

    if let Ok(re) = Regex::new(r#"<img[^>]+class="[^"]*league[^"]*"[^>]+alt="([^"]+)""#) {
        if let Some(caps) = re.captures(html) {
            return clean_text(&caps[1]);
        }
    }

    String::new()
}

fn extract_league_points(doc: &Html, html: &str) -> u32 {
    if let Some(text) = select_first_text(doc, &[r#"[class*="league_point"]"#]) {
        if let Some(points) = parse_count(&text) {
            return points;
        }
    }

    if let Ok(re) = Regex::new(r#"league_point[^>]*>([^<]*\d[^<]*)<"#) {
        if let Some(caps) = re.captures(&strip_comments(html)) {
            if let Some(points) = parse_count(&caps[1]) {
                return points;
            }
        }
    }

    // Plain-text fallback keyed on the points unit glyph.
    if let Ok(re) = Regex::new(r"([\d,]+)\s*积分") {
        if let Some(caps) = re.captures(&strip_comments(html)) {
            if let Some(points) = parse_count(&caps[1]) {
                return points;
            }
        }
    }

    0
}

fn extract_master_rating(doc: &Html, html: &str) -> u32 {
    if let Some(text) = select_first_text(doc, &[r#"[class*="master_rating"]"#]) {
        if let Some(rating) = parse_count(&text) {
            return rating;
        }
    }

    if let Ok(re) = Regex::new(r#"master_rat(?:ing|e)[^>]*>([^<]*\d[^<]*)<"#) {
        if let Some(caps) = re.captures(&strip_comments(html)) {
            if let Some(rating) = parse_count(&caps[1]) {
                return rating;
            }
        }
    }

    if let Ok(re) = Regex::new(r"MR\s*[：:]?\s*([\d,]+)") {
        if let Some(caps) = re.captures(&strip_comments(html)) {
            if let Some(rating) = parse_count(&caps[1]) {
                return rating;
            }
        }
    }

    0
}

fn extract_title(doc: &Html, html: &str) -> String {
    if let Some(title) =
        select_first_text(doc, &[r#"[class*="title_text"]"#, r#"[class*="fighter_title"]"#])
    {
        return title;
    }

    if let Ok(re) = Regex::new(r"称号[：:]\s*([^<\n]{1,30})") {
        if let Some(caps) = re.captures(&strip_tags(html)) {
            return clean_text(&caps[1]);
        }
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PROFILE: &str = r#"<html><body>
        <div class="fighter_banner_k3j">
          <span class="status_name_a1b2">Daigo</span>
          <div class="league_info_x7"><img src="/master.png" alt="大师"></div>
          <p class="league_point_c3d4">25,<!-- -->000积分</p>
          <p class="master_rating_e5f6">1,847</p>
          <span class="character_name_g7h8">隆</span>
          <span class="title_text_i9j0">无敌的演武者</span>
        </div>
        </body></html>"#;

    #[test]
    fn test_full_profile_extraction() {
        let record = extract_rank(FULL_PROFILE, "3425126856", "https://example/profile/3425126856");
        assert_eq!(record.player_id, "3425126856");
        assert_eq!(record.name.as_deref(), Some("Daigo"));
        assert_eq!(record.character, "隆");
        assert_eq!(record.league_tier, "大师");
        assert_eq!(record.league_points, 25000);
        assert_eq!(record.master_rating, 1847);
        assert_eq!(record.title, "无敌的演武者");
        assert!(!record.is_unresolved());
    }

    #[test]
    fn test_name_falls_back_to_og_title() {
        let html = r#"<html><head>
            <meta property="og:title" content="Tokido | STREET FIGHTER 6">
            </head><body><div class="league_point_z">100积分</div></body></html>"#;
        let record = extract_rank(html, "1", "u");
        assert_eq!(record.name.as_deref(), Some("Tokido"));
    }

    #[test]
    fn test_denylisted_secondary_falls_through_to_text_heuristic() {
        let html = r#"<html><head>
            <meta property="og:title" content="CAPCOM">
            </head><body><p>Fuudo</p><div class="league_point_z">100积分</div></body></html>"#;
        let record = extract_rank(html, "1", "u");
        assert_eq!(record.name.as_deref(), Some("Fuudo"));
    }

    #[test]
    fn test_points_from_plain_text_unit_glyph() {
        let html = r#"<html><body><p>当前段位积分 12,345积分</p></body></html>"#;
        let record = extract_rank(html, "1", "u");
        assert_eq!(record.league_points, 12345);
    }

    #[test]
    fn test_absent_fields_mean_unresolved() {
        let html = r#"<html><body><div class="totally_unrelated">hello</div></body></html>"#;
        let record = extract_rank(html, "1", "u");
        assert_eq!(record.league_points, 0);
        assert_eq!(record.master_rating, 0);
        assert_eq!(record.character, UNKNOWN_CHARACTER);
        assert!(record.is_unresolved());
    }
}
