mod auth;
mod rank;
mod search;
mod winrate;

pub use auth::is_login_wall;
pub use rank::extract_rank;
pub use search::extract_search_results;
pub use winrate::extract_win_rate;

use regex::Regex;
use scraper::{Html, Selector};

/// Display-name candidates that are really page chrome in the locales we
/// scrape. Matched exactly, after trimming.
const NAME_DENYLIST: &[&str] = &[
    "CAPCOM",
    "STREET FIGHTER",
    "街头霸王",
    "街霸",
    "登录",
    "注册",
    "搜索",
    "排行榜",
    "对战记录",
    "个人资料",
];

/// Upstream ships versioned, hash-suffixed class names, so every DOM scan
/// matches on a stable class prefix via substring selectors. First selector
/// that yields non-empty text wins.
pub(crate) fn select_first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = doc.select(&selector).next() {
                let text = clean_text(&element.text().collect::<String>());
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

pub(crate) fn select_first_attr(doc: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = doc.select(&selector).next() {
                if let Some(value) = element.value().attr(attr) {
                    let value = clean_text(value);
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }
    }
    None
}

pub(crate) fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The upstream renderer splices HTML comments into the middle of numeric
/// text nodes, so raw-text strategies strip them before matching.
pub(crate) fn strip_comments(html: &str) -> String {
    match Regex::new(r"(?s)<!--.*?-->") {
        Ok(re) => re.replace_all(html, "").into_owned(),
        Err(_) => html.to_string(),
    }
}

pub(crate) fn strip_tags(html: &str) -> String {
    match Regex::new(r"<[^>]*>") {
        Ok(re) => re.replace_all(&strip_comments(html), "\n").into_owned(),
        Err(_) => html.to_string(),
    }
}

/// Parse a count out of text like `"12,345积分"`: drop comments and
/// thousands separators, then take the first digit run.
pub(crate) fn parse_count(raw: &str) -> Option<u32> {
    let cleaned = strip_comments(raw).replace(',', "");
    let re = Regex::new(r"\d+").ok()?;
    re.find(&cleaned)?.as_str().parse().ok()
}

pub(crate) fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = strip_comments(raw).replace(',', "");
    let re = Regex::new(r"\d+(?:\.\d+)?").ok()?;
    re.find(&cleaned)?.as_str().parse().ok()
}

/// Accepts a candidate display name: non-chrome, 2 to 20 characters, and
/// not a bare number (counts and ids bleed through text heuristics).
pub(crate) fn plausible_name(candidate: &str) -> bool {
    let candidate = candidate.trim();
    let len = candidate.chars().count();
    if len < 2 || len > 20 {
        return false;
    }
    if candidate.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    !NAME_DENYLIST.contains(&candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_strips_separators_and_units() {
        assert_eq!(parse_count("12,345积分"), Some(12345));
        assert_eq!(parse_count("  987  "), Some(987));
        assert_eq!(parse_count("no digits"), None);
    }

    #[test]
    fn test_parse_count_tolerates_embedded_comments() {
        assert_eq!(parse_count("1,2<!-- -->34"), Some(1234));
    }

    #[test]
    fn test_plausible_name_filters() {
        assert!(plausible_name("Daigo"));
        assert!(plausible_name("梅原"));
        assert!(!plausible_name("CAPCOM"));
        assert!(!plausible_name("X"));
        assert!(!plausible_name("123456789"));
        assert!(!plausible_name("a-name-way-longer-than-twenty-characters"));
    }

    #[test]
    fn test_strip_tags_keeps_visible_text() {
        let text = strip_tags("<div><span>hello</span><!-- hidden -->world</div>");
        assert!(text.contains("hello"));
        assert!(text.contains("world"));
        assert!(!text.contains("hidden"));
    }
}
