use super::{parse_count, parse_decimal, plausible_name, select_first_text, strip_comments};
use crate::models::WinRateRecord;
use chrono::Utc;
use regex::Regex;
use scraper::Html;

/// Extract win/battle totals and the printed win percentage from a play
/// page. The rate is taken from the document at whatever precision it
/// prints, never recomputed from the totals.
pub fn extract_win_rate(html: &str, player_id: &str, source_url: &str) -> WinRateRecord {
    let doc = Html::parse_document(html);

    let name = select_first_text(&doc, &[r#"[class*="status_name"]"#])
        .filter(|candidate| plausible_name(candidate));

    let (wins, battles) = extract_totals(&doc, html).unwrap_or((0, 0));
    let rate = extract_rate(&doc, html).unwrap_or(0.0);

    // Upstream never reports more wins than battles; seeing that means we
    // paired digits from the wrong nodes, which is worthless data.
    let (wins, battles, rate) = if wins > battles {
        (0, 0, 0.0)
    } else {
        (wins, battles, rate)
    };

    WinRateRecord {
        player_id: player_id.to_string(),
        name,
        wins,
        battles,
        rate,
        source_url: source_url.to_string(),
        fetched_at: Utc::now(),
    }
}

fn extract_totals(doc: &Html, html: &str) -> Option<(u32, u32)> {
    // Record block first; scraper's text() already skips the HTML comments
    // upstream splices into these numbers.
    if let Some(text) =
        select_first_text(doc, &[r#"[class*="battle_record"]"#, r#"[class*="play_record"]"#])
    {
        if let Some(pair) = parse_totals_text(&text) {
            return Some(pair);
        }
    }

    parse_totals_text(&strip_comments(html))
}

fn parse_totals_text(text: &str) -> Option<(u32, u32)> {
    let re = Regex::new(r"([\d,]+)\s*胜\s*对战\s*[：:]\s*([\d,]+)").ok()?;
    let caps = re.captures(text)?;
    let wins = parse_count(&caps[1])?;
    let battles = parse_count(&caps[2])?;
    Some((wins, battles))
}

fn extract_rate(doc: &Html, html: &str) -> Option<f64> {
    if let Some(text) = select_first_text(doc, &[r#"[class*="winning_rate"]"#]) {
        if let Some(rate) = parse_decimal(&text) {
            return Some(rate);
        }
    }

    let re = Regex::new(r">\s*([\d.]+)\s*</span>\s*%").ok()?;
    let stripped = strip_comments(html);
    let caps = re.captures(&stripped)?;
    caps[1].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAY_PAGE: &str = r#"<html><body>
        <span class="status_name_q1">Daigo</span>
        <div class="battle_record_w2">37胜对战：54</div>
        <div class="winning_rate_e3"><span>68.51</span>%</div>
        </body></html>"#;

    #[test]
    fn test_play_page_extraction() {
        let record = extract_win_rate(PLAY_PAGE, "3425126856", "u");
        assert_eq!(record.wins, 37);
        assert_eq!(record.battles, 54);
        assert_eq!(record.rate, 68.51);
        assert_eq!(record.name.as_deref(), Some("Daigo"));
        assert!(record.wins <= record.battles);
        assert!(!record.is_unresolved());
    }

    #[test]
    fn test_totals_tolerate_embedded_comments() {
        let html = r#"<div>1,0<!-- -->37胜对战：<!-- c -->2,054</div>"#;
        let record = extract_win_rate(html, "1", "u");
        assert_eq!(record.wins, 1037);
        assert_eq!(record.battles, 2054);
    }

    #[test]
    fn test_rate_keeps_printed_precision() {
        let html = r#"<div class="winning_rate_z"><span>50.0</span>%</div>
                      <div class="battle_record_z">1胜对战：2</div>"#;
        let record = extract_win_rate(html, "1", "u");
        assert_eq!(record.rate, 50.0);
    }

    #[test]
    fn test_impossible_totals_degrade_to_sentinels() {
        let html = r#"<div class="battle_record_z">54胜对战：37</div>"#;
        let record = extract_win_rate(html, "1", "u");
        assert!(record.is_unresolved());
    }

    #[test]
    fn test_empty_page_is_unresolved() {
        let record = extract_win_rate("<html><body></body></html>", "1", "u");
        assert!(record.is_unresolved());
    }
}
