use super::{clean_text, plausible_name};
use crate::models::SearchResult;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// Extract a player-search result listing.
///
/// Two independent strategies run over the same document: a structured
/// scan of the results list container, and — only when that yields
/// nothing — a flat positional pairing of every profile link with every
/// name span in document order. The flat strategy silently misaligns when
/// upstream emits a link without its name (or vice versa); it is kept
/// because real search pages have shipped without the list container.
pub fn extract_search_results(html: &str, base_url: &str) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);

    let mut results = structured_scan(&doc, base_url);
    if results.is_empty() {
        debug!("Structured search scan found nothing, trying flat link/name pairing");
        results = flat_pair_scan(&doc, base_url);
    }

    dedup_by_id(results)
}

fn structured_scan(doc: &Html, base_url: &str) -> Vec<SearchResult> {
    let mut results = Vec::new();

    let Ok(item_selector) = Selector::parse(r#"[class*="fighterslist"] li"#) else {
        return results;
    };
    let Ok(link_selector) = Selector::parse(r#"a[href*="/profile/"]"#) else {
        return results;
    };

    for item in doc.select(&item_selector) {
        let Some(link) = item.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        let name = select_item_name(&item).unwrap_or_else(|| clean_text(&link.text().collect::<String>()));
        let Some(player_id) = id_from_href(href) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        results.push(SearchResult {
            player_id,
            name,
            profile_url: absolutize(base_url, href),
        });
    }

    results
}

fn select_item_name(item: &scraper::ElementRef) -> Option<String> {
    for selector_str in [r#"[class*="fighter_name"]"#, r#"[class*="name"]"#, "span"] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = item.select(&selector).next() {
                let text = clean_text(&element.text().collect::<String>());
                if plausible_name(&text) {
                    return Some(text);
                }
            }
        }
    }
    None
}

// Positional fallback: all profile links zipped against all name-class
// spans, both in document order.
fn flat_pair_scan(doc: &Html, base_url: &str) -> Vec<SearchResult> {
    let Ok(link_selector) = Selector::parse(r#"a[href*="/profile/"]"#) else {
        return Vec::new();
    };
    let Ok(name_selector) = Selector::parse(r#"span[class*="name"]"#) else {
        return Vec::new();
    };

    let hrefs: Vec<&str> = doc
        .select(&link_selector)
        .filter_map(|link| link.value().attr("href"))
        .collect();
    let names: Vec<String> = doc
        .select(&name_selector)
        .map(|span| clean_text(&span.text().collect::<String>()))
        .collect();

    if hrefs.len() != names.len() {
        debug!(
            "Flat search pairing counts diverge ({} links, {} names); results may misalign",
            hrefs.len(),
            names.len()
        );
    }

    hrefs
        .into_iter()
        .zip(names)
        .filter_map(|(href, name)| {
            let player_id = id_from_href(href)?;
            if name.is_empty() {
                return None;
            }
            Some(SearchResult {
                player_id,
                name,
                profile_url: absolutize(base_url, href),
            })
        })
        .collect()
}

fn dedup_by_id(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|result| seen.insert(result.player_id.clone()))
        .collect()
}

/// Profile ids are the last path segment: `/6/buckler/zh-hans/profile/123`.
fn id_from_href(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next()?;
    let id = path.trim_end_matches('/').rsplit('/').next()?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(id.to_string())
}

fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match url::Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}
