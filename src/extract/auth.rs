/// Class prefixes that only render for an authenticated session. Any hit
/// settles the question: the page has real content, whatever else it says.
const CONTENT_MARKERS: &[&str] = &[
    "league_point",
    "status_name",
    "fighter_banner",
    "battlelog_list",
    "fighterslist",
    "winning_rate",
];

const LOGIN_VOCABULARY: &[&str] = &["登录", "登入", "ログイン", "sign in", "log in", "login"];

const LOGIN_AFFORDANCES: &[&str] = &[
    r#"type="password""#,
    r#"type='password'"#,
    r#"name="password""#,
    "login_form",
    "loginform",
    "login-form",
    "btn_login",
    "auth-button",
];

/// Classify raw HTML as a login wall.
///
/// Login vocabulary alone is not enough: authenticated pages carry "登录"
/// in their navigation chrome too. A page is only a wall when it both talks
/// about logging in AND offers something to log in with, and never when an
/// authenticated-content marker is present.
pub fn is_login_wall(html: &str) -> bool {
    if CONTENT_MARKERS.iter().any(|marker| html.contains(marker)) {
        return false;
    }

    let lowered = html.to_lowercase();
    let has_vocabulary = LOGIN_VOCABULARY
        .iter()
        .any(|word| lowered.contains(&word.to_lowercase()));
    let has_affordance = LOGIN_AFFORDANCES
        .iter()
        .any(|marker| lowered.contains(marker));

    has_vocabulary && has_affordance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_requires_both_signals() {
        let wall = r#"<html><body><h1>登录</h1>
            <form class="login_form"><input type="password" name="password"></form>
            </body></html>"#;
        assert!(is_login_wall(wall));
    }

    #[test]
    fn test_vocabulary_alone_is_not_a_wall() {
        let nav_chrome = r#"<html><body><nav><a href="/auth">登录</a></nav>
            <div>some public landing page</div></body></html>"#;
        assert!(!is_login_wall(nav_chrome));
    }

    #[test]
    fn test_affordance_alone_is_not_a_wall() {
        let html = r#"<form><input type="password"></form>"#;
        assert!(!is_login_wall(html));
    }

    #[test]
    fn test_content_marker_overrides_login_signals() {
        let html = r#"<html><body><nav><a>登录</a></nav>
            <form class="login_form"><input type="password"></form>
            <div class="league_point_a1b2">12,345</div></body></html>"#;
        assert!(!is_login_wall(html));
    }

    #[test]
    fn test_plain_content_page() {
        let html = r#"<div class="status_name_x9">Daigo</div>"#;
        assert!(!is_login_wall(html));
    }
}
