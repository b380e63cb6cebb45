//! URL comparison ignoring fragment and trailing slash

use url::Url;

/// Canonical form used to compare the current page with a requested URL.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => raw
            .split('#')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string(),
    }
}

pub fn same_page(a: &str, b: &str) -> bool {
    normalize_url(a) == normalize_url(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_and_trailing_slash_are_ignored() {
        assert!(same_page("https://shop.test/cart/", "https://shop.test/cart#top"));
        assert!(same_page("https://shop.test", "https://shop.test/"));
        assert!(same_page("HTTPS://Shop.Test/a", "https://shop.test/a"));
        assert!(!same_page("https://shop.test/a?x=1", "https://shop.test/a?x=2"));
        assert!(!same_page("https://shop.test/a", "https://shop.test/b"));
    }

    #[test]
    fn unparseable_urls_use_string_rules() {
        assert_eq!(normalize_url("/relative/path/#frag"), "/relative/path");
        assert_eq!(normalize_url("about:blank"), "about:blank");
    }
}
