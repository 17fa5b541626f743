/// Checks if a host matches a wildcard pattern
///
/// 1. Exact match: "samsung.com" matches only "samsung.com"
/// 2. Wildcard match: "*.samsung.com" matches "samsung.com" and any subdomain
///    ("www.samsung.com", "images.samsung.com")
///
/// Both arguments are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use catalog_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.samsung.com", "www.samsung.com"));
/// assert!(matches_wildcard("*.samsung.com", "samsung.com"));
/// assert!(!matches_wildcard("*.samsung.com", "notsamsung.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base
            || candidate
                .strip_suffix(base)
                .is_some_and(|prefix| prefix.ends_with('.'))
    } else {
        candidate == pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("shop.example.com", "shop.example.com"));
        assert!(!matches_wildcard("shop.example.com", "example.com"));
        assert!(!matches_wildcard("example.com", "shop.example.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_subdomains() {
        assert!(matches_wildcard("*.samsung.com", "samsung.com"));
        assert!(matches_wildcard("*.samsung.com", "www.samsung.com"));
        assert!(matches_wildcard("*.samsung.com", "images.eu.samsung.com"));
    }

    #[test]
    fn test_wildcard_rejects_lookalikes() {
        assert!(!matches_wildcard("*.samsung.com", "mysamsung.com"));
        assert!(!matches_wildcard("*.samsung.com", "samsung.com.evil.org"));
        assert!(!matches_wildcard("*.samsung.com", "samsung.co.uk"));
    }

    #[test]
    fn test_empty_candidate() {
        assert!(!matches_wildcard("*.samsung.com", ""));
        assert!(!matches_wildcard("samsung.com", ""));
    }
}
