use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_harvest::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Samsung.com/uk/").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.samsung.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Host key used for per-host admission and rate limiting
///
/// Unparseable input falls back to the raw string so that it still gets a
/// (single, shared) admission slot instead of bypassing the limits.
pub fn host_key(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| extract_domain(&u))
        .unwrap_or_else(|| url.to_string())
}
