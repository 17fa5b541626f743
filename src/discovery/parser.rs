//! Sitemap document parsing
//!
//! A sitemap node is either an HTML page of links or an XML document:
//! - `<sitemapindex>`: every `<loc>` is a child sitemap
//! - `<urlset>`: every `<loc>` is a page link
//!
//! Links to `.xml` documents found on an HTML sitemap are child sitemaps too.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static LOC_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)<loc>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</loc>").ok());

/// What kind of document a sitemap node turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    Html,
    UrlSet,
    SitemapIndex,
}

/// Links found on one sitemap node
#[derive(Debug, Clone)]
pub struct SitemapDocument {
    pub kind: SitemapKind,

    /// Page links, absolute
    pub links: Vec<String>,

    /// Nested sitemap documents, absolute
    pub child_sitemaps: Vec<String>,
}

/// Parses a sitemap node
///
/// # Arguments
///
/// * `content` - The fetched document
/// * `base_url` - The document URL, for resolving relative links
pub fn parse_sitemap(content: &str, base_url: &Url) -> SitemapDocument {
    let head: String = content.trim_start().chars().take(512).collect();

    if content.contains("<sitemapindex") {
        return SitemapDocument {
            kind: SitemapKind::SitemapIndex,
            links: Vec::new(),
            child_sitemaps: extract_locs(content, base_url),
        };
    }
    if content.contains("<urlset") || head.starts_with("<?xml") {
        let (child_sitemaps, links) = extract_locs(content, base_url)
            .into_iter()
            .partition(|link| is_sitemap_document(link));
        return SitemapDocument {
            kind: SitemapKind::UrlSet,
            links,
            child_sitemaps,
        };
    }

    let (child_sitemaps, links) = extract_links(content, base_url)
        .into_iter()
        .partition(|link| is_sitemap_document(link));
    SitemapDocument {
        kind: SitemapKind::Html,
        links,
        child_sitemaps,
    }
}

fn is_sitemap_document(link: &str) -> bool {
    Url::parse(link)
        .map(|url| {
            let path = url.path().to_lowercase();
            path.ends_with(".xml") || path.ends_with(".xml.gz")
        })
        .unwrap_or(false)
}

/// `<loc>` entries of an XML sitemap
fn extract_locs(content: &str, base_url: &Url) -> Vec<String> {
    let Some(pattern) = LOC_PATTERN.as_ref() else {
        return Vec::new();
    };

    pattern
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
        .filter_map(|loc| resolve_link(&loc, base_url))
        .collect()
}

/// `<a href>` targets of an HTML page
fn extract_links(content: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(content);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link to an absolute HTTP(S) URL
///
/// Returns None for `javascript:`, `mailto:`, `tel:` and `data:` links,
/// same-page anchors, and anything that does not resolve.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
