//! Link classification against the storefront's URL layout
//!
//! A link is first resolved against the page it was found on, normalized and
//! aligned to the site origin. It is then classified by these rules, in order:
//!
//! 1. off-domain, wrong locale, or excluded section → `Irrelevant`
//! 2. product-slug last segment under a known top-level category → `Product`
//! 3. category root, `all-*` hub, or second-level listing → `Category`
//! 4. anything else → `Irrelevant`

use crate::config::SiteConfig;
use crate::url::{matches_wildcard, normalize_url};
use crate::ConfigError;
use regex::Regex;
use serde::Serialize;
use url::Url;

/// What a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkClass {
    Category,
    Product,
    Irrelevant,
}

/// Compiled URL rules for one storefront
#[derive(Debug, Clone)]
pub struct SiteRules {
    origin: Url,
    domain: String,
    locale_segments: Vec<String>,
    excluded_sections: Vec<String>,
    listing_exclusions: Vec<String>,
    categories: Vec<String>,
    product_patterns: Vec<Regex>,
}

impl SiteRules {
    /// Builds the rule table from the site configuration
    pub fn from_config(site: &SiteConfig) -> Result<Self, ConfigError> {
        let origin = Url::parse(&site.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

        let product_patterns = site
            .product_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            origin,
            domain: site.domain.to_lowercase(),
            locale_segments: split_segments(&site.locale_prefix),
            excluded_sections: lowercase_all(&site.excluded_sections),
            listing_exclusions: lowercase_all(&site.listing_exclusions),
            categories: site.categories.iter().map(|c| c.name.to_lowercase()).collect(),
            product_patterns,
        })
    }

    /// Resolves, normalizes and origin-aligns a link
    ///
    /// Returns `None` for unparseable, non-HTTP(S) and off-domain links.
    /// In-scope links get the origin's scheme, host and port so that
    /// `http://samsung.com/x` and `https://www.samsung.com/x/` share one key.
    pub fn canonicalize(&self, raw_link: &str, origin_page: Option<&Url>) -> Option<Url> {
        let raw_link = raw_link.trim();
        if raw_link.is_empty()
            || raw_link.starts_with('#')
            || raw_link.starts_with("javascript:")
            || raw_link.starts_with("mailto:")
            || raw_link.starts_with("tel:")
        {
            return None;
        }

        let absolute = match origin_page {
            Some(base) => base.join(raw_link).ok()?,
            None => Url::parse(raw_link).ok()?,
        };
        let mut url = normalize_url(absolute.as_str()).ok()?;

        let host = url.host_str()?.to_string();
        if !matches_wildcard(&self.domain, &host) {
            return None;
        }

        url.set_scheme(self.origin.scheme()).ok()?;
        url.set_host(self.origin.host_str()).ok()?;
        url.set_port(self.origin.port()).ok()?;
        Some(url)
    }

    /// Classifies a raw link found on `origin_page`
    ///
    /// Pure and deterministic: the same inputs always yield the same class.
    pub fn classify(&self, raw_link: &str, origin_page: &str) -> LinkClass {
        let base = Url::parse(origin_page).ok();
        match self.canonicalize(raw_link, base.as_ref()) {
            Some(url) => self.classify_url(&url),
            None => LinkClass::Irrelevant,
        }
    }

    /// Classifies an already canonical URL
    pub fn classify_url(&self, url: &Url) -> LinkClass {
        let Some(rest) = self.section_segments(url) else {
            return LinkClass::Irrelevant;
        };
        let Some(section) = rest.first() else {
            return LinkClass::Irrelevant;
        };

        if self.excluded_sections.iter().any(|s| s == section) {
            return LinkClass::Irrelevant;
        }
        if !self.categories.iter().any(|c| c == section) {
            return LinkClass::Irrelevant;
        }

        let last = rest[rest.len() - 1].as_str();

        if rest.len() >= 2 && self.is_product_slug(last) {
            return LinkClass::Product;
        }

        if rest.len() == 1 || last.starts_with("all-") {
            return LinkClass::Category;
        }
        if rest.len() == 2 && !self.is_listing_excluded(last) {
            return LinkClass::Category;
        }

        LinkClass::Irrelevant
    }

    /// Category and sub-category derived from the URL path
    pub fn category_of(&self, url: &Url) -> (Option<String>, Option<String>) {
        let Some(rest) = self.section_segments(url) else {
            return (None, None);
        };
        let category = rest.first().cloned();

        let sub_candidate = match self.classify_url(url) {
            LinkClass::Product if rest.len() > 2 => rest.get(1),
            LinkClass::Category if rest.len() >= 2 => rest.get(1),
            _ => None,
        };
        let sub_category = sub_candidate
            .filter(|s| !s.starts_with("all-") && !self.is_listing_excluded(s))
            .cloned();

        (category, sub_category)
    }

    /// Names of the configured top-level categories
    pub fn category_names(&self) -> &[String] {
        &self.categories
    }

    /// The origin every in-scope link is aligned to
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Lowercase path segments after the locale prefix, or `None` when the
    /// URL is not under the locale
    fn section_segments(&self, url: &Url) -> Option<Vec<String>> {
        let segments = split_segments(url.path());
        if segments.len() < self.locale_segments.len()
            || segments[..self.locale_segments.len()] != self.locale_segments[..]
        {
            return None;
        }
        Some(segments[self.locale_segments.len()..].to_vec())
    }

    fn is_product_slug(&self, segment: &str) -> bool {
        !segment.starts_with("all-")
            && !self.is_listing_excluded(segment)
            && self.product_patterns.iter().any(|p| p.is_match(segment))
    }

    fn is_listing_excluded(&self, segment: &str) -> bool {
        self.listing_exclusions.iter().any(|excl| {
            if excl.ends_with('-') {
                segment.starts_with(excl.as_str())
            } else {
                segment == excl
            }
        })
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}
