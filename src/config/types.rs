use serde::Deserialize;

/// Main configuration structure for Catalog-Harvest
///
/// Every section falls back to defaults targeting the Samsung UK storefront,
/// so an empty file (or no file at all) yields a runnable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub fetch: FetchConfig,
    pub concurrency: ConcurrencyConfig,
    pub pagination: PaginationConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
}

/// Description of the target storefront and its URL layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Scheme and host every in-scope link is canonicalized to
    pub base_url: String,

    /// Host pattern for in-scope links (e.g., "*.samsung.com")
    pub domain: String,

    /// Path prefix of the target locale (e.g., "/uk/")
    pub locale_prefix: String,

    /// Root of the sitemap tree (HTML or XML)
    pub sitemap_url: String,

    /// Maximum BFS depth below the sitemap root
    pub sitemap_max_depth: u32,

    /// First path segments (after the locale) that are never in scope
    pub excluded_sections: Vec<String>,

    /// Segments that mark marketing or checkout pages rather than listings or products
    pub listing_exclusions: Vec<String>,

    /// Regexes matched against the last path segment of a product page
    pub product_patterns: Vec<String>,

    /// Known top-level categories with their fallback hubs
    pub categories: Vec<CategoryEntry>,

    /// Site-specific "reveal more products" control selector
    pub reveal_selector: String,

    /// Class fragments marking a product-listing container
    pub listing_container_hints: Vec<String>,

    /// Class fragments marking a filter/facet container
    pub filter_container_hints: Vec<String>,

    /// Lowercase label fragments of a generic "load more" control
    pub reveal_texts: Vec<String>,

    /// Brand recorded when the page does not name one
    pub brand: String,

    /// Currency assumed when the page does not state one
    pub default_currency: String,

    /// ISO currency codes accepted by validation
    pub known_currencies: Vec<String>,
}

/// A top-level catalog section
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CategoryEntry {
    /// First path segment after the locale (e.g., "smartphones")
    pub name: String,

    /// "All products in this category" hub used when the sitemap misses the section
    #[serde(default)]
    pub fallback_hub: Option<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Fetch-layer behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Timeout for a single static retrieval (milliseconds)
    pub static_timeout_ms: u64,

    /// Timeout for a rendered navigation (milliseconds)
    pub render_timeout_ms: u64,

    /// Quiet window waited after navigation and after each reveal (milliseconds)
    pub settle_ms: u64,

    /// Whether the browser tier may be used at all
    pub rendering: bool,

    /// Maximum number of browser pages open at once
    pub browser_slots: usize,

    /// Honor robots.txt allow rules and crawl-delay
    pub respect_robots: bool,
}

/// Admission limits applied to every fetch
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConcurrencyConfig {
    /// Run-wide in-flight fetch limit (N)
    pub max_concurrent: usize,

    /// In-flight fetch limit per host (M, never above N)
    pub per_host: usize,

    /// Minimum delay between requests to one host (milliseconds)
    pub crawl_delay_ms: u64,

    /// Upper bound of the random delay added to each request slot (milliseconds)
    pub jitter_ms: u64,
}

/// Pagination resolver limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PaginationConfig {
    /// Ceiling on reveal attempts per listing
    pub max_attempts: u32,

    /// Consecutive attempts without growth before a listing is exhausted
    pub no_growth_limit: u32,

    /// Retries of a single reveal attempt on transient failure
    pub load_retries: u32,
}

/// Backoff used for retried operations
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub factor: f64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

/// Output artifact locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory every artifact is written to
    pub directory: String,

    /// Newline-delimited validated product URLs (the phase hand-off)
    pub product_urls: String,

    /// Per-URL discovery metadata (JSON)
    pub url_metadata: String,

    /// Listing URLs that could not be resolved
    pub failed_listings: String,

    /// Extracted product records (NDJSON)
    pub records: String,

    /// Product URLs that were quarantined
    pub failed_urls: String,

    /// Failure ledger shared by both phases (NDJSON)
    pub failure_ledger: String,
}

const BASE_URL: &str = "https://www.samsung.com";

fn hub(category: &str) -> String {
    format!("{}/uk/{}/all-{}/", BASE_URL, category, category)
}

impl Default for SiteConfig {
    fn default() -> Self {
        let categories = [
            "smartphones",
            "tablets",
            "watches",
            "tvs",
            "monitors",
            "audio-sound",
            "refrigerators",
            "washers-and-dryers",
            "vacuum-cleaners",
            "dishwashers",
            "microwave-ovens",
            "computers",
            "projectors",
        ]
        .iter()
        .map(|name| CategoryEntry {
            name: name.to_string(),
            fallback_hub: Some(hub(name)),
        })
        .collect();

        Self {
            base_url: BASE_URL.to_string(),
            domain: "*.samsung.com".to_string(),
            locale_prefix: "/uk/".to_string(),
            sitemap_url: format!("{}/uk/info/sitemap/", BASE_URL),
            sitemap_max_depth: 2,
            excluded_sections: [
                "info",
                "support",
                "business",
                "offer",
                "estore",
                "legal",
                "privacy",
                "sustainability",
                "mypage",
                "members",
                "account",
                "login",
                "register",
                "cart",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            listing_exclusions: [
                "buy",
                "compare",
                "learn",
                "buying-guide",
                "highlights",
                "help-me-choose",
                "why-",
                "accessories",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            product_patterns: vec![
                r"(^|-)sm-[a-z0-9]{5,}$".to_string(),
                r"(^|-)[a-z]{2}\d{2}[a-z0-9]{5,}$".to_string(),
                r"(^|-)hw-[a-z0-9]+(-[a-z]{2})?$".to_string(),
                r"(^|-)np\d{3}[a-z0-9]+(-[a-z0-9]+)?$".to_string(),
                r"-[a-z]{2}-[a-z0-9]{10,}$".to_string(),
            ],
            categories,
            reveal_selector: ".pd19-product-finder__view-more-btn".to_string(),
            listing_container_hints: [
                "product-finder",
                "product-list",
                "products",
                "product-card",
                "listing",
                "grid",
                "result",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            filter_container_hints: ["filter", "facet", "sidebar", "nav", "menu"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            reveal_texts: ["load more", "view more", "show more", "see more"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            brand: "Samsung".to_string(),
            default_currency: "GBP".to_string(),
            known_currencies: ["GBP", "EUR", "USD"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "CatalogHarvest".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "scraper@example.com".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            static_timeout_ms: 30_000,
            render_timeout_ms: 45_000,
            settle_ms: 3_000,
            rendering: true,
            browser_slots: 2,
            respect_robots: true,
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            per_host: 4,
            crawl_delay_ms: 500,
            jitter_ms: 250,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            no_growth_limit: 2,
            load_retries: 2,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            factor: 2.0,
            max_delay_ms: 8_000,
            jitter_ms: 500,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            product_urls: "product_urls.txt".to_string(),
            url_metadata: "url_metadata.json".to_string(),
            failed_listings: "failed_listing_urls.txt".to_string(),
            records: "products.ndjson".to_string(),
            failed_urls: "failed_urls.txt".to_string(),
            failure_ledger: "failures.ndjson".to_string(),
        }
    }
}

impl OutputConfig {
    /// Resolves an artifact file name against the output directory
    pub fn path_of(&self, file_name: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.directory).join(file_name)
    }
}
