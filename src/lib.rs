//! Catalog-Harvest: a two-phase product catalog harvester
//!
//! This crate discovers every product page of a JavaScript-heavy storefront
//! (sitemap walk, fallback category hubs, "load more" pagination) and turns
//! each product page into a validated structured record.

pub mod concurrency;
pub mod config;
pub mod discovery;
pub mod extraction;
pub mod fetch;
pub mod model;
pub mod output;
pub mod pagination;
pub mod retry;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for run-level failures
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("No category URLs could be discovered: sitemap unreachable and no fallback hubs configured")]
    NoSeeds,

    #[error("Input URL list {path} contains no URLs")]
    EmptyInput { path: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern in config: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Fetch-layer errors
///
/// Timeouts, connection failures, 5xx and 429 responses are transient and
/// may be retried by the caller. Everything else is terminal for the URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{tier} fetch timed out for {url}")]
    Timeout { url: String, tier: fetch::Tier },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDenied { url: String },

    #[error("Browser error for {url}: {message}")]
    Browser { url: String, message: String },

    #[error("Rendered fetch requested for {url} but no renderer is available")]
    RendererUnavailable { url: String },

    #[error("Run cancelled before {url} was fetched")]
    Cancelled { url: String },
}

impl FetchError {
    /// Returns true if retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::Browser { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::RobotsDenied { .. }
            | Self::RendererUnavailable { .. }
            | Self::Cancelled { .. } => false,
        }
    }

    /// The URL the failed request was for
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. }
            | Self::Network { url, .. }
            | Self::Http { url, .. }
            | Self::RobotsDenied { url }
            | Self::Browser { url, .. }
            | Self::RendererUnavailable { url }
            | Self::Cancelled { url } => url,
        }
    }
}

/// Result type alias for run-level operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{DiscoveredUrl, DiscoverySource, FailureRecord, Phase, ProductRecord};
pub use url::{normalize_url, LinkClass, SiteRules};
