use crate::config::types::{
    ConcurrencyConfig, Config, FetchConfig, OutputConfig, PaginationConfig, RetryConfig,
    SiteConfig, UserAgentConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(&config.fetch)?;
    validate_concurrency_config(&config.concurrency)?;
    validate_pagination_config(&config.pagination)?;
    validate_retry_config(&config.retry)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the site description
fn validate_site_config(site: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&site.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;
    if base.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            site.base_url
        )));
    }

    validate_domain_pattern(&site.domain)?;

    if !site.locale_prefix.starts_with('/') || !site.locale_prefix.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "locale-prefix must start and end with '/', got '{}'",
            site.locale_prefix
        )));
    }

    Url::parse(&site.sitemap_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid sitemap-url: {}", e)))?;

    for pattern in &site.product_patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("product pattern '{}': {}", pattern, e))
        })?;
    }

    for entry in &site.categories {
        if entry.name.is_empty() || entry.name.contains('/') {
            return Err(ConfigError::Validation(format!(
                "category name must be a single non-empty path segment, got '{}'",
                entry.name
            )));
        }
        if let Some(hub) = &entry.fallback_hub {
            Url::parse(hub).map_err(|e| {
                ConfigError::InvalidUrl(format!(
                    "Invalid fallback hub for '{}': {}",
                    entry.name, e
                ))
            })?;
        }
    }

    if site.default_currency.is_empty()
        || !site
            .known_currencies
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&site.default_currency))
    {
        return Err(ConfigError::Validation(format!(
            "default-currency '{}' must be one of the known currencies",
            site.default_currency
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.static_timeout_ms == 0 || config.render_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "fetch timeouts must be greater than zero".to_string(),
        ));
    }
    if config.rendering && config.browser_slots == 0 {
        return Err(ConfigError::Validation(
            "browser-slots must be >= 1 when rendering is enabled".to_string(),
        ));
    }
    Ok(())
}

fn validate_concurrency_config(config: &ConcurrencyConfig) -> Result<(), ConfigError> {
    if config.max_concurrent < 1 || config.max_concurrent > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent must be between 1 and 100, got {}",
            config.max_concurrent
        )));
    }

    if config.per_host < 1 || config.per_host > config.max_concurrent {
        return Err(ConfigError::Validation(format!(
            "per-host must be between 1 and max-concurrent ({}), got {}",
            config.max_concurrent, config.per_host
        )));
    }

    Ok(())
}

fn validate_pagination_config(config: &PaginationConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 100 {
        return Err(ConfigError::Validation(format!(
            "pagination max-attempts must be between 1 and 100, got {}",
            config.max_attempts
        )));
    }
    if config.no_growth_limit < 1 {
        return Err(ConfigError::Validation(
            "no-growth-limit must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "retry max-attempts must be >= 1".to_string(),
        ));
    }
    if !config.factor.is_finite() || config.factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "retry factor must be >= 1.0, got {}",
            config.factor
        )));
    }
    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry base-delay-ms ({}) exceeds max-delay-ms ({})",
            config.base_delay_ms, config.max_delay_ms
        )));
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (key, value) in [
        ("directory", &config.directory),
        ("product-urls", &config.product_urls),
        ("url-metadata", &config.url_metadata),
        ("failed-listings", &config.failed_listings),
        ("records", &config.records),
        ("failed-urls", &config.failed_urls),
        ("failure-ledger", &config.failure_ledger),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!(
                "output {} cannot be empty",
                key
            )));
        }
    }
    Ok(())
}

/// Validates a host pattern (supports a leading "*." wildcard)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
        || domain.contains("..")
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' is malformed",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        ))),
    }
}
