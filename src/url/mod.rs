//! URL handling module for Catalog-Harvest
//!
//! This module provides URL normalization, host extraction, wildcard matching,
//! and link classification against the storefront's URL layout.

mod classify;
mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use classify::{LinkClass, SiteRules};
pub use domain::{extract_domain, host_key};
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;
