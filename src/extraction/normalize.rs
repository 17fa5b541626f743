use crate::model::Availability;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Longest description kept on a record, in characters
pub const DESCRIPTION_LIMIT: usize = 500;

static PRICE_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?").ok());

/// Parses price text into a decimal amount
///
/// Currency symbols, codes and thousands separators are ignored; the first
/// number in the text is used ("From £1,299.00" → 1299.0).
pub fn parse_price(raw: &str) -> Option<f64> {
    let matched = PRICE_PATTERN.as_ref()?.find(raw)?;
    matched.as_str().replace(',', "").parse::<f64>().ok()
}

/// Currency implied by a symbol or ISO code in price text
pub fn currency_from_text(raw: &str) -> Option<String> {
    let upper = raw.to_uppercase();
    let code = if raw.contains('£') || upper.contains("GBP") {
        "GBP"
    } else if raw.contains('€') || upper.contains("EUR") {
        "EUR"
    } else if raw.contains('$') || upper.contains("USD") {
        "USD"
    } else {
        return None;
    };
    Some(code.to_string())
}

/// Maps availability text or a schema.org availability URL onto the fixed vocabulary
pub fn normalize_availability(raw: Option<&str>) -> Availability {
    let Some(raw) = raw else {
        return Availability::Unknown;
    };

    let trimmed = raw.trim();
    let term = trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_lowercase()
        .replace([' ', '_', '-'], "");

    match term.as_str() {
        "instock" | "available" | "instoreonly" | "onlineonly" | "addtobasket" | "buynow" => {
            Availability::InStock
        }
        "outofstock" | "soldout" | "unavailable" | "notavailable" | "notifyme" => {
            Availability::OutOfStock
        }
        "preorder" | "presale" => Availability::PreOrder,
        "backorder" => Availability::BackOrder,
        "limitedavailability" | "lowstock" => Availability::LimitedAvailability,
        "discontinued" => Availability::Discontinued,
        _ => Availability::Unknown,
    }
}

/// Collapses whitespace and caps the description length
pub fn normalize_description(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(DESCRIPTION_LIMIT).collect())
}

/// Resolves a possibly relative image reference against the page URL
pub fn absolutize(raw: &str, page_url: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }
    let base = Url::parse(page_url).ok()?;
    base.join(raw).ok().map(|url| url.to_string())
}
