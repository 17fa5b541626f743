//! Selector fallback for pages without usable structured data
//!
//! Each field is read from the first selector in its priority list that
//! matches a non-empty element.

use crate::extraction::PartialProduct;
use scraper::{Html, Selector};

pub const NAME_SELECTORS: &[&str] = &[
    r#"h1[data-testid="pdp-product-name"]"#,
    "h1.pdp-product-name",
    "h1.product-title",
    ".product-name h1",
    ".pdp-product-name",
    r#"h1[class*="product"]"#,
    r#"h1[id*="product"]"#,
];

pub const PRICE_SELECTORS: &[&str] = &[
    r#"[data-testid="price-current"]"#,
    ".price-current",
    ".current-price",
    ".price .current",
    ".product-price .current",
    ".price-value",
    r#"[class*="price"][class*="current"]"#,
];

pub const IMAGE_SELECTORS: &[&str] = &[
    ".pdp-gallery img[src]",
    ".product-image img[src]",
    ".hero-image img[src]",
    ".product-gallery img[src]",
    ".main-image img[src]",
    r#"[data-testid="pdp-gallery"] img[src]"#,
];

pub const SKU_SELECTORS: &[&str] = &[
    r#"[data-testid="model-code"]"#,
    ".model-code",
    ".product-sku",
    ".sku-value",
    r#"[class*="model-code"]"#,
    r#"[id*="model-code"]"#,
];

pub const DESCRIPTION_SELECTORS: &[&str] = &[
    ".product-description",
    ".pdp-description",
    ".product-overview",
    r#"[data-testid="product-description"]"#,
    ".product-details p",
];

pub const AVAILABILITY_SELECTORS: &[&str] = &[
    ".availability-status",
    ".stock-status",
    r#"[data-testid="availability"]"#,
    ".product-availability",
];

/// Reads every field through its selector list
///
/// The name falls back to the `<title>` text before the first `|`. The model
/// code mirrors the SKU, which on these pages is the model code.
pub fn selector_fields(document: &Html) -> PartialProduct {
    let sku = first_text(document, SKU_SELECTORS);
    let name = first_text(document, NAME_SELECTORS).or_else(|| title_name(document));

    PartialProduct {
        name,
        model_code: sku.clone(),
        sku,
        price: first_text(document, PRICE_SELECTORS),
        currency: None,
        availability: first_text(document, AVAILABILITY_SELECTORS),
        image_url: first_attr(document, IMAGE_SELECTORS, "src"),
        description: first_text(document, DESCRIPTION_SELECTORS),
        category: None,
        sub_category: None,
        brand: None,
    }
}

fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        document.select(&selector).find_map(|element| {
            let text = collapse_whitespace(&element.text().collect::<String>());
            (!text.is_empty()).then_some(text)
        })
    })
}

fn first_attr(document: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        document.select(&selector).find_map(|element| {
            element
                .value()
                .attr(attr)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
    })
}

fn title_name(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document.select(&selector).next()?.text().collect::<String>();
    let name = collapse_whitespace(title.split('|').next().unwrap_or_default());
    (!name.is_empty()).then_some(name)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_priority() {
        let html = Html::parse_document(
            r#"<html><body>
                <h1 class="product-title">Fallback Title</h1>
                <h1 data-testid="pdp-product-name">  Galaxy   Tab S9 </h1>
                <div class="price-value">£999.00</div>
                <div class="price-current">£799.00</div>
                <span class="model-code">SM-X710NZAAEUB</span>
                <div class="product-gallery"><img src="/uk/tab-s9.png"></div>
                <p class="stock-status">In stock</p>
            </body></html>"#,
        );

        let fields = selector_fields(&html);
        assert_eq!(fields.name.as_deref(), Some("Galaxy Tab S9"));
        assert_eq!(fields.price.as_deref(), Some("£799.00"));
        assert_eq!(fields.sku.as_deref(), Some("SM-X710NZAAEUB"));
        assert_eq!(fields.model_code.as_deref(), Some("SM-X710NZAAEUB"));
        assert_eq!(fields.image_url.as_deref(), Some("/uk/tab-s9.png"));
        assert_eq!(fields.availability.as_deref(), Some("In stock"));
        assert!(fields.description.is_none());
    }

    #[test]
    fn test_title_fallback_for_name() {
        let html = Html::parse_document(
            "<html><head><title>Galaxy Buds3 Pro | Samsung UK</title></head><body></body></html>",
        );
        assert_eq!(
            selector_fields(&html).name.as_deref(),
            Some("Galaxy Buds3 Pro")
        );
    }

    #[test]
    fn test_empty_elements_are_skipped() {
        let html = Html::parse_document(
            r#"<html><body><div class="price-current">  </div><div class="current-price">£10</div></body></html>"#,
        );
        assert_eq!(selector_fields(&html).price.as_deref(), Some("£10"));
    }
}
