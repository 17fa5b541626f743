//! Embedded JSON-LD product data
//!
//! Accepted layouts for a `<script type="application/ld+json">` block:
//! - a `Product` object
//! - an array containing a `Product` object
//! - an object with an `@graph` array containing a `Product` object
//! - an object with a nested `product` object

use crate::extraction::PartialProduct;
use scraper::{Html, Selector};
use serde_json::Value;

/// Returns the first JSON-LD `Product` object in the page
pub fn find_product(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    find_product_in(&document)
}

pub(crate) fn find_product_in(document: &Html) -> Option<Value> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    document.select(&selector).find_map(|script| {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => product_node(&value).cloned(),
            Err(e) => {
                tracing::trace!("Skipping unparseable JSON-LD block: {}", e);
                None
            }
        }
    })
}

/// Whether the page embeds a JSON-LD `Product`
pub fn has_structured_product(html: &str) -> bool {
    find_product(html).is_some()
}

fn product_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(product_node),
        Value::Object(map) => {
            if is_product_type(map.get("@type")) {
                return Some(value);
            }
            if let Some(graph) = map.get("@graph") {
                if let Some(found) = product_node(graph) {
                    return Some(found);
                }
            }
            match map.get("product") {
                Some(nested @ Value::Object(_)) => Some(nested),
                _ => None,
            }
        }
        _ => None,
    }
}

fn is_product_type(kind: Option<&Value>) -> bool {
    match kind {
        Some(Value::String(s)) => s == "Product",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("Product")),
        _ => false,
    }
}

/// Reads the record fields out of a JSON-LD `Product`
pub fn product_fields(product: &Value) -> PartialProduct {
    let offer = first_offer(product);

    let (category, sub_category) = match product.get("category") {
        Some(Value::Array(items)) => (
            items.first().and_then(scalar_text),
            items.get(1).and_then(scalar_text),
        ),
        Some(other) => (scalar_text(other), None),
        None => (None, None),
    };

    let description = match product.get("description").or_else(|| product.get("text")) {
        Some(Value::Array(parts)) => {
            let joined = parts
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(" ");
            Some(joined)
        }
        Some(other) => scalar_text(other),
        None => None,
    };

    PartialProduct {
        name: text_field(product, &["name"]),
        sku: text_field(product, &["sku", "mpn", "productID"]),
        price: offer.and_then(|o| text_field(o, &["price", "lowPrice"])),
        currency: offer.and_then(|o| text_field(o, &["priceCurrency"])),
        availability: offer.and_then(|o| text_field(o, &["availability"])),
        image_url: product.get("image").and_then(image_url),
        description,
        model_code: text_field(product, &["model", "modelCode", "mpn"]),
        category,
        sub_category,
        brand: product.get("brand").and_then(|brand| match brand {
            Value::Object(map) => map.get("name").and_then(scalar_text),
            other => scalar_text(other),
        }),
    }
}

fn first_offer(product: &Value) -> Option<&Value> {
    match product.get("offers")? {
        Value::Array(offers) => offers.first(),
        offer @ Value::Object(_) => Some(offer),
        _ => None,
    }
}

fn image_url(image: &Value) -> Option<String> {
    match image {
        Value::Array(images) => images.first().and_then(image_url),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .or_else(|| map.get("@id"))
            .and_then(scalar_text),
        other => scalar_text(other),
    }
}

/// First non-empty scalar among `keys`
fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => return map.get("name").and_then(scalar_text),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
