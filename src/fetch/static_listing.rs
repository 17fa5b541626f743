use crate::pagination::{Activation, ListingSession, RevealControl};
use crate::FetchError;
use async_trait::async_trait;
use scraper::{Html, Selector};

/// A listing read from statically fetched HTML
///
/// Static HTML exposes no interactive controls, so the resolver sees the
/// products present in the initial markup and terminates on the first
/// Loading step.
pub struct StaticListing {
    url: String,
    links: Vec<String>,
}

impl StaticListing {
    pub fn new(url: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            links: extract_hrefs(html),
        }
    }
}

fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}

#[async_trait]
impl ListingSession for StaticListing {
    fn url(&self) -> &str {
        &self.url
    }

    async fn links(&mut self) -> Result<Vec<String>, FetchError> {
        Ok(self.links.clone())
    }

    async fn controls(&mut self) -> Result<Vec<RevealControl>, FetchError> {
        Ok(Vec::new())
    }

    async fn activate(
        &mut self,
        _control: &RevealControl,
        _activation: Activation,
    ) -> Result<(), FetchError> {
        Err(FetchError::RendererUnavailable {
            url: self.url.clone(),
        })
    }

    async fn settle(&mut self) -> Result<(), FetchError> {
        Ok(())
    }
}
