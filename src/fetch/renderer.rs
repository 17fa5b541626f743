//! Rendered fetch tier backed by a headless Chromium
//!
//! A bounded number of browser pages may be open at once. Each page is held by
//! a [`PageGuard`] together with its slot permit, so both are released on every
//! exit path, including errors and cancellation.

use crate::concurrency::ConcurrencyController;
use crate::config::{Config, SiteConfig};
use crate::fetch::Tier;
use crate::pagination::{Activation, ListingSession, RevealControl};
use crate::{FetchError, HarvestError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Something that can render pages and open interactive listing sessions
///
/// Implementations take their own page slot first and only then ask
/// `controller` for admission, holding it for the navigation alone. An open
/// listing keeps its slot but no admission, so its reveals can be admitted
/// while other listings wait for a slot.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigates to `url`, waits for it to settle and returns the final DOM
    async fn render(
        &self,
        url: &str,
        controller: &ConcurrencyController,
    ) -> Result<String, FetchError>;

    /// Opens `url` and keeps the page alive for pagination
    async fn open_listing(
        &self,
        url: &str,
        controller: &ConcurrencyController,
    ) -> Result<Box<dyn ListingSession>, FetchError>;
}

/// Closes the wrapped page when dropped
///
/// `Page::close` is async, so the drop path spawns it on the runtime captured
/// at construction.
pub struct PageGuard {
    page: Page,
    url: String,
    runtime: tokio::runtime::Handle,
}

impl PageGuard {
    pub fn new(page: Page, url: impl Into<String>) -> Self {
        Self {
            page,
            url: url.into(),
            runtime: tokio::runtime::Handle::current(),
        }
    }
}

impl Deref for PageGuard {
    type Target = Page;

    fn deref(&self) -> &Self::Target {
        &self.page
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        let page = self.page.clone();
        let url = std::mem::take(&mut self.url);
        self.runtime.spawn(async move {
            if let Err(e) = page.close().await {
                tracing::debug!("Closing page for {} failed: {}", url, e);
            }
        });
    }
}

/// chromiumoxide-backed renderer
pub struct ChromeRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    slots: Arc<Semaphore>,
    render_timeout: Duration,
    settle: Duration,
    reveal_selector: String,
    reveal_texts: Vec<String>,
}

impl ChromeRenderer {
    /// Launches a headless browser
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::Browser` when no Chromium can be started.
    pub async fn launch(config: &Config) -> Result<Self, HarvestError> {
        let browser_config = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(Duration::from_millis(config.fetch.render_timeout_ms))
            .arg(format!("--user-agent={}", config.user_agent.header_value()))
            .build()
            .map_err(HarvestError::Browser)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| HarvestError::Browser(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
        });

        tracing::info!(
            "Headless browser launched ({} page slots)",
            config.fetch.browser_slots
        );

        Ok(Self::from_parts(browser, handler, config))
    }

    fn from_parts(browser: Browser, handler: JoinHandle<()>, config: &Config) -> Self {
        let SiteConfig {
            reveal_selector,
            reveal_texts,
            ..
        } = config.site.clone();

        Self {
            browser,
            handler,
            slots: Arc::new(Semaphore::new(config.fetch.browser_slots.max(1))),
            render_timeout: Duration::from_millis(config.fetch.render_timeout_ms),
            settle: Duration::from_millis(config.fetch.settle_ms),
            reveal_selector,
            reveal_texts,
        }
    }

    async fn acquire_slot(&self, url: &str) -> Result<OwnedSemaphorePermit, FetchError> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::Cancelled {
                url: url.to_string(),
            })
    }

    /// Opens a new page on `url` and waits for navigation, bounded by the render timeout
    async fn open_page(&self, url: &str) -> Result<PageGuard, FetchError> {
        let navigation = async {
            let page = self
                .browser
                .new_page(url)
                .await
                .map_err(|e| browser_error(url, e))?;
            let guard = PageGuard::new(page, url);
            guard
                .wait_for_navigation()
                .await
                .map_err(|e| browser_error(url, e))?;
            Ok::<_, FetchError>(guard)
        };

        with_render_timeout(url, self.render_timeout, navigation).await
    }
}

impl Drop for ChromeRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(
        &self,
        url: &str,
        controller: &ConcurrencyController,
    ) -> Result<String, FetchError> {
        let _slot = self.acquire_slot(url).await?;
        let page = {
            let _admission = controller.admit(url).await?;
            self.open_page(url).await?
        };

        tokio::time::sleep(self.settle).await;

        with_render_timeout(url, self.render_timeout, async {
            page.content().await.map_err(|e| browser_error(url, e))
        })
        .await
    }

    async fn open_listing(
        &self,
        url: &str,
        controller: &ConcurrencyController,
    ) -> Result<Box<dyn ListingSession>, FetchError> {
        let slot = self.acquire_slot(url).await?;
        let page = {
            let _admission = controller.admit(url).await?;
            self.open_page(url).await?
        };

        let mut session = ChromeListing {
            url: url.to_string(),
            page,
            _slot: slot,
            settle: self.settle,
            timeout: self.render_timeout,
            controls_script: controls_script(&self.reveal_selector, &self.reveal_texts),
        };
        session.settle().await?;

        Ok(Box::new(session))
    }
}

/// A live listing page
struct ChromeListing {
    url: String,
    page: PageGuard,
    _slot: OwnedSemaphorePermit,
    settle: Duration,
    timeout: Duration,
    controls_script: String,
}

const LINKS_SCRIPT: &str =
    "Array.from(document.querySelectorAll('a[href]')).map(a => a.getAttribute('href'))";

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight); true";

/// Tags candidate controls with `data-harvest-control` and describes them
fn controls_script(reveal_selector: &str, reveal_texts: &[String]) -> String {
    let selector = serde_json::to_string(reveal_selector).unwrap_or_else(|_| "\"\"".to_string());
    let lowered: Vec<String> = reveal_texts.iter().map(|t| t.to_lowercase()).collect();
    let texts = serde_json::to_string(&lowered).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"(() => {{
  const revealSelector = {selector};
  const revealTexts = {texts};
  const matchesSelector = (el) => {{
    if (!revealSelector) return false;
    try {{ return el.matches(revealSelector); }} catch (e) {{ return false; }}
  }};
  document.querySelectorAll('[data-harvest-control]').forEach((el) => el.removeAttribute('data-harvest-control'));
  const nodes = Array.from(document.querySelectorAll('button, a, [role="button"], input[type="button"]'));
  const out = [];
  nodes.forEach((el) => {{
    const text = (el.innerText || el.value || el.getAttribute('aria-label') || '').trim();
    const lower = text.toLowerCase();
    const own = matchesSelector(el);
    if (!own && !revealTexts.some((t) => lower.includes(t))) return;
    const index = out.length;
    el.setAttribute('data-harvest-control', String(index));
    const ancestors = [];
    let p = el.parentElement;
    while (p && ancestors.length < 12) {{
      if (typeof p.className === 'string' && p.className) ancestors.push(p.className);
      p = p.parentElement;
    }}
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    out.push({{
      index: index,
      text: text.slice(0, 80),
      classes: typeof el.className === 'string' ? el.className : '',
      ancestor_classes: ancestors,
      matches_reveal_selector: own,
      enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
      visible: style.display !== 'none' && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0,
    }});
  }});
  return out;
}})()"#
    )
}

impl ChromeListing {
    async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T, FetchError> {
        let url = self.url.as_str();
        with_render_timeout(url, self.timeout, async {
            self.page
                .evaluate(script)
                .await
                .map_err(|e| browser_error(url, e))?
                .into_value::<T>()
                .map_err(|e| browser_error(url, e))
        })
        .await
    }
}

#[async_trait]
impl ListingSession for ChromeListing {
    fn url(&self) -> &str {
        &self.url
    }

    async fn links(&mut self) -> Result<Vec<String>, FetchError> {
        let links: Vec<Option<String>> = self.evaluate(LINKS_SCRIPT).await?;
        Ok(links.into_iter().flatten().collect())
    }

    async fn controls(&mut self) -> Result<Vec<RevealControl>, FetchError> {
        let script = self.controls_script.clone();
        self.evaluate(&script).await
    }

    async fn activate(
        &mut self,
        control: &RevealControl,
        activation: Activation,
    ) -> Result<(), FetchError> {
        let selector = format!("[data-harvest-control=\"{}\"]", control.index);
        let url = self.url.clone();

        match activation {
            Activation::Pointer => {
                with_render_timeout(&url, self.timeout, async {
                    let element = self
                        .page
                        .find_element(selector.as_str())
                        .await
                        .map_err(|e| browser_error(&url, e))?;
                    element.click().await.map_err(|e| browser_error(&url, e))?;
                    Ok(())
                })
                .await
            }
            Activation::Direct => {
                let script = format!(
                    "(() => {{ const el = document.querySelector('{}'); if (!el) return false; el.click(); return true; }})()",
                    selector.replace('\'', "\\'")
                );
                let clicked: bool = self.evaluate(&script).await?;
                if clicked {
                    Ok(())
                } else {
                    Err(FetchError::Browser {
                        url,
                        message: format!("control {} detached before activation", control.index),
                    })
                }
            }
        }
    }

    async fn settle(&mut self) -> Result<(), FetchError> {
        // lazy-loaded tiles only appear once scrolled into view
        let _: bool = self.evaluate(SCROLL_SCRIPT).await?;
        tokio::time::sleep(self.settle).await;
        Ok(())
    }
}

async fn with_render_timeout<T>(
    url: &str,
    timeout: Duration,
    operation: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            tier: Tier::Rendered,
        }),
    }
}

fn browser_error(url: &str, error: impl std::fmt::Display) -> FetchError {
    FetchError::Browser {
        url: url.to_string(),
        message: error.to_string(),
    }
}
