//! End-to-end tests for the discovery phase against a mock storefront

mod common;

use catalog_harvest::concurrency::ConcurrencyController;
use catalog_harvest::discovery::{
    run_discovery, DiscoveryReport, DiscoveryRun, HandOffPaths, SitemapNavigator,
};
use catalog_harvest::fetch::Fetcher;
use catalog_harvest::output::{read_ledger, read_metadata, FileOutput};
use catalog_harvest::pagination::{PaginationResolver, RunSignals};
use catalog_harvest::retry::RetryPolicy;
use catalog_harvest::{DiscoverySource, HarvestError, Phase, SiteRules};
use common::{static_fetcher, test_config, FakeRenderer};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITEMAP_HTML: &str = r#"<html><body>
    <ul class="sitemap">
      <li><a href="/uk/tvs/all-tvs/">All TVs</a></li>
      <li><a href="/uk/tvs/qled-tv/">QLED TVs</a></li>
      <li><a href="/uk/offer/">Offers</a></li>
      <li><a href="/uk/info/contact/">Contact</a></li>
      <li><a href="https://elsewhere.example.org/uk/tvs/">Partner</a></li>
    </ul>
</body></html>"#;

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body.to_string())
}

async fn mount_sitemap(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/uk/info/sitemap"))
        .respond_with(html(SITEMAP_HTML))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_missing_section_gets_fallback_hub() {
    let server = MockServer::start().await;
    mount_sitemap(&server).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());
    let rules = Arc::new(SiteRules::from_config(&config.site).unwrap());
    let navigator = SitemapNavigator::new(Arc::new(static_fetcher()), rules, &config.site);

    let listings = navigator.discover_category_urls().await.unwrap();
    let by_url: HashMap<String, DiscoverySource> = listings
        .iter()
        .map(|entry| (entry.url.clone(), entry.source))
        .collect();

    let uri = server.uri();
    assert_eq!(listings.len(), 3, "{:?}", by_url);
    assert_eq!(
        by_url.get(&format!("{}/uk/tvs/all-tvs", uri)),
        Some(&DiscoverySource::Sitemap)
    );
    assert_eq!(
        by_url.get(&format!("{}/uk/tvs/qled-tv", uri)),
        Some(&DiscoverySource::Sitemap)
    );
    assert_eq!(
        by_url.get(&format!("{}/uk/audio-sound/all-audio-sound", uri)),
        Some(&DiscoverySource::FallbackHub)
    );
    assert!(listings.iter().all(|entry| entry.validated));

    let urls: Vec<&str> = listings.iter().map(|entry| entry.url.as_str()).collect();
    let mut sorted = urls.clone();
    sorted.sort();
    assert_eq!(urls, sorted);
}

#[tokio::test]
async fn test_no_sitemap_and_no_hubs_is_fatal() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), dir.path());
    for category in &mut config.site.categories {
        category.fallback_hub = None;
    }

    let rules = Arc::new(SiteRules::from_config(&config.site).unwrap());
    let navigator = SitemapNavigator::new(Arc::new(static_fetcher()), rules, &config.site);

    let result = navigator.discover_category_urls().await;
    assert!(matches!(result, Err(HarvestError::NoSeeds)));
}

#[tokio::test]
async fn test_static_discovery_writes_hand_off() {
    let server = MockServer::start().await;
    mount_sitemap(&server).await;

    let tvs_listing = r#"<html><body><div class="product-finder">
        <a href="/uk/tvs/qled-tv/q80d-qe65q80datxxu/">Q80D 65</a>
        <a href="/uk/tvs/qled-tv/q80d-qe55q80datxxu/?cid=promo">Q80D 55</a>
        <a href="/uk/tvs/qled-tv/">QLED</a>
        <a href="/uk/offer/">Offers</a>
    </div></body></html>"#;
    let audio_listing = r#"<html><body><div class="product-finder">
        <a href="/uk/audio-sound/soundbars/hw-q990d-xu/">HW-Q990D</a>
        <a href="/uk/tvs/qled-tv/q80d-qe65q80datxxu/">Q80D 65 again</a>
    </div></body></html>"#;

    Mock::given(method("GET"))
        .and(path("/uk/tvs/all-tvs"))
        .respond_with(html(tvs_listing))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uk/audio-sound/all-audio-sound"))
        .respond_with(html(audio_listing))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), dir.path());
    config.site.sitemap_max_depth = 1;

    let report = run_discovery(&config, 2, CancellationToken::new())
        .await
        .unwrap();

    let uri = server.uri();
    let expected = vec![
        format!("{}/uk/audio-sound/soundbars/hw-q990d-xu", uri),
        format!("{}/uk/tvs/qled-tv/q80d-qe55q80datxxu", uri),
        format!("{}/uk/tvs/qled-tv/q80d-qe65q80datxxu", uri),
    ];

    let written =
        std::fs::read_to_string(config.output.path_of(&config.output.product_urls)).unwrap();
    assert_eq!(written.lines().map(str::to_string).collect::<Vec<_>>(), expected);
    assert_eq!(report.products.len(), 3);

    let metadata = read_metadata(&config.output.path_of(&config.output.url_metadata)).unwrap();
    assert_eq!(metadata.total_urls, 3);
    assert_eq!(metadata.category_counts.get("tvs"), Some(&2));
    assert_eq!(metadata.category_counts.get("audio-sound"), Some(&1));
    assert!(metadata
        .urls
        .iter()
        .all(|entry| entry.source == DiscoverySource::PaginationExpansion));

    // static listings expose no reveal control, so none can be confirmed exhausted
    assert_eq!(report.summary.completeness, Some(0.0));
    let failed =
        std::fs::read_to_string(config.output.path_of(&config.output.failed_listings)).unwrap();
    assert_eq!(failed.lines().count(), report.listings.len());

    let ledger = read_ledger(&config.output.path_of(&config.output.failure_ledger)).unwrap();
    assert!(ledger.iter().all(|failure| failure.phase == Phase::Discovery));
}

#[tokio::test]
async fn test_rendered_listing_is_fully_expanded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uk/info/sitemap"))
        .respond_with(html(
            r#"<html><body><a href="/uk/tvs/all-tvs/">All TVs</a></body></html>"#,
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), dir.path());
    config.site.categories.retain(|category| category.name == "tvs");
    config.site.sitemap_max_depth = 1;

    let listing_url = format!("{}/uk/tvs/all-tvs", server.uri());
    let mut listings = HashMap::new();
    listings.insert(listing_url.clone(), (36, 12));
    let renderer = Arc::new(FakeRenderer {
        listings,
        ..Default::default()
    });

    let rules = Arc::new(SiteRules::from_config(&config.site).unwrap());
    let fetcher = Arc::new(static_fetcher().with_renderer(renderer.clone()));
    let retry = RetryPolicy::from_config(&config.retry);
    let resolver = Arc::new(PaginationResolver::new(
        Arc::clone(&rules),
        &config.site,
        &config.pagination,
        retry.clone(),
        Arc::new(RunSignals::new()),
    ));
    let navigator = SitemapNavigator::new(Arc::clone(&fetcher), Arc::clone(&rules), &config.site);

    let output = FileOutput::for_discovery(&config.output).unwrap();
    let paths = HandOffPaths {
        product_urls: config.output.path_of(&config.output.product_urls),
        url_metadata: config.output.path_of(&config.output.url_metadata),
    };

    let report = DiscoveryRun::new(
        navigator,
        resolver,
        fetcher,
        rules,
        retry,
        2,
        CancellationToken::new(),
    )
    .run(&output, &paths)
    .await
    .unwrap();

    assert_eq!(report.listings.len(), 1);
    assert_eq!(report.products.len(), 36);
    assert!(report.products.iter().all(|entry| entry.validated));
    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.summary.completeness, Some(1.0));
    assert_eq!(renderer.listing_calls.load(Ordering::SeqCst), 1);

    let written = std::fs::read_to_string(&paths.product_urls).unwrap();
    assert_eq!(written.lines().count(), 36);
}

const TV_LISTINGS: [&str; 6] = [
    "all-tvs",
    "qled-tv",
    "oled-tv",
    "neo-qled-tv",
    "the-frame",
    "crystal-uhd-tv",
];

/// Serves a sitemap linking every TV listing and returns their canonical URLs
async fn mount_tv_listings(server: &MockServer) -> Vec<String> {
    let links: String = TV_LISTINGS
        .iter()
        .map(|name| format!(r#"<li><a href="/uk/tvs/{}/">{}</a></li>"#, name, name))
        .collect();
    Mock::given(method("GET"))
        .and(path("/uk/info/sitemap"))
        .respond_with(html(&format!("<html><body><ul>{}</ul></body></html>", links)))
        .mount(server)
        .await;

    TV_LISTINGS
        .iter()
        .map(|name| format!("{}/uk/tvs/{}", server.uri(), name))
        .collect()
}

/// Runs rendered discovery over the TV listings with its own resolver controller
async fn run_rendered(
    server: &MockServer,
    dir: &TempDir,
    renderer: Arc<FakeRenderer>,
    reveal_controller: impl FnOnce(&Fetcher) -> Arc<ConcurrencyController>,
    workers: usize,
) -> (DiscoveryReport, HandOffPaths) {
    let mut config = test_config(&server.uri(), dir.path());
    config.site.categories.retain(|category| category.name == "tvs");
    config.site.sitemap_max_depth = 1;

    let rules = Arc::new(SiteRules::from_config(&config.site).unwrap());
    let fetcher = Arc::new(static_fetcher().with_renderer(renderer));
    let retry = RetryPolicy::from_config(&config.retry);
    let resolver = Arc::new(
        PaginationResolver::new(
            Arc::clone(&rules),
            &config.site,
            &config.pagination,
            retry.clone(),
            Arc::new(RunSignals::new()),
        )
        .with_controller(reveal_controller(&fetcher)),
    );
    let navigator = SitemapNavigator::new(Arc::clone(&fetcher), Arc::clone(&rules), &config.site);

    let output = FileOutput::for_discovery(&config.output).unwrap();
    let paths = HandOffPaths {
        product_urls: config.output.path_of(&config.output.product_urls),
        url_metadata: config.output.path_of(&config.output.url_metadata),
    };

    let report = DiscoveryRun::new(
        navigator,
        resolver,
        fetcher,
        rules,
        retry,
        workers,
        CancellationToken::new(),
    )
    .run(&output, &paths)
    .await
    .unwrap();

    (report, paths)
}

#[tokio::test]
async fn test_more_workers_than_browser_slots_completes() {
    let server = MockServer::start().await;
    let listing_urls = mount_tv_listings(&server).await;

    let renderer = Arc::new(FakeRenderer {
        listings: listing_urls
            .iter()
            .map(|url| (url.clone(), (36, 12)))
            .collect(),
        slots: Some(Arc::new(Semaphore::new(2))),
        ..Default::default()
    });

    // reveals share the fetcher's controller, whose per-host limit (4) is
    // below the worker count (6) and above the browser slot count (2)
    let dir = TempDir::new().unwrap();
    let (report, paths) = tokio::time::timeout(
        Duration::from_secs(10),
        run_rendered(
            &server,
            &dir,
            renderer.clone(),
            |fetcher| Arc::clone(fetcher.controller()),
            6,
        ),
    )
    .await
    .expect("discovery stalled waiting on admissions");

    assert_eq!(report.listings.len(), 6);
    assert_eq!(report.summary.succeeded, 6);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.summary.completeness, Some(1.0));
    assert_eq!(report.products.len(), 36);
    assert_eq!(renderer.listing_calls.load(Ordering::SeqCst), 6);

    let written = std::fs::read_to_string(&paths.product_urls).unwrap();
    assert_eq!(written.lines().count(), 36);
}

#[tokio::test]
async fn test_listing_cancelled_mid_expansion_is_not_counted() {
    let server = MockServer::start().await;
    let listing_urls = mount_tv_listings(&server).await;

    let renderer = Arc::new(FakeRenderer {
        listings: listing_urls
            .iter()
            .map(|url| (url.clone(), (36, 12)))
            .collect(),
        ..Default::default()
    });

    // listings open normally, then every reveal is refused as the run shuts down
    let closed = Arc::new(ConcurrencyController::with_limits(
        4,
        4,
        Duration::ZERO,
        Duration::ZERO,
    ));
    closed.close().await;

    let dir = TempDir::new().unwrap();
    let (report, paths) = run_rendered(
        &server,
        &dir,
        renderer.clone(),
        move |_| closed,
        2,
    )
    .await;

    assert_eq!(renderer.listing_calls.load(Ordering::SeqCst), 6);
    assert_eq!(report.summary.processed, 0);
    assert_eq!(report.summary.succeeded, 0);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.summary.completeness, Some(0.0));
    assert!(report.products.is_empty());

    let written = std::fs::read_to_string(&paths.product_urls).unwrap();
    assert_eq!(written.lines().count(), 0);
}
