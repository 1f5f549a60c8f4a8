//! # Fetch Module
//!
//! Retrieves HTML for a URL. Every network download is gated by the site's
//! robots.txt, bodies can be served from and written to an on-disk cache,
//! and pages that only render client-side can be loaded through a WebDriver
//! session.
//!
//! ## Key Components
//!
//! - `Fetcher`: static downloads, cache handling and dynamic rendering
//! - `FetchConfig`: user agent, timeouts, cache directory and WebDriver endpoint
//! - `PageSource`: the retrieval seam the compiler depends on
//! - `HtmlCache`: flat `<sha256>.html` file cache
//! - `RobotsPolicy`: lazily populated per-origin robots.txt rules

use std::time::Duration;

use reqwest::Client;
use tracing::{error, info, instrument, warn};
use url::Url;

pub mod cache;
pub mod config;
pub mod dynamic;
mod error;
pub mod robots;

pub use cache::HtmlCache;
pub use config::{FetchConfig, FetchConfigBuilder};
pub use error::FetchError;
pub use robots::RobotsPolicy;

/// Default maximum age of a cache entry
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(12 * 3600);

/// Where the compiler gets pages from
#[allow(async_fn_in_trait)]
pub trait PageSource {
    /// Static download, served from the cache when `use_cache` and the entry is younger than `max_age`
    async fn fetch_with_cache(
        &self,
        url: &str,
        use_cache: bool,
        max_age: Duration,
    ) -> Result<String, FetchError>;

    /// Rendered HTML from a headless browser
    async fn fetch_dynamic(&self, url: &str) -> Result<String, FetchError>;
}

/// Downloads pages over HTTP and through WebDriver
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    cache: HtmlCache,
    robots: RobotsPolicy,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        let cache = HtmlCache::new(config.cache_dir.clone());
        let robots = RobotsPolicy::new(client.clone(), config.robots_agent.clone());

        Ok(Self {
            client,
            config,
            cache,
            robots,
        })
    }

    pub fn cache(&self) -> &HtmlCache {
        &self.cache
    }

    /// Download `url`, refusing before any request if robots.txt disallows it.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url)?;

        if self.config.respect_robots_txt && !self.robots.allowed(&parsed).await {
            error!("Access blocked by robots.txt: {}", url);
            return Err(FetchError::Disallowed(url.to_string()));
        }

        info!("Downloading {}", url);
        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("Error downloading {}: status {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        info!("Downloaded {} ({} bytes)", url, body.len());
        Ok(body)
    }
}

impl PageSource for Fetcher {
    #[instrument(skip(self))]
    async fn fetch_with_cache(
        &self,
        url: &str,
        use_cache: bool,
        max_age: Duration,
    ) -> Result<String, FetchError> {
        if use_cache && self.cache.is_fresh(url, max_age).await {
            if let Some(cached) = self.cache.load(url).await {
                if let Some(age) = self.cache.age(url).await {
                    info!("Using cached copy of {} (age {})", url, cache::format_age(age));
                }
                return Ok(cached);
            }
        }

        let html = self.fetch(url).await?;

        if let Err(e) = self.cache.store(url, &html).await {
            warn!("Error writing cache for {}: {}", url, e);
        }

        Ok(html)
    }

    #[instrument(skip(self))]
    async fn fetch_dynamic(&self, url: &str) -> Result<String, FetchError> {
        info!("Rendering {} with headless browser", url);
        dynamic::render(
            &self.config.webdriver_url,
            url,
            self.config.render_timeout,
            self.config.settle_time,
        )
        .await
    }
}
