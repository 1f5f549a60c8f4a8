//! # Fetcher Configuration
//!
//! `FetchConfig` holds the knobs for static downloads, the HTML cache and the
//! headless-browser fallback. Use `FetchConfig::builder()` to override the
//! defaults.

use std::path::PathBuf;
use std::time::Duration;

/// User agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "BrochureBot/1.0 (Educational Project)";

/// Configuration for the fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent for page and robots.txt requests
    pub user_agent: String,

    /// Product token matched against robots.txt `User-agent` lines
    pub robots_agent: String,

    /// Whether to respect robots.txt
    pub respect_robots_txt: bool,

    /// Timeout for a single static download
    pub timeout: Duration,

    /// Directory holding cached HTML
    pub cache_dir: PathBuf,

    /// WebDriver endpoint for dynamic rendering
    pub webdriver_url: String,

    /// Navigation timeout for dynamic rendering
    pub render_timeout: Duration,

    /// Fixed wait after navigation so scripts can populate the page
    pub settle_time: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            robots_agent: "BrochureBot".to_string(),
            respect_robots_txt: true,
            timeout: Duration::from_secs(30),
            cache_dir: PathBuf::from("data"),
            webdriver_url: "http://localhost:4444".to_string(),
            render_timeout: Duration::from_secs(30),
            settle_time: Duration::from_millis(3000),
        }
    }
}

/// Builder for FetchConfig
#[derive(Debug, Default)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: FetchConfig::default(),
        }
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn respect_robots_txt(mut self, respect_robots_txt: bool) -> Self {
        self.config.respect_robots_txt = respect_robots_txt;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = cache_dir.into();
        self
    }

    pub fn webdriver_url(mut self, webdriver_url: impl Into<String>) -> Self {
        self.config.webdriver_url = webdriver_url.into();
        self
    }

    pub fn render_timeout(mut self, render_timeout: Duration) -> Self {
        self.config.render_timeout = render_timeout;
        self
    }

    pub fn settle_time(mut self, settle_time: Duration) -> Self {
        self.config.settle_time = settle_time;
        self
    }

    pub fn build(self) -> FetchConfig {
        self.config
    }
}

impl FetchConfig {
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::new()
    }
}
