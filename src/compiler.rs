//! # Compiler
//!
//! Visits every selected link in order, extracts its text and groups the
//! pages by category. Pages whose static HTML yields almost no text are
//! rendered again through the headless browser. Consolidation then joins
//! each category's pages into one blob with `--- <url> ---` headers.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::extract::extract_content;
use crate::fetch::{DEFAULT_CACHE_MAX_AGE, PageSource};
use crate::selector::SelectedLinksResult;
use crate::validate::retain_non_empty;

/// Below this many characters the static extraction is considered a failure
pub const MIN_STATIC_TEXT_CHARS: usize = 100;

/// Pause between two page fetches
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

/// One successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPage {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// Category label to its pages, in selection order
pub type CompiledData = IndexMap<String, Vec<CompiledPage>>;

/// Category label to one text blob
pub type ConsolidatedContent = IndexMap<String, String>;

/// Fetches selected pages through a `PageSource`
pub struct Compiler<'a, S: PageSource> {
    source: &'a S,
    delay: Duration,
    use_cache: bool,
    cache_max_age: Duration,
}

impl<'a, S: PageSource> Compiler<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            delay: DEFAULT_DELAY,
            use_cache: false,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn cache_max_age(mut self, cache_max_age: Duration) -> Self {
        self.cache_max_age = cache_max_age;
        self
    }

    /// Fetch and extract every selected page. Unreachable pages are skipped.
    #[instrument(skip_all, fields(links = selection.links.len()))]
    pub async fn compile_pages(&self, selection: &SelectedLinksResult) -> CompiledData {
        let mut compiled = CompiledData::new();
        let total = selection.links.len();

        if total == 0 {
            info!("No links to compile");
            return compiled;
        }

        info!("Compiling {} pages...", total);

        for (i, link) in selection.links.iter().enumerate() {
            let position = i + 1;
            info!("[{}/{}] Downloading {}: {}", position, total, link.kind, link.url);

            match self
                .source
                .fetch_with_cache(&link.url, self.use_cache, self.cache_max_age)
                .await
            {
                Ok(html) => {
                    let mut page = extract_content(&html);

                    if page.text.chars().count() < MIN_STATIC_TEXT_CHARS {
                        info!("Not enough content, trying the headless browser...");
                        match self.source.fetch_dynamic(&link.url).await {
                            Ok(rendered) => {
                                page = extract_content(&rendered);
                                info!("Content rendered with the browser");
                            }
                            Err(e) => warn!("Dynamic render of {} failed: {}", link.url, e),
                        }
                    }

                    info!("Extracted {} characters", page.text.chars().count());
                    compiled
                        .entry(link.kind.clone())
                        .or_default()
                        .push(CompiledPage {
                            url: link.url.clone(),
                            title: page.title,
                            content: page.text,
                        });
                }
                Err(e) => warn!("Could not download {}: {}", link.url, e),
            }

            if position < total {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!("Compilation finished: {} categories", compiled.len());
        compiled
    }

    /// Compile the selection and consolidate it per category.
    pub async fn compile(&self, selection: &SelectedLinksResult) -> ConsolidatedContent {
        let compiled = self.compile_pages(selection).await;
        consolidate_by_type(&compiled)
    }
}

/// Join each category's pages under `--- <url> ---` headers and drop empty categories.
pub fn consolidate_by_type(compiled: &CompiledData) -> ConsolidatedContent {
    let consolidated = compiled
        .iter()
        .map(|(category, pages)| {
            let mut text = String::new();
            for page in pages {
                text.push_str(&format!("\n--- {} ---\n", page.url));
                text.push_str(&page.content);
                text.push_str("\n\n");
            }
            (category.clone(), text.trim().to_string())
        })
        .collect();

    retain_non_empty(consolidated)
}
