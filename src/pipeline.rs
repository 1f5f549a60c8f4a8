//! # Pipeline
//!
//! Runs the brochure stages in order against explicitly passed collaborators:
//! a chat model, a page source and the run's metrics. Each stage is timed.
//!
//! ```text
//! download -> extract_links -> select_links -> compile -> generate_brochure -> translate
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::brochure::{BrochureGenerator, Tone};
use crate::compiler::{Compiler, ConsolidatedContent, DEFAULT_DELAY};
use crate::error::{Error, Result};
use crate::extract::{ExtractedPage, extract_content};
use crate::fetch::{DEFAULT_CACHE_MAX_AGE, PageSource};
use crate::language::detect_language;
use crate::metrics::Metrics;
use crate::model::ChatModel;
use crate::selector::{LinkSelector, SelectedLinksResult};

/// Knobs for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Model name sent with every completion
    pub model: String,
    /// Pause between selected-page fetches
    pub delay: Duration,
    /// Serve fresh pages from the HTML cache
    pub use_cache: bool,
    pub cache_max_age: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            delay: DEFAULT_DELAY,
            use_cache: false,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }
}

/// Landing page after extraction
#[derive(Debug, Clone)]
pub struct LandingPage {
    pub page: ExtractedPage,
    /// ISO 639-1 code detected from the page text
    pub language: String,
}

/// The stages of a brochure run
pub struct Pipeline<'a, M: ChatModel, S: PageSource> {
    model: &'a M,
    source: &'a S,
    metrics: Arc<Metrics>,
    options: PipelineOptions,
}

impl<'a, M: ChatModel, S: PageSource> Pipeline<'a, M, S> {
    pub fn new(model: &'a M, source: &'a S, metrics: Arc<Metrics>, options: PipelineOptions) -> Self {
        Self {
            model,
            source,
            metrics,
            options,
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Fetch the landing page
    #[instrument(skip(self))]
    pub async fn download(&self, url: &str) -> Result<String> {
        let html = self
            .metrics
            .time_stage(
                "download",
                self.source
                    .fetch_with_cache(url, self.options.use_cache, self.options.cache_max_age),
            )
            .await?;
        Ok(html)
    }

    /// Extract the landing page and detect its language
    pub fn extract_links(&self, html: &str) -> LandingPage {
        let start = std::time::Instant::now();
        let page = extract_content(html);
        let language = detect_language(&page.text);
        info!(
            "Landing page '{}': {} links, language {}",
            page.title,
            page.links.len(),
            language
        );
        self.metrics.record_stage("extract_links", start.elapsed());
        LandingPage { page, language }
    }

    /// Ask the model which links matter. An empty answer is an error here.
    #[instrument(skip(self, links))]
    pub async fn select_links(&self, base_url: &str, links: &[String]) -> Result<SelectedLinksResult> {
        let selector = LinkSelector::new(self.model, self.options.model.clone());
        let selection = self
            .metrics
            .time_stage("select_links", selector.select(base_url, links))
            .await?;

        if selection.is_empty() {
            return Err(Error::NoRelevantLinks(base_url.to_string()));
        }
        Ok(selection)
    }

    /// Fetch and consolidate the selected pages. Nothing compiled is an error here.
    #[instrument(skip_all)]
    pub async fn compile(&self, selection: &SelectedLinksResult) -> Result<ConsolidatedContent> {
        let compiler = Compiler::new(self.source)
            .delay(self.options.delay)
            .use_cache(self.options.use_cache)
            .cache_max_age(self.options.cache_max_age);
        let content = self
            .metrics
            .time_stage("compile", compiler.compile(selection))
            .await;

        if content.is_empty() {
            return Err(Error::EmptyContent(
                "none of the selected pages produced any text".to_string(),
            ));
        }
        Ok(content)
    }

    pub async fn generate_brochure(
        &self,
        company: &str,
        content: &ConsolidatedContent,
        tone: Tone,
        language: &str,
    ) -> Result<String> {
        let generator = BrochureGenerator::new(self.model, self.options.model.clone());
        self.metrics
            .time_stage(
                "generate_brochure",
                generator.generate(company, content, tone, language),
            )
            .await
    }

    pub async fn translate(&self, brochure: &str, language: &str) -> Result<String> {
        let generator = BrochureGenerator::new(self.model, self.options.model.clone());
        self.metrics
            .time_stage(
                &format!("translate_{}", language),
                generator.translate(brochure, language),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::model::mock_model::ScriptedChatModel;

    struct NoPages;

    impl PageSource for NoPages {
        async fn fetch_with_cache(
            &self,
            url: &str,
            _use_cache: bool,
            _max_age: Duration,
        ) -> std::result::Result<String, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            })
        }

        async fn fetch_dynamic(&self, url: &str) -> std::result::Result<String, FetchError> {
            Err(FetchError::Render(url.to_string()))
        }
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            delay: Duration::ZERO,
            ..PipelineOptions::default()
        }
    }

    #[tokio::test]
    async fn test_download_failure_is_fetch_error() {
        let model = ScriptedChatModel::default();
        let pipeline = Pipeline::new(&model, &NoPages, Arc::new(Metrics::new()), options());

        let result = pipeline.download("https://acme.test").await;

        assert!(matches!(result, Err(Error::Fetch(FetchError::Status { status: 503, .. }))));
        assert!(pipeline.metrics().summary().stages.contains_key("download"));
    }

    #[tokio::test]
    async fn test_empty_selection_is_no_relevant_links() {
        let model = ScriptedChatModel::always(r#"{"links": []}"#);
        let pipeline = Pipeline::new(&model, &NoPages, Arc::new(Metrics::new()), options());

        let result = pipeline
            .select_links("https://acme.test", &["/about".to_string()])
            .await;

        assert!(matches!(result, Err(Error::NoRelevantLinks(_))));
    }

    #[tokio::test]
    async fn test_nothing_compiled_is_empty_content() {
        let model = ScriptedChatModel::default();
        let pipeline = Pipeline::new(&model, &NoPages, Arc::new(Metrics::new()), options());
        let selection: SelectedLinksResult = serde_json::from_str(
            r#"{"links": [{"type": "about page", "url": "https://acme.test/about", "score": 90, "rationale": "r"}]}"#,
        )
        .unwrap();

        let result = pipeline.compile(&selection).await;

        assert!(matches!(result, Err(Error::EmptyContent(_))));
    }

    #[test]
    fn test_extract_links_detects_language() {
        let model = ScriptedChatModel::default();
        let pipeline = Pipeline::new(&model, &NoPages, Arc::new(Metrics::new()), options());
        let html = "<html><head><title>Acme</title></head><body>\
                    <p>Somos una empresa que fabrica cohetes y trabajamos cada día para llevar a todos al espacio.</p>\
                    <a href=\"/sobre-nosotros\">Sobre nosotros</a></body></html>";

        let landing = pipeline.extract_links(html);

        assert_eq!(landing.page.title, "Acme");
        assert_eq!(landing.page.links, vec!["/sobre-nosotros"]);
        assert_eq!(landing.language, "es");
    }
}
