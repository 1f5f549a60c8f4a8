//! # brochure - Company brochures from a website
//!
//! This crate turns a company's website into a short marketing brochure. It
//! downloads the landing page, asks a language model which links describe the
//! company, compiles the text of those pages, and has the model write the
//! brochure in Markdown.
//!
//! ## Features
//!
//! - robots.txt-aware fetching with an on-disk HTML cache
//! - Headless-browser fallback for pages rendered by JavaScript
//! - Link selection with schema validation and corrective retries
//! - Rate-limited, metered chat completions with backoff on transient failures
//! - Offline mode backed by fixture content when no API key is configured
//! - Optional translation with HTML and PDF export
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use brochure::brochure::{Tone, offline::fixture_content};
//! use brochure::fetch::{FetchConfig, Fetcher};
//! use brochure::metrics::Metrics;
//! use brochure::model::{ModelBackend, OfflineChatModel};
//! use brochure::pipeline::{Pipeline, PipelineOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let metrics = Arc::new(Metrics::new());
//!     let content = fixture_content(Tone::Formal);
//!     let model = ModelBackend::offline(OfflineChatModel::new(content.clone()), metrics.clone());
//!     let fetcher = Fetcher::new(FetchConfig::default())?;
//!
//!     let pipeline = Pipeline::new(&model, &fetcher, metrics, PipelineOptions::default());
//!     let brochure = pipeline
//!         .generate_brochure("Hugging Face", &content, Tone::Formal, "en")
//!         .await?;
//!
//!     println!("{}", brochure);
//!     Ok(())
//! }
//! ```

mod error;
mod markdown;

pub mod brochure;
pub mod compiler;
pub mod config;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod language;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod selector;
pub mod validate;

pub use error::{Error, Result};
pub use markdown::{markdown_to_html, strip_code_fences};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
}
