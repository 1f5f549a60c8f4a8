//! Writes brochures and intermediate artifacts into the output directory.
//!
//! Every file is named `<YYYYmmdd_HHMMSS>_<prefix>.<ext>` so repeated runs
//! never overwrite each other. PDFs are printed by headless Chrome through
//! the same WebDriver endpoint the fetcher renders pages with.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tokio::fs;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::fetch::dynamic::print_pdf;
use crate::markdown::markdown_to_html;

/// Time allowed for the browser to load the brochure before printing
const PRINT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause for fonts and layout before printing
const PRINT_SETTLE: Duration = Duration::from_millis(500);

/// Output format for the brochure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Md,
    Html,
    Pdf,
}

/// Writes timestamped files under one directory
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    webdriver_url: Option<String>,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            webdriver_url: None,
        }
    }

    /// Enable PDF export through this WebDriver endpoint
    pub fn with_webdriver(mut self, webdriver_url: impl Into<String>) -> Self {
        self.webdriver_url = Some(webdriver_url.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn path_for(&self, prefix: &str, extension: &str) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        self.output_dir
            .join(format!("{}_{}.{}", timestamp, prefix, extension))
    }

    async fn write(
        &self,
        prefix: &str,
        extension: &str,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).await?;
        let path = self.path_for(prefix, extension);
        fs::write(&path, contents).await?;
        info!("Saved {}", path.display());
        Ok(path)
    }

    pub async fn save_markdown(&self, markdown: &str, prefix: &str) -> Result<PathBuf> {
        self.write(prefix, "md", markdown).await
    }

    pub async fn save_json<T: Serialize>(&self, value: &T, prefix: &str) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)?;
        self.write(prefix, "json", &json).await
    }

    /// Render `markdown` to a standalone HTML page and save it
    pub async fn save_html(&self, markdown: &str, title: &str, prefix: &str) -> Result<PathBuf> {
        self.write(prefix, "html", &markdown_to_html(markdown, title))
            .await
    }

    /// Render `markdown` to HTML and print it to PDF with headless Chrome
    pub async fn save_pdf(&self, markdown: &str, title: &str, prefix: &str) -> Result<PathBuf> {
        let webdriver_url = self.webdriver_url.as_deref().ok_or_else(|| {
            Error::Config("PDF export needs a WebDriver endpoint".to_string())
        })?;
        let html = markdown_to_html(markdown, title);
        let pdf = print_pdf(webdriver_url, &html, PRINT_TIMEOUT, PRINT_SETTLE).await?;
        self.write(prefix, "pdf", pdf).await
    }

    /// Save the brochure as Markdown, plus each extra format requested.
    ///
    /// A PDF that cannot be printed is logged and left out; the other files
    /// are still written.
    pub async fn save_brochure(
        &self,
        markdown: &str,
        title: &str,
        prefix: &str,
        formats: &[ExportFormat],
    ) -> Result<Vec<PathBuf>> {
        let mut paths = vec![self.save_markdown(markdown, prefix).await?];

        if formats.contains(&ExportFormat::Html) {
            paths.push(self.save_html(markdown, title, prefix).await?);
        }
        if formats.contains(&ExportFormat::Pdf) {
            match self.save_pdf(markdown, title, prefix).await {
                Ok(path) => paths.push(path),
                Err(e) => error!("Error generating PDF: {}", e),
            }
        }

        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_files_are_timestamped_and_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path().join("outputs"));

        let md = exporter.save_markdown("# Acme", "brochure").await.unwrap();
        let name = md.file_name().unwrap().to_str().unwrap().to_string();

        assert!(name.ends_with("_brochure.md"));
        // YYYYmmdd_HHMMSS
        assert_eq!(name.len(), "20240101_120000_brochure.md".len());
        assert_eq!(std::fs::read_to_string(&md).unwrap(), "# Acme");
    }

    #[tokio::test]
    async fn test_json_and_html_exports() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path());

        let json_path = exporter
            .save_json(&json!({"links": []}), "links")
            .await
            .unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(saved, json!({"links": []}));

        let html_path = exporter.save_html("# Acme", "Acme", "brochure").await.unwrap();
        assert_eq!(html_path.extension().unwrap(), "html");
        assert!(
            std::fs::read_to_string(&html_path)
                .unwrap()
                .contains("<h1>Acme</h1>")
        );
    }

    fn extensions(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.extension().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_markdown_is_always_saved() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path());

        let html_only = exporter
            .save_brochure("# Acme", "Acme", "brochure", &[ExportFormat::Html])
            .await
            .unwrap();
        assert_eq!(extensions(&html_only), vec!["md", "html"]);

        let repeated = exporter
            .save_brochure(
                "# Acme",
                "Acme",
                "brochure",
                &[ExportFormat::Md, ExportFormat::Md],
            )
            .await
            .unwrap();
        assert_eq!(extensions(&repeated), vec!["md"]);
    }

    #[tokio::test]
    async fn test_pdf_needs_webdriver() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path());

        let result = exporter.save_pdf("# Acme", "Acme", "brochure").await;

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_failed_pdf_keeps_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path()).with_webdriver("http://127.0.0.1:1");

        let direct = exporter.save_pdf("# Acme", "Acme", "brochure").await;
        assert!(matches!(direct, Err(Error::Fetch(_))));

        let paths = exporter
            .save_brochure(
                "# Acme",
                "Acme",
                "brochure",
                &[ExportFormat::Html, ExportFormat::Pdf],
            )
            .await
            .unwrap();
        assert_eq!(extensions(&paths), vec!["md", "html"]);
        assert!(paths.iter().all(|p| p.exists()));
    }
}
