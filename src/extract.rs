//! Content extraction: title, cleaned body text and raw outbound links

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Upper bound on extracted text, in characters
pub const MAX_TEXT_CHARS: usize = 12_000;

/// Title used when a page has none
pub const UNTITLED: &str = "Untitled";

/// Subtrees whose text never reaches the extracted body
const EXCLUDED_ELEMENTS: &[&str] = &[
    "script", "style", "img", "input", "noscript", "svg", "footer", "nav", "aside",
];

/// What the extractor pulls out of one HTML document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub title: String,
    pub text: String,
    /// `href` values in document order, unresolved
    pub links: Vec<String>,
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Failed to parse selector '{}': {}", css, e);
            None
        }
    }
}

/// Parse `html` into title, body text and links.
///
/// Body text is every non-blank text node outside the excluded elements,
/// trimmed and joined with newlines, then cut to `MAX_TEXT_CHARS`.
pub fn extract_content(html: &str) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = selector("title")
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .map(|element| element.text().collect::<String>())
        })
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let links = selector("a[href]")
        .map(|s| {
            document
                .select(&s)
                .filter_map(|element| element.value().attr("href"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let body = selector("body").and_then(|s| document.select(&s).next());
    let mut parts: Vec<&str> = Vec::new();
    if let Some(body) = body {
        for node in body.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let excluded = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| EXCLUDED_ELEMENTS.contains(&element.name()))
            });
            if excluded {
                continue;
            }
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }

    let text: String = parts.join("\n").chars().take(MAX_TEXT_CHARS).collect();

    ExtractedPage { title, text, links }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_title_text_and_links() {
        let html = r##"
            <html>
              <head><title>  Acme Corp </title><style>body { color: red }</style></head>
              <body>
                <nav><a href="/about">About</a></nav>
                <h1>Welcome to Acme</h1>
                <p>We build   rockets.</p>
                <script>var hidden = "no";</script>
                <aside>Sidebar</aside>
                <p>Join us <a href="https://acme.test/careers">here</a></p>
                <footer>Copyright <a href="#top">top</a></footer>
              </body>
            </html>
        "##;

        let page = extract_content(html);

        assert_eq!(page.title, "Acme Corp");
        assert_eq!(
            page.links,
            vec!["/about", "https://acme.test/careers", "#top"]
        );
        assert_eq!(
            page.text,
            "Welcome to Acme\nWe build   rockets.\nJoin us\nhere"
        );
    }

    #[test]
    fn test_missing_title() {
        let page = extract_content("<html><body><p>Hello</p></body></html>");
        assert_eq!(page.title, UNTITLED);
        assert_eq!(page.text, "Hello");
        assert!(page.links.is_empty());
    }

    #[test]
    fn test_text_is_truncated() {
        let long = "x".repeat(MAX_TEXT_CHARS + 500);
        let page = extract_content(&format!("<html><body><p>{}</p></body></html>", long));
        assert_eq!(page.text.chars().count(), MAX_TEXT_CHARS);
    }
}
