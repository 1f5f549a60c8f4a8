//! Headless-browser rendering through a WebDriver endpoint

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fantoccini::wd::WebDriverCompatibleCommand;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use super::FetchError;

/// W3C "Print Page", which fantoccini has no helper for
#[derive(Debug)]
struct PrintPage;

impl WebDriverCompatibleCommand for PrintPage {
    fn endpoint(&self, base_url: &Url, session_id: Option<&str>) -> Result<Url, url::ParseError> {
        base_url.join(&format!("session/{}/print", session_id.unwrap_or_default()))
    }

    fn method_and_body(&self, _request_url: &Url) -> (http::Method, Option<String>) {
        let body = json!({
            "background": true,
            "orientation": "portrait",
            "page": { "width": 21.0, "height": 29.7 },
        });
        (http::Method::POST, Some(body.to_string()))
    }
}

/// Inline `html` as a `data:` URL so the browser needs no access to our filesystem
pub fn html_data_url(html: &str) -> String {
    format!("data:text/html;charset=utf-8;base64,{}", STANDARD.encode(html))
}

fn chrome_capabilities() -> serde_json::Map<String, serde_json::Value> {
    let mut caps = serde_json::Map::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": ["--headless=new", "--no-sandbox", "--disable-gpu"] }),
    );
    caps
}

async fn navigate(
    client: &Client,
    url: &str,
    render_timeout: Duration,
    settle_time: Duration,
) -> Result<String, FetchError> {
    match tokio::time::timeout(render_timeout, client.goto(url)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(FetchError::Render(format!("navigation to {} failed: {}", url, e))),
        Err(_) => {
            return Err(FetchError::Render(format!(
                "navigation to {} timed out after {:?}",
                url, render_timeout
            )));
        }
    }

    tokio::time::sleep(settle_time).await;

    client
        .source()
        .await
        .map_err(|e| FetchError::Render(format!("reading source of {} failed: {}", url, e)))
}

async fn connect(webdriver_url: &str) -> Result<Client, FetchError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(chrome_capabilities());
    let client = builder.connect(webdriver_url).await.map_err(|e| {
        FetchError::Render(format!(
            "failed to connect to WebDriver at {}: {}",
            webdriver_url, e
        ))
    })?;
    debug!("Connected to WebDriver at {}", webdriver_url);
    Ok(client)
}

async fn close(client: Client) {
    if let Err(e) = client.close().await {
        warn!("Failed to close WebDriver session: {}", e);
    }
}

/// Load `url` in headless Chrome and return the rendered HTML.
pub async fn render(
    webdriver_url: &str,
    url: &str,
    render_timeout: Duration,
    settle_time: Duration,
) -> Result<String, FetchError> {
    let client = connect(webdriver_url).await?;
    let result = navigate(&client, url, render_timeout, settle_time).await;
    close(client).await;
    result
}

async fn print_page(
    client: &Client,
    url: &str,
    render_timeout: Duration,
    settle_time: Duration,
) -> Result<Vec<u8>, FetchError> {
    navigate(client, url, render_timeout, settle_time).await?;

    let value = client
        .issue_cmd(PrintPage)
        .await
        .map_err(|e| FetchError::Render(format!("printing {} failed: {}", url, e)))?;
    let encoded = value
        .as_str()
        .ok_or_else(|| FetchError::Render("print returned no PDF data".to_string()))?;
    STANDARD
        .decode(encoded)
        .map_err(|e| FetchError::Render(format!("invalid PDF data: {}", e)))
}

/// Print a standalone HTML document to PDF with headless Chrome.
pub async fn print_pdf(
    webdriver_url: &str,
    html: &str,
    render_timeout: Duration,
    settle_time: Duration,
) -> Result<Vec<u8>, FetchError> {
    let client = connect(webdriver_url).await?;
    let result = print_page(&client, &html_data_url(html), render_timeout, settle_time).await;
    close(client).await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_request_headless_chrome() {
        let caps = chrome_capabilities();
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
    }

    #[test]
    fn test_print_command_targets_session() {
        let base = Url::parse("http://localhost:4444/").unwrap();
        let endpoint = PrintPage.endpoint(&base, Some("abc123")).unwrap();
        assert_eq!(endpoint.as_str(), "http://localhost:4444/session/abc123/print");

        let (method, body) = PrintPage.method_and_body(&endpoint);
        assert_eq!(method, http::Method::POST);
        let body: serde_json::Value = serde_json::from_str(&body.unwrap()).unwrap();
        assert_eq!(body["background"], true);
    }

    #[test]
    fn test_html_is_inlined_as_data_url() {
        let url = html_data_url("<h1>Acme</h1>");
        let encoded = url
            .strip_prefix("data:text/html;charset=utf-8;base64,")
            .unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), b"<h1>Acme</h1>");
    }

    #[tokio::test]
    async fn test_print_without_webdriver_is_render_error() {
        let result = print_pdf(
            "http://127.0.0.1:1",
            "<h1>Acme</h1>",
            Duration::from_secs(1),
            Duration::ZERO,
        )
        .await;

        assert!(matches!(result, Err(FetchError::Render(_))));
    }

    #[tokio::test]
    async fn test_unreachable_webdriver_is_render_error() {
        let result = render(
            "http://127.0.0.1:1",
            "https://acme.test",
            Duration::from_secs(1),
            Duration::ZERO,
        )
        .await;

        assert!(matches!(result, Err(FetchError::Render(_))));
    }
}
