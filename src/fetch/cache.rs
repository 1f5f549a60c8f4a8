//! On-disk HTML cache keyed by the SHA-256 of the URL

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use super::FetchError;

/// Flat directory of `<sha256(url)>.html` files
#[derive(Debug, Clone)]
pub struct HtmlCache {
    dir: PathBuf,
}

impl HtmlCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the cached body of `url`
    pub fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{}.html", hex::encode(digest)))
    }

    /// Age of the cached entry, if there is one
    pub async fn age(&self, url: &str) -> Option<Duration> {
        let metadata = fs::metadata(self.path_for(url)).await.ok()?;
        let modified = metadata.modified().ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    /// Whether an entry exists and is younger than `max_age`
    pub async fn is_fresh(&self, url: &str, max_age: Duration) -> bool {
        matches!(self.age(url).await, Some(age) if age < max_age)
    }

    /// Cached body, if present and readable
    pub async fn load(&self, url: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(url)).await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!("Cache miss for {}: {}", url, e);
                None
            }
        }
    }

    pub async fn store(&self, url: &str, html: &str) -> Result<(), FetchError> {
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.path_for(url), html).await?;
        Ok(())
    }
}

/// Render a cache age as `"<hours>h <minutes>m"`
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HtmlCache::new(dir.path().join("nested"));
        let url = "https://acme.test/about";

        assert!(cache.load(url).await.is_none());
        assert!(!cache.is_fresh(url, Duration::from_secs(3600)).await);

        cache.store(url, "<html>about</html>").await.unwrap();

        assert_eq!(cache.load(url).await.as_deref(), Some("<html>about</html>"));
        assert!(cache.is_fresh(url, Duration::from_secs(12 * 3600)).await);
        assert!(!cache.is_fresh(url, Duration::ZERO).await);
    }

    #[test]
    fn test_path_is_hex_digest() {
        let cache = HtmlCache::new("data");
        let path = cache.path_for("https://acme.test");
        let name = path.file_name().unwrap().to_str().unwrap();

        assert_eq!(name.len(), 64 + ".html".len());
        assert!(name.ends_with(".html"));
        assert_ne!(path, cache.path_for("https://acme.test/"));
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(0)), "0h 0m");
        assert_eq!(format_age(Duration::from_secs(3 * 3600 + 25 * 60 + 59)), "3h 25m");
    }
}
