use anyhow::{anyhow, Result};
use colored::*;
use tokio::fs;
use tracing::info;

use crate::config::PdfSource;

/// Downloads the guide PDFs over plain HTTP.
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetches one PDF source. Idempotent by presence: an existing target
    /// file short-circuits the download without issuing any network request
    /// (the existing content is not re-verified). Returns whether a download
    /// actually happened.
    pub async fn fetch_pdf(&self, source: &PdfSource) -> Result<bool> {
        if source.path.exists() {
            info!(
                "PDF already exists, not downloading: {}",
                source.path.display().to_string().blue()
            );
            return Ok(false);
        }

        info!(
            "Downloading PDF {} into {}",
            source.url.as_str().green(),
            source.path.display().to_string().blue()
        );

        let response = self
            .client
            .get(source.url.clone())
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch {}: {}", source.url, e))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP {} fetching {}", response.status(), source.url));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| anyhow!("Failed to read response body from {}: {}", source.url, e))?;

        if let Some(parent) = source.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow!("Failed to create directory {}: {}", parent.display(), e))?;
        }

        fs::write(&source.path, &body)
            .await
            .map_err(|e| anyhow!("Failed to write PDF to {}: {}", source.path.display(), e))?;

        Ok(true)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanguageCode;
    use std::path::Path;
    use url::Url;

    // Port 9 (discard) is never listening, so any attempt to actually issue
    // the request fails fast instead of hitting the real site.
    fn unreachable_source(dir: &Path) -> PdfSource {
        PdfSource {
            url: Url::parse("http://127.0.0.1:9/guide.pdf").unwrap(),
            path: dir.join("guide.pdf"),
            cropped_path: dir.join("guide_cropped.pdf"),
            language: LanguageCode::En,
        }
    }

    #[tokio::test]
    async fn existing_file_skips_the_network_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let source = unreachable_source(dir.path());
        std::fs::write(&source.path, b"%PDF-1.5 cached").unwrap();

        let fetcher = Fetcher::new();
        let downloaded = fetcher.fetch_pdf(&source).await.unwrap();

        assert!(!downloaded);
        // Second call is just as much of a no-op.
        assert!(!fetcher.fetch_pdf(&source).await.unwrap());
        assert_eq!(
            std::fs::read(&source.path).unwrap(),
            b"%PDF-1.5 cached".to_vec()
        );
    }

    #[tokio::test]
    async fn missing_file_attempts_the_download() {
        let dir = tempfile::tempdir().unwrap();
        let source = unreachable_source(dir.path());

        let fetcher = Fetcher::new();
        let result = fetcher.fetch_pdf(&source).await;

        assert!(result.is_err());
        assert!(!source.path.exists());
    }
}
