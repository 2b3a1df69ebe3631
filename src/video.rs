use anyhow::{anyhow, Result};
use colored::*;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::{LanguageCode, VideoListing};

/// Format handed to yt-dlp: mp4 capped at 480p, the largest the publishing
/// platform accepts for low-bandwidth deployments.
const VIDEO_FORMAT: &str =
    "bestvideo[height<=480][ext=mp4]+bestaudio[ext=m4a]/best[height<=480][ext=mp4]";

/// A playable video URL recovered from a listing page, before download.
#[derive(Debug, Clone)]
pub struct VideoSource {
    pub url: String,
    pub language: LanguageCode,
    pub filename_prefix: String,
}

/// A downloaded video with the metadata the extractor reported for it.
#[derive(Debug, Clone)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub language: LanguageCode,
    pub filename_prefix: String,
}

/// Scrapes listing pages for embedded player URLs.
pub struct VideoScraper {
    client: reqwest::Client,
}

impl VideoScraper {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn scrape_listing(&self, listing: &VideoListing) -> Result<Vec<VideoSource>> {
        info!("Scraping {}", listing.url.as_str().green());

        let response = self
            .client
            .get(listing.url.clone())
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch {}: {}", listing.url, e))?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP {} fetching {}", response.status(), listing.url));
        }

        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read {}: {}", listing.url, e))?;
        Ok(collect_video_sources(&body, listing))
    }
}

impl Default for VideoScraper {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks every `div.content-inner` block of a listing page. A structural
/// mismatch in any block stops the walk and returns what was collected so
/// far; a page without matching blocks yields an empty list, not an error.
pub fn collect_video_sources(html: &str, listing: &VideoListing) -> Vec<VideoSource> {
    let document = Html::parse_document(html);
    let content_selector = Selector::parse("div.content-inner").unwrap();

    let mut sources = Vec::new();
    for content_div in document.select(&content_selector) {
        match embedded_player_url(&content_div) {
            Ok(url) => sources.push(VideoSource {
                url,
                language: listing.language,
                filename_prefix: listing.filename_prefix.clone(),
            }),
            Err(e) => {
                warn!("Stopping scrape of {}: {}", listing.url, e);
                break;
            }
        }
    }
    sources
}

/// Digs the player URL out of one content block: video block → Squarespace
/// video wrapper → `data-html` attribute, whose value is escaped iframe
/// markup that has to be decoded and parsed again.
fn embedded_player_url(content_div: &ElementRef<'_>) -> Result<String> {
    let block_selector = Selector::parse("div.video-block").unwrap();
    let wrapper_selector = Selector::parse("div.sqs-video-wrapper").unwrap();
    let iframe_selector = Selector::parse("iframe").unwrap();

    let block = content_div
        .select(&block_selector)
        .next()
        .ok_or_else(|| anyhow!("content block has no video block"))?;
    let wrapper = block
        .select(&wrapper_selector)
        .next()
        .ok_or_else(|| anyhow!("video block has no video wrapper"))?;
    let data_html = wrapper
        .value()
        .attr("data-html")
        .ok_or_else(|| anyhow!("video wrapper has no data-html attribute"))?;

    let fragment = Html::parse_fragment(&unescape_entities(data_html));
    let iframe = fragment
        .select(&iframe_selector)
        .next()
        .ok_or_else(|| anyhow!("no iframe in embedded player markup"))?;
    let src = iframe
        .value()
        .attr("src")
        .ok_or_else(|| anyhow!("embedded iframe has no src"))?;
    Ok(src.to_string())
}

/// Decodes the entities Squarespace uses when it inlines player markup into
/// an attribute value.
fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Subset of yt-dlp's info JSON kept for the channel records.
#[derive(Debug, Deserialize)]
struct VideoInfo {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

/// Drives the external yt-dlp binary, one video at a time.
pub struct VideoDownloader;

impl VideoDownloader {
    pub fn new() -> Self {
        Self
    }

    /// Downloads one video into the working directory as
    /// `{filename_prefix}{id}.{ext}`, alongside its thumbnail, and returns a
    /// record carrying the metadata the extractor reported. Any extractor
    /// failure surfaces as an error; the caller logs it and moves on to the
    /// next video.
    pub async fn download(&self, source: &VideoSource) -> Result<Video> {
        let output_template = format!("{}%(id)s.%(ext)s", source.filename_prefix);
        info!("Downloading video from {}", source.url.green());

        let output = Command::new("yt-dlp")
            .arg("--no-warnings")
            .arg("--no-continue")
            .arg("--restrict-filenames")
            .arg("--write-thumbnail")
            .arg("--print-json")
            .args(["--format", VIDEO_FORMAT])
            .args(["--output", &output_template])
            .arg(&source.url)
            .output()
            .await
            .map_err(|e| anyhow!("Failed to run yt-dlp: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "yt-dlp failed for {}: {}",
                source.url,
                stderr.trim()
            ));
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| anyhow!("Failed to parse yt-dlp info JSON for {}: {}", source.url, e))?;

        Ok(Video {
            id: info.id,
            title: info.title,
            description: info.description,
            url: source.url.clone(),
            language: source.language,
            filename_prefix: source.filename_prefix.clone(),
        })
    }
}

impl Default for VideoDownloader {
    fn default() -> Self {
        Self::new()
    }
}
