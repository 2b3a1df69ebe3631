use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Root of the source site everything below is fetched from.
pub const POINTB_URL: &str = "http://www.pointb.is/";

/// Languages the source site publishes the guide in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    En,
    My,
}

impl LanguageCode {
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::My => "my",
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One guide PDF to fetch and crop.
#[derive(Debug, Clone)]
pub struct PdfSource {
    pub url: Url,
    pub path: PathBuf,
    pub cropped_path: PathBuf,
    pub language: LanguageCode,
}

/// One listing page with embedded videos.
#[derive(Debug, Clone)]
pub struct VideoListing {
    pub url: Url,
    pub language: LanguageCode,
    pub filename_prefix: String,
}

/// Fixed channel metadata handed to the publishing framework.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub title: String,
    pub source_domain: String,
    pub source_id: String,
    pub language: String,
    pub description: String,
}

/// Immutable configuration built once at startup and passed explicitly to
/// every pipeline stage. URLs, paths, and language codes all live here so no
/// stage depends on process-wide state.
#[derive(Debug, Clone)]
pub struct ChefConfig {
    pub downloads_dir: PathBuf,
    pub split_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub pdfs: Vec<PdfSource>,
    pub video_listings: Vec<VideoListing>,
    pub channel: ChannelInfo,
}

impl ChefConfig {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Result<Self> {
        let downloads_dir = downloads_dir.into();
        let base_url = Url::parse(POINTB_URL)?;

        // The Burmese guide exists on the site only as videos; the PDF list
        // stays English-only until a Burmese scan is published.
        let pdfs = vec![PdfSource {
            url: base_url.join("s/21CSGuide_English.pdf")?,
            path: downloads_dir.join("21CSGuide_English.pdf"),
            cropped_path: downloads_dir.join("21CSGuide_English_cropped.pdf"),
            language: LanguageCode::En,
        }];

        let video_listings = vec![
            VideoListing {
                url: base_url.join("21cs-videos")?,
                language: LanguageCode::En,
                filename_prefix: video_filename_prefix(LanguageCode::En),
            },
            VideoListing {
                url: base_url.join("21cs-videos-mm")?,
                language: LanguageCode::My,
                filename_prefix: video_filename_prefix(LanguageCode::My),
            },
        ];

        Ok(Self {
            split_dir: downloads_dir.join("21CSGuide_English_split"),
            manifest_path: downloads_dir.join("channel.json"),
            pdfs,
            video_listings,
            channel: ChannelInfo {
                title: "PointB 21CS Guide".to_string(),
                source_domain: "pointb.is".to_string(),
                source_id: "21csguide".to_string(),
                language: "mul".to_string(),
                description: "Guide To Becoming A 21St Century Teacher".to_string(),
            },
            downloads_dir,
        })
    }
}

fn video_filename_prefix(language: LanguageCode) -> String {
    format!("pointb21cs-video-{}-", language.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_urls_and_paths_from_downloads_dir() {
        let config = ChefConfig::new("downloads").unwrap();

        assert_eq!(config.pdfs.len(), 1);
        let pdf = &config.pdfs[0];
        assert_eq!(
            pdf.url.as_str(),
            "http://www.pointb.is/s/21CSGuide_English.pdf"
        );
        assert_eq!(pdf.path, PathBuf::from("downloads/21CSGuide_English.pdf"));
        assert_eq!(
            pdf.cropped_path,
            PathBuf::from("downloads/21CSGuide_English_cropped.pdf")
        );
        assert_eq!(
            config.split_dir,
            PathBuf::from("downloads/21CSGuide_English_split")
        );
        assert_eq!(config.manifest_path, PathBuf::from("downloads/channel.json"));
    }

    #[test]
    fn video_listings_cover_both_languages() {
        let config = ChefConfig::new("downloads").unwrap();

        let urls: Vec<&str> = config
            .video_listings
            .iter()
            .map(|listing| listing.url.as_str())
            .collect();
        assert_eq!(
            urls,
            vec![
                "http://www.pointb.is/21cs-videos",
                "http://www.pointb.is/21cs-videos-mm",
            ]
        );
        assert_eq!(
            config.video_listings[0].filename_prefix,
            "pointb21cs-video-en-"
        );
        assert_eq!(
            config.video_listings[1].filename_prefix,
            "pointb21cs-video-my-"
        );
    }

    #[test]
    fn channel_metadata_is_fixed() {
        let config = ChefConfig::new("downloads").unwrap();
        assert_eq!(config.channel.source_domain, "pointb.is");
        assert_eq!(config.channel.language, "mul");
    }
}
