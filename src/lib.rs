//! # pointb-chef
//!
//! Ingestion chef for the Point B *21st Century Skills Guide*: fetches the
//! two-up scanned guide PDF and the companion videos from pointb.is, crops
//! the scan into single pages, splits it into chapter files, and assembles a
//! channel tree (channel → topics → documents) as a JSON manifest for the
//! external publishing framework.
//!
//! The pipeline is strictly sequential: fetch → crop → chapter split →
//! videos → manifest, and every stage completes before the next begins.
//!
//! ## Usage
//!
//! ```bash
//! pointb-chef run --downloads downloads
//! ```

mod chapter_splitter;
mod config;
mod fetcher;
mod pdf_splitter;
mod tree;
mod video;

pub use chapter_splitter::{english_page_ranges, split_chapters, ChapterFile, PageRange};
pub use config::{ChefConfig, LanguageCode, PdfSource, VideoListing};
pub use fetcher::Fetcher;
pub use pdf_splitter::split_two_up;
pub use tree::{build_channel, write_manifest, ChannelNode, ContentNode};
pub use video::{Video, VideoDownloader, VideoScraper, VideoSource};
