use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use pointb_chef::{
    build_channel, english_page_ranges, split_chapters, split_two_up, write_manifest, ChapterFile,
    ChefConfig, Fetcher, LanguageCode, Video, VideoDownloader, VideoScraper,
};
use std::process;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pointb-chef")]
#[command(about = "Ingests the Point B 21CS guide and builds a channel tree for publishing")]
#[command(version = "0.1.0")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline: PDFs, videos, and the channel manifest
    Run {
        /// Directory used to store downloaded and split files
        #[arg(short = 'd', long = "downloads", default_value = "downloads")]
        downloads_dir: String,
    },
    /// Fetch and split the guide PDFs only
    Pdfs {
        /// Directory used to store downloaded and split files
        #[arg(short = 'd', long = "downloads", default_value = "downloads")]
        downloads_dir: String,
    },
    /// Scrape and download the companion videos only
    Videos {
        /// Directory used to store downloaded and split files
        #[arg(short = 'd', long = "downloads", default_value = "downloads")]
        downloads_dir: String,
    },
}

/// Fetches every declared PDF, crops the two-up scan, and splits the English
/// guide into chapters. Any failure aborts the stage.
async fn run_pdf_stage(config: &ChefConfig) -> Result<Vec<ChapterFile>> {
    let fetcher = Fetcher::new();
    let mut chapters = Vec::new();

    for source in &config.pdfs {
        fetcher.fetch_pdf(source).await?;

        info!(
            "Cropping two-up pages of {}",
            source.path.display().to_string().blue()
        );
        split_two_up(&source.path, &source.cropped_path)?;

        // Only the English guide has a chapter table.
        if source.language == LanguageCode::En {
            chapters = split_chapters(
                &source.cropped_path,
                &config.split_dir,
                &english_page_ranges(),
            )?;
        }
    }

    Ok(chapters)
}

/// Scrapes each listing page and downloads every video found. A failing
/// listing or video is logged and skipped; the stage itself never fails.
async fn run_video_stage(config: &ChefConfig) -> Result<Vec<Video>> {
    let scraper = VideoScraper::new();
    let downloader = VideoDownloader::new();
    let mut downloaded = Vec::new();

    for listing in &config.video_listings {
        let sources = match scraper.scrape_listing(listing).await {
            Ok(sources) => sources,
            Err(e) => {
                error!("Failed to scrape {}: {}", listing.url, e);
                continue;
            }
        };
        info!(
            "Found {} videos on {}",
            sources.len(),
            listing.url.as_str().green()
        );

        for (index, source) in sources.iter().enumerate() {
            info!("{}/{}: {}", index + 1, sources.len(), source.url.green());
            match downloader.download(source).await {
                // A finished download is only recorded; video nodes are not
                // part of the channel tree yet.
                Ok(video) => {
                    info!("Downloaded video {} ({})", video.id, video.title);
                    downloaded.push(video);
                }
                Err(e) => error!("Failed to download {}: {}", source.url, e),
            }
        }
        info!("Done downloading videos for {}", listing.url);
    }

    Ok(downloaded)
}

async fn run_all(downloads_dir: &str) -> Result<()> {
    let config = ChefConfig::new(downloads_dir)?;

    let chapters = run_pdf_stage(&config).await?;
    let videos = run_video_stage(&config).await?;
    info!("Downloaded {} videos", videos.len());

    let channel = build_channel(&config, &chapters);
    write_manifest(&channel, &config.manifest_path).await?;
    Ok(())
}

async fn run_pdfs(downloads_dir: &str) -> Result<()> {
    let config = ChefConfig::new(downloads_dir)?;
    run_pdf_stage(&config).await?;
    Ok(())
}

async fn run_videos(downloads_dir: &str) -> Result<()> {
    let config = ChefConfig::new(downloads_dir)?;
    let videos = run_video_stage(&config).await?;
    info!("Downloaded {} videos", videos.len());
    Ok(())
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::from_default_env()
        .add_directive("pointb_chef=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Run { downloads_dir } => run_all(&downloads_dir).await,
        Commands::Pdfs { downloads_dir } => run_pdfs(&downloads_dir).await,
        Commands::Videos { downloads_dir } => run_videos(&downloads_dir).await,
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        process::exit(1);
    }
}
