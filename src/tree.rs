use anyhow::{anyhow, Result};
use colored::*;
use serde::Serialize;
use slug::slugify;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::chapter_splitter::ChapterFile;
use crate::config::{ChefConfig, LanguageCode};

/// License attached to every document in the channel.
#[derive(Debug, Clone, Serialize)]
pub struct License {
    pub name: String,
    pub copyright_holder: String,
}

impl License {
    pub fn cc_by_nc_sa() -> Self {
        Self {
            name: "CC BY-NC-SA".to_string(),
            copyright_holder: "Point B Design and Training".to_string(),
        }
    }
}

/// An on-disk file a document points at.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentFile {
    pub path: PathBuf,
    pub language: LanguageCode,
}

#[derive(Debug, Serialize)]
pub struct TopicNode {
    pub title: String,
    pub source_id: String,
    pub children: Vec<ContentNode>,
}

#[derive(Debug, Serialize)]
pub struct DocumentNode {
    pub title: String,
    pub description: String,
    pub source_id: String,
    pub license: License,
    pub language: LanguageCode,
    pub files: Vec<DocumentFile>,
}

/// One node of the channel tree: topics group children, documents reference
/// actual files.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentNode {
    Topic(TopicNode),
    Document(DocumentNode),
}

/// The channel handed to the publishing framework, which owns validation,
/// upload, and hosting from here on.
#[derive(Debug, Serialize)]
pub struct ChannelNode {
    pub title: String,
    pub source_domain: String,
    pub source_id: String,
    pub language: String,
    pub description: String,
    pub children: Vec<ContentNode>,
}

/// Assembles the full channel tree from the split chapter files. Pure and
/// deterministic; the tree is never mutated after this returns.
pub fn build_channel(config: &ChefConfig, chapters: &[ChapterFile]) -> ChannelNode {
    let english = TopicNode {
        title: "English".to_string(),
        source_id: "21cs_en".to_string(),
        children: chapters
            .iter()
            .map(|chapter| chapter_node(chapter, LanguageCode::En))
            .collect(),
    };

    // The Burmese guide has no published PDF yet; its topic stays empty
    // until the source site ships one.
    let burmese = TopicNode {
        title: "Burmese".to_string(),
        source_id: "21cs_my".to_string(),
        children: Vec::new(),
    };

    ChannelNode {
        title: config.channel.title.clone(),
        source_domain: config.channel.source_domain.clone(),
        source_id: config.channel.source_id.clone(),
        language: config.channel.language.clone(),
        description: config.channel.description.clone(),
        children: vec![ContentNode::Topic(english), ContentNode::Topic(burmese)],
    }
}

/// A sectioned chapter becomes a topic holding the section document plus one
/// document per sub-range; a plain chapter becomes a single document.
fn chapter_node(chapter: &ChapterFile, language: LanguageCode) -> ContentNode {
    if chapter.children.is_empty() {
        return document_node(&chapter.title, &chapter.path, language);
    }

    let mut children = vec![document_node(&chapter.title, &chapter.path, language)];
    children.extend(
        chapter
            .children
            .iter()
            .map(|child| document_node(&child.title, &child.path, language)),
    );

    ContentNode::Topic(TopicNode {
        title: chapter.title.clone(),
        source_id: format!("21cs_{}", slugify(&chapter.title)),
        children,
    })
}

fn document_node(title: &str, file: &Path, language: LanguageCode) -> ContentNode {
    let source_id = file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("unknown.pdf")
        .to_string();

    ContentNode::Document(DocumentNode {
        title: title.to_string(),
        description: title.to_string(),
        source_id,
        license: License::cc_by_nc_sa(),
        language,
        files: vec![DocumentFile {
            path: file.to_path_buf(),
            language,
        }],
    })
}

/// Serializes the channel as the JSON manifest the publishing framework
/// ingests.
pub async fn write_manifest(channel: &ChannelNode, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(channel)
        .map_err(|e| anyhow!("Failed to serialize channel manifest: {}", e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow!("Failed to create directory {}: {}", parent.display(), e))?;
    }
    fs::write(path, json)
        .await
        .map_err(|e| anyhow!("Failed to write manifest to {}: {}", path.display(), e))?;

    info!(
        "Channel manifest written to {}",
        path.display().to_string().blue()
    );
    Ok(())
}
