use anyhow::{anyhow, Result};
use lopdf::Document;
use slug::slugify;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A contiguous, half-open page interval of the cropped guide. Page indexes
/// are 0-based; children must fall inside the parent's interval.
#[derive(Debug, Clone)]
pub struct PageRange {
    pub title: String,
    pub page_start: u32,
    pub page_end: u32,
    pub children: Vec<PageRange>,
}

impl PageRange {
    pub fn new(title: &str, page_start: u32, page_end: u32) -> Self {
        Self {
            title: title.to_string(),
            page_start,
            page_end,
            children: Vec::new(),
        }
    }

    pub fn with_children(
        title: &str,
        page_start: u32,
        page_end: u32,
        children: Vec<PageRange>,
    ) -> Self {
        Self {
            children,
            ..Self::new(title, page_start, page_end)
        }
    }
}

/// A chapter PDF written to disk, mirroring the nesting of the range table.
#[derive(Debug, Clone)]
pub struct ChapterFile {
    pub title: String,
    pub path: PathBuf,
    pub children: Vec<ChapterFile>,
}

/// Chapter table for the cropped English guide. Page numbers index into the
/// cropped single-page PDF, not the two-up scan.
pub fn english_page_ranges() -> Vec<PageRange> {
    vec![
        PageRange::new("Cover", 0, 1),
        PageRange::new("Foreword", 1, 5),
        PageRange::new("Front Matter", 5, 13),
        PageRange::new(
            "Section 1 - Setting a Vision for Your 21st Century Learning Classroom",
            13,
            21,
        ),
        PageRange::with_children(
            "Section 2 - 21st Century Mindsets and Practices",
            21,
            61,
            vec![
                PageRange::new("Mindset #1: Mindfulness", 23, 31),
                PageRange::new("Mindset #2: Curiousity", 31, 37),
                PageRange::new("Mindset #3: Growth", 37, 41),
                PageRange::new("Mindset #4: Empathy", 41, 47),
                PageRange::new("Mindset #5: Appreciation", 47, 51),
                PageRange::new("Mindset #6: Experimentation", 51, 57),
                PageRange::new("Mindset #7: Systems Thinking", 57, 61),
            ],
        ),
        PageRange::new("Section 3 - 21st Century Skills", 61, 69),
        PageRange::new("Section 4 - Self-Discovery", 69, 95),
        PageRange::new(
            "Section 5 - 21st Century Skills Building For Teachers",
            95,
            109,
        ),
        PageRange::new(
            "Section 6 - Integrating 21st Century Skills Into Your Classroom",
            109,
            129,
        ),
        PageRange::new("Classroom Resources", 129, 135),
        PageRange::new("Thanks To Our Teachers", 135, 137),
    ]
}

/// Extracts every range (and sub-range) of `ranges` from the cropped source
/// PDF into its own file under `out_dir`. Filenames are derived from the
/// range's position in the table and its slugified title, so repeated runs
/// produce identical names. Fails on the first out-of-bounds range; the
/// caller is expected to abort the rest of the pipeline.
pub fn split_chapters(
    source: &Path,
    out_dir: &Path,
    ranges: &[PageRange],
) -> Result<Vec<ChapterFile>> {
    info!("Splitting chapters for {}", source.display());

    let doc = Document::load(source)
        .map_err(|e| anyhow!("Failed to parse PDF file {}: {}", source.display(), e))?;
    let page_count = doc.get_pages().len() as u32;

    std::fs::create_dir_all(out_dir)
        .map_err(|e| anyhow!("Failed to create directory {}: {}", out_dir.display(), e))?;

    let mut chapters = Vec::with_capacity(ranges.len());
    for (index, range) in ranges.iter().enumerate() {
        let path = out_dir.join(format!("{}-{}.pdf", index, slugify(&range.title)));
        extract_range(&doc, range, page_count, &path)?;

        let mut children = Vec::with_capacity(range.children.len());
        for (child_index, child) in range.children.iter().enumerate() {
            let child_path = out_dir.join(format!(
                "{}-{}-{}.pdf",
                index,
                child_index,
                slugify(&child.title)
            ));
            extract_range(&doc, child, page_count, &child_path)?;
            children.push(ChapterFile {
                title: child.title.clone(),
                path: child_path,
                children: Vec::new(),
            });
        }

        chapters.push(ChapterFile {
            title: range.title.clone(),
            path,
            children,
        });
    }

    let total: usize = chapters.iter().map(|c| 1 + c.children.len()).sum();
    info!("Split {} into {} chapter files", source.display(), total);
    Ok(chapters)
}

/// Writes pages `[page_start, page_end)` of `doc` to `path`.
fn extract_range(doc: &Document, range: &PageRange, page_count: u32, path: &Path) -> Result<()> {
    if range.page_start >= range.page_end {
        return Err(anyhow!(
            "Page range '{}' is empty ({}..{})",
            range.title,
            range.page_start,
            range.page_end
        ));
    }
    if range.page_end > page_count {
        return Err(anyhow!(
            "Page range '{}' ends at page {} but the document has only {} pages",
            range.title,
            range.page_end,
            page_count
        ));
    }

    // delete_pages wants 1-based page numbers; the table is 0-based and
    // half-open.
    let excluded: Vec<u32> = (1..=page_count)
        .filter(|page| *page <= range.page_start || *page > range.page_end)
        .collect();

    let mut part = doc.clone();
    part.delete_pages(&excluded);
    part.save(path)
        .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;

    debug!(
        "Wrote pages {}..{} to {}",
        range.page_start,
        range.page_end,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_splitter::sample_document;

    fn saved_source(dir: &Path, num_pages: usize) -> PathBuf {
        let path = dir.join("cropped.pdf");
        let mut doc = sample_document(num_pages, 400, 600);
        doc.save(&path).unwrap();
        path
    }

    fn page_count(path: &Path) -> usize {
        Document::load(path).unwrap().get_pages().len()
    }

    #[test]
    fn extracted_chapters_have_the_range_page_counts() {
        let dir = tempfile::tempdir().unwrap();
        let source = saved_source(dir.path(), 20);
        let ranges = vec![
            PageRange::new("Opening", 0, 5),
            PageRange::new("Closing", 5, 13),
        ];

        let chapters = split_chapters(&source, &dir.path().join("split"), &ranges).unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(page_count(&chapters[0].path), 5);
        assert_eq!(page_count(&chapters[1].path), 8);
    }

    #[test]
    fn filenames_come_from_position_and_title() {
        let dir = tempfile::tempdir().unwrap();
        let source = saved_source(dir.path(), 10);
        let ranges = vec![PageRange::with_children(
            "Section 2 - Mindsets",
            0,
            10,
            vec![PageRange::new("Mindset #1: Mindfulness", 2, 4)],
        )];

        let chapters = split_chapters(&source, &dir.path().join("split"), &ranges).unwrap();

        assert_eq!(
            chapters[0].path.file_name().unwrap(),
            "0-section-2-mindsets.pdf"
        );
        assert_eq!(
            chapters[0].children[0].path.file_name().unwrap(),
            "0-0-mindset-1-mindfulness.pdf"
        );
    }

    #[test]
    fn out_of_bounds_range_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = saved_source(dir.path(), 10);
        let ranges = vec![PageRange::new("Too Far", 5, 25)];

        assert!(split_chapters(&source, &dir.path().join("split"), &ranges).is_err());
    }

    #[test]
    fn empty_range_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = saved_source(dir.path(), 10);
        let ranges = vec![PageRange::new("Backwards", 5, 5)];

        assert!(split_chapters(&source, &dir.path().join("split"), &ranges).is_err());
    }

    #[test]
    fn guide_table_emits_eighteen_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = saved_source(dir.path(), 137);
        let out_dir = dir.path().join("split");

        let chapters = split_chapters(&source, &out_dir, &english_page_ranges()).unwrap();

        assert_eq!(chapters.len(), 11);
        let total: usize = chapters.iter().map(|c| 1 + c.children.len()).sum();
        assert_eq!(total, 18);

        let written = std::fs::read_dir(&out_dir).unwrap().count();
        assert_eq!(written, 18);
    }

    #[test]
    fn guide_table_ranges_are_well_formed() {
        for range in english_page_ranges() {
            assert!(range.page_start < range.page_end, "{}", range.title);
            for child in &range.children {
                assert!(child.page_start < child.page_end, "{}", child.title);
                assert!(
                    child.page_start >= range.page_start && child.page_end <= range.page_end,
                    "{} escapes {}",
                    child.title,
                    range.title
                );
            }
        }
    }
}
