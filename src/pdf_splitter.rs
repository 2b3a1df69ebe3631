use anyhow::{anyhow, Result};
use lopdf::{Document, Object, ObjectId};
use std::path::Path;
use tracing::{debug, info};

/// Width of the binder shadow trimmed off the spine edge of the first sheet
/// and the outer edge of the last sheet.
pub const BINDER_EDGE_WIDTH: f32 = 40.0;

/// Half of the binder gutter removed between the two halves of a middle
/// sheet.
pub const GUTTER_HALF_WIDTH: f32 = 20.0;

// These constants are calibrated for the one known 21CS Guide scan and are
// not a general two-up splitting geometry.

/// Splits a two-pages-per-sheet scan into single pages, trimming the binder
/// margins. Every sheet contributes its left and right half in reading
/// order, except the first sheet whose left half (the cover backing) is
/// dropped, so an N-sheet input yields `2N - 1` pages. Returns the emitted
/// page count.
pub fn split_two_up(input: &Path, output: &Path) -> Result<usize> {
    let mut doc = Document::load(input)
        .map_err(|e| anyhow!("Failed to parse PDF file {}: {}", input.display(), e))?;

    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    let num_pages = pages.len();
    if num_pages == 0 {
        return Err(anyhow!("{} has no pages to split", input.display()));
    }

    let mut emitted: Vec<ObjectId> = Vec::with_capacity(num_pages * 2);

    for (index, &page_id) in pages.iter().enumerate() {
        let is_first = index == 0;
        let is_last = index + 1 == num_pages;

        let media_box = page_media_box(&doc, page_id)?;
        let [llx, lly, urx, ury] = media_box;
        let half = urx / 2.0;

        // The right page is a duplicate of the sheet with a narrower box; the
        // left page reuses the original page object.
        let mut right_box = media_box;
        right_box[0] = if is_first {
            // Binder sits on the left of the first sheet, so the trim at the
            // spine is wider than the usual half gutter.
            half + BINDER_EDGE_WIDTH
        } else {
            half + GUTTER_HALF_WIDTH
        };
        if is_last {
            // Binder on the right: pull the outer edge in.
            right_box[2] = urx - BINDER_EDGE_WIDTH;
        }

        let mut right_dict = doc
            .get_dictionary(page_id)
            .map_err(|e| anyhow!("Malformed page dictionary in {}: {}", input.display(), e))?
            .clone();
        right_dict.set("MediaBox", box_object(right_box));
        let right_id = doc.add_object(Object::Dictionary(right_dict));

        if !is_first {
            let left_box = [llx, lly, half - GUTTER_HALF_WIDTH, ury];
            set_media_box(&mut doc, page_id, left_box)?;
            emitted.push(page_id);
        }
        emitted.push(right_id);
    }

    let emitted_count = emitted.len();
    rebuild_page_tree(&mut doc, emitted)?;
    log_page_geometry(&doc);

    doc.save(output)
        .map_err(|e| anyhow!("Failed to write {}: {}", output.display(), e))?;

    info!(
        "Split {} two-up sheets into {} single pages",
        num_pages, emitted_count
    );
    Ok(emitted_count)
}

/// Logs every page's media box, mirroring the geometry dump used when the
/// binder constants were calibrated against the source scan.
pub fn log_page_geometry(doc: &Document) {
    for (page_num, page_id) in doc.get_pages() {
        match page_media_box(doc, page_id) {
            Ok(media_box) => debug!("page {} media box {:?}", page_num, media_box),
            Err(e) => debug!("page {} has no readable media box: {}", page_num, e),
        }
    }
}

/// Reads a page's media box, falling back to the page tree root when the box
/// is inherited.
fn page_media_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| anyhow!("Failed to load page {:?}: {}", page_id, e))?;

    let object = match page.get(b"MediaBox") {
        Ok(object) => object,
        Err(_) => {
            let parent_id = match page.get(b"Parent") {
                Ok(Object::Reference(id)) => *id,
                _ => return Err(anyhow!("Page {:?} has no MediaBox and no Parent", page_id)),
            };
            doc.get_dictionary(parent_id)
                .map_err(|e| anyhow!("Failed to load page tree node {:?}: {}", parent_id, e))?
                .get(b"MediaBox")
                .map_err(|_| anyhow!("Page {:?} inherits no MediaBox", page_id))?
        }
    };

    let values = match object {
        Object::Array(values) => values,
        _ => return Err(anyhow!("MediaBox of page {:?} is not an array", page_id)),
    };
    if values.len() != 4 {
        return Err(anyhow!(
            "MediaBox of page {:?} has {} entries, expected 4",
            page_id,
            values.len()
        ));
    }

    let mut media_box = [0.0f32; 4];
    for (slot, value) in media_box.iter_mut().zip(values) {
        *slot = match value {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r,
            _ => return Err(anyhow!("Non-numeric MediaBox entry in page {:?}", page_id)),
        };
    }
    Ok(media_box)
}

fn set_media_box(doc: &mut Document, page_id: ObjectId, media_box: [f32; 4]) -> Result<()> {
    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| anyhow!("Failed to load page {:?}: {}", page_id, e))?;
    if let Object::Dictionary(ref mut dict) = page {
        dict.set("MediaBox", box_object(media_box));
        Ok(())
    } else {
        Err(anyhow!("Page {:?} is not a dictionary", page_id))
    }
}

fn box_object(media_box: [f32; 4]) -> Object {
    Object::Array(media_box.iter().map(|v| Object::Real(*v)).collect())
}

/// Points the document's page tree at `kids`, in order, and fixes the page
/// count to match.
fn rebuild_page_tree(doc: &mut Document, kids: Vec<ObjectId>) -> Result<()> {
    let pages_id = {
        let catalog = doc
            .catalog()
            .map_err(|e| anyhow!("Failed to read PDF catalog: {}", e))?;
        match catalog.get(b"Pages") {
            Ok(Object::Reference(id)) => *id,
            _ => return Err(anyhow!("PDF catalog has no Pages reference")),
        }
    };

    let count = kids.len() as i64;
    let pages_obj = doc
        .get_object_mut(pages_id)
        .map_err(|e| anyhow!("Failed to load Pages object: {}", e))?;
    if let Object::Dictionary(ref mut pages_dict) = pages_obj {
        pages_dict.set(
            "Kids",
            Object::Array(kids.into_iter().map(Object::Reference).collect()),
        );
        pages_dict.set("Count", Object::Integer(count));
        Ok(())
    } else {
        Err(anyhow!("Pages object is not a dictionary"))
    }
}

/// Builds a minimal document with `num_pages` identical pages, used by the
/// splitter and chapter tests.
#[cfg(test)]
pub(crate) fn sample_document(num_pages: usize, width: i64, height: i64) -> Document {
    use lopdf::dictionary;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..num_pages)
        .map(|_| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ],
            });
            Object::Reference(page_id)
        })
        .collect();
    let count = kids.len() as i64;

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_fixture(num_pages: usize, width: i64, height: i64) -> Document {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("two_up.pdf");
        let output = dir.path().join("cropped.pdf");

        let mut doc = sample_document(num_pages, width, height);
        doc.save(&input).unwrap();

        let emitted = split_two_up(&input, &output).unwrap();
        let cropped = Document::load(&output).unwrap();
        assert_eq!(cropped.get_pages().len(), emitted);
        cropped
    }

    fn boxes(doc: &Document) -> Vec<[f32; 4]> {
        doc.get_pages()
            .values()
            .map(|&id| page_media_box(doc, id).unwrap())
            .collect()
    }

    #[test]
    fn emits_two_n_minus_one_pages() {
        let cropped = split_fixture(5, 800, 600);
        assert_eq!(cropped.get_pages().len(), 9);
    }

    #[test]
    fn middle_sheets_lose_the_gutter_on_both_halves() {
        let cropped = split_fixture(5, 800, 600);
        let boxes = boxes(&cropped);

        // Sheet 1 is the first middle sheet: its halves sit at indexes 1 and 2
        // of the output (index 0 is the first sheet's right half).
        assert_eq!(boxes[1], [0.0, 0.0, 380.0, 600.0]);
        assert_eq!(boxes[2], [420.0, 0.0, 800.0, 600.0]);
    }

    #[test]
    fn two_sheet_guide_yields_three_pages_with_binder_trims() {
        let cropped = split_fixture(2, 800, 600);
        let boxes = boxes(&cropped);
        assert_eq!(boxes.len(), 3);

        // First sheet: only the right half survives, trimmed at the spine.
        assert_eq!(boxes[0], [440.0, 0.0, 800.0, 600.0]);
        // Last sheet: normal left half, right half loses 40 units at the
        // outer edge.
        assert_eq!(boxes[1], [0.0, 0.0, 380.0, 600.0]);
        assert_eq!(boxes[2], [420.0, 0.0, 760.0, 600.0]);
    }

    #[test]
    fn empty_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.pdf");
        let output = dir.path().join("cropped.pdf");

        let mut doc = sample_document(0, 800, 600);
        doc.save(&input).unwrap();

        assert!(split_two_up(&input, &output).is_err());
    }
}
