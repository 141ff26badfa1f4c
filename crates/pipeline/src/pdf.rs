//! PDF inspection and page splicing on top of [`lopdf`].

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

/// Error type for PDF operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("invalid PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Depth guard for malformed, cyclic page trees.
const MAX_TREE_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Join per-page text with `--- Page n ---` markers (1-based).
pub fn format_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut out = String::new();
    for (i, text) in pages.into_iter().enumerate() {
        out.push_str(&format!("\n--- Page {} ---\n{}", i + 1, text));
    }
    out.trim().to_string()
}

/// Whether the PDF carries no extractable text on any page.
///
/// A document that cannot be parsed is treated as scanned so it still goes
/// through OCR.
pub fn is_scanned_pdf(bytes: &[u8]) -> bool {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(error = %e, "PDF scan detection failed, assuming scanned");
            return true;
        }
    };

    !doc.get_pages().keys().any(|&page| {
        doc.extract_text(&[page])
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false)
    })
}

/// Native text of every page, joined with page markers.
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfError> {
    let doc = Document::load_mem(bytes)?;
    let page_map = doc.get_pages();
    let pages = page_map.keys().map(|&page| {
        doc.extract_text(&[page]).unwrap_or_else(|e| {
            tracing::warn!(page, error = %e, "Text extraction failed for page");
            String::new()
        })
    });
    Ok(format_pages(pages.collect::<Vec<_>>()))
}

pub fn page_count(bytes: &[u8]) -> Result<usize, PdfError> {
    Ok(Document::load_mem(bytes)?.get_pages().len())
}

// ---------------------------------------------------------------------------
// Page replacement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The original document has no such page.
    NotInOriginal,
    /// The replacement document has no such page.
    NotInReplacement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPage {
    pub page: u32,
    pub reason: SkipReason,
}

/// What [`replace_pages`] did with each requested page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceReport {
    pub replaced: Vec<u32>,
    pub skipped: Vec<SkippedPage>,
}

/// Replace page `n` of `original` with page `n` of `replacement` for every
/// `n` in `pages` (1-based).
///
/// Pages missing from either document are skipped with a warning. All other
/// pages of the original are left untouched. Returns the rewritten PDF.
pub fn replace_pages(
    original: &[u8],
    replacement: &[u8],
    pages: &[u32],
) -> Result<(Vec<u8>, ReplaceReport), PdfError> {
    let mut target = Document::load_mem(original)?;
    let mut source = Document::load_mem(replacement)?;

    // Move the source object ids past the target's so both can share one table.
    source.renumber_objects_with(target.max_id + 1);

    let target_pages = target.get_pages();
    let source_pages = source.get_pages();
    let mut report = ReplaceReport::default();
    let mut swaps: Vec<(ObjectId, Dictionary)> = Vec::new();

    for &page in pages {
        let Some(&target_id) = target_pages.get(&page) else {
            tracing::warn!(page, "Page not in original document, skipping");
            report.skipped.push(SkippedPage {
                page,
                reason: SkipReason::NotInOriginal,
            });
            continue;
        };
        let Some(&source_id) = source_pages.get(&page) else {
            tracing::warn!(page, "Page not in replacement document, skipping");
            report.skipped.push(SkippedPage {
                page,
                reason: SkipReason::NotInReplacement,
            });
            continue;
        };

        let mut page_dict = source.get_dictionary(source_id)?.clone();
        for (key, value) in inherited_attributes(&source, &page_dict) {
            page_dict.set(key, value);
        }
        let parent = target.get_dictionary(target_id)?.get(b"Parent")?.clone();
        page_dict.set("Parent", parent);

        swaps.push((target_id, page_dict));
        report.replaced.push(page);
    }

    if swaps.is_empty() {
        return Ok((original.to_vec(), report));
    }

    target.max_id = target.max_id.max(source.max_id);
    target.objects.extend(std::mem::take(&mut source.objects));
    for (id, page_dict) in swaps {
        target.objects.insert(id, Object::Dictionary(page_dict));
    }
    target.prune_objects();

    let mut out = Vec::new();
    target.save_to(&mut out)?;
    Ok((out, report))
}

/// Inheritable attributes the page does not set itself, resolved from the
/// nearest ancestor that does.
fn inherited_attributes(doc: &Document, page: &Dictionary) -> Vec<(Vec<u8>, Object)> {
    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(node) = parent.and_then(|id| doc.get_dictionary(id).ok()) else {
            break;
        };
        for key in INHERITABLE {
            let already = page.has(key) || found.iter().any(|(k, _)| k.as_slice() == key);
            if !already {
                if let Ok(value) = node.get(key) {
                    found.push((key.to_vec(), value.clone()));
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    found
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
