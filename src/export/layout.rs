//! Paginated layouts: booklet imposition and N-up sheets.
//!
//! Both layouts build a new document whose sheets hold scaled copies of the
//! source pages, and write it as a native container. Page number stamps are
//! resolved against the source numbering before the pages are moved.

use super::ExportOptions;
use crate::codec;
use crate::error::{Error, Result};
use crate::model::{Document, Element, Page, Rect, TextRun, Transform};
use crate::ops::referenced_resources;

/// Sheet order for a saddle-stitched booklet of `count` pages.
///
/// Each entry is one sheet side holding a left and a right page index;
/// `None` is a blank filler page.
fn booklet_order(count: usize) -> Vec<(Option<usize>, Option<usize>)> {
    let padded = count.div_ceil(4) * 4;
    let slot = |i: usize| (i < count).then_some(i);
    let mut sides = Vec::with_capacity(padded / 2);
    for sheet in 0..padded / 4 {
        let front = 2 * sheet;
        // outside: last and first, inside: second and second-to-last
        sides.push((slot(padded - 1 - front), slot(front)));
        sides.push((slot(front + 1), slot(padded - 2 - front)));
    }
    sides
}

/// Copy `source` page `idx` into `cell` of `sheet`, scaled to fit and centered.
fn place(sheet: &mut Page, doc: &Document, idx: usize, cell: Rect) {
    let page = &doc.pages[idx];
    let (pw, ph) = page.dimensions();
    let scale = (cell.width / pw).min(cell.height / ph);
    let tx = cell.x + (cell.width - pw * scale) / 2.0;
    let ty = cell.y + (cell.height - ph * scale) / 2.0;
    let t = Transform::scale_translate(scale, tx, ty);
    let ctx = doc.context(idx);

    for element in &page.elements {
        let mut element = match element {
            Element::PageNumber(stamp) => {
                Element::Text(TextRun::new(stamp.resolve(ctx), stamp.x, stamp.y).with_style(stamp.style.clone()))
            }
            other => other.clone(),
        };
        element.transform(&t);
        sheet.add_element(element);
    }
}

fn sheet_document(doc: &Document) -> Document {
    let mut out = Document::new();
    out.metadata = doc.metadata.clone();
    for id in referenced_resources(&doc.pages) {
        if let Some(resource) = doc.get_resource(&id) {
            out.add_resource(id, resource.clone());
        }
    }
    out
}

fn first_page_size(doc: &Document) -> Result<(f32, f32)> {
    let page = doc
        .pages
        .first()
        .ok_or_else(|| Error::Export("cannot lay out a document without pages".into()))?;
    if !page.has_valid_dimensions() {
        return Err(Error::Export("first page has invalid dimensions".into()));
    }
    Ok(page.dimensions())
}

/// Two pages per landscape sheet side, in booklet reading order.
pub(crate) fn to_booklet(doc: &Document, _options: &ExportOptions) -> Result<Vec<u8>> {
    let (w, h) = first_page_size(doc)?;
    let mut out = sheet_document(doc);
    for (left, right) in booklet_order(doc.pages.len()) {
        let mut sheet = Page::new(w * 2.0, h);
        for (slot, x) in [(left, 0.0), (right, w)] {
            if let Some(idx) = slot {
                place(&mut sheet, doc, idx, Rect::new(x, 0.0, w, h));
            }
        }
        out.pages.push(sheet);
    }
    log::debug!("booklet of {} pages on {} sheet sides", doc.pages.len(), out.pages.len());
    codec::encode(&out)
}

/// `columns x rows` pages per sheet, filled row by row.
pub(crate) fn to_n_up(doc: &Document, options: &ExportOptions) -> Result<Vec<u8>> {
    let (columns, rows) = options
        .grid
        .ok_or_else(|| Error::MissingParameter("N-up layout needs a grid".into()))?;
    if columns == 0 || rows == 0 {
        return Err(Error::InvalidArgument(format!("invalid N-up grid {}x{}", columns, rows)));
    }
    let (w, h) = first_page_size(doc)?;
    // every cell keeps at least one point per side
    if columns as f32 > w || rows as f32 > h {
        return Err(Error::InvalidArgument(format!(
            "N-up grid {}x{} is too fine for a {}x{} page",
            columns, rows, w, h
        )));
    }
    let per_sheet = columns
        .checked_mul(rows)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::InvalidArgument(format!("invalid N-up grid {}x{}", columns, rows)))?;
    let (cell_w, cell_h) = (w / columns as f32, h / rows as f32);

    let mut out = sheet_document(doc);
    for chunk_start in (0..doc.pages.len()).step_by(per_sheet) {
        let mut sheet = Page::new(w, h);
        let end = (chunk_start + per_sheet).min(doc.pages.len());
        for (slot, idx) in (chunk_start..end).enumerate() {
            let col = slot % columns as usize;
            let row = slot / columns as usize;
            let cell = Rect::new(col as f32 * cell_w, row as f32 * cell_h, cell_w, cell_h);
            place(&mut sheet, doc, idx, cell);
        }
        out.pages.push(sheet);
    }
    log::debug!("{}x{} N-up of {} pages on {} sheets", columns, rows, doc.pages.len(), out.pages.len());
    codec::encode(&out)
}
