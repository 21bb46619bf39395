//! Integration tests for document mutations.

use folio::{
    Annotation, AnnotationKind, Document, Element, ErrorKind, ImageElement, PageSize, Rect,
    Resource, Rotation, Table, TableCell, TableRow, WatermarkOptions,
};
use image::{ImageFormat, Rgb, RgbImage};
use pretty_assertions::assert_eq;
use std::io::Cursor;

fn lettered(labels: &[&str]) -> Document {
    let mut doc = Document::new();
    for label in labels {
        let n = doc.add_page();
        doc.page_add_text(n, label).unwrap();
    }
    doc
}

fn texts(doc: &Document) -> Vec<String> {
    (1..=doc.page_count()).map(|n| doc.page_text(n).unwrap()).collect()
}

fn red_png() -> Vec<u8> {
    let mut buf = Vec::new();
    RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn place_image(doc: &mut Document, page: usize, id: &str) {
    doc.pages[page].add_element(Element::Image(ImageElement::new(
        id,
        Rect::new(10.0, 10.0, 20.0, 20.0),
    )));
}

fn image_ids(doc: &Document, page: usize) -> Vec<String> {
    doc.pages[page]
        .elements
        .iter()
        .filter_map(|e| match e {
            Element::Image(img) => Some(img.resource_id.clone()),
            _ => None,
        })
        .collect()
}

// ==================== Page structure ====================

#[test]
fn test_insert_then_delete_restores_order() {
    let mut doc = lettered(&["A", "B", "C"]);
    for p in 1..=4 {
        doc.insert_page(p).unwrap();
        doc.delete_page(p).unwrap();
        assert_eq!(texts(&doc), vec!["A", "B", "C"]);
    }
}

#[test]
fn test_delete_then_insert() {
    let mut doc = lettered(&["A", "B", "C"]);
    doc.delete_page(2).unwrap();
    assert_eq!(texts(&doc), vec!["A", "C"]);
    doc.insert_page(2).unwrap();
    assert_eq!(texts(&doc), vec!["A", "", "C"]);
    assert!(doc.is_page_blank(2).unwrap());
}

#[test]
fn test_page_index_validation() {
    let mut doc = lettered(&["A"]);
    assert_eq!(doc.insert_page(0).unwrap_err().kind(), ErrorKind::PageOutOfRange);
    assert_eq!(doc.insert_page(3).unwrap_err().kind(), ErrorKind::PageOutOfRange);
    assert_eq!(doc.delete_page(2).unwrap_err().kind(), ErrorKind::PageOutOfRange);
    assert_eq!(doc.page_rotate(5, 90).unwrap_err().kind(), ErrorKind::PageOutOfRange);
    assert_eq!(texts(&doc), vec!["A"]);
}

#[test]
fn test_append_adds_page_counts() {
    let mut doc = lettered(&["A", "B"]);
    let other = lettered(&["C", "D", "E"]);
    doc.append(&other).unwrap();
    assert_eq!(doc.page_count(), 5);
    assert_eq!(texts(&doc), vec!["A", "B", "C", "D", "E"]);
}

#[test]
fn test_append_pages_range_table() {
    let source = lettered(&["1", "2", "3", "4"]);
    let cases = [
        ("", 4),
        ("-", 4),
        ("-3", 3),
        ("2-", 3),
        ("1,3,4", 3),
        ("2", 1),
        ("2-3", 2),
        ("1,2,4", 3),
        ("1,2,3,4", 4),
    ];
    for (spec, expected) in cases {
        let mut dest = Document::new();
        dest.append_pages(&source, spec).unwrap();
        assert_eq!(dest.page_count(), expected, "spec {:?}", spec);
    }
}

#[test]
fn test_append_pages_keeps_order_and_is_atomic() {
    let source = lettered(&["a", "b", "c", "d", "e"]);
    let mut dest = lettered(&["x"]);
    dest.append_pages(&source, "1,3-4").unwrap();
    assert_eq!(texts(&dest), vec!["x", "a", "c", "d"]);

    for bad in ["1,9", "0", "3-1", "1,,2", "two"] {
        let err = dest.append_pages(&source, bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRange, "spec {:?}", bad);
    }
    assert_eq!(dest.page_count(), 4);
}

#[test]
fn test_append_carries_bookmarks_with_pages() {
    let mut source = lettered(&["intro", "body"]);
    source.pages[1].add_element(Element::Bookmark(folio::Bookmark::new("Body", 0)));
    let mut dest = lettered(&["cover"]);
    dest.append(&source).unwrap();

    let bookmarks = dest.bookmarks();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].0, 3);
    assert_eq!(bookmarks[0].1.title, "Body");
}

#[test]
fn test_remove_blank_pages() {
    let mut doc = lettered(&["A", "", "B"]);
    doc.add_page();
    assert_eq!(doc.remove_blank_pages(), 2);
    assert_eq!(texts(&doc), vec!["A", "B"]);

    let mut blank = Document::with_blank_page();
    assert_eq!(blank.remove_blank_pages(), 1);
    assert!(blank.is_empty());
}

// ==================== Geometry ====================

#[test]
fn test_rotation_cycles() {
    let mut doc = Document::with_blank_page();
    for _ in 0..4 {
        doc.page_rotate(1, 90).unwrap();
    }
    assert_eq!(doc.pages[0].rotation, Rotation::R0);

    doc.rotate(-90).unwrap();
    assert_eq!(doc.pages[0].rotation, Rotation::R270);
    assert_eq!(doc.rotate(45).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(doc.pages[0].rotation, Rotation::R270);
}

#[test]
fn test_page_set_size_scales_content() {
    let mut doc = Document::new();
    doc.add_page();
    doc.pages[0].add_element(Element::text("corner", 306.0, 396.0));
    doc.page_set_size(1, PageSize::from_code(4).unwrap()).unwrap();

    let page = doc.page(1).unwrap();
    assert_eq!(page.dimensions(), PageSize::A4.dimensions());
    assert_eq!(page.size, Some(PageSize::A4));
    let Element::Text(run) = &page.elements[0] else {
        panic!("expected text");
    };
    assert!((run.x - 595.0 / 2.0).abs() < 0.01);
    assert!((run.y - 842.0 / 2.0).abs() < 0.01);

    assert_eq!(PageSize::from_code(12).unwrap_err().kind(), ErrorKind::InvalidArgument);
}

// ==================== Text ====================

#[test]
fn test_blank_page_scenario() {
    let mut doc = Document::with_blank_page();
    assert!(doc.is_page_blank(1).unwrap());
    doc.page_add_text(1, "x").unwrap();
    assert!(!doc.is_page_blank(1).unwrap());
}

#[test]
fn test_absent_replace_keeps_counts() {
    let mut doc = lettered(&["the quick brown fox", "jumps over"]);
    let (words, chars) = (doc.word_count(), doc.character_count());
    assert_eq!(doc.replace_text("zebra", "lion").unwrap(), 0);
    assert_eq!((doc.word_count(), doc.character_count()), (words, chars));
    assert_eq!((words, chars), (6, 25));
}

#[test]
fn test_replace_text() {
    let mut doc = lettered(&["aaa", "banana"]);
    assert_eq!(doc.replace_text("aa", "b").unwrap(), 1);
    assert_eq!(doc.page_replace_text(2, "an", "AN").unwrap(), 2);
    assert_eq!(texts(&doc), vec!["ba", "bANANa"]);
    assert_eq!(doc.replace_text("", "x").unwrap_err().kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_page_numbers_follow_position() {
    let mut doc = Document::new();
    for _ in 0..3 {
        doc.add_page();
    }
    doc.add_page_numbers().unwrap();
    assert_eq!(texts(&doc), vec!["1", "2", "3"]);

    doc.delete_page(1).unwrap();
    assert_eq!(texts(&doc), vec!["1", "2"]);
}

#[test]
fn test_page_number_template() {
    let mut doc = Document::new();
    doc.add_page();
    doc.add_page();
    doc.add_page_numbers_with("Page {n} of {total}").unwrap();
    assert_eq!(doc.page_text(2).unwrap(), "Page 2 of 2");
}

#[test]
fn test_headers_and_footers() {
    let mut doc = lettered(&["body"]);
    doc.add_text_header("Title").unwrap();
    doc.page_add_text_footer(1, "Footer").unwrap();
    let text = doc.page_text(1).unwrap();
    assert!(text.contains("Title"));
    assert!(text.contains("Footer"));
}

#[test]
fn test_watermark() {
    let mut doc = Document::with_blank_page();
    let bad_color = WatermarkOptions::new("DRAFT").with_color("red");
    assert_eq!(doc.add_watermark(&bad_color).unwrap_err().kind(), ErrorKind::InvalidArgument);
    let bad_opacity = WatermarkOptions::new("DRAFT").with_opacity(1.5);
    assert_eq!(doc.add_watermark(&bad_opacity).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert!(doc.is_page_blank(1).unwrap());

    doc.add_watermark(&WatermarkOptions::new("DRAFT").with_rotation(45.0)).unwrap();
    assert!(!doc.is_page_blank(1).unwrap());
    assert_eq!(doc.word_count(), 0);
}

// ==================== Transforms ====================

#[test]
fn test_set_background() {
    let mut doc = lettered(&["A", "B"]);
    assert_eq!(doc.set_background(300, 0, 0).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(doc.set_background(0, -1, 0).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert!(doc.pages.iter().all(|p| p.background.is_none()));

    doc.set_background(255, 0, 0).unwrap();
    let once = doc.clone();
    doc.set_background(255, 0, 0).unwrap();
    assert_eq!(doc.pages, once.pages);
    assert_eq!(doc.pages[1].background.map(|c| c.to_hex()), Some("#FF0000".to_string()));
}

#[test]
fn test_flatten() {
    let mut doc = Document::with_blank_page();
    let rect = Rect::new(72.0, 72.0, 100.0, 20.0);
    doc.pages[0].add_element(Element::Annotation(Annotation::widget("name", "Jane", rect)));
    doc.pages[0].add_element(Element::Annotation(Annotation::widget("empty", "", rect)));
    doc.pages[0].add_element(Element::Annotation(Annotation::new(AnnotationKind::Note, rect).with_contents("hidden")));
    assert_eq!(doc.extract_text(), "");

    doc.flatten().unwrap();
    assert_eq!(doc.extract_text(), "Jane");
    assert!(!doc.pages[0]
        .elements
        .iter()
        .any(|e| matches!(e, Element::Annotation(_))));
}

#[test]
fn test_grayscale_images() {
    let mut doc = lettered(&["A", "B"]);
    doc.add_resource("logo", Resource::png(red_png()));
    place_image(&mut doc, 0, "logo");
    place_image(&mut doc, 1, "logo");

    doc.page_grayscale(1).unwrap();
    let page1 = image_ids(&doc, 0);
    let page2 = image_ids(&doc, 1);
    assert_ne!(page1, page2);
    assert_eq!(page2, vec!["logo"]);

    let gray = image::load_from_memory(&doc.get_resource(&page1[0]).unwrap().data)
        .unwrap()
        .to_rgb8();
    let px = gray.get_pixel(0, 0);
    assert_eq!(px[0], px[1]);
    assert_eq!(px[1], px[2]);
    assert_eq!(px[0], 76);
}

#[test]
fn test_grayscale_rejects_bad_image_without_changes() {
    let mut doc = lettered(&["A"]);
    doc.pages[0].background = Some(folio::Color::from_hex("#FF0000").unwrap());
    doc.add_resource("broken", Resource::png(vec![1, 2, 3]));
    place_image(&mut doc, 0, "broken");
    let before = doc.clone();

    assert_eq!(doc.grayscale().unwrap_err().kind(), ErrorKind::InternalFailure);
    assert_eq!(doc.pages, before.pages);
}

#[test]
fn test_optimize_resources_deduplicates() {
    let mut doc = lettered(&["A", "B"]);
    doc.add_resource("one", Resource::png(red_png()));
    doc.add_resource("two", Resource::png(red_png()));
    doc.add_resource("orphan", Resource::png(vec![9, 9]));
    place_image(&mut doc, 0, "one");
    place_image(&mut doc, 1, "two");

    doc.optimize_resources().unwrap();
    assert_eq!(doc.resources.len(), 1);
    assert_eq!(image_ids(&doc, 0), image_ids(&doc, 1));
}

#[test]
fn test_optimize_drops_empty_content() {
    let mut doc = lettered(&["keep"]);
    doc.pages[0].add_element(Element::text("", 0.0, 0.0));
    doc.pages[0].add_element(Element::Table(Table::new()));
    doc.add_resource("unused", Resource::png(vec![1]));

    doc.optimize().unwrap();
    assert_eq!(doc.pages[0].elements.len(), 1);
    assert!(doc.resources.is_empty());
}

#[test]
fn test_repair() {
    let mut doc = lettered(&["A"]);
    doc.pages[0].width = -1.0;
    doc.pages[0].add_element(Element::Image(ImageElement::new("missing", Rect::new(0.0, 0.0, 1.0, 1.0))));
    let report = doc.repair().unwrap();
    assert_eq!(report.pages_resized, 1);
    assert_eq!(report.dangling_images_removed, 1);
    assert_eq!(doc.pages[0].width, 612.0);
    assert!(doc.repair().unwrap().is_clean());

    let mut untagged = Document::new();
    untagged.pages.push(folio::Page::new(f32::NAN, 100.0));
    untagged.pages[0].add_element(Element::Image(ImageElement::new("missing", Rect::new(0.0, 0.0, 1.0, 1.0))));
    let err = untagged.repair().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnrecoverableDocument);
    assert_eq!(untagged.pages[0].elements.len(), 1);
}

#[test]
fn test_removals() {
    let mut doc = lettered(&["A", "B"]);
    let mut table = Table::new();
    table.add_row(TableRow::new(vec![TableCell::text("cell")]));
    doc.pages[0].add_element(Element::Table(table.clone()));
    doc.pages[1].add_element(Element::Table(table));

    assert_eq!(doc.page_remove_tables(1).unwrap(), 1);
    assert_eq!(doc.remove_tables().unwrap(), 1);
    assert_eq!(doc.remove_tables().unwrap(), 0);
    assert_eq!(doc.remove_scripts().unwrap(), 0);
    assert_eq!(texts(&doc), vec!["A", "B"]);
}

#[test]
fn test_mutations_mark_dirty() {
    let bytes = Document::with_blank_page().to_bytes().unwrap();
    let mut doc = folio::open_bytes(&bytes).unwrap();
    assert!(!doc.is_dirty());
    doc.rotate(90).unwrap();
    assert!(doc.is_dirty());
}
