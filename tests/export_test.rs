//! Integration tests for the export pipeline.

use folio::export::{to_json, MAX_RASTER_PIXELS};
use folio::{
    export, export_page, Destination, Document, Element, ErrorKind, ExportFormat, ExportOptions,
    ImageElement, JsonFormat, Page, PageFormat, Rect, Resource, Table, TableCell, TableRow,
    WatermarkOptions,
};
use pretty_assertions::assert_eq;
use std::io::{Cursor, Read};

fn report() -> Document {
    let mut doc = Document::new();
    doc.metadata.title = Some("Report".into());
    doc.add_page();
    doc.page_add_text(1, "Summary of results").unwrap();
    let mut table = Table::with_header(1);
    table.add_row(TableRow::header(vec![TableCell::text("Name"), TableCell::text("Score")]));
    table.add_row(TableRow::new(vec![TableCell::text("Ada"), TableCell::text("97")]));
    doc.pages[0].add_element(Element::Table(table));
    doc.add_page();
    doc.page_add_text(2, "Appendix").unwrap();
    doc.add_page_numbers().unwrap();
    doc.add_watermark(&WatermarkOptions::new("DRAFT").with_rotation(30.0)).unwrap();
    doc
}

fn to_memory(doc: &Document, format: ExportFormat, options: &ExportOptions) -> Vec<u8> {
    export(doc, format, options, &Destination::Memory)
        .unwrap()
        .expect("memory destination returns bytes")
}

fn zip_entry(bytes: &[u8], name: &str) -> String {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut out = String::new();
    zip.by_name(name).unwrap().read_to_string(&mut out).unwrap();
    out
}

#[test]
fn test_every_format_leaves_document_unchanged() {
    let doc = report();
    let before = to_json(&doc, JsonFormat::Compact).unwrap();
    let options = ExportOptions::new().with_resolution(10).with_grid(2, 1);

    for format in ExportFormat::ALL {
        let bytes = to_memory(&doc, format, &options);
        assert!(!bytes.is_empty(), "{} produced nothing", format);
    }
    for format in PageFormat::ALL {
        let bytes = export_page(&doc, 2, format, &options, &Destination::Memory)
            .unwrap()
            .unwrap();
        assert!(!bytes.is_empty(), "{:?} produced nothing", format);
    }

    assert_eq!(to_json(&doc, JsonFormat::Compact).unwrap(), before);
    assert!(doc.is_dirty());
}

#[test]
fn test_native_round_trip() {
    let doc = report();
    let bytes = to_memory(&doc, ExportFormat::Native, &ExportOptions::default());
    let back = folio::open_bytes(&bytes).unwrap();
    assert_eq!(back.page_count(), doc.page_count());
    assert_eq!(back.extract_text(), doc.extract_text());
    assert_eq!(back.pages, doc.pages);
    assert!(back.metadata.producer.is_some());
}

#[test]
fn test_single_page_native() {
    let doc = report();
    let bytes = export_page(&doc, 2, PageFormat::Native, &ExportOptions::default(), &Destination::Memory)
        .unwrap()
        .unwrap();
    let page = folio::open_bytes(&bytes).unwrap();
    assert_eq!(page.page_count(), 1);
    assert!(page.extract_text().starts_with("Appendix"));
}

#[test]
fn test_file_destination() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.md");
    let doc = report();

    let result = export(&doc, ExportFormat::Markdown, &ExportOptions::default(), &Destination::file(&path)).unwrap();
    assert!(result.is_none());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("Summary of results"));
    assert!(written.contains("| Name | Score |"));

    let missing = Destination::file(dir.path().join("no").join("such.txt"));
    let err = export(&doc, ExportFormat::Txt, &ExportOptions::default(), &missing).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);
}

#[test]
fn test_text_export_matches_extraction() {
    let doc = report();
    let bytes = to_memory(&doc, ExportFormat::Txt, &ExportOptions::default());
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("Summary of results"));
    assert!(text.contains("Appendix"));
    assert!(!text.contains("DRAFT"));
}

#[test]
fn test_raster_parameters() {
    let doc = report();
    let none = ExportOptions::default();
    let err = export_page(&doc, 1, PageFormat::Png, &none, &Destination::Memory).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingParameter);

    let zero = ExportOptions::new().with_resolution(0);
    let err = export_page(&doc, 1, PageFormat::Jpeg, &zero, &Destination::Memory).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let huge = ExportOptions::new().with_resolution(5000);
    let err = export_page(&doc, 1, PageFormat::Bmp, &huge, &Destination::Memory).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = export_page(&doc, 3, PageFormat::Svg, &none, &Destination::Memory).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PageOutOfRange);
}

#[test]
fn test_png_dimensions_follow_dpi() {
    let doc = report();
    let options = ExportOptions::new().with_resolution(36);
    let bytes = export_page(&doc, 1, PageFormat::Png, &options, &Destination::Memory)
        .unwrap()
        .unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (306, 396));
}

#[test]
fn test_tiff_defaults_resolution() {
    let doc = report();
    let bytes = to_memory(&doc, ExportFormat::Tiff, &ExportOptions::default());
    let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (1275, 1650));
    assert!(decoder.more_images());
    decoder.next_image().unwrap();
    assert!(!decoder.more_images());
}

#[test]
fn test_n_up_grid_validation() {
    let doc = report();
    let err = export(&doc, ExportFormat::NUp, &ExportOptions::default(), &Destination::Memory).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingParameter);

    let options = ExportOptions::new().with_grid(0, 3);
    let err = export(&doc, ExportFormat::NUp, &options, &Destination::Memory).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let options = ExportOptions::new().with_grid(2, 1);
    let sheets = folio::open_bytes(&to_memory(&doc, ExportFormat::NUp, &options)).unwrap();
    assert_eq!(sheets.page_count(), 1);
}

#[test]
fn test_n_up_grid_bounded_by_page() {
    let doc = report();
    for (columns, rows) in [(65536, 65536), (u32::MAX, u32::MAX), (1, 100_000)] {
        let options = ExportOptions::new().with_grid(columns, rows);
        let err = export(&doc, ExportFormat::NUp, &options, &Destination::Memory).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_oversized_image_rect_renders() {
    let mut png = Vec::new();
    image::RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 0]))
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    let mut doc = Document::with_blank_page();
    doc.add_resource("huge", Resource::png(png));
    doc.pages[0].add_element(Element::Image(ImageElement::new("huge", Rect::new(0.0, 0.0, 1e10, 1e10))));

    let options = ExportOptions::new().with_resolution(72);
    let bytes = export_page(&doc, 1, PageFormat::Png, &options, &Destination::Memory)
        .unwrap()
        .unwrap();
    let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (612, 792));
    assert_eq!(*img.get_pixel(306, 396), image::Rgb([255, 0, 0]));

    let tiff = to_memory(&doc, ExportFormat::Tiff, &ExportOptions::new().with_resolution(10));
    assert!(!tiff.is_empty());
    let dicom = export_page(&doc, 1, PageFormat::Dicom, &options, &Destination::Memory)
        .unwrap()
        .unwrap();
    assert_eq!(&dicom[128..132], b"DICM");
}

#[test]
fn test_tiff_resolution_at_pixel_limit() {
    // a 72pt tall strip is exactly `dpi` pixels high
    let mut doc = Document::new();
    doc.pages.push(Page::new(0.36, 72.0));
    let at_limit = ExportOptions::new().with_resolution(MAX_RASTER_PIXELS);
    let bytes = to_memory(&doc, ExportFormat::Tiff, &at_limit);
    let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (100, MAX_RASTER_PIXELS));

    let over = ExportOptions::new().with_resolution(MAX_RASTER_PIXELS + 1);
    let err = export(&doc, ExportFormat::Tiff, &over, &Destination::Memory).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_office_packages() {
    let doc = report();
    let docx = to_memory(&doc, ExportFormat::Docx, &ExportOptions::default());
    let body = zip_entry(&docx, "word/document.xml");
    assert!(body.contains("Summary of results"));
    assert!(body.contains("<w:tbl>"));
    assert!(zip_entry(&docx, "[Content_Types].xml").contains("wordprocessingml"));

    let xlsx = to_memory(&doc, ExportFormat::Xlsx, &ExportOptions::default());
    assert!(zip_entry(&xlsx, "xl/workbook.xml").contains("<sheet "));

    let pptx = to_memory(&doc, ExportFormat::Pptx, &ExportOptions::default());
    assert!(zip_entry(&pptx, "ppt/slides/slide2.xml").contains("Appendix"));
}

#[test]
fn test_svg_zip_has_one_entry_per_page() {
    let doc = report();
    let bytes = to_memory(&doc, ExportFormat::SvgZip, &ExportOptions::default());
    let zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<&str> = zip.file_names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["page-1.svg", "page-2.svg"]);
}

#[test]
fn test_format_names_parse() {
    for format in ExportFormat::ALL {
        assert_eq!(format.name().parse::<ExportFormat>().unwrap(), format);
    }
    assert_eq!("DOCX".parse::<ExportFormat>().unwrap(), ExportFormat::Docx);
    assert_eq!("tif".parse::<PageFormat>().unwrap(), PageFormat::Tiff);
    assert_eq!("bogus".parse::<ExportFormat>().unwrap_err().kind(), ErrorKind::InvalidArgument);
}
