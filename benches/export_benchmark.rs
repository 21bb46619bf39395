//! Benchmarks for folio open and export performance.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio::{
    export, export_page, Destination, Document, ExportFormat, ExportOptions, PageFormat,
    WatermarkOptions,
};

/// Builds a document with the given number of text-heavy pages.
fn create_test_document(page_count: u32) -> Document {
    let mut doc = Document::new();
    for n in 1..=page_count {
        doc.add_page();
        for line in 0..20 {
            doc.page_add_text(
                n,
                &format!("Page {} line {} - benchmark content for folio exports.", n, line),
            )
            .unwrap();
        }
    }
    doc.add_page_numbers().unwrap();
    doc.add_watermark(&WatermarkOptions::new("DRAFT")).unwrap();
    doc
}

fn bench_format_detection(c: &mut Criterion) {
    let bytes = create_test_document(1).to_bytes().unwrap();
    let garbage = b"Not a folio container, just random text content";

    c.bench_function("detect_native", |b| {
        b.iter(|| folio::detect_format_from_bytes(black_box(&bytes)).unwrap());
    });

    c.bench_function("detect_garbage", |b| {
        b.iter(|| folio::detect_format_from_bytes(black_box(garbage)).is_err());
    });
}

fn bench_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("open");

    for page_count in [1, 10, 50].iter() {
        let bytes = create_test_document(*page_count).to_bytes().unwrap();
        group.bench_function(format!("{}_pages", page_count), |b| {
            b.iter(|| folio::open_bytes(black_box(&bytes)).unwrap());
        });
    }

    group.finish();
}

fn bench_document_export(c: &mut Criterion) {
    let doc = create_test_document(10);
    let options = ExportOptions::default();
    let mut group = c.benchmark_group("export");

    for format in [
        ExportFormat::Txt,
        ExportFormat::Markdown,
        ExportFormat::Json,
        ExportFormat::Docx,
        ExportFormat::Xlsx,
        ExportFormat::SvgZip,
    ] {
        group.bench_function(format.name(), |b| {
            b.iter(|| export(black_box(&doc), format, &options, &Destination::Memory).unwrap());
        });
    }

    group.finish();
}

fn bench_raster(c: &mut Criterion) {
    let doc = create_test_document(1);
    let mut group = c.benchmark_group("raster");
    group.sample_size(20);

    for dpi in [36, 72, 150].iter() {
        let options = ExportOptions::new().with_resolution(*dpi);
        group.bench_function(format!("png_{}_dpi", dpi), |b| {
            b.iter(|| {
                export_page(black_box(&doc), 1, PageFormat::Png, &options, &Destination::Memory)
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_format_detection,
    bench_open,
    bench_document_export,
    bench_raster,
);
criterion_main!(benches);
