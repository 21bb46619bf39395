//! EPUB 3 export: one XHTML chapter per page.

use super::archive::Archive;
use super::office::media_file_name;
use super::{xml_escape, ExportOptions};
use crate::error::Result;
use crate::model::{AnnotationKind, Document, Element, Page, PageContext, Table, TextStyle};
use chrono::Utc;
use md5::{Digest, Md5};

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const XHTML_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">"#;

/// Package identifier derived from the document text and title.
fn identifier(doc: &Document) -> String {
    let mut hasher = Md5::new();
    hasher.update(doc.metadata.title.as_deref().unwrap_or_default().as_bytes());
    hasher.update(doc.extract_text().as_bytes());
    let hex: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "urn:uuid:{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

fn chapter_title(page: &Page, idx: usize) -> String {
    page.elements
        .iter()
        .find_map(|e| match e {
            Element::Bookmark(b) => Some(b.title.clone()),
            _ => None,
        })
        .unwrap_or_else(|| format!("Page {}", idx + 1))
}

/// Render the document as an EPUB 3 package.
pub(crate) fn to_epub(doc: &Document, _options: &ExportOptions) -> Result<Vec<u8>> {
    let meta = &doc.metadata;
    let title = meta.title.clone().unwrap_or_else(|| "Untitled".to_string());

    let mut archive = Archive::new();
    // the mimetype entry must come first, uncompressed
    archive.add_stored("mimetype", "application/epub+zip")?;
    archive.add("META-INF/container.xml", CONTAINER_XML)?;

    let mut manifest = String::from(
        r#"<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>"#,
    );
    let mut spine = String::new();
    let mut toc = String::new();
    for (i, page) in doc.pages.iter().enumerate() {
        let n = i + 1;
        manifest.push_str(&format!(
            r#"<item id="page-{n}" href="page-{n}.xhtml" media-type="application/xhtml+xml"/>"#,
            n = n
        ));
        spine.push_str(&format!(r#"<itemref idref="page-{}"/>"#, n));
        toc.push_str(&format!(
            r#"<li><a href="page-{}.xhtml">{}</a></li>"#,
            n,
            xml_escape(&chapter_title(page, i))
        ));
        archive.add(&format!("OEBPS/page-{}.xhtml", n), chapter(doc, page, doc.context(i), &title))?;
    }
    for (id, resource) in doc.resources.iter().filter(|(_, r)| r.is_image()) {
        let file = media_file_name(id, resource.extension());
        manifest.push_str(&format!(
            r#"<item id="img-{}" href="images/{}" media-type="{}"/>"#,
            xml_escape(&file.replace('.', "-")),
            xml_escape(&file),
            xml_escape(&resource.mime_type)
        ));
        archive.add(&format!("OEBPS/images/{}", file), &resource.data)?;
    }

    let modified = meta.modified.or(meta.created).unwrap_or_else(Utc::now);
    let mut opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:identifier id="uid">{}</dc:identifier><dc:title>{}</dc:title><dc:language>en</dc:language>"#,
        identifier(doc),
        xml_escape(&title)
    );
    if let Some(author) = &meta.author {
        opf.push_str(&format!("<dc:creator>{}</dc:creator>", xml_escape(author)));
    }
    if let Some(subject) = &meta.subject {
        opf.push_str(&format!("<dc:subject>{}</dc:subject>", xml_escape(subject)));
    }
    opf.push_str(&format!(
        r#"<meta property="dcterms:modified">{}</meta></metadata>
<manifest>{}</manifest>
<spine>{}</spine>
</package>
"#,
        modified.format("%Y-%m-%dT%H:%M:%SZ"),
        manifest,
        spine
    ));
    archive.add("OEBPS/content.opf", opf)?;
    archive.add(
        "OEBPS/nav.xhtml",
        format!(
            r#"{}<head><title>{}</title></head><body><nav epub:type="toc"><ol>{}</ol></nav></body></html>
"#,
            XHTML_HEAD,
            xml_escape(&title),
            toc
        ),
    )?;
    archive.finish()
}

fn chapter(doc: &Document, page: &Page, ctx: PageContext, title: &str) -> String {
    let mut body = String::new();
    for element in &page.elements {
        match element {
            Element::Bookmark(b) => {
                let level = (b.level as usize + 1).min(6);
                body.push_str(&format!("<h{l}>{}</h{l}>", xml_escape(&b.title), l = level));
            }
            Element::Text(run) => paragraph(&mut body, &run.text, &run.style),
            Element::PageNumber(stamp) => paragraph(&mut body, &stamp.resolve(ctx), &stamp.style),
            Element::Table(table) => table_xhtml(&mut body, table),
            Element::Image(img) => {
                if let Some(resource) = doc.get_resource(&img.resource_id) {
                    body.push_str(&format!(
                        r#"<p><img src="images/{}" alt="{}"/></p>"#,
                        xml_escape(&media_file_name(&img.resource_id, resource.extension())),
                        xml_escape(img.alt_text.as_deref().unwrap_or_default())
                    ));
                }
            }
            Element::Annotation(a) => {
                if let AnnotationKind::Link { uri } = &a.kind {
                    let label = a.contents.as_deref().unwrap_or(uri);
                    body.push_str(&format!(
                        r#"<p><a href="{}">{}</a></p>"#,
                        xml_escape(uri),
                        xml_escape(label)
                    ));
                }
            }
            _ => {}
        }
    }
    format!(
        "{}<head><title>{}</title></head><body>{}</body></html>\n",
        XHTML_HEAD,
        xml_escape(title),
        body
    )
}

fn paragraph(out: &mut String, text: &str, style: &TextStyle) {
    if text.trim().is_empty() {
        return;
    }
    let mut inner = text
        .lines()
        .map(|l| xml_escape(l).into_owned())
        .collect::<Vec<_>>()
        .join("<br/>");
    if style.underline {
        inner = format!("<u>{}</u>", inner);
    }
    if style.italic {
        inner = format!("<i>{}</i>", inner);
    }
    if style.bold {
        inner = format!("<b>{}</b>", inner);
    }
    out.push_str(&format!("<p>{}</p>", inner));
}

fn table_xhtml(out: &mut String, table: &Table) {
    if table.is_empty() {
        return;
    }
    out.push_str("<table>");
    for row in &table.rows {
        let tag = if row.is_header { "th" } else { "td" };
        out.push_str("<tr>");
        for cell in &row.cells {
            let mut attrs = String::new();
            if cell.colspan > 1 {
                attrs.push_str(&format!(r#" colspan="{}""#, cell.colspan));
            }
            if cell.rowspan > 1 {
                attrs.push_str(&format!(r#" rowspan="{}""#, cell.rowspan));
            }
            out.push_str(&format!("<{t}{}>{}</{t}>", attrs, xml_escape(&cell.content), t = tag));
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bookmark, ImageElement, Rect, Resource, TableCell, TableRow, TextRun};
    use std::io::{Cursor, Read};

    fn read(zip: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut out = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_mimetype_is_first_and_stored() {
        let doc = Document::with_blank_page();
        let bytes = to_epub(&doc, &ExportOptions::default()).unwrap();
        assert_eq!(&bytes[30..38], b"mimetype");

        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let first = zip.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), zip::CompressionMethod::Stored);
    }

    #[test]
    fn test_chapters_and_navigation() {
        let mut doc = Document::with_blank_page();
        doc.metadata.title = Some("Guide".into());
        doc.pages[0].add_element(Element::Bookmark(Bookmark::new("Start", 0)));
        let mut run = TextRun::new("a & b\nc", 72.0, 72.0);
        run.style.bold = true;
        doc.pages[0].add_element(Element::Text(run));
        let mut table = Table::new();
        table.add_row(TableRow::header(vec![TableCell::text("k"), TableCell::text("v")]));
        doc.pages[0].add_element(Element::Table(table));
        doc.add_page();

        let bytes = to_epub(&doc, &ExportOptions::default()).unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        let opf = read(&mut zip, "OEBPS/content.opf");
        assert!(opf.contains("<dc:title>Guide</dc:title>"));
        assert!(opf.contains(r#"<itemref idref="page-2"/>"#));
        assert!(opf.contains("urn:uuid:"));

        let nav = read(&mut zip, "OEBPS/nav.xhtml");
        assert!(nav.contains(r#"<a href="page-1.xhtml">Start</a>"#));
        assert!(nav.contains(r#"<a href="page-2.xhtml">Page 2</a>"#));

        let page = read(&mut zip, "OEBPS/page-1.xhtml");
        assert!(page.contains("<h1>Start</h1>"));
        assert!(page.contains("<p><b>a &amp; b<br/>c</b></p>"));
        assert!(page.contains("<tr><th>k</th><th>v</th></tr>"));
    }

    #[test]
    fn test_images_are_packaged() {
        let mut doc = Document::with_blank_page();
        doc.add_resource("img1", Resource::png(vec![1, 2, 3]));
        let mut img = ImageElement::new("img1", Rect::new(0.0, 0.0, 10.0, 10.0));
        img.alt_text = Some("logo".into());
        doc.pages[0].add_element(Element::Image(img));

        let bytes = to_epub(&doc, &ExportOptions::default()).unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(read(&mut zip, "OEBPS/page-1.xhtml").contains(r#"<img src="images/img1.png" alt="logo"/>"#));
        assert!(read(&mut zip, "OEBPS/content.opf").contains(r#"href="images/img1.png" media-type="image/png""#));
        assert!(zip.by_name("OEBPS/images/img1.png").is_ok());
    }
}
