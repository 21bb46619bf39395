//! Office Open XML export: word processing, spreadsheet and presentation.

use super::archive::Archive;
use super::xml_escape;
use crate::error::Result;
use crate::license;
use crate::model::{Color, Document, Element, ImageElement, Page, PageContext, Rect, Table, TextStyle};
use std::collections::HashMap;

pub(crate) const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub(crate) const XLSX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub(crate) const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

pub(super) const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(super) const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Points to English Metric Units.
fn emu(pt: f32) -> i64 {
    (f64::from(pt.max(0.0)) * 12_700.0).round() as i64
}

/// Points to twentieths of a point.
fn twips(pt: f32) -> i64 {
    (f64::from(pt.max(0.0)) * 20.0).round() as i64
}

fn hex(color: Color) -> String {
    color.to_hex().trim_start_matches('#').to_string()
}

/// Images referenced by one package part.
struct Media<'a> {
    doc: &'a Document,
    /// Folder of the media files relative to the part
    prefix: &'static str,
    first_rel: usize,
    rels: Vec<(String, String)>,
    by_id: HashMap<String, String>,
}

impl<'a> Media<'a> {
    fn new(doc: &'a Document, prefix: &'static str, first_rel: usize) -> Self {
        Self {
            doc,
            prefix,
            first_rel,
            rels: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Relationship id for an image, or `None` when the resource is missing.
    fn rel_for(&mut self, image: &ImageElement) -> Option<String> {
        if let Some(rel) = self.by_id.get(image.resource_id.as_str()) {
            return Some(rel.clone());
        }
        let resource = self.doc.get_resource(&image.resource_id)?;
        let rel = format!("rId{}", self.first_rel + self.rels.len());
        let target = format!("{}{}", self.prefix, media_file_name(&image.resource_id, resource.extension()));
        self.rels.push((rel.clone(), target));
        self.by_id.insert(image.resource_id.clone(), rel.clone());
        Some(rel)
    }

    fn relationships(&self) -> String {
        self.rels
            .iter()
            .map(|(id, target)| {
                format!(
                    r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
                    id,
                    REL_IMAGE,
                    xml_escape(target)
                )
            })
            .collect()
    }
}

pub(super) fn media_file_name(resource_id: &str, extension: &str) -> String {
    let stem: String = resource_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}.{}", stem, extension)
}

/// Write every image resource into `folder`.
fn add_media_files(archive: &mut Archive, doc: &Document, folder: &str) -> Result<()> {
    for (id, resource) in doc.resources.iter().filter(|(_, r)| r.is_image()) {
        archive.add(
            &format!("{}{}", folder, media_file_name(id, resource.extension())),
            &resource.data,
        )?;
    }
    Ok(())
}

pub(super) fn content_types(overrides: &[(String, &str)]) -> String {
    let mut xml = format!(
        r#"{}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#,
        XML_DECL
    );
    for (ext, mime) in [
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("gif", "image/gif"),
        ("bmp", "image/bmp"),
        ("tiff", "image/tiff"),
        ("webp", "image/webp"),
        ("jp2", "image/jp2"),
        ("raw", "application/octet-stream"),
    ] {
        xml.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            ext, mime
        ));
    }
    for (part, mime) in overrides {
        xml.push_str(&format!(
            r#"<Override PartName="{}" ContentType="{}"/>"#,
            part, mime
        ));
    }
    xml.push_str("</Types>");
    xml
}

pub(super) fn package_rels(main_type: &str, main_target: &str) -> String {
    format!(
        r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}" Target="{}"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#,
        XML_DECL, NS_PKG_REL, main_type, main_target
    )
}

fn core_properties(doc: &Document) -> String {
    let meta = &doc.metadata;
    let mut xml = format!(
        r#"{}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
        XML_DECL
    );
    let fields = [
        ("dc:title", &meta.title),
        ("dc:creator", &meta.author),
        ("dc:subject", &meta.subject),
        ("cp:keywords", &meta.keywords),
    ];
    for (tag, value) in fields {
        if let Some(value) = value {
            xml.push_str(&format!("<{tag}>{}</{tag}>", xml_escape(value)));
        }
    }
    for (tag, value) in [("dcterms:created", meta.created), ("dcterms:modified", meta.modified)] {
        if let Some(value) = value {
            xml.push_str(&format!(
                r#"<{tag} xsi:type="dcterms:W3CDTF">{}</{tag}>"#,
                value.format("%Y-%m-%dT%H:%M:%SZ")
            ));
        }
    }
    xml.push_str("</cp:coreProperties>");
    xml
}

fn app_properties() -> String {
    format!(
        r#"{}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>{}</Application></Properties>"#,
        XML_DECL,
        xml_escape(&license::producer())
    )
}

pub(super) fn add_doc_props(archive: &mut Archive, doc: &Document) -> Result<()> {
    archive.add("docProps/core.xml", core_properties(doc))?;
    archive.add("docProps/app.xml", app_properties())
}

pub(super) fn doc_prop_overrides() -> [(String, &'static str); 2] {
    [
        (
            "/docProps/core.xml".to_string(),
            "application/vnd.openxmlformats-package.core-properties+xml",
        ),
        (
            "/docProps/app.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.extended-properties+xml",
        ),
    ]
}

// ---------------------------------------------------------------------------
// Word processing
// ---------------------------------------------------------------------------

const WORD_STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="36"/></w:rPr></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/></w:rPr></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading4"><w:name w:val="heading 4"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="3"/></w:pPr><w:rPr><w:b/><w:sz w:val="24"/></w:rPr></w:style>"#,
    r#"<w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/></w:tblBorders></w:tblPr></w:style>"#,
    r#"</w:styles>"#
);

/// Flowing word processing document.
pub(crate) fn to_docx(doc: &Document, _options: &super::ExportOptions) -> Result<Vec<u8>> {
    DocxWriter::new(doc, false).write()
}

/// Word processing document with every element in an absolutely positioned frame.
pub(crate) fn to_docx_enhanced(doc: &Document, _options: &super::ExportOptions) -> Result<Vec<u8>> {
    DocxWriter::new(doc, true).write()
}

struct DocxWriter<'a> {
    doc: &'a Document,
    positioned: bool,
    media: Media<'a>,
    body: String,
    drawing_id: u32,
}

impl<'a> DocxWriter<'a> {
    fn new(doc: &'a Document, positioned: bool) -> Self {
        Self {
            doc,
            positioned,
            // rId1 is the style sheet
            media: Media::new(doc, "media/", 2),
            body: String::new(),
            drawing_id: 0,
        }
    }

    fn write(mut self) -> Result<Vec<u8>> {
        let doc = self.doc;
        let last = doc.pages.len().saturating_sub(1);
        for (i, page) in doc.pages.iter().enumerate() {
            self.write_page(page, doc.context(i));
            if i < last {
                if self.positioned {
                    let section = section_properties(page, true);
                    self.body
                        .push_str(&format!("<w:p><w:pPr>{}</w:pPr></w:p>", section));
                } else {
                    self.body
                        .push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
                }
            }
        }

        let final_page = if self.positioned { doc.pages.last() } else { doc.pages.first() };
        let final_section = match final_page {
            Some(page) => section_properties(page, self.positioned),
            None => section_properties(&Page::letter(), false),
        };

        let document_xml = format!(
            r#"{}<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="{}" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>{}{}</w:body></w:document>"#,
            XML_DECL, NS_REL, self.body, final_section
        );
        let document_rels = format!(
            r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>{}</Relationships>"#,
            XML_DECL,
            NS_PKG_REL,
            self.media.relationships()
        );

        let mut overrides = vec![
            (
                "/word/document.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
            ),
            (
                "/word/styles.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
            ),
        ];
        overrides.extend(doc_prop_overrides());

        let mut archive = Archive::new();
        archive.add("[Content_Types].xml", content_types(&overrides))?;
        archive.add(
            "_rels/.rels",
            package_rels(
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
                "word/document.xml",
            ),
        )?;
        add_doc_props(&mut archive, doc)?;
        archive.add("word/document.xml", document_xml)?;
        archive.add("word/_rels/document.xml.rels", document_rels)?;
        archive.add("word/styles.xml", WORD_STYLES)?;
        add_media_files(&mut archive, doc, "word/media/")?;
        archive.finish()
    }

    fn write_page(&mut self, page: &Page, ctx: PageContext) {
        for element in &page.elements {
            match element {
                Element::Text(run) => {
                    let frame = self.positioned.then(|| run.bounds());
                    self.paragraph(&run.text, &run.style, frame, None);
                }
                Element::PageNumber(stamp) => {
                    let frame = self.positioned.then(|| element.bounds()).flatten();
                    self.paragraph(&stamp.resolve(ctx), &stamp.style, frame, None);
                }
                Element::Bookmark(b) if !self.positioned => {
                    let style = format!("Heading{}", b.level.saturating_add(1).min(4));
                    self.paragraph(&b.title, &TextStyle::default(), None, Some(&style));
                }
                Element::Table(table) => self.table(table),
                Element::Image(img) => self.image(img),
                Element::Watermark(w) if self.positioned => {
                    let frame = element.bounds();
                    self.paragraph(&w.text, &w.style, frame, None);
                }
                _ => {}
            }
        }
    }

    fn paragraph(&mut self, text: &str, style: &TextStyle, frame: Option<Rect>, p_style: Option<&str>) {
        let mut props = String::new();
        if let Some(name) = p_style {
            props.push_str(&format!(r#"<w:pStyle w:val="{}"/>"#, name));
        }
        if let Some(rect) = frame {
            props.push_str(&frame_properties(rect));
        }

        self.body.push_str("<w:p>");
        if !props.is_empty() {
            self.body.push_str(&format!("<w:pPr>{}</w:pPr>", props));
        }
        for (i, line) in text.lines().enumerate() {
            if i > 0 {
                self.body.push_str("<w:r><w:br/></w:r>");
            }
            self.body.push_str(&run_xml(line, style));
        }
        self.body.push_str("</w:p>");
    }

    fn table(&mut self, table: &Table) {
        let columns = table.column_count();
        if columns == 0 {
            return;
        }
        let col_width = twips(table.rect.width.max(72.0)) / columns as i64;

        self.body.push_str(r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/>"#);
        if self.positioned {
            self.body.push_str(&format!(
                r#"<w:tblpPr w:horzAnchor="page" w:vertAnchor="page" w:tblpX="{}" w:tblpY="{}"/>"#,
                twips(table.rect.x),
                twips(table.rect.y)
            ));
        }
        self.body
            .push_str(r#"<w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid>"#);
        for _ in 0..columns {
            self.body
                .push_str(&format!(r#"<w:gridCol w:w="{}"/>"#, col_width));
        }
        self.body.push_str("</w:tblGrid>");

        for (i, row) in table.rows.iter().enumerate() {
            self.body.push_str("<w:tr>");
            if i < table.header_rows as usize {
                self.body.push_str("<w:trPr><w:tblHeader/></w:trPr>");
            }
            for cell in &row.cells {
                self.body.push_str("<w:tc><w:tcPr>");
                self.body
                    .push_str(&format!(r#"<w:tcW w:w="{}" w:type="dxa"/>"#, col_width * i64::from(cell.colspan.max(1))));
                if cell.colspan > 1 {
                    self.body
                        .push_str(&format!(r#"<w:gridSpan w:val="{}"/>"#, cell.colspan));
                }
                self.body.push_str("</w:tcPr><w:p>");
                self.body.push_str(&run_xml(&cell.content, &TextStyle::default()));
                self.body.push_str("</w:p></w:tc>");
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        // a table may not end a cell or the body
        self.body.push_str("<w:p/>");
    }

    fn image(&mut self, img: &ImageElement) {
        let Some(rel) = self.media.rel_for(img) else {
            log::warn!("image {} has no resource; skipped", img.resource_id);
            return;
        };
        self.drawing_id += 1;
        let id = self.drawing_id;
        let (cx, cy) = (emu(img.rect.width), emu(img.rect.height));
        let descr = xml_escape(img.alt_text.as_deref().unwrap_or(""));

        self.body.push_str("<w:p>");
        if self.positioned {
            self.body
                .push_str(&format!("<w:pPr>{}</w:pPr>", frame_properties(img.rect)));
        }
        self.body.push_str(&format!(
            concat!(
                r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
                r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{id}" name="Picture {id}" descr="{descr}"/>"#,
                r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:pic><pic:nvPicPr><pic:cNvPr id="{id}" name="Picture {id}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
                r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
            ),
            cx = cx,
            cy = cy,
            id = id,
            descr = descr,
            rel = rel
        ));
        self.body.push_str("</w:p>");
    }
}

fn run_xml(text: &str, style: &TextStyle) -> String {
    let mut props = String::new();
    if let Some(font) = &style.font_name {
        let font = xml_escape(font);
        props.push_str(&format!(r#"<w:rFonts w:ascii="{0}" w:hAnsi="{0}"/>"#, font));
    }
    if style.bold {
        props.push_str("<w:b/>");
    }
    if style.italic {
        props.push_str("<w:i/>");
    }
    if style.color != Color::BLACK {
        props.push_str(&format!(r#"<w:color w:val="{}"/>"#, hex(style.color)));
    }
    let half_points = (style.font_size * 2.0).round().max(2.0) as u32;
    props.push_str(&format!(r#"<w:sz w:val="{}"/>"#, half_points));
    if style.underline {
        props.push_str(r#"<w:u w:val="single"/>"#);
    }
    format!(
        r#"<w:r><w:rPr>{}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        props,
        xml_escape(text)
    )
}

fn frame_properties(rect: Rect) -> String {
    format!(
        r#"<w:framePr w:w="{}" w:h="{}" w:hRule="exact" w:hAnchor="page" w:vAnchor="page" w:x="{}" w:y="{}"/>"#,
        twips(rect.width.max(1.0)),
        twips(rect.height.max(1.0)),
        twips(rect.x),
        twips(rect.y)
    )
}

fn section_properties(page: &Page, positioned: bool) -> String {
    let (w, h) = page.dimensions();
    let orient = if w > h { r#" w:orient="landscape""# } else { "" };
    let margin = if positioned { 0 } else { twips(72.0) };
    format!(
        r#"<w:sectPr><w:pgSz w:w="{}" w:h="{}"{}/><w:pgMar w:top="{m}" w:right="{m}" w:bottom="{m}" w:left="{m}" w:header="0" w:footer="0" w:gutter="0"/></w:sectPr>"#,
        twips(w),
        twips(h),
        orient,
        m = margin
    )
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

/// One worksheet per page. Text lines fill column A, tables keep their grid.
pub(crate) fn to_xlsx(doc: &Document, _options: &super::ExportOptions) -> Result<Vec<u8>> {
    let mut sheets: Vec<Vec<Vec<String>>> = doc
        .pages
        .iter()
        .enumerate()
        .map(|(i, page)| sheet_rows(page, doc.context(i)))
        .collect();
    if sheets.is_empty() {
        // a workbook needs at least one sheet
        sheets.push(Vec::new());
    }

    let mut workbook_sheets = String::new();
    let mut workbook_rels = String::new();
    let mut overrides = vec![(
        "/xl/workbook.xml".to_string(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
    )];
    for i in 1..=sheets.len() {
        workbook_sheets.push_str(&format!(
            r#"<sheet name="Page {i}" sheetId="{i}" r:id="rId{i}"/>"#
        ));
        workbook_rels.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
        overrides.push((
            format!("/xl/worksheets/sheet{}.xml", i),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
        ));
    }
    overrides.extend(doc_prop_overrides());

    let mut archive = Archive::new();
    archive.add("[Content_Types].xml", content_types(&overrides))?;
    archive.add(
        "_rels/.rels",
        package_rels(
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
            "xl/workbook.xml",
        ),
    )?;
    add_doc_props(&mut archive, doc)?;
    archive.add(
        "xl/workbook.xml",
        format!(
            r#"{}<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="{}"><sheets>{}</sheets></workbook>"#,
            XML_DECL, NS_REL, workbook_sheets
        ),
    )?;
    archive.add(
        "xl/_rels/workbook.xml.rels",
        format!(
            r#"{}<Relationships xmlns="{}">{}</Relationships>"#,
            XML_DECL, NS_PKG_REL, workbook_rels
        ),
    )?;
    for (i, rows) in sheets.iter().enumerate() {
        archive.add(&format!("xl/worksheets/sheet{}.xml", i + 1), worksheet_xml(rows))?;
    }
    archive.finish()
}

fn sheet_rows(page: &Page, ctx: PageContext) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for element in &page.elements {
        match element {
            Element::Table(table) => {
                rows.extend(table.rows.iter().map(|row| {
                    row.cells.iter().map(|c| c.content.clone()).collect()
                }));
            }
            Element::Bookmark(b) => rows.push(vec![b.title.clone()]),
            other => {
                if let Some(text) = other.visible_text(ctx) {
                    rows.extend(text.lines().map(|line| vec![line.to_string()]));
                }
            }
        }
    }
    rows
}

fn worksheet_xml(rows: &[Vec<String>]) -> String {
    let mut xml = format!(
        r#"{}<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        XML_DECL
    );
    for (r, row) in rows.iter().enumerate() {
        let r = r + 1;
        xml.push_str(&format!(r#"<row r="{}">"#, r));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let cell_ref = format!("{}{}", column_name(c), r);
            match value.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, n));
                }
                _ => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    cell_ref,
                    xml_escape(value)
                )),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Zero-based column index to its spreadsheet letters.
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

const NS_PRESENTATION: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const EMPTY_TREE: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

const THEME: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Folio"><a:themeElements>"#,
    r#"<a:clrScheme name="Folio"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme>"#,
    r#"<a:fontScheme name="Folio"><a:majorFont><a:latin typeface="Helvetica"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Helvetica"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>"#,
    r#"<a:fmtScheme name="Folio"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst>"#,
    r#"<a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst>"#,
    r#"<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>"#,
    r#"<a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme>"#,
    r#"</a:themeElements></a:theme>"#
);

/// Slide sizes are limited to 1-56 inches a side.
fn slide_emu(pt: f32) -> i64 {
    emu(pt).clamp(914_400, 51_206_400)
}

/// One slide per page, every element placed at its page position.
pub(crate) fn to_pptx(doc: &Document, _options: &super::ExportOptions) -> Result<Vec<u8>> {
    let (width, height) = doc
        .pages
        .first()
        .map(Page::dimensions)
        .unwrap_or_else(|| Page::letter().dimensions());

    let mut archive = Archive::new();
    let mut overrides = vec![
        (
            "/ppt/presentation.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
        ),
        (
            "/ppt/slideMasters/slideMaster1.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml",
        ),
        (
            "/ppt/slideLayouts/slideLayout1.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml",
        ),
        (
            "/ppt/theme/theme1.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.theme+xml",
        ),
    ];
    overrides.extend(doc_prop_overrides());

    let mut slide_ids = String::new();
    let mut presentation_rels = String::from(
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>"#,
    );
    let mut slides = Vec::with_capacity(doc.pages.len());
    for (i, page) in doc.pages.iter().enumerate() {
        let n = i + 1;
        slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2));
        presentation_rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
            n + 2,
            n
        ));
        overrides.push((
            format!("/ppt/slides/slide{}.xml", n),
            "application/vnd.openxmlformats-officedocument.presentationml.slide+xml",
        ));
        slides.push(slide_xml(doc, page, doc.context(i)));
    }

    archive.add("[Content_Types].xml", content_types(&overrides))?;
    archive.add(
        "_rels/.rels",
        package_rels(
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
            "ppt/presentation.xml",
        ),
    )?;
    add_doc_props(&mut archive, doc)?;
    archive.add(
        "ppt/presentation.xml",
        format!(
            r#"{}<p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
            XML_DECL,
            NS_PRESENTATION,
            slide_ids,
            slide_emu(width),
            slide_emu(height)
        ),
    )?;
    archive.add(
        "ppt/_rels/presentation.xml.rels",
        format!(r#"{}<Relationships xmlns="{}">{}</Relationships>"#, XML_DECL, NS_PKG_REL, presentation_rels),
    )?;
    archive.add(
        "ppt/slideMasters/slideMaster1.xml",
        format!(
            r#"{}<p:sldMaster {}><p:cSld><p:spTree>{}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#,
            XML_DECL, NS_PRESENTATION, EMPTY_TREE
        ),
    )?;
    archive.add(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        format!(
            r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/></Relationships>"#,
            XML_DECL, NS_PKG_REL
        ),
    )?;
    archive.add(
        "ppt/slideLayouts/slideLayout1.xml",
        format!(
            r#"{}<p:sldLayout {} preserve="1"><p:cSld name="Blank"><p:spTree>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
            XML_DECL, NS_PRESENTATION, EMPTY_TREE
        ),
    )?;
    archive.add(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        format!(
            r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#,
            XML_DECL, NS_PKG_REL
        ),
    )?;
    archive.add("ppt/theme/theme1.xml", THEME)?;

    for (i, (xml, rels)) in slides.into_iter().enumerate() {
        archive.add(&format!("ppt/slides/slide{}.xml", i + 1), xml)?;
        archive.add(&format!("ppt/slides/_rels/slide{}.xml.rels", i + 1), rels)?;
    }
    add_media_files(&mut archive, doc, "ppt/media/")?;
    archive.finish()
}

/// Slide part and its relationships.
fn slide_xml(doc: &Document, page: &Page, ctx: PageContext) -> (String, String) {
    let mut media = Media::new(doc, "../media/", 2);
    let plain = TextStyle::default();
    let mut shapes = String::new();
    let mut shape_id = 1;

    for element in &page.elements {
        let text_shape = match element {
            Element::Text(run) => Some((run.text.clone(), &run.style, run.bounds(), 0.0)),
            Element::PageNumber(stamp) => element
                .bounds()
                .map(|b| (stamp.resolve(ctx), &stamp.style, b, 0.0)),
            Element::Watermark(w) => element.bounds().map(|b| (w.text.clone(), &w.style, b, w.angle)),
            Element::Table(table) => Some((table.plain_text(), &plain, table.rect, 0.0)),
            Element::Image(img) => {
                if let Some(rel) = media.rel_for(img) {
                    shape_id += 1;
                    shapes.push_str(&picture_shape(shape_id, &rel, img));
                }
                None
            }
            _ => None,
        };
        if let Some((text, style, rect, angle)) = text_shape {
            shape_id += 1;
            shapes.push_str(&text_shape_xml(shape_id, &text, style, rect, angle));
        }
    }

    let background = page
        .background
        .map(|c| {
            format!(
                r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#,
                hex(c)
            )
        })
        .unwrap_or_default();

    let xml = format!(
        r#"{}<p:sld {}><p:cSld>{}<p:spTree>{}{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        XML_DECL, NS_PRESENTATION, background, EMPTY_TREE, shapes
    );
    let rels = format!(
        r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>{}</Relationships>"#,
        XML_DECL,
        NS_PKG_REL,
        media.relationships()
    );
    (xml, rels)
}

fn xfrm(rect: Rect, angle: f32) -> String {
    let rot = if angle != 0.0 {
        // counter-clockwise degrees to clockwise 60000ths
        format!(r#" rot="{}""#, ((-angle).rem_euclid(360.0) * 60_000.0).round() as i64)
    } else {
        String::new()
    };
    format!(
        r#"<a:xfrm{}><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        rot,
        emu(rect.x),
        emu(rect.y),
        emu(rect.width),
        emu(rect.height)
    )
}

fn text_shape_xml(id: u32, text: &str, style: &TextStyle, rect: Rect, angle: f32) -> String {
    let mut attrs = format!(
        r#" lang="en-US" sz="{}""#,
        (style.font_size * 100.0).round().clamp(100.0, 400_000.0) as u32
    );
    if style.bold {
        attrs.push_str(r#" b="1""#);
    }
    if style.italic {
        attrs.push_str(r#" i="1""#);
    }
    if style.underline {
        attrs.push_str(r#" u="sng""#);
    }
    let mut props = format!(
        r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#,
        hex(style.color)
    );
    if let Some(font) = &style.font_name {
        props.push_str(&format!(r#"<a:latin typeface="{}"/>"#, xml_escape(font)));
    }

    let paragraphs: String = text
        .lines()
        .map(|line| {
            format!(
                r#"<a:p><a:r><a:rPr{}>{}</a:rPr><a:t>{}</a:t></a:r></a:p>"#,
                attrs,
                props,
                xml_escape(line)
            )
        })
        .collect();
    let paragraphs = if paragraphs.is_empty() {
        "<a:p/>".to_string()
    } else {
        paragraphs
    };

    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="none" lIns="0" tIns="0" rIns="0" bIns="0"/><a:lstStyle/>{}</p:txBody></p:sp>"#,
        xfrm(rect, angle),
        paragraphs,
        id = id
    )
}

fn picture_shape(id: u32, rel: &str, img: &ImageElement) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}" descr="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
        xml_escape(img.alt_text.as_deref().unwrap_or("")),
        rel,
        xfrm(img.rect, 0.0),
        id = id
    )
}
