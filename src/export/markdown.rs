//! Markdown export.

use crate::model::{
    Alignment, AnnotationKind, Document, Element, Page, PageContext, Table, TableRow, TextRun,
    TextStyle,
};

/// How to render tables with merged cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFallback {
    /// Pipe table, spans ignored
    Markdown,
    /// HTML table keeping rowspan and colspan
    #[default]
    Html,
}

/// Options for Markdown export.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Start with a YAML frontmatter block of the metadata
    pub include_frontmatter: bool,

    /// Escape Markdown syntax characters in text
    pub escape_special_chars: bool,

    /// Prefix for image links
    pub image_path_prefix: String,

    /// Rendering of tables with merged cells
    pub table_fallback: TableFallback,

    /// Put a horizontal rule between pages
    pub page_rules: bool,

    /// Deepest heading level emitted for bookmarks
    pub max_heading_level: u8,
}

impl MarkdownOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable frontmatter.
    pub fn with_frontmatter(mut self, enabled: bool) -> Self {
        self.include_frontmatter = enabled;
        self
    }

    /// Set the image path prefix.
    pub fn with_image_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.image_path_prefix = prefix.into();
        self
    }

    /// Set the merged-cell table fallback.
    pub fn with_table_fallback(mut self, fallback: TableFallback) -> Self {
        self.table_fallback = fallback;
        self
    }

    /// Enable or disable rules between pages.
    pub fn with_page_rules(mut self, enabled: bool) -> Self {
        self.page_rules = enabled;
        self
    }
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            include_frontmatter: false,
            escape_special_chars: true,
            image_path_prefix: String::new(),
            table_fallback: TableFallback::default(),
            page_rules: false,
            max_heading_level: 6,
        }
    }
}

/// Convert a document to Markdown.
pub fn to_markdown(doc: &Document, options: &MarkdownOptions) -> String {
    MarkdownRenderer::new(options).render(doc)
}

/// Markdown renderer.
struct MarkdownRenderer<'a> {
    options: &'a MarkdownOptions,
    output: String,
}

impl<'a> MarkdownRenderer<'a> {
    fn new(options: &'a MarkdownOptions) -> Self {
        Self {
            options,
            output: String::new(),
        }
    }

    fn render(mut self, doc: &Document) -> String {
        if self.options.include_frontmatter {
            self.output
                .push_str(&doc.metadata.to_yaml_frontmatter(doc.page_count()));
            self.output.push('\n');
        }

        for (i, page) in doc.pages.iter().enumerate() {
            if i > 0 && self.options.page_rules {
                self.output.push_str("---\n\n");
            }
            self.render_page(page, doc.context(i));
        }

        self.output.trim().to_string()
    }

    fn render_page(&mut self, page: &Page, ctx: PageContext) {
        for element in &page.elements {
            match element {
                Element::Text(run) => self.render_text_run(run),
                Element::Bookmark(b) => {
                    let level = (b.level as usize + 1).min(self.options.max_heading_level.max(1) as usize);
                    let title = self.escape(&b.title);
                    self.output
                        .push_str(&format!("{} {}\n\n", "#".repeat(level), title));
                }
                Element::PageNumber(stamp) => {
                    let text = stamp.resolve(ctx);
                    self.paragraph(&text, &stamp.style);
                }
                Element::Table(table) => self.render_table(table),
                Element::Image(img) => {
                    let alt = img.alt_text.as_deref().unwrap_or("");
                    self.output.push_str(&format!(
                        "![{}]({}{})\n\n",
                        alt, self.options.image_path_prefix, img.resource_id
                    ));
                }
                Element::Annotation(a) => {
                    if let AnnotationKind::Link { uri } = &a.kind {
                        let label = a.contents.as_deref().unwrap_or(uri);
                        self.output
                            .push_str(&format!("[{}]({})\n\n", self.escape(label), uri));
                    }
                }
                Element::HiddenText(_)
                | Element::Script(_)
                | Element::Attachment(_)
                | Element::Watermark(_) => {}
            }
        }
    }

    fn render_text_run(&mut self, run: &TextRun) {
        if run.text.trim().is_empty() {
            return;
        }
        self.paragraph(&run.text, &run.style);
    }

    fn paragraph(&mut self, text: &str, style: &TextStyle) {
        let lines: Vec<String> = text
            .lines()
            .map(|line| apply_text_style(&self.escape(line), style))
            .collect();
        // hard breaks keep the run's own line structure
        self.output.push_str(&lines.join("  \n"));
        self.output.push_str("\n\n");
    }

    fn escape(&self, text: &str) -> String {
        if self.options.escape_special_chars {
            escape_markdown(text)
        } else {
            text.to_string()
        }
    }

    fn render_table(&mut self, table: &Table) {
        if table.is_empty() {
            return;
        }

        if let Some(caption) = &table.caption {
            self.output.push_str(&format!("*{}*\n\n", self.escape(caption)));
        }

        if table.has_merged_cells() && self.options.table_fallback == TableFallback::Html {
            self.render_table_html(table);
        } else {
            self.render_table_markdown(table);
        }
    }

    fn render_table_markdown(&mut self, table: &Table) {
        let col_count = table.column_count();
        if col_count == 0 {
            return;
        }

        let separator_after = table.header_rows.max(1) as usize - 1;
        for (i, row) in table.rows.iter().enumerate() {
            self.output.push('|');
            for c in 0..col_count {
                let content = row
                    .cells
                    .get(c)
                    .map(|cell| cell.plain_text().replace('\n', " "))
                    .unwrap_or_default();
                self.output
                    .push_str(&format!(" {} |", self.escape(content.trim())));
            }
            self.output.push('\n');

            if i == separator_after {
                self.output.push('|');
                for c in 0..col_count {
                    let alignment = row.cells.get(c).map(|cell| cell.alignment).unwrap_or_default();
                    self.output.push_str(match alignment {
                        Alignment::Left => " --- |",
                        Alignment::Center => " :---: |",
                        Alignment::Right => " ---: |",
                    });
                }
                self.output.push('\n');
            }
        }

        self.output.push('\n');
    }

    fn render_table_html(&mut self, table: &Table) {
        self.output.push_str("<table>\n");

        if table.header_rows > 0 {
            self.output.push_str("<thead>\n");
            for row in table.header() {
                self.render_html_row(row, true);
            }
            self.output.push_str("</thead>\n");
        }

        self.output.push_str("<tbody>\n");
        for row in table.body() {
            self.render_html_row(row, false);
        }
        self.output.push_str("</tbody>\n");

        self.output.push_str("</table>\n\n");
    }

    fn render_html_row(&mut self, row: &TableRow, is_header: bool) {
        let tag = if is_header { "th" } else { "td" };
        self.output.push_str("<tr>");

        for cell in &row.cells {
            let mut attrs = String::new();
            if cell.rowspan > 1 {
                attrs.push_str(&format!(" rowspan=\"{}\"", cell.rowspan));
            }
            if cell.colspan > 1 {
                attrs.push_str(&format!(" colspan=\"{}\"", cell.colspan));
            }

            self.output.push_str(&format!(
                "<{tag}{attrs}>{}</{tag}>",
                super::xml_escape(&cell.plain_text())
            ));
        }

        self.output.push_str("</tr>\n");
    }
}

fn apply_text_style(text: &str, style: &TextStyle) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }
    let mut result = text.to_string();
    if style.italic {
        result = format!("*{}*", result);
    }
    if style.bold {
        result = format!("**{}**", result);
    }
    if style.underline {
        result = format!("<u>{}</u>", result);
    }
    result
}

/// Escape characters that could be misread as Markdown syntax.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bookmark, Rect, TableCell};
    use pretty_assertions::assert_eq;

    fn doc_with(elements: Vec<Element>) -> Document {
        let mut doc = Document::with_blank_page();
        for e in elements {
            doc.pages[0].add_element(e);
        }
        doc
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("Hello *world*"), "Hello \\*world\\*");
        assert_eq!(escape_markdown("[link]"), "\\[link\\]");
    }

    #[test]
    fn test_render_simple_text() {
        let doc = doc_with(vec![Element::text("Hello, world!", 72.0, 72.0)]);
        assert_eq!(to_markdown(&doc, &MarkdownOptions::new()), "Hello, world!");
    }

    #[test]
    fn test_bookmark_becomes_heading() {
        let doc = doc_with(vec![
            Element::Bookmark(Bookmark::new("Chapter 1", 0)),
            Element::text("Body", 72.0, 90.0),
            Element::Bookmark(Bookmark::new("Deep", 9)),
        ]);
        assert_eq!(
            to_markdown(&doc, &MarkdownOptions::new()),
            "# Chapter 1\n\nBody\n\n###### Deep"
        );
    }

    #[test]
    fn test_styled_run() {
        let mut run = TextRun::new("strong", 0.0, 0.0);
        run.style.bold = true;
        run.style.italic = true;
        let doc = doc_with(vec![Element::Text(run)]);
        assert_eq!(to_markdown(&doc, &MarkdownOptions::new()), "***strong***");
    }

    #[test]
    fn test_hidden_text_is_skipped() {
        let doc = doc_with(vec![
            Element::HiddenText(TextRun::new("secret", 0.0, 0.0)),
            Element::text("shown", 0.0, 0.0),
        ]);
        assert_eq!(to_markdown(&doc, &MarkdownOptions::new()), "shown");
    }

    #[test]
    fn test_table_rendering() {
        let mut table = Table::with_header(1).at(Rect::new(72.0, 72.0, 200.0, 40.0));
        table.add_row(TableRow::header(vec![
            TableCell::text("Name"),
            TableCell::text("Qty").align(Alignment::Right),
        ]));
        table.add_row(TableRow::from_strings(["Apple", "3"]));
        let doc = doc_with(vec![Element::Table(table)]);

        assert_eq!(
            to_markdown(&doc, &MarkdownOptions::new()),
            "| Name | Qty |\n| --- | ---: |\n| Apple | 3 |"
        );
    }

    #[test]
    fn test_merged_cells_use_html() {
        let mut table = Table::new();
        table.add_row(TableRow::new(vec![TableCell::text("a<b").colspan(2)]));
        table.add_row(TableRow::from_strings(["1", "2"]));
        let doc = doc_with(vec![Element::Table(table)]);

        let md = to_markdown(&doc, &MarkdownOptions::new());
        assert!(md.starts_with("<table>"));
        assert!(md.contains("<td colspan=\"2\">a&lt;b</td>"));
    }

    #[test]
    fn test_frontmatter_and_page_rules() {
        let mut doc = Document::with_blank_page();
        doc.metadata.title = Some("Test Doc".to_string());
        doc.page_add_text(1, "one").unwrap();
        let n = doc.add_page();
        doc.page_add_text(n, "two").unwrap();

        let options = MarkdownOptions::new()
            .with_frontmatter(true)
            .with_page_rules(true);
        let md = to_markdown(&doc, &options);
        assert!(md.starts_with("---\n"));
        assert!(md.contains("title:"));
        assert!(md.ends_with("one\n\n---\n\ntwo"));
    }
}
