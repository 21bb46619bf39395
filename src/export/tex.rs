//! LaTeX source export.

use super::ExportOptions;
use crate::error::Result;
use crate::model::{Document, Element, Table, TextStyle};

/// Render the document as a standalone LaTeX article.
pub(crate) fn to_tex(doc: &Document, _options: &ExportOptions) -> Result<Vec<u8>> {
    let mut out = String::from("\\documentclass{article}\n");
    out.push_str("\\usepackage[utf8]{inputenc}\n\\usepackage[T1]{fontenc}\n\\usepackage{ulem}\n\\usepackage{graphicx}\n");
    if let Some(page) = doc.pages.first() {
        let (w, h) = page.dimensions();
        out.push_str(&format!(
            "\\usepackage[paperwidth={}bp,paperheight={}bp,margin=1in]{{geometry}}\n",
            w.round(),
            h.round()
        ));
    }

    let meta = &doc.metadata;
    if let Some(title) = &meta.title {
        out.push_str(&format!("\\title{{{}}}\n", escape_tex(title)));
    }
    if let Some(author) = &meta.author {
        out.push_str(&format!("\\author{{{}}}\n", escape_tex(author)));
    }
    out.push_str("\\date{}\n\\begin{document}\n");
    if meta.title.is_some() {
        out.push_str("\\maketitle\n");
    }

    let last = doc.pages.len().saturating_sub(1);
    for (i, page) in doc.pages.iter().enumerate() {
        let ctx = doc.context(i);
        for element in &page.elements {
            match element {
                Element::Text(run) => paragraph(&mut out, &run.text, &run.style),
                Element::PageNumber(stamp) => paragraph(&mut out, &stamp.resolve(ctx), &stamp.style),
                Element::Bookmark(b) => {
                    let command = match b.level {
                        0 => "section",
                        1 => "subsection",
                        2 => "subsubsection",
                        _ => "paragraph",
                    };
                    out.push_str(&format!("\\{}*{{{}}}\n\n", command, escape_tex(&b.title)));
                }
                Element::Table(table) => tabular(&mut out, table),
                Element::Image(img) => {
                    out.push_str(&format!(
                        "% image {} ({:.0}x{:.0}bp)\n\n",
                        img.resource_id, img.rect.width, img.rect.height
                    ));
                }
                _ => {}
            }
        }
        if i < last {
            out.push_str("\\newpage\n\n");
        }
    }

    out.push_str("\\end{document}\n");
    Ok(out.into_bytes())
}

fn paragraph(out: &mut String, text: &str, style: &TextStyle) {
    let lines: Vec<String> = text.lines().map(|l| styled(&escape_tex(l), style)).collect();
    if lines.is_empty() {
        return;
    }
    out.push_str(&lines.join("\\\\\n"));
    out.push_str("\n\n");
}

fn styled(text: &str, style: &TextStyle) -> String {
    let mut result = text.to_string();
    if style.italic {
        result = format!("\\textit{{{}}}", result);
    }
    if style.bold {
        result = format!("\\textbf{{{}}}", result);
    }
    if style.underline {
        result = format!("\\uline{{{}}}", result);
    }
    result
}

fn tabular(out: &mut String, table: &Table) {
    let columns = table.column_count();
    if columns == 0 {
        return;
    }
    out.push_str(&format!("\\begin{{tabular}}{{|{}}}\n\\hline\n", "l|".repeat(columns)));
    for row in &table.rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|cell| {
                let text = escape_tex(&cell.content.replace('\n', " "));
                if cell.colspan > 1 {
                    format!("\\multicolumn{{{}}}{{|l|}}{{{}}}", cell.colspan, text)
                } else {
                    text
                }
            })
            .collect();
        out.push_str(&cells.join(" & "));
        out.push_str(" \\\\\n\\hline\n");
    }
    out.push_str("\\end{tabular}\n\n");
}

/// Escape LaTeX special characters.
fn escape_tex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            c => out.push(c),
        }
    }
    out
}
