//! Legacy word processing export as Rich Text Format.

use super::ExportOptions;
use crate::error::Result;
use crate::model::{Color, Document, Element, TextStyle};

/// Render the document as RTF. Each page ends with a page break.
pub(crate) fn to_rtf(doc: &Document, _options: &ExportOptions) -> Result<Vec<u8>> {
    let plain = TextStyle::default();
    let mut colors = vec![Color::BLACK];
    let mut fonts = vec!["Helvetica".to_string()];
    for page in &doc.pages {
        for element in &page.elements {
            if let Some(style) = style_of(element, &plain) {
                if !colors.contains(&style.color) {
                    colors.push(style.color);
                }
                if let Some(name) = &style.font_name {
                    if !fonts.contains(name) {
                        fonts.push(name.clone());
                    }
                }
            }
        }
    }

    let mut out = String::from("{\\rtf1\\ansi\\deff0\n{\\fonttbl");
    for (i, name) in fonts.iter().enumerate() {
        out.push_str(&format!("{{\\f{}\\fswiss {};}}", i, escape_rtf(name)));
    }
    out.push_str("}\n{\\colortbl;");
    for c in &colors {
        out.push_str(&format!("\\red{}\\green{}\\blue{};", c.r, c.g, c.b));
    }
    out.push_str("}\n");

    let meta = &doc.metadata;
    out.push_str("{\\info");
    for (tag, value) in [("title", &meta.title), ("author", &meta.author), ("subject", &meta.subject)] {
        if let Some(value) = value {
            out.push_str(&format!("{{\\{} {}}}", tag, escape_rtf(value)));
        }
    }
    out.push_str("}\n");

    if let Some(page) = doc.pages.first() {
        let (w, h) = page.dimensions();
        out.push_str(&format!(
            "\\paperw{}\\paperh{}\\margl1440\\margr1440\\margt1440\\margb1440\n",
            (w * 20.0).round() as i64,
            (h * 20.0).round() as i64
        ));
    }

    let last = doc.pages.len().saturating_sub(1);
    for (i, page) in doc.pages.iter().enumerate() {
        let ctx = doc.context(i);
        for element in &page.elements {
            let Some(style) = style_of(element, &plain) else {
                continue;
            };
            let Some(text) = element.visible_text(ctx) else {
                continue;
            };
            let font = style
                .font_name
                .as_ref()
                .and_then(|name| fonts.iter().position(|f| f == name))
                .unwrap_or(0);
            // color table index 0 is "auto"
            let color = colors.iter().position(|c| *c == style.color).unwrap_or(0) + 1;

            out.push_str(&format!(
                "{{\\pard\\f{}\\fs{}\\cf{}",
                font,
                (style.font_size * 2.0).round().max(2.0) as u32,
                color
            ));
            if style.bold {
                out.push_str("\\b");
            }
            if style.italic {
                out.push_str("\\i");
            }
            if style.underline {
                out.push_str("\\ul");
            }
            out.push(' ');
            out.push_str(&escape_rtf(&text).replace('\n', "\\line "));
            out.push_str("\\par}\n");
        }
        if i < last {
            out.push_str("\\page\n");
        }
    }

    out.push('}');
    Ok(out.into_bytes())
}

fn style_of<'a>(element: &'a Element, plain: &'a TextStyle) -> Option<&'a TextStyle> {
    match element {
        Element::Text(run) => Some(&run.style),
        Element::PageNumber(stamp) => Some(&stamp.style),
        Element::Table(_) => Some(plain),
        _ => None,
    }
}

/// Escape RTF control characters; non-ASCII becomes `\uN?`.
fn escape_rtf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push_str("\\tab "),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // RTF takes signed 16-bit code units
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
    out
}
