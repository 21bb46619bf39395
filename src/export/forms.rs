//! Form data export.
//!
//! Form fields are the widget annotations of the document. A field that
//! appears on several pages is exported once, with its first value.

use super::{xml_escape, ExportOptions};
use crate::error::Result;
use crate::model::{AnnotationKind, Document, Element};

/// A named form value.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field<'a> {
    name: &'a str,
    value: &'a str,
}

fn fields(doc: &Document) -> Vec<Field<'_>> {
    let mut out: Vec<Field<'_>> = Vec::new();
    for page in &doc.pages {
        for element in &page.elements {
            if let Element::Annotation(a) = element {
                if let AnnotationKind::Widget { field_name, value } = &a.kind {
                    if !out.iter().any(|f| f.name == field_name.as_str()) {
                        out.push(Field {
                            name: field_name,
                            value,
                        });
                    }
                }
            }
        }
    }
    out
}

/// Forms Data Format.
pub(crate) fn to_fdf(doc: &Document, _options: &ExportOptions) -> Result<Vec<u8>> {
    let mut out: Vec<u8> = b"%FDF-1.2\n%\xE2\xE3\xCF\xD3\n1 0 obj\n<< /FDF << /Fields [".to_vec();
    for field in fields(doc) {
        out.extend_from_slice(b"\n<< /T ");
        out.extend_from_slice(&pdf_string(field.name));
        out.extend_from_slice(b" /V ");
        out.extend_from_slice(&pdf_string(field.value));
        out.extend_from_slice(b" >>");
    }
    out.extend_from_slice(b"\n] >> >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n");
    Ok(out)
}

/// Encode a PDF string literal. Non-ASCII text becomes UTF-16BE with a BOM.
fn pdf_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        let mut out = Vec::with_capacity(text.len() + 2);
        out.push(b'(');
        for b in text.bytes() {
            match b {
                b'(' | b')' | b'\\' => {
                    out.push(b'\\');
                    out.push(b);
                }
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                _ => out.push(b),
            }
        }
        out.push(b')');
        out
    } else {
        let mut out = String::from("<FEFF");
        for unit in text.encode_utf16() {
            out.push_str(&format!("{:04X}", unit));
        }
        out.push('>');
        out.into_bytes()
    }
}

/// Node of the dotted field-name hierarchy.
#[derive(Default)]
struct FieldNode<'a> {
    name: &'a str,
    value: Option<&'a str>,
    children: Vec<FieldNode<'a>>,
}

impl<'a> FieldNode<'a> {
    fn insert(&mut self, path: &[&'a str], value: &'a str) {
        let Some((head, rest)) = path.split_first() else {
            self.value = Some(value);
            return;
        };
        let idx = match self.children.iter().position(|c| c.name == *head) {
            Some(idx) => idx,
            None => {
                self.children.push(FieldNode {
                    name: *head,
                    ..Default::default()
                });
                self.children.len() - 1
            }
        };
        self.children[idx].insert(rest, value);
    }

    fn write_xfdf(&self, out: &mut String) {
        out.push_str(&format!(r#"<field name="{}">"#, xml_escape(self.name)));
        if let Some(value) = self.value {
            out.push_str(&format!("<value>{}</value>", xml_escape(value)));
        }
        for child in &self.children {
            child.write_xfdf(out);
        }
        out.push_str("</field>");
    }
}

/// XML Forms Data Format. Dotted names nest as child fields.
pub(crate) fn to_xfdf(doc: &Document, _options: &ExportOptions) -> Result<Vec<u8>> {
    let mut root = FieldNode::default();
    for field in fields(doc) {
        let path: Vec<&str> = field.name.split('.').collect();
        root.insert(&path, field.value);
    }

    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><xfdf xmlns="http://ns.adobe.com/xfdf/" xml:space="preserve"><fields>"#,
    );
    for node in &root.children {
        node.write_xfdf(&mut out);
    }
    out.push_str("</fields>");
    if let Some(title) = &doc.metadata.title {
        out.push_str(&format!(r#"<f href="{}"/>"#, xml_escape(title)));
    }
    out.push_str("</xfdf>\n");
    Ok(out.into_bytes())
}

/// Flat XML list of fields.
pub(crate) fn to_xml(doc: &Document, _options: &ExportOptions) -> Result<Vec<u8>> {
    let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push_str("\n<fields>\n");
    for field in fields(doc) {
        out.push_str(&format!(
            "  <field name=\"{}\">\n    <value>{}</value>\n  </field>\n",
            xml_escape(field.name),
            xml_escape(field.value)
        ));
    }
    out.push_str("</fields>\n");
    Ok(out.into_bytes())
}
