//! JSON export.

use crate::error::{Error, Result};
use crate::model::Document;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a document to JSON.
pub fn to_json(doc: &Document, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(doc),
        JsonFormat::Compact => serde_json::to_string(doc),
    };

    result.map_err(|e| Error::Export(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_pretty() {
        let mut doc = Document::with_blank_page();
        doc.metadata.title = Some("Test".to_string());
        doc.pages[0].add_text("Hello");

        let json = to_json(&doc, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"title\""));
        assert!(json.contains("Hello"));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_to_json_compact() {
        let doc = Document::with_blank_page();
        let json = to_json(&doc, JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_json_has_no_session_state() {
        let mut doc = Document::with_blank_page();
        doc.set_origin("/tmp/a.folio");
        let json = to_json(&doc, JsonFormat::Compact).unwrap();
        assert!(!json.contains("origin"));
        assert!(!json.contains("dirty"));
    }
}
