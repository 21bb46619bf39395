//! Plain text export with an optional cleanup pass.

use crate::model::Document;
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref HYPHEN_BREAK: Regex = Regex::new(r"([A-Za-z])-\n([a-z])").expect("hyphen pattern");
    static ref SPACE_RUN: Regex = Regex::new(r"[ \t]{2,}").expect("space pattern");
    static ref TRAILING_SPACE: Regex = Regex::new(r"(?m)[ \t]+$").expect("trailing pattern");
}

const LIGATURES: [(char, &str); 7] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Options for plain text export.
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// Normalize Unicode to NFC form
    pub normalize_unicode: bool,

    /// Replace typographic ligatures with plain letters
    pub fix_ligatures: bool,

    /// Join words hyphenated across a line break
    pub fix_hyphenation: bool,

    /// Collapse runs of spaces and strip trailing spaces
    pub normalize_whitespace: bool,

    /// Maximum consecutive newlines (0 = unlimited)
    pub max_consecutive_newlines: u8,

    /// Text placed between pages
    pub page_separator: String,
}

impl TextOptions {
    /// Page text as stored, NFC-normalized.
    pub fn raw() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: false,
            fix_hyphenation: false,
            normalize_whitespace: false,
            max_consecutive_newlines: 0,
            page_separator: "\n\n".to_string(),
        }
    }

    /// Every cleanup step enabled.
    pub fn clean() -> Self {
        Self {
            fix_ligatures: true,
            fix_hyphenation: true,
            normalize_whitespace: true,
            max_consecutive_newlines: 2,
            ..Self::raw()
        }
    }

    /// Set the page separator.
    pub fn with_page_separator(mut self, separator: impl Into<String>) -> Self {
        self.page_separator = separator.into();
        self
    }

    fn process(&self, text: &str) -> String {
        let mut result: String = if self.normalize_unicode {
            text.nfc().collect()
        } else {
            text.to_string()
        };

        if self.fix_ligatures {
            for (ligature, replacement) in LIGATURES {
                if result.contains(ligature) {
                    result = result.replace(ligature, replacement);
                }
            }
        }

        if self.fix_hyphenation {
            result = HYPHEN_BREAK.replace_all(&result, "$1$2").into_owned();
        }

        if self.normalize_whitespace {
            result = SPACE_RUN.replace_all(&result, " ").into_owned();
            result = TRAILING_SPACE.replace_all(&result, "").into_owned();
        }

        if self.max_consecutive_newlines > 0 {
            result = limit_newlines(&result, self.max_consecutive_newlines as usize);
        }

        result
    }
}

impl Default for TextOptions {
    fn default() -> Self {
        Self::raw()
    }
}

fn limit_newlines(text: &str, max: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run > max {
                continue;
            }
        } else {
            run = 0;
        }
        out.push(c);
    }
    out
}

/// Convert a document to plain text.
pub fn to_text(doc: &Document, options: &TextOptions) -> String {
    let pages: Vec<String> = doc
        .pages
        .iter()
        .enumerate()
        .map(|(i, page)| options.process(&page.text(doc.context(i))))
        .collect();

    pages.join(&options.page_separator).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(pages: &[&str]) -> Document {
        let mut doc = Document::new();
        for text in pages {
            let n = doc.add_page();
            doc.page_add_text(n, text).unwrap();
        }
        doc
    }

    #[test]
    fn test_to_text() {
        let doc = doc(&["Hello, world!", "Second page."]);
        assert_eq!(
            to_text(&doc, &TextOptions::default()),
            "Hello, world!\n\nSecond page."
        );
    }

    #[test]
    fn test_matches_extracted_text() {
        let doc = doc(&["one", "two", "three"]);
        assert_eq!(to_text(&doc, &TextOptions::raw()), doc.extract_text());
    }

    #[test]
    fn test_page_separator() {
        let doc = doc(&["a", "b"]);
        let options = TextOptions::raw().with_page_separator("\n\u{c}\n");
        assert_eq!(to_text(&doc, &options), "a\n\u{c}\nb");
    }

    #[test]
    fn test_cleanup() {
        let doc = doc(&["e\u{301}\u{FB01}ne   infor-\nmation  "]);
        assert_eq!(to_text(&doc, &TextOptions::clean()), "\u{e9}fine information");
        assert_eq!(limit_newlines("a\n\n\n\nb", 2), "a\n\nb");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(to_text(&Document::new(), &TextOptions::default()), "");
    }
}
