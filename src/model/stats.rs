//! Word and character counting over visible text.

use unicode_normalization::UnicodeNormalization;

/// Word and character tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    /// Whitespace-delimited tokens
    pub word_count: u32,

    /// Non-whitespace characters after NFC normalization
    pub char_count: u32,
}

impl TextStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update counts from a piece of text.
    pub fn count_text(&mut self, text: &str) {
        self.word_count += text.split_whitespace().count() as u32;
        self.char_count += text.nfc().filter(|c| !c.is_whitespace()).count() as u32;
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &TextStats) {
        self.word_count += other.word_count;
        self.char_count += other.char_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_text() {
        let mut stats = TextStats::new();
        stats.count_text("Hello, world! This is a test.");

        assert_eq!(stats.word_count, 6);
        assert_eq!(stats.char_count, 24);
    }

    #[test]
    fn test_nfc_composes_before_counting() {
        let mut stats = TextStats::new();
        // "e" followed by a combining acute accent
        stats.count_text("cafe\u{301}");
        assert_eq!(stats.char_count, 4);
        assert_eq!(stats.word_count, 1);
    }

    #[test]
    fn test_whitespace_only() {
        let mut stats = TextStats::new();
        stats.count_text(" \t\n ");
        assert_eq!(stats, TextStats::default());
    }

    #[test]
    fn test_merge() {
        let mut a = TextStats {
            word_count: 2,
            char_count: 10,
        };
        a.merge(&TextStats {
            word_count: 1,
            char_count: 3,
        });
        assert_eq!(a.word_count, 3);
        assert_eq!(a.char_count, 13);
    }
}
