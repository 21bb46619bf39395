//! Page range specifications such as `"1,3-4"` or `"2-"`.

use crate::error::{Error, Result};
use std::fmt;

/// One comma-separated token of a range spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeToken {
    /// A single page
    Page(u32),
    /// Inclusive span; `None` bounds extend to the first or last page
    Span(Option<u32>, Option<u32>),
}

/// A parsed page range, not yet checked against a page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    tokens: Vec<RangeToken>,
    source: String,
}

impl PageRange {
    /// Every page.
    pub fn all() -> Self {
        Self {
            tokens: vec![RangeToken::Span(None, None)],
            source: String::new(),
        }
    }

    /// Parse a range spec.
    ///
    /// Tokens keep their written order and duplicates are kept. `""` and
    /// `"-"` select every page.
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed: String = spec.chars().filter(|c| !c.is_whitespace()).collect();
        if trimmed.is_empty() {
            return Ok(Self::all());
        }

        let tokens = trimmed
            .split(',')
            .map(|part| parse_token(part, spec))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tokens,
            source: spec.to_string(),
        })
    }

    /// Parse a `;`-separated list of ranges, as used by split.
    pub fn parse_list(spec: &str) -> Result<Vec<Self>> {
        if spec.trim().is_empty() {
            return Ok(vec![Self::all()]);
        }
        spec.split(';')
            .map(|part| {
                if part.trim().is_empty() {
                    Err(invalid(spec, "empty range between ';'"))
                } else {
                    Self::parse(part)
                }
            })
            .collect()
    }

    pub fn tokens(&self) -> &[RangeToken] {
        &self.tokens
    }

    /// Resolve into 1-based page numbers, checking every index against
    /// `page_count`.
    pub fn resolve(&self, page_count: u32) -> Result<Vec<u32>> {
        let mut pages = Vec::new();
        for token in &self.tokens {
            let (start, end) = match *token {
                RangeToken::Page(p) => (p, p),
                RangeToken::Span(start, end) => (start.unwrap_or(1), end.unwrap_or(page_count)),
            };
            if page_count == 0 && *token == RangeToken::Span(None, None) {
                continue;
            }
            if start > page_count || end > page_count {
                return Err(invalid(
                    &self.source,
                    &format!(
                        "page {} exceeds page count {}",
                        start.max(end),
                        page_count
                    ),
                ));
            }
            if start > end {
                return Err(invalid(&self.source, &format!("span {}-{} is reversed", start, end)));
            }
            pages.extend(start..=end);
        }
        Ok(pages)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_empty() {
            write!(f, "all pages")
        } else {
            write!(f, "{}", self.source)
        }
    }
}

/// Parse and resolve a spec in one step.
pub fn resolve(spec: &str, page_count: u32) -> Result<Vec<u32>> {
    PageRange::parse(spec)?.resolve(page_count)
}

fn parse_token(part: &str, spec: &str) -> Result<RangeToken> {
    if part.is_empty() {
        return Err(invalid(spec, "empty token"));
    }

    match part.split_once('-') {
        Some((start, end)) => {
            let start = parse_bound(start, spec)?;
            let end = parse_bound(end, spec)?;
            if let (Some(s), Some(e)) = (start, end) {
                if s > e {
                    return Err(invalid(spec, &format!("span {}-{} is reversed", s, e)));
                }
            }
            Ok(RangeToken::Span(start, end))
        }
        None => Ok(RangeToken::Page(parse_page(part, spec)?)),
    }
}

fn parse_bound(s: &str, spec: &str) -> Result<Option<u32>> {
    if s.is_empty() {
        Ok(None)
    } else {
        parse_page(s, spec).map(Some)
    }
}

fn parse_page(s: &str, spec: &str) -> Result<u32> {
    let page: u32 = s
        .parse()
        .map_err(|_| invalid(spec, &format!("'{}' is not a page number", s)))?;
    if page == 0 {
        return Err(invalid(spec, "page numbers start at 1"));
    }
    Ok(page)
}

fn invalid(spec: &str, reason: &str) -> Error {
    Error::InvalidPageRange(format!("\"{}\": {}", spec, reason))
}
