//! Page structure: insert, delete, append, rotate, resize, merge and split.

use super::{commit, referenced_resources, retarget_images, Scope};
use crate::error::{Error, Result};
use crate::model::{Document, Page, PageSize, Rotation, Transform};
use crate::range::PageRange;

impl Document {
    /// Append a blank Letter page and return its number.
    pub fn add_page(&mut self) -> u32 {
        self.pages.push(Page::letter());
        let n = self.page_count();
        commit(self, "add_page", Scope::Page(n));
        n
    }

    /// Insert a blank page so that it becomes page `n`.
    ///
    /// `n` may be one past the last page, which appends.
    pub fn insert_page(&mut self, n: u32) -> Result<()> {
        if n == 0 || n > self.page_count() + 1 {
            return Err(Error::PageOutOfRange(n, self.page_count()));
        }
        let page = self
            .pages
            .get((n - 1) as usize)
            .or_else(|| self.pages.last())
            .map(|p| {
                let mut blank = Page::new(p.width, p.height);
                blank.size = p.size;
                blank
            })
            .unwrap_or_else(Page::letter);
        self.pages.insert((n - 1) as usize, page);
        commit(self, "insert_page", Scope::Page(n));
        Ok(())
    }

    /// Delete page `n`. Later pages move up by one.
    pub fn delete_page(&mut self, n: u32) -> Result<()> {
        let idx = self.index_of(n)?;
        self.pages.remove(idx);
        commit(self, "delete_page", Scope::Page(n));
        Ok(())
    }

    /// Append every page of `other`.
    pub fn append(&mut self, other: &Document) -> Result<()> {
        let indices: Vec<usize> = (0..other.pages.len()).collect();
        self.import_pages(other, &indices);
        commit(self, "append", Scope::Document);
        Ok(())
    }

    /// Append the pages of `other` selected by a range spec such as `"1,3-4"`.
    ///
    /// The whole spec is checked against `other` before anything is appended.
    pub fn append_pages(&mut self, other: &Document, spec: &str) -> Result<()> {
        let pages = PageRange::parse(spec)?.resolve(other.page_count())?;
        let indices: Vec<usize> = pages.iter().map(|&p| (p - 1) as usize).collect();
        self.import_pages(other, &indices);
        commit(self, "append_pages", Scope::Document);
        Ok(())
    }

    /// Copy pages of `source` onto the end, bringing their resources along.
    ///
    /// Resource ids that collide with different content are renamed in the
    /// copied pages.
    fn import_pages(&mut self, source: &Document, indices: &[usize]) {
        let mut pages: Vec<Page> = indices.iter().map(|&i| source.pages[i].clone()).collect();

        for id in referenced_resources(&pages) {
            let Some(resource) = source.resources.get(&id) else {
                continue;
            };
            match self.resources.get(&id) {
                None => {
                    self.resources.insert(id, resource.clone());
                }
                Some(existing) if existing == resource => {}
                // fonts are shared by name
                Some(_) if id.starts_with("font:") => {}
                Some(_) => {
                    let renamed = self.next_resource_id(&format!("{}-", id));
                    retarget_images(&mut pages, &id, &renamed);
                    self.resources.insert(renamed, resource.clone());
                }
            }
        }

        self.pages.extend(pages);
    }

    /// Rotate every page by `degrees` (a multiple of 90, may be negative).
    pub fn rotate(&mut self, degrees: i32) -> Result<()> {
        self.rotate_scope(Scope::Document, degrees)
    }

    /// Rotate page `n` by `degrees`.
    pub fn page_rotate(&mut self, n: u32, degrees: i32) -> Result<()> {
        self.rotate_scope(Scope::Page(n), degrees)
    }

    fn rotate_scope(&mut self, scope: Scope, degrees: i32) -> Result<()> {
        let rotation = Rotation::from_degrees(degrees)?;
        let range = scope.indices(self)?;
        for page in &mut self.pages[range] {
            page.rotation = page.rotation.add(rotation);
        }
        commit(self, "rotate", scope);
        Ok(())
    }

    /// Resize page `n` to a standard size, scaling its content per axis.
    pub fn page_set_size(&mut self, n: u32, size: PageSize) -> Result<()> {
        let idx = self.index_of(n)?;
        let page = &mut self.pages[idx];
        let (width, height) = size.dimensions();

        if page.has_valid_dimensions() {
            let t = Transform::scale(width / page.width, height / page.height);
            for element in &mut page.elements {
                element.transform(&t);
            }
        }
        page.width = width;
        page.height = height;
        page.size = Some(size);

        commit(self, "page_set_size", Scope::Page(n));
        Ok(())
    }

    /// Remove every blank page and return how many were removed.
    pub fn remove_blank_pages(&mut self) -> usize {
        let blank: Vec<bool> = self
            .pages
            .iter()
            .enumerate()
            .map(|(i, p)| p.is_blank(self.context(i)))
            .collect();
        let before = self.pages.len();
        let mut flags = blank.into_iter();
        self.pages.retain(|_| !flags.next().unwrap_or(false));
        let removed = before - self.pages.len();
        commit(self, "remove_blank_pages", Scope::Document);
        removed
    }

    /// New document holding copies of the given pages (1-indexed).
    pub(crate) fn extract(&self, pages: &[u32]) -> Document {
        let mut doc = Document::new();
        doc.metadata = self.metadata.clone();
        let indices: Vec<usize> = pages.iter().map(|&p| (p - 1) as usize).collect();
        doc.import_pages(self, &indices);
        doc
    }
}

/// Concatenate documents into a new one. Metadata comes from the first.
pub fn merge(docs: &[&Document]) -> Document {
    let mut merged = Document::new();
    if let Some(first) = docs.first() {
        merged.metadata = first.metadata.clone();
    }
    for doc in docs {
        let indices: Vec<usize> = (0..doc.pages.len()).collect();
        merged.import_pages(doc, &indices);
    }
    log::debug!(
        "merged {} documents into {} pages",
        docs.len(),
        merged.page_count()
    );
    merged
}

/// Split into one document per `;`-separated range, e.g. `"1-2;3;4-"`.
pub fn split(doc: &Document, spec: &str) -> Result<Vec<Document>> {
    let ranges = PageRange::parse_list(spec)?;
    let resolved = ranges
        .iter()
        .map(|r| r.resolve(doc.page_count()))
        .collect::<Result<Vec<_>>>()?;
    Ok(resolved.iter().map(|pages| doc.extract(pages)).collect())
}

/// Split before page `n + 1`, giving pages `1..=n` and `n+1..`.
pub fn split_at(doc: &Document, n: u32) -> Result<(Document, Document)> {
    let count = doc.page_count();
    if n == 0 || n >= count {
        return Err(Error::PageOutOfRange(n, count));
    }
    let first: Vec<u32> = (1..=n).collect();
    let second: Vec<u32> = (n + 1..=count).collect();
    Ok((doc.extract(&first), doc.extract(&second)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ImageElement, Rect, Resource};

    fn labeled(labels: &[&str]) -> Document {
        let mut doc = Document::new();
        for label in labels {
            let mut page = Page::letter();
            page.add_text(*label);
            doc.pages.push(page);
        }
        doc
    }

    fn labels(doc: &Document) -> Vec<String> {
        (1..=doc.page_count())
            .map(|n| doc.page_text(n).unwrap())
            .collect()
    }

    #[test]
    fn test_delete_then_insert() {
        let mut doc = labeled(&["A", "B", "C"]);
        doc.delete_page(2).unwrap();
        assert_eq!(labels(&doc), vec!["A", "C"]);

        doc.insert_page(2).unwrap();
        assert_eq!(labels(&doc), vec!["A", "", "C"]);
        assert!(doc.is_dirty());
    }

    #[test]
    fn test_insert_bounds() {
        let mut doc = labeled(&["A"]);
        assert!(doc.insert_page(0).is_err());
        assert!(doc.insert_page(3).is_err());
        doc.insert_page(2).unwrap();
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_failed_delete_leaves_document_clean() {
        let mut doc = labeled(&["A"]);
        assert!(matches!(doc.delete_page(5), Err(Error::PageOutOfRange(5, 1))));
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_append_pages_order() {
        let src = labeled(&["1", "2", "3", "4", "5"]);
        let mut dest = labeled(&["x"]);
        dest.append_pages(&src, "1,3-4").unwrap();
        assert_eq!(labels(&dest), vec!["x", "1", "3", "4"]);
    }

    #[test]
    fn test_append_pages_invalid_range_is_atomic() {
        let src = labeled(&["1", "2", "3", "4", "5"]);
        let mut dest = labeled(&["x"]);
        let err = dest.append_pages(&src, "1,9").unwrap_err();
        assert!(matches!(err, Error::InvalidPageRange(_)));
        assert_eq!(dest.page_count(), 1);
        assert!(!dest.is_dirty());
    }

    #[test]
    fn test_append_renames_conflicting_resources() {
        let mut a = labeled(&["a"]);
        a.add_resource("img1", Resource::png(vec![1]));
        let mut b = Document::new();
        let mut page = Page::letter();
        page.add_element(Element::Image(ImageElement::new("img1", Rect::default())));
        b.pages.push(page);
        b.add_resource("img1", Resource::png(vec![2]));

        a.append(&b).unwrap();
        assert_eq!(a.resources.len(), 2);
        let Element::Image(img) = &a.pages[1].elements[0] else {
            panic!("expected image");
        };
        assert_ne!(img.resource_id, "img1");
        assert_eq!(a.get_resource(&img.resource_id).unwrap().data, vec![2]);
    }

    #[test]
    fn test_rotate_four_times() {
        let mut doc = labeled(&["A"]);
        for _ in 0..4 {
            doc.page_rotate(1, 90).unwrap();
        }
        assert_eq!(doc.pages[0].rotation, Rotation::R0);
        assert!(doc.rotate(45).is_err());
        doc.rotate(-90).unwrap();
        assert_eq!(doc.pages[0].rotation, Rotation::R270);
    }

    #[test]
    fn test_set_size_scales_content() {
        let mut doc = Document::new();
        let mut page = Page::new(100.0, 200.0);
        page.add_element(Element::text("t", 50.0, 100.0));
        doc.pages.push(page);

        doc.page_set_size(1, PageSize::A4).unwrap();
        let Element::Text(run) = &doc.pages[0].elements[0] else {
            panic!("expected text");
        };
        assert!((run.x - 297.5).abs() < 1e-3);
        assert!((run.y - 421.0).abs() < 1e-3);
        assert_eq!(doc.pages[0].size, Some(PageSize::A4));
    }

    #[test]
    fn test_remove_blank_pages() {
        let mut doc = labeled(&["A", "", "C"]);
        doc.pages[1].elements.clear();
        assert_eq!(doc.remove_blank_pages(), 1);
        assert_eq!(labels(&doc), vec!["A", "C"]);
    }

    #[test]
    fn test_split_and_merge() {
        let doc = labeled(&["1", "2", "3", "4"]);
        let parts = split(&doc, "1-2;3;4-").unwrap();
        let counts: Vec<u32> = parts.iter().map(|d| d.page_count()).collect();
        assert_eq!(counts, vec![2, 1, 1]);

        let refs: Vec<&Document> = parts.iter().collect();
        let merged = merge(&refs);
        assert_eq!(labels(&merged), labels(&doc));
    }

    #[test]
    fn test_split_at() {
        let doc = labeled(&["1", "2", "3", "4"]);
        let (a, b) = split_at(&doc, 2).unwrap();
        assert_eq!((a.page_count(), b.page_count()), (2, 2));
        assert!(split_at(&doc, 0).is_err());
        assert!(split_at(&doc, 4).is_err());
    }
}
