//! Handle registry: maps opaque numeric handles to live documents.
//!
//! Each document sits behind its own mutex, so work on different handles
//! never contends. Handles come from a counter and are never reused, so a
//! released handle stays invalid for the life of the process.

use crate::codec::{self, OpenOptions};
use crate::error::{Error, Result};
use crate::model::Document;
use lazy_static::lazy_static;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque identifier of a live document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(NonZeroU64);

impl Handle {
    /// Wrap a raw value. Zero is never a valid handle.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Handle)
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Slot = Arc<Mutex<Document>>;

/// Owner of every live document.
pub struct Registry {
    documents: RwLock<HashMap<Handle, Slot>>,
    next: AtomicU64,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            next: AtomicU64::new(1),
        }
    }

    /// Register a new document with one blank page.
    pub fn create(&self) -> Handle {
        self.insert(Document::with_blank_page())
    }

    /// Register a new document without pages.
    pub fn create_empty(&self) -> Handle {
        self.insert(Document::new())
    }

    /// Decode a native container and register it.
    pub fn open(&self, data: &[u8]) -> Result<Handle> {
        let doc = codec::decode(data, &OpenOptions::default())?;
        Ok(self.insert(doc))
    }

    /// Read a native container file and register it.
    pub fn open_file<P: AsRef<Path>>(&self, path: P) -> Result<Handle> {
        let doc = codec::read_file(path, &OpenOptions::default())?;
        Ok(self.insert(doc))
    }

    /// Take ownership of a document and return its handle.
    pub fn insert(&self, doc: Document) -> Handle {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        // the counter starts at 1 and only grows
        let handle = Handle(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN));
        self.documents
            .write()
            .insert(handle, Arc::new(Mutex::new(doc)));
        log::debug!("registered document {}", handle);
        handle
    }

    /// Destroy a document. Releasing twice fails with `InvalidHandle`.
    pub fn release(&self, handle: Handle) -> Result<()> {
        match self.documents.write().remove(&handle) {
            Some(_) => {
                log::debug!("released document {}", handle);
                Ok(())
            }
            None => Err(Error::InvalidHandle(handle.raw())),
        }
    }

    /// Remove a document from the registry and return it.
    pub fn take(&self, handle: Handle) -> Result<Document> {
        let slot = self
            .documents
            .write()
            .remove(&handle)
            .ok_or(Error::InvalidHandle(handle.raw()))?;
        Ok(Arc::try_unwrap(slot)
            .map(Mutex::into_inner)
            .unwrap_or_else(|shared| shared.lock().clone()))
    }

    fn slot(&self, handle: Handle) -> Result<Slot> {
        self.documents
            .read()
            .get(&handle)
            .cloned()
            .ok_or(Error::InvalidHandle(handle.raw()))
    }

    /// Run `f` with shared access to a document.
    pub fn with<T>(&self, handle: Handle, f: impl FnOnce(&Document) -> Result<T>) -> Result<T> {
        let slot = self.slot(handle)?;
        let doc = slot.lock();
        f(&doc)
    }

    /// Run `f` with exclusive access to a document.
    pub fn with_mut<T>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut Document) -> Result<T>,
    ) -> Result<T> {
        let slot = self.slot(handle)?;
        let mut doc = slot.lock();
        f(&mut doc)
    }

    /// Append every page of `source` to `dest`. `dest` may equal `source`.
    pub fn append(&self, dest: Handle, source: Handle) -> Result<()> {
        let snapshot = self.with(source, |doc| Ok(doc.clone()))?;
        self.with_mut(dest, |doc| doc.append(&snapshot))
    }

    /// Append the pages of `source` selected by `spec` to `dest`.
    pub fn append_pages(&self, dest: Handle, source: Handle, spec: &str) -> Result<()> {
        let snapshot = self.with(source, |doc| Ok(doc.clone()))?;
        self.with_mut(dest, |doc| doc.append_pages(&snapshot, spec))
    }

    /// Whether the handle refers to a live document.
    pub fn contains(&self, handle: Handle) -> bool {
        self.documents.read().contains_key(&handle)
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref GLOBAL: Registry = Registry::new();
}

/// The process-wide registry used by the C interface.
pub fn global() -> &'static Registry {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_create_and_release() {
        let reg = Registry::new();
        let h = reg.create();
        assert_eq!(reg.with(h, |d| Ok(d.page_count())).unwrap(), 1);
        reg.release(h).unwrap();

        let err = reg.release(h).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
        assert!(reg.with(h, |d| Ok(d.page_count())).is_err());
    }

    #[test]
    fn test_handles_are_never_reused() {
        let reg = Registry::new();
        let a = reg.create();
        reg.release(a).unwrap();
        let b = reg.create();
        assert_ne!(a, b);
        assert!(!reg.contains(a));
    }

    #[test]
    fn test_zero_is_not_a_handle() {
        assert!(Handle::from_raw(0).is_none());
        assert_eq!(Handle::from_raw(5).unwrap().raw(), 5);
    }

    #[test]
    fn test_self_append() {
        let reg = Registry::new();
        let h = reg.create();
        reg.with_mut(h, |d| d.page_add_text(1, "x")).unwrap();
        reg.append(h, h).unwrap();
        assert_eq!(reg.with(h, |d| Ok(d.page_count())).unwrap(), 2);
        assert_eq!(reg.with(h, |d| Ok(d.word_count())).unwrap(), 2);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let reg = Registry::new();
        let err = reg.open(b"garbage").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_documents_are_independent() {
        let reg = Registry::new();
        let a = reg.create();
        let b = reg.create();
        reg.with_mut(a, |d| d.delete_page(1)).unwrap();
        assert_eq!(reg.with(b, |d| Ok(d.page_count())).unwrap(), 1);
        reg.release(a).unwrap();
        assert!(reg.contains(b));
    }

    #[test]
    fn test_concurrent_documents() {
        let reg = Arc::new(Registry::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    let h = reg.create();
                    for _ in 0..i {
                        reg.with_mut(h, |d| Ok(d.add_page())).unwrap();
                    }
                    let count = reg.with(h, |d| Ok(d.page_count())).unwrap();
                    reg.release(h).unwrap();
                    count
                })
            })
            .collect();
        for (i, t) in threads.into_iter().enumerate() {
            assert_eq!(t.join().unwrap(), i as u32 + 1);
        }
        assert!(reg.is_empty());
    }
}
