//! Integration tests for the C interface conventions.

#![cfg(feature = "ffi")]

use folio::ffi::*;
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// Error slot that frees its message when read.
struct Slot(*mut c_char);

impl Slot {
    fn new() -> Self {
        Slot(ptr::null_mut())
    }

    fn ptr(&mut self) -> *mut *mut c_char {
        &mut self.0
    }

    fn is_empty(&self) -> bool {
        self.0.is_null()
    }

    fn take(&mut self) -> String {
        assert!(!self.0.is_null(), "expected an error message");
        let message = unsafe { CStr::from_ptr(self.0) }.to_string_lossy().into_owned();
        unsafe { folio_free_string(self.0) };
        self.0 = ptr::null_mut();
        message
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { folio_free_string(self.0) };
        }
    }
}

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

unsafe fn new_doc(pages: &[&str], err: &mut Slot) -> u64 {
    let h = folio_document_new(err.ptr());
    assert_ne!(h, 0);
    for text in pages {
        let n = folio_page_add(h, err.ptr());
        let text = cstr(text);
        assert_eq!(folio_page_add_text(h, n as u32, text.as_ptr(), err.ptr()), 0);
    }
    h
}

#[test]
fn test_error_slot_untouched_on_success() {
    let mut err = Slot::new();
    unsafe {
        let h = new_doc(&["hello world"], &mut err);
        assert_eq!(folio_document_page_count(h, err.ptr()), 1);
        assert_eq!(folio_document_word_count(h, err.ptr()), 2);
        assert_eq!(folio_document_character_count(h, err.ptr()), 10);
        assert!(err.is_empty());

        // a stale message is left as is by a successful call
        let sentinel = CString::new("previous").unwrap().into_raw();
        err.0 = sentinel;
        assert_eq!(folio_page_word_count(h, 1, err.ptr()), 2);
        assert_eq!(err.take(), "previous");

        assert_eq!(folio_document_release(h, err.ptr()), 0);
    }
}

#[test]
fn test_released_handle() {
    let mut err = Slot::new();
    unsafe {
        let h = new_doc(&[], &mut err);
        assert_eq!(folio_document_release(h, err.ptr()), 0);

        assert_eq!(folio_document_page_count(h, err.ptr()), -1);
        assert!(err.take().contains("invalid handle"));
        assert_eq!(folio_page_add(h, err.ptr()), -1);
        assert!(err.take().contains("invalid handle"));
        assert!(folio_document_extract_text(h, err.ptr()).is_null());
        assert!(err.take().contains("invalid handle"));
        assert_eq!(folio_document_release(h, err.ptr()), -1);
        assert!(err.take().contains("invalid handle"));
    }
}

#[test]
fn test_memory_round_trip() {
    let mut err = Slot::new();
    unsafe {
        let h = new_doc(&["alpha", "beta"], &mut err);
        let mut buf: *mut u8 = ptr::null_mut();
        let mut len: usize = 0;
        assert_eq!(folio_document_save_memory(h, &mut buf, &mut len, err.ptr()), 0);
        assert!(!buf.is_null());
        assert!(len > 0);

        let copy = folio_document_open_memory(buf, len, err.ptr());
        assert_ne!(copy, 0);
        folio_free_buffer(buf);
        // a second free is ignored
        folio_free_buffer(buf);

        assert_eq!(folio_document_page_count(copy, err.ptr()), 2);
        let text = folio_document_extract_text(copy, err.ptr());
        assert_eq!(CStr::from_ptr(text).to_str().unwrap(), "alpha\n\nbeta");
        folio_free_string(text);
        assert!(err.is_empty());

        folio_document_release(h, err.ptr());
        folio_document_release(copy, err.ptr());
    }
}

#[test]
fn test_export_memory_formats() {
    let mut err = Slot::new();
    unsafe {
        let h = new_doc(&["exported text"], &mut err);
        let mut buf: *mut u8 = ptr::null_mut();
        let mut len: usize = 0;

        let txt = cstr("txt");
        assert_eq!(folio_document_export_memory(h, txt.as_ptr(), &mut buf, &mut len, err.ptr()), 0);
        assert_eq!(std::slice::from_raw_parts(buf, len), b"exported text");
        folio_free_buffer(buf);

        let docx = cstr("docx");
        assert_eq!(folio_document_export_memory(h, docx.as_ptr(), &mut buf, &mut len, err.ptr()), 0);
        let bytes = std::slice::from_raw_parts(buf, len).to_vec();
        folio_free_buffer(buf);
        let zip = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert!(zip.file_names().any(|name| name == "word/document.xml"));

        let png = cstr("png");
        assert_eq!(folio_page_export_memory(h, 1, png.as_ptr(), 18, &mut buf, &mut len, err.ptr()), 0);
        let img = image::load_from_memory(std::slice::from_raw_parts(buf, len)).unwrap();
        folio_free_buffer(buf);
        assert_eq!((img.width(), img.height()), (153, 198));

        let svg = cstr("svg");
        assert_eq!(folio_page_export_memory(h, 1, svg.as_ptr(), 0, &mut buf, &mut len, err.ptr()), 0);
        let svg_text = String::from_utf8_lossy(std::slice::from_raw_parts(buf, len)).into_owned();
        assert!(svg_text.contains("<svg"));
        folio_free_buffer(buf);
        assert!(err.is_empty());

        folio_document_release(h, err.ptr());
    }
}

#[test]
fn test_export_memory_failures() {
    let mut err = Slot::new();
    unsafe {
        let h = new_doc(&["x"], &mut err);
        let mut buf: *mut u8 = ptr::null_mut();
        let mut len: usize = 0;

        let bogus = cstr("bogus");
        assert_eq!(folio_document_export_memory(h, bogus.as_ptr(), &mut buf, &mut len, err.ptr()), -1);
        assert!(err.take().contains("Invalid argument"));
        assert!(buf.is_null());

        assert_eq!(folio_document_export_memory(h, ptr::null(), &mut buf, &mut len, err.ptr()), -1);
        assert!(err.take().contains("format is null"));

        let txt = cstr("txt");
        assert_eq!(folio_document_export_memory(h, txt.as_ptr(), ptr::null_mut(), &mut len, err.ptr()), -1);
        assert!(!err.take().is_empty());

        let nup = cstr("n-up");
        assert_eq!(folio_document_export_memory(h, nup.as_ptr(), &mut buf, &mut len, err.ptr()), -1);
        assert!(err.take().contains("grid"));

        let png = cstr("png");
        assert_eq!(folio_page_export_memory(h, 1, png.as_ptr(), 0, &mut buf, &mut len, err.ptr()), -1);
        assert!(!err.take().is_empty());
        assert_eq!(folio_page_export_memory(h, 2, png.as_ptr(), 72, &mut buf, &mut len, err.ptr()), -1);
        assert!(err.take().contains("out of range"));
        assert!(buf.is_null());

        let path = cstr("/unused.docx");
        assert_eq!(folio_document_export(h, bogus.as_ptr(), path.as_ptr(), err.ptr()), -1);
        assert!(err.take().contains("Invalid argument"));

        folio_document_release(h, err.ptr());
    }
}

#[test]
fn test_save_nup_rejects_huge_grid() {
    let dir = tempfile::tempdir().unwrap();
    let path = cstr(dir.path().join("sheets.folio").to_str().unwrap());
    let mut err = Slot::new();
    unsafe {
        let h = new_doc(&["x"], &mut err);
        assert_eq!(folio_document_save_nup(h, path.as_ptr(), 65536, 65536, err.ptr()), -1);
        assert!(err.take().contains("Invalid argument"));
        assert_eq!(folio_document_save_nup(h, path.as_ptr(), 2, 2, err.ptr()), 0);
        assert!(err.is_empty());
        folio_document_release(h, err.ptr());
    }
}

#[test]
fn test_open_failures() {
    let mut err = Slot::new();
    unsafe {
        let garbage = b"not a document";
        assert_eq!(folio_document_open_memory(garbage.as_ptr(), garbage.len(), err.ptr()), 0);
        assert!(!err.take().is_empty());

        let dir = tempfile::tempdir().unwrap();
        let missing = cstr(dir.path().join("missing.folio").to_str().unwrap());
        assert_eq!(folio_document_open(missing.as_ptr(), err.ptr()), 0);
        assert!(err.take().starts_with("I/O error"));
    }
}

#[test]
fn test_save_and_reopen_files() {
    let dir = tempfile::tempdir().unwrap();
    let native = cstr(dir.path().join("doc.folio").to_str().unwrap());
    let docx = cstr(dir.path().join("doc.docx").to_str().unwrap());
    let png = cstr(dir.path().join("page.png").to_str().unwrap());
    let mut err = Slot::new();
    unsafe {
        let h = new_doc(&["saved text"], &mut err);
        assert_eq!(folio_document_save(h, err.ptr()), -1);
        assert!(err.take().contains("save_as"));

        assert_eq!(folio_document_save_as(h, native.as_ptr(), err.ptr()), 0);
        assert_eq!(folio_document_add_page_num(h, err.ptr()), 0);
        assert_eq!(folio_document_save(h, err.ptr()), 0);
        assert_eq!(folio_document_save_docx(h, docx.as_ptr(), err.ptr()), 0);
        assert_eq!(folio_page_to_png(h, 1, 18, png.as_ptr(), err.ptr()), 0);
        assert_eq!(folio_page_to_png(h, 1, 0, png.as_ptr(), err.ptr()), -1);
        assert!(!err.take().is_empty());
        assert!(err.is_empty());

        let reopened = folio_document_open(native.as_ptr(), err.ptr());
        assert_ne!(reopened, 0);
        let text = folio_document_extract_text(reopened, err.ptr());
        assert_eq!(CStr::from_ptr(text).to_str().unwrap(), "saved text\n1");
        folio_free_string(text);

        folio_document_release(h, err.ptr());
        folio_document_release(reopened, err.ptr());
    }
    assert!(std::fs::metadata(dir.path().join("doc.docx")).unwrap().len() > 0);
    let img = image::open(dir.path().join("page.png")).unwrap();
    assert_eq!(img.width(), 153);
}

#[test]
fn test_page_operations() {
    let mut err = Slot::new();
    unsafe {
        let h = new_doc(&["A", "B", "C"], &mut err);
        assert_eq!(folio_page_delete(h, 2, err.ptr()), 0);
        assert_eq!(folio_page_insert(h, 2, err.ptr()), 0);
        assert_eq!(folio_page_is_blank(h, 2, err.ptr()), 1);
        assert_eq!(folio_page_is_blank(h, 1, err.ptr()), 0);
        assert_eq!(folio_document_remove_blank_pages(h, err.ptr()), 1);
        assert_eq!(folio_document_page_count(h, err.ptr()), 2);

        assert_eq!(folio_page_rotate(h, 1, 45, err.ptr()), -1);
        assert!(!err.take().is_empty());
        assert_eq!(folio_page_set_size(h, 1, 99, err.ptr()), -1);
        assert!(!err.take().is_empty());
        assert_eq!(folio_page_set_size(h, 1, 4, err.ptr()), 0);

        assert_eq!(folio_document_set_background(h, 300, 0, 0, err.ptr()), -1);
        assert!(err.take().contains("Invalid argument"));
        assert_eq!(folio_document_set_background(h, 255, 0, 0, err.ptr()), 0);

        let find = cstr("C");
        let replace = cstr("see");
        assert_eq!(folio_document_replace_text(h, find.as_ptr(), replace.as_ptr(), err.ptr()), 1);
        assert_eq!(folio_page_word_count(h, 2, err.ptr()), 1);
        assert_eq!(folio_page_character_count(h, 2, err.ptr()), 3);
        assert!(err.is_empty());
        folio_document_release(h, err.ptr());
    }
}

#[test]
fn test_append_pages() {
    let mut err = Slot::new();
    unsafe {
        let source = new_doc(&["1", "2", "3", "4", "5"], &mut err);
        let dest = new_doc(&[], &mut err);

        let bad = cstr("1,9");
        assert_eq!(folio_document_append_pages(dest, source, bad.as_ptr(), err.ptr()), -1);
        assert!(err.take().contains("range"));
        assert_eq!(folio_document_page_count(dest, err.ptr()), 0);

        let good = cstr("1,3-4");
        assert_eq!(folio_document_append_pages(dest, source, good.as_ptr(), err.ptr()), 0);
        assert_eq!(folio_document_append(dest, source, err.ptr()), 0);
        assert_eq!(folio_document_page_count(dest, err.ptr()), 8);
        assert!(err.is_empty());

        folio_document_release(source, err.ptr());
        folio_document_release(dest, err.ptr());
    }
}

#[test]
fn test_about_is_json() {
    let mut err = Slot::new();
    unsafe {
        let about = folio_about(err.ptr());
        let json: serde_json::Value =
            serde_json::from_str(CStr::from_ptr(about).to_str().unwrap()).unwrap();
        folio_free_string(about);
        assert_eq!(json["product"], "folio");
        assert!(json["islicensed"].is_boolean());

        let missing = cstr("/definitely/not/a/license.json");
        assert_eq!(folio_set_license(missing.as_ptr(), err.ptr()), -1);
        assert!(!err.take().is_empty());
    }
}
