//! C-ABI bindings over the process-wide handle registry.
//!
//! Conventions shared by every function:
//!
//! - Documents are addressed by `uint64_t` handles. Zero is never valid.
//! - The last parameter is `char **error`. On failure a non-empty UTF-8
//!   message is stored there and must be freed with `folio_free_string`.
//!   On success the slot is left untouched. A null slot drops the message.
//! - Integer results are `-1` on failure, handle results are `0`.
//! - Buffers from `folio_document_save_memory` and the `*_export_memory`
//!   functions are freed with `folio_free_buffer`, exactly once.
//! - A panic never crosses the boundary; it is reported as an internal error.
//!
//! # Safety
//!
//! String parameters must be null or valid NUL-terminated strings. Pointer
//! parameters that receive output must be null or point to writable storage.

use std::collections::HashMap;
use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::export::{export, export_page, Destination, ExportFormat, ExportOptions, PageFormat};
use crate::license;
use crate::model::{Document, PageSize};
use crate::ops::{Scope, Strip, WatermarkOptions};
use crate::registry::{self, Handle};

const OK: c_int = 0;
const FAILED: c_int = -1;

lazy_static! {
    /// Buffers handed to C, by address, with their lengths.
    static ref BUFFERS: Mutex<HashMap<usize, usize>> = Mutex::new(HashMap::new());
}

/// Store `err` in the error slot.
unsafe fn report(error: *mut *mut c_char, err: &Error) {
    log::debug!("ffi call failed: {}", err);
    if error.is_null() {
        return;
    }
    *error = into_c_string(err.to_string());
}

/// Run `f`, converting errors and panics into the error slot and `failed`.
unsafe fn guard<T>(error: *mut *mut c_char, failed: T, f: impl FnOnce() -> Result<T>) -> T {
    let outcome = panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(Error::Internal(format!("panic in folio: {}", detail)))
    });
    match outcome {
        Ok(value) => value,
        Err(err) => {
            report(error, &err);
            failed
        }
    }
}

unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(Error::MissingParameter(format!("{} is null", what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| Error::InvalidArgument(format!("{} is not valid UTF-8", what)))
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s.replace('\0', "")).unwrap_or_default().into_raw()
}

fn handle(raw: u64) -> Result<Handle> {
    Handle::from_raw(raw).ok_or(Error::InvalidHandle(raw))
}

fn with_doc<T>(raw: u64, f: impl FnOnce(&Document) -> Result<T>) -> Result<T> {
    registry::global().with(handle(raw)?, f)
}

fn with_doc_mut<T>(raw: u64, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
    registry::global().with_mut(handle(raw)?, f)
}

fn count(n: usize) -> c_int {
    c_int::try_from(n).unwrap_or(c_int::MAX)
}

// ==================== Lifecycle ====================

/// Create an empty document (no pages) and return its handle.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_new(error: *mut *mut c_char) -> u64 {
    guard(error, 0, || {
        Ok(registry::global().insert(Document::new()).raw())
    })
}

/// Open a native document file.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_open(path: *const c_char, error: *mut *mut c_char) -> u64 {
    guard(error, 0, || {
        let path = c_str(path, "path")?;
        Ok(registry::global().open_file(path)?.raw())
    })
}

/// Open a native document from `len` bytes at `data`.
///
/// # Safety
///
/// `data` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn folio_document_open_memory(
    data: *const u8,
    len: usize,
    error: *mut *mut c_char,
) -> u64 {
    guard(error, 0, || {
        if data.is_null() {
            return Err(Error::MissingParameter("data is null".into()));
        }
        let bytes = std::slice::from_raw_parts(data, len);
        Ok(registry::global().open(bytes)?.raw())
    })
}

/// Release a document. The handle is invalid afterwards.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_release(h: u64, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || {
        registry::global().release(handle(h)?)?;
        Ok(OK)
    })
}

/// Product information as a JSON object.
///
/// # Safety
///
/// The returned string must be freed with `folio_free_string`.
#[no_mangle]
pub unsafe extern "C" fn folio_about(error: *mut *mut c_char) -> *mut c_char {
    guard(error, ptr::null_mut(), || {
        Ok(into_c_string(serde_json::to_string(&license::about())?))
    })
}

/// Activate a license file for the process.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_set_license(path: *const c_char, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || {
        license::set_license(c_str(path, "path")?)?;
        Ok(OK)
    })
}

// ==================== Saving ====================

/// Save to the file the document was opened from or last saved to.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save(h: u64, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || {
        with_doc_mut(h, Document::save)?;
        Ok(OK)
    })
}

/// Save as a native document at `path`.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_as(
    h: u64,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let path = c_str(path, "path")?;
        with_doc_mut(h, |doc| doc.save_as(path))?;
        Ok(OK)
    })
}

/// Encode the document into a new buffer.
///
/// On success `*buf` and `*len` describe the bytes, which must be freed with
/// `folio_free_buffer`.
///
/// # Safety
///
/// `buf` and `len` must point to writable storage.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_memory(
    h: u64,
    buf: *mut *mut u8,
    len: *mut usize,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        check_out_pointers(buf, len)?;
        let bytes = with_doc(h, Document::to_bytes)?;
        hand_out(bytes, buf, len);
        Ok(OK)
    })
}

fn check_out_pointers(buf: *mut *mut u8, len: *mut usize) -> Result<()> {
    if buf.is_null() || len.is_null() {
        return Err(Error::MissingParameter("output buffer pointers are null".into()));
    }
    Ok(())
}

/// Record `bytes` in the buffer ledger and pass ownership to the caller.
unsafe fn hand_out(bytes: Vec<u8>, buf: *mut *mut u8, len: *mut usize) {
    let size = bytes.len();
    let data = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;
    BUFFERS.lock().insert(data as usize, size);
    *buf = data;
    *len = size;
}

/// Free a buffer handed out by this library.
///
/// Null, unknown and already freed pointers are ignored.
///
/// # Safety
///
/// `buf` must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn folio_free_buffer(buf: *mut u8) {
    if buf.is_null() {
        return;
    }
    match BUFFERS.lock().remove(&(buf as usize)) {
        Some(size) => drop(Box::from_raw(ptr::slice_from_raw_parts_mut(buf, size))),
        None => log::warn!("folio_free_buffer: ignoring unknown buffer {:p}", buf),
    }
}

/// Free a string returned by this library or stored in an error slot.
///
/// # Safety
///
/// `s` must be null or a string allocated by this library.
#[no_mangle]
pub unsafe extern "C" fn folio_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ==================== Document export ====================

unsafe fn save_format(
    h: u64,
    format: ExportFormat,
    options: ExportOptions,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let dest = Destination::file(c_str(path, "path")?);
        with_doc(h, |doc| export(doc, format, &options, &dest))?;
        Ok(OK)
    })
}

/// Save as a flowing word processing document.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_docx(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Docx, ExportOptions::default(), path, error)
}

/// Save as a word processing document with positioned frames.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_docx_enhanced(
    h: u64,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    save_format(h, ExportFormat::DocxEnhanced, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_doc(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Doc, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_xlsx(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Xlsx, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_pptx(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Pptx, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_xps(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Xps, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_txt(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Txt, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_epub(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Epub, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_tex(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Tex, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_markdown(
    h: u64,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    save_format(h, ExportFormat::Markdown, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_json(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Json, ExportOptions::default(), path, error)
}

/// Save every page as one multi-frame TIFF. A `dpi` of 0 uses the default
/// resolution.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_tiff(
    h: u64,
    dpi: u32,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    let mut options = ExportOptions::default();
    if dpi > 0 {
        options = options.with_resolution(dpi);
    }
    save_format(h, ExportFormat::Tiff, options, path, error)
}

/// Save every page as SVG inside a zip archive.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_svg_zip(
    h: u64,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    save_format(h, ExportFormat::SvgZip, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_booklet(
    h: u64,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    save_format(h, ExportFormat::Booklet, ExportOptions::default(), path, error)
}

/// Save `columns x rows` pages per sheet.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_nup(
    h: u64,
    path: *const c_char,
    columns: u32,
    rows: u32,
    error: *mut *mut c_char,
) -> c_int {
    let options = ExportOptions::new().with_grid(columns, rows);
    save_format(h, ExportFormat::NUp, options, path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_fdf(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Fdf, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_xfdf(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Xfdf, ExportOptions::default(), path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_save_xml(h: u64, path: *const c_char, error: *mut *mut c_char) -> c_int {
    save_format(h, ExportFormat::Xml, ExportOptions::default(), path, error)
}

/// Export by format name (`docx`, `epub`, `svg-zip`, ...).
///
/// # Safety
///
/// `format` and `path` must be valid NUL-terminated UTF-8 strings.
#[no_mangle]
pub unsafe extern "C" fn folio_document_export(
    h: u64,
    format: *const c_char,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let format = c_str(format, "format")?.parse::<ExportFormat>()?;
        let dest = Destination::file(c_str(path, "path")?);
        with_doc(h, |doc| export(doc, format, &ExportOptions::default(), &dest))?;
        Ok(OK)
    })
}

/// Export by format name into a buffer freed with `folio_free_buffer`.
///
/// # Safety
///
/// `format` must be a valid NUL-terminated UTF-8 string. `buf` and `len`
/// must point to writable storage.
#[no_mangle]
pub unsafe extern "C" fn folio_document_export_memory(
    h: u64,
    format: *const c_char,
    buf: *mut *mut u8,
    len: *mut usize,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        check_out_pointers(buf, len)?;
        let format = c_str(format, "format")?.parse::<ExportFormat>()?;
        let bytes = with_doc(h, |doc| {
            export(doc, format, &ExportOptions::default(), &Destination::Memory)
        })?
        .ok_or_else(|| Error::Internal("memory export returned no bytes".into()))?;
        hand_out(bytes, buf, len);
        Ok(OK)
    })
}

// ==================== Document queries and transforms ====================

/// Visible text of every page.
///
/// # Safety
///
/// The returned string must be freed with `folio_free_string`.
#[no_mangle]
pub unsafe extern "C" fn folio_document_extract_text(h: u64, error: *mut *mut c_char) -> *mut c_char {
    guard(error, ptr::null_mut(), || {
        with_doc(h, |doc| Ok(into_c_string(doc.extract_text())))
    })
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_page_count(h: u64, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || with_doc(h, |doc| Ok(count(doc.page_count() as usize))))
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_word_count(h: u64, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || with_doc(h, |doc| Ok(count(doc.word_count() as usize))))
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_character_count(h: u64, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || {
        with_doc(h, |doc| Ok(count(doc.character_count() as usize)))
    })
}

unsafe fn mutate(h: u64, error: *mut *mut c_char, f: impl FnOnce(&mut Document) -> Result<()>) -> c_int {
    guard(error, FAILED, || {
        with_doc_mut(h, f)?;
        Ok(OK)
    })
}

unsafe fn strip(h: u64, what: Strip, scope: Scope, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || with_doc_mut(h, |doc| Ok(count(doc.remove(what, scope)?))))
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_optimize(h: u64, error: *mut *mut c_char) -> c_int {
    mutate(h, error, Document::optimize)
}

/// Deduplicate identical resources and drop unused ones.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_optimize_resource(h: u64, error: *mut *mut c_char) -> c_int {
    mutate(h, error, Document::optimize_resources)
}

/// Repair damaged geometry and references. Returns the number of fixes.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_repair(h: u64, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || {
        with_doc_mut(h, |doc| Ok(count(doc.repair()?.total())))
    })
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_grayscale(h: u64, error: *mut *mut c_char) -> c_int {
    mutate(h, error, Document::grayscale)
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_flatten(h: u64, error: *mut *mut c_char) -> c_int {
    mutate(h, error, Document::flatten)
}

/// Register font resources for every font in use. Returns how many were added.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_embed_fonts(h: u64, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || with_doc_mut(h, |doc| Ok(count(doc.embed_fonts()?))))
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_remove_annotations(h: u64, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::Annotations, Scope::Document, error)
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_remove_attachments(h: u64, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::Attachments, Scope::Document, error)
}

/// Remove every blank page. Returns how many were removed.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_remove_blank_pages(h: u64, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || with_doc_mut(h, |doc| Ok(count(doc.remove_blank_pages()))))
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_remove_bookmarks(h: u64, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::Bookmarks, Scope::Document, error)
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_remove_hidden_text(h: u64, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::HiddenText, Scope::Document, error)
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_remove_images(h: u64, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::Images, Scope::Document, error)
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_remove_javascripts(h: u64, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::Scripts, Scope::Document, error)
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_remove_tables(h: u64, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::Tables, Scope::Document, error)
}

/// Fill every page background. Components must be in 0..=255.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_set_background(
    h: u64,
    r: c_int,
    g: c_int,
    b: c_int,
    error: *mut *mut c_char,
) -> c_int {
    mutate(h, error, |doc| doc.set_background(r, g, b))
}

/// Rotate every page clockwise by a multiple of 90 degrees.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_rotate(h: u64, degrees: c_int, error: *mut *mut c_char) -> c_int {
    mutate(h, error, |doc| doc.rotate(degrees))
}

/// Replace text on every page. Returns the number of replacements.
///
/// # Safety
///
/// `find` and `replace` must be valid NUL-terminated UTF-8 strings.
#[no_mangle]
pub unsafe extern "C" fn folio_document_replace_text(
    h: u64,
    find: *const c_char,
    replace: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let find = c_str(find, "find")?;
        let replace = c_str(replace, "replace")?;
        with_doc_mut(h, |doc| Ok(count(doc.replace_text(find, replace)?)))
    })
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_add_page_num(h: u64, error: *mut *mut c_char) -> c_int {
    mutate(h, error, Document::add_page_numbers)
}

/// # Safety
///
/// `text` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_add_text_header(
    h: u64,
    text: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let text = c_str(text, "text")?;
        with_doc_mut(h, |doc| doc.add_text_header(text))?;
        Ok(OK)
    })
}

/// # Safety
///
/// `text` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_add_text_footer(
    h: u64,
    text: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let text = c_str(text, "text")?;
        with_doc_mut(h, |doc| doc.add_text_footer(text))?;
        Ok(OK)
    })
}

/// Stamp a centered watermark on every page. `font_name` may be null.
///
/// # Safety
///
/// `text` and `color` must be valid NUL-terminated UTF-8 strings.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn folio_document_add_watermark(
    h: u64,
    text: *const c_char,
    font_name: *const c_char,
    font_size: f32,
    color: *const c_char,
    angle: f32,
    opacity: f32,
    background: bool,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let mut options = WatermarkOptions::new(c_str(text, "text")?)
            .with_color(c_str(color, "color")?)
            .with_rotation(angle)
            .with_opacity(opacity)
            .behind_content(background);
        options.font_size = font_size;
        if !font_name.is_null() {
            options = options.with_font(c_str(font_name, "font_name")?, font_size);
        }
        with_doc_mut(h, |doc| doc.add_watermark(&options))?;
        Ok(OK)
    })
}

/// Append every page of `other` to `h`.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_document_append(h: u64, other: u64, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || {
        registry::global().append(handle(h)?, handle(other)?)?;
        Ok(OK)
    })
}

/// Append the pages of `other` selected by `range` (e.g. `"1,3-"`).
///
/// # Safety
///
/// `range` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_document_append_pages(
    h: u64,
    other: u64,
    range: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let range = c_str(range, "range")?;
        registry::global().append_pages(handle(h)?, handle(other)?, range)?;
        Ok(OK)
    })
}

// ==================== Pages ====================

/// Append a blank page. Returns its page number.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_add(h: u64, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || with_doc_mut(h, |doc| Ok(count(doc.add_page() as usize))))
}

/// Insert a blank page so that it becomes page `n`.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_insert(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    mutate(h, error, |doc| doc.insert_page(n))
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_delete(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    mutate(h, error, |doc| doc.delete_page(n))
}

unsafe fn page_to(
    h: u64,
    n: u32,
    format: PageFormat,
    dpi: u32,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let dest = Destination::file(c_str(path, "path")?);
        let mut options = ExportOptions::default();
        if format.is_raster() {
            options = options.with_resolution(dpi);
        }
        with_doc(h, |doc| export_page(doc, n, format, &options, &dest))?;
        Ok(OK)
    })
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_page_to_jpg(
    h: u64,
    n: u32,
    dpi: u32,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    page_to(h, n, PageFormat::Jpeg, dpi, path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_page_to_png(
    h: u64,
    n: u32,
    dpi: u32,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    page_to(h, n, PageFormat::Png, dpi, path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_page_to_bmp(
    h: u64,
    n: u32,
    dpi: u32,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    page_to(h, n, PageFormat::Bmp, dpi, path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_page_to_tiff(
    h: u64,
    n: u32,
    dpi: u32,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    page_to(h, n, PageFormat::Tiff, dpi, path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_page_to_dicom(
    h: u64,
    n: u32,
    dpi: u32,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    page_to(h, n, PageFormat::Dicom, dpi, path, error)
}

/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_page_to_svg(h: u64, n: u32, path: *const c_char, error: *mut *mut c_char) -> c_int {
    page_to(h, n, PageFormat::Svg, 0, path, error)
}

/// Save page `n` as a single-page native document.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_page_to_native(
    h: u64,
    n: u32,
    path: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    page_to(h, n, PageFormat::Native, 0, path, error)
}

/// Export page `n` by format name (`png`, `jpeg`, `svg`, ...) into a buffer
/// freed with `folio_free_buffer`. `dpi` is used by raster formats only.
///
/// # Safety
///
/// `format` must be a valid NUL-terminated UTF-8 string. `buf` and `len`
/// must point to writable storage.
#[no_mangle]
pub unsafe extern "C" fn folio_page_export_memory(
    h: u64,
    n: u32,
    format: *const c_char,
    dpi: u32,
    buf: *mut *mut u8,
    len: *mut usize,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        check_out_pointers(buf, len)?;
        let format = c_str(format, "format")?.parse::<PageFormat>()?;
        let mut options = ExportOptions::default();
        if format.is_raster() {
            options = options.with_resolution(dpi);
        }
        let bytes = with_doc(h, |doc| export_page(doc, n, format, &options, &Destination::Memory))?
            .ok_or_else(|| Error::Internal("memory export returned no bytes".into()))?;
        hand_out(bytes, buf, len);
        Ok(OK)
    })
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_grayscale(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    mutate(h, error, |doc| doc.page_grayscale(n))
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_rotate(h: u64, n: u32, degrees: c_int, error: *mut *mut c_char) -> c_int {
    mutate(h, error, |doc| doc.page_rotate(n, degrees))
}

/// Replace text on page `n`. Returns the number of replacements.
///
/// # Safety
///
/// `find` and `replace` must be valid NUL-terminated UTF-8 strings.
#[no_mangle]
pub unsafe extern "C" fn folio_page_replace_text(
    h: u64,
    n: u32,
    find: *const c_char,
    replace: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let find = c_str(find, "find")?;
        let replace = c_str(replace, "replace")?;
        with_doc_mut(h, |doc| Ok(count(doc.page_replace_text(n, find, replace)?)))
    })
}

/// # Safety
///
/// `text` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_page_add_text(
    h: u64,
    n: u32,
    text: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let text = c_str(text, "text")?;
        with_doc_mut(h, |doc| doc.page_add_text(n, text))?;
        Ok(OK)
    })
}

/// Resize page `n` to a standard size code (0 = A0 ... 11 = 11x17).
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_set_size(h: u64, n: u32, size: c_int, error: *mut *mut c_char) -> c_int {
    mutate(h, error, |doc| doc.page_set_size(n, PageSize::from_code(size)?))
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_word_count(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || {
        with_doc(h, |doc| Ok(count(doc.page_word_count(n)? as usize)))
    })
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_character_count(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || {
        with_doc(h, |doc| Ok(count(doc.page_character_count(n)? as usize)))
    })
}

/// 1 if page `n` is blank, 0 if not, -1 on failure.
///
/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_is_blank(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    guard(error, FAILED, || {
        with_doc(h, |doc| Ok(c_int::from(doc.is_page_blank(n)?)))
    })
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_add_page_num(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    mutate(h, error, |doc| doc.page_add_page_number(n))
}

/// # Safety
///
/// `text` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_page_add_text_header(
    h: u64,
    n: u32,
    text: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let text = c_str(text, "text")?;
        with_doc_mut(h, |doc| doc.page_add_text_header(n, text))?;
        Ok(OK)
    })
}

/// # Safety
///
/// `text` must be a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn folio_page_add_text_footer(
    h: u64,
    n: u32,
    text: *const c_char,
    error: *mut *mut c_char,
) -> c_int {
    guard(error, FAILED, || {
        let text = c_str(text, "text")?;
        with_doc_mut(h, |doc| doc.page_add_text_footer(n, text))?;
        Ok(OK)
    })
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_remove_annotations(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::Annotations, Scope::Page(n), error)
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_remove_hidden_text(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::HiddenText, Scope::Page(n), error)
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_remove_images(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::Images, Scope::Page(n), error)
}

/// # Safety
///
/// See the module conventions.
#[no_mangle]
pub unsafe extern "C" fn folio_page_remove_tables(h: u64, n: u32, error: *mut *mut c_char) -> c_int {
    strip(h, Strip::Tables, Scope::Page(n), error)
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take_error(slot: &mut *mut c_char) -> Option<String> {
        if slot.is_null() {
            return None;
        }
        let message = CStr::from_ptr(*slot).to_string_lossy().into_owned();
        folio_free_string(*slot);
        *slot = ptr::null_mut();
        Some(message)
    }

    #[test]
    fn test_null_string_is_reported() {
        unsafe {
            let mut err = ptr::null_mut();
            assert_eq!(folio_document_open(ptr::null(), &mut err), 0);
            assert!(take_error(&mut err).unwrap().contains("path is null"));
        }
    }

    #[test]
    fn test_zero_handle_is_invalid() {
        unsafe {
            let mut err = ptr::null_mut();
            assert_eq!(folio_document_page_count(0, &mut err), FAILED);
            assert!(take_error(&mut err).unwrap().contains("invalid handle"));
        }
    }

    #[test]
    fn test_null_error_slot_is_allowed() {
        unsafe {
            assert_eq!(folio_document_release(0, ptr::null_mut()), FAILED);
        }
    }

    #[test]
    fn test_panics_become_internal_errors() {
        unsafe {
            let mut err = ptr::null_mut();
            let value = guard(&mut err, FAILED, || -> Result<c_int> { panic!("boom") });
            assert_eq!(value, FAILED);
            let message = take_error(&mut err).unwrap();
            assert!(message.starts_with("Internal error"));
            assert!(message.contains("boom"));
        }
    }

    #[test]
    fn test_unknown_buffer_is_ignored() {
        let mut local = [0u8; 4];
        unsafe {
            folio_free_buffer(local.as_mut_ptr());
            folio_free_buffer(ptr::null_mut());
        }
        assert_eq!(local, [0; 4]);
    }

    #[test]
    fn test_page_is_blank() {
        unsafe {
            let mut err = ptr::null_mut();
            let h = folio_document_new(&mut err);
            assert_eq!(folio_page_add(h, &mut err), 1);
            assert_eq!(folio_page_is_blank(h, 1, &mut err), 1);

            let text = CString::new("hello").unwrap();
            assert_eq!(folio_page_add_text(h, 1, text.as_ptr(), &mut err), OK);
            assert_eq!(folio_page_is_blank(h, 1, &mut err), 0);
            assert!(err.is_null());

            assert_eq!(folio_page_is_blank(h, 2, &mut err), FAILED);
            assert!(take_error(&mut err).unwrap().contains("out of range"));
            assert_eq!(folio_document_release(h, &mut err), OK);
        }
    }
}
