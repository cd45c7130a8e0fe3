//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible fields: `*mut c_char`
//! for strings (null for `None`), pointer + length for lists, and enums with
//! explicit discriminants. Conversions live here so `lib.rs` stays focused
//! on the `extern "C"` surface. Everything handed out is heap-allocated by
//! Rust and released by the matching `booklist_free_*` function.

use std::ffi::CString;
use std::os::raw::c_char;

use booklist_core::{
    BookRecord, Completion, EmptyReason, HttpMethod, HttpRequest, PageRequest, SearchSession,
    SortOrder, VolumePage, ViewState,
};

/// Opaque handle to a `SearchSession`. C callers receive a pointer to this
/// and pass it back into every `booklist_session_*` function.
pub struct FfiSearchSession {
    pub(crate) inner: SearchSession,
}

/// Copy `s` into a C string. Interior NULs cannot cross the boundary and
/// are dropped.
pub(crate) fn c_string(s: String) -> *mut c_char {
    let bytes: Vec<u8> = s.into_bytes().into_iter().filter(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
}

pub(crate) fn c_string_opt(s: Option<String>) -> *mut c_char {
    s.map(c_string).unwrap_or(std::ptr::null_mut())
}

/// Release a string produced by `c_string`. Null is ignored.
pub(crate) fn drop_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Hand a vector to C as pointer + length (null for empty).
pub(crate) fn into_raw_parts<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    let boxed = items.into_boxed_slice();
    (Box::into_raw(boxed) as *mut T, len)
}

/// Take back a pointer + length produced by `into_raw_parts`.
pub(crate) unsafe fn from_raw_parts<T>(ptr: *mut T, len: u32) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    let slice = std::ptr::slice_from_raw_parts_mut(ptr, len as usize);
    unsafe { Box::from_raw(slice) }.into_vec()
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiSortOrder {
    Relevance = 0,
    Newest = 1,
}

impl From<FfiSortOrder> for SortOrder {
    fn from(o: FfiSortOrder) -> Self {
        match o {
            FfiSortOrder::Relevance => SortOrder::Relevance,
            FfiSortOrder::Newest => SortOrder::Newest,
        }
    }
}

/// What the host should display, flattened for C.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiViewState {
    Idle = 0,
    Loading = 1,
    Results = 2,
    EmptyNoConnection = 3,
    EmptyNoResults = 4,
}

impl From<ViewState> for FfiViewState {
    fn from(v: ViewState) -> Self {
        match v {
            ViewState::Idle => FfiViewState::Idle,
            ViewState::Loading => FfiViewState::Loading,
            ViewState::Results => FfiViewState::Results,
            ViewState::Empty(EmptyReason::NoConnection) => FfiViewState::EmptyNoConnection,
            ViewState::Empty(EmptyReason::NoResults) => FfiViewState::EmptyNoResults,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiCompletionKind {
    Applied = 0,
    Failed = 1,
    Stale = 2,
    NullArg = 3,
    Panic = 4,
}

/// Returned by value from `booklist_session_complete`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiCompletion {
    pub kind: FfiCompletionKind,
    /// Records appended; only meaningful for `Applied`.
    pub appended: u32,
}

impl FfiCompletion {
    pub(crate) fn of(kind: FfiCompletionKind) -> Self {
        Self { kind, appended: 0 }
    }
}

impl From<Completion> for FfiCompletion {
    fn from(c: Completion) -> Self {
        match c {
            Completion::Applied { appended } => FfiCompletion {
                kind: FfiCompletionKind::Applied,
                appended: appended as u32,
            },
            Completion::Failed => FfiCompletion::of(FfiCompletionKind::Failed),
            Completion::Stale => FfiCompletion::of(FfiCompletionKind::Stale),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
}

impl FfiHttpRequest {
    fn from_core(req: HttpRequest) -> Self {
        let headers: Vec<FfiHeader> = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: c_string(k),
                value: c_string(v),
            })
            .collect();
        let (headers, headers_len) = into_raw_parts(headers);
        FfiHttpRequest {
            method: req.method.into(),
            url: c_string(req.url),
            headers,
            headers_len,
        }
    }

    /// Release the strings and header array (not the struct itself).
    pub(crate) fn release(&mut self) {
        drop_c_string(self.url);
        self.url = std::ptr::null_mut();
        let headers = unsafe { from_raw_parts(self.headers, self.headers_len) };
        for h in headers {
            drop_c_string(h.key);
            drop_c_string(h.value);
        }
        self.headers = std::ptr::null_mut();
        self.headers_len = 0;
    }
}

/// A page request the host must execute, then report back with
/// `booklist_session_complete(session, token, response)`.
#[repr(C)]
pub struct FfiPageRequest {
    pub token: u64,
    pub start_index: u32,
    pub request: FfiHttpRequest,
}

impl FfiPageRequest {
    pub(crate) fn from_core(page: PageRequest) -> *mut Self {
        Box::into_raw(Box::new(FfiPageRequest {
            token: page.token.value(),
            start_index: page.start_index,
            request: FfiHttpRequest::from_core(page.request),
        }))
    }
}

/// An HTTP response described as C-compatible plain data.
///
/// Built by the caller on its own stack; the FFI layer reads but never
/// frees these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A single book exposed to C. Optional fields are null when absent.
#[repr(C)]
pub struct FfiBook {
    pub thumbnail_url: *mut c_char,
    pub title: *mut c_char,
    pub authors: *mut c_char,
    /// `authors`, or a placeholder when there are none. Never null.
    pub author_display: *mut c_char,
    pub published_date: *mut c_char,
    pub preview_link: *mut c_char,
}

impl FfiBook {
    pub(crate) fn from_core(book: &BookRecord) -> Self {
        FfiBook {
            thumbnail_url: c_string_opt(book.thumbnail_url.clone()),
            title: c_string(book.title.clone()),
            authors: c_string_opt(book.authors.clone()),
            author_display: c_string(book.author_display().to_string()),
            published_date: c_string_opt(book.published_date.clone()),
            preview_link: c_string(book.preview_link.clone()),
        }
    }

    /// Release the string fields (not the struct itself).
    pub(crate) fn release(&self) {
        drop_c_string(self.thumbnail_url);
        drop_c_string(self.title);
        drop_c_string(self.authors);
        drop_c_string(self.author_display);
        drop_c_string(self.published_date);
        drop_c_string(self.preview_link);
    }
}

/// A parsed page of books exposed to C.
#[repr(C)]
pub struct FfiBookList {
    pub items: *mut FfiBook,
    pub len: u32,
    pub total_items: u64,
}

impl FfiBookList {
    pub(crate) fn from_core(page: VolumePage) -> *mut Self {
        let books: Vec<FfiBook> = page.books.iter().map(FfiBook::from_core).collect();
        let (items, len) = into_raw_parts(books);
        Box::into_raw(Box::new(FfiBookList {
            items,
            len,
            total_items: page.total_items,
        }))
    }
}
