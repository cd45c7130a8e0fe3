//! C-ABI wrapper around `booklist-core`.
//!
//! # Overview
//! Lets a native GUI host drive a search session: the host asks for page
//! requests, executes them with its own HTTP stack, reports the responses
//! back, and reads records out for its list view.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Requests carry the session's token; passing it back to
//!   `booklist_session_complete` is what lets late responses be discarded.
//! - The C caller owns all returned pointers and must call the matching
//!   `booklist_free_*` function to release them.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::catch_unwind;

use booklist_core::{
    parse_volumes, HttpResponse, RecordFaults, RequestToken, SearchConfig, SearchSession,
    VolumePage,
};
use tracing::warn;

use types::*;

/// Borrow a C string as `&str`; null or invalid UTF-8 yields `None`.
fn str_arg<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = if resp.body.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(resp.body) }
            .to_string_lossy()
            .into_owned()
    };
    HttpResponse {
        status: resp.status,
        headers: Vec::new(),
        body,
    }
}

fn boxed_session(inner: SearchSession) -> *mut FfiSearchSession {
    Box::into_raw(Box::new(FfiSearchSession { inner }))
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Create a session searching `endpoint`.
///
/// Returns null if `endpoint` is null or not UTF-8. `page_size` is clamped
/// into the catalog's accepted range. Free with `booklist_session_free`.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_new(
    endpoint: *const c_char,
    page_size: u32,
    order: FfiSortOrder,
    free_only: bool,
) -> *mut FfiSearchSession {
    catch_unwind(|| {
        let Some(endpoint) = str_arg(endpoint) else {
            return std::ptr::null_mut();
        };
        let config = SearchConfig {
            endpoint: endpoint.to_string(),
            page_size,
            order: order.into(),
            free_only,
            ..SearchConfig::default()
        };
        boxed_session(SearchSession::new(&config))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a session from a TOML configuration document. Missing keys take
/// their defaults. Returns null if `config_toml` is null or invalid.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_new_with_config(
    config_toml: *const c_char,
) -> *mut FfiSearchSession {
    catch_unwind(|| {
        let Some(raw) = str_arg(config_toml) else {
            return std::ptr::null_mut();
        };
        match SearchConfig::from_toml_str(raw) {
            Ok(config) => boxed_session(SearchSession::new(&config)),
            Err(err) => {
                warn!("rejecting session config: {err}");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a session. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_free(session: *mut FfiSearchSession) {
    if !session.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(session) });
        });
    }
}

// ---------------------------------------------------------------------------
// Issuing requests
// ---------------------------------------------------------------------------

/// Start a new search, clearing the current results.
///
/// Returns the first page request, or null if `session` is null or the
/// query is blank (nothing to do). Free with `booklist_free_page_request`.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_submit(
    session: *mut FfiSearchSession,
    query: *const c_char,
) -> *mut FfiPageRequest {
    catch_unwind(|| {
        if session.is_null() {
            return std::ptr::null_mut();
        }
        let session = unsafe { &mut *session };
        let Some(query) = str_arg(query) else {
            return std::ptr::null_mut();
        };
        match session.inner.submit(query) {
            Ok(page) => FfiPageRequest::from_core(page),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Request the next page. Returns null while a load is in flight, before
/// any search, or once results are exhausted.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_load_more(
    session: *mut FfiSearchSession,
) -> *mut FfiPageRequest {
    catch_unwind(|| {
        if session.is_null() {
            return std::ptr::null_mut();
        }
        let session = unsafe { &mut *session };
        session
            .inner
            .load_more()
            .map(FfiPageRequest::from_core)
            .unwrap_or(std::ptr::null_mut())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// List scroll callback. Returns a page request when the visible window is
/// near the end of the loaded results, null otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_on_scroll(
    session: *mut FfiSearchSession,
    first_visible: u32,
    visible_count: u32,
) -> *mut FfiPageRequest {
    catch_unwind(|| {
        if session.is_null() {
            return std::ptr::null_mut();
        }
        let session = unsafe { &mut *session };
        session
            .inner
            .on_scroll(first_visible as usize, visible_count as usize)
            .map(FfiPageRequest::from_core)
            .unwrap_or(std::ptr::null_mut())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Record that the host's connectivity probe failed.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_mark_offline(session: *mut FfiSearchSession) {
    if session.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let session = unsafe { &mut *session };
        session.inner.mark_offline();
    });
}

// ---------------------------------------------------------------------------
// Completing requests
// ---------------------------------------------------------------------------

/// Report the outcome of the request identified by `token`.
///
/// Pass null for `response` when the request could not be executed at all.
/// A non-200 response, or a body that is not a JSON object, counts as a
/// failed load.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_complete(
    session: *mut FfiSearchSession,
    token: u64,
    response: *const FfiHttpResponse,
) -> FfiCompletion {
    catch_unwind(|| {
        if session.is_null() {
            return FfiCompletion::of(FfiCompletionKind::NullArg);
        }
        let session = unsafe { &mut *session };
        let page = if response.is_null() {
            None
        } else {
            let resp = ffi_response_to_core(unsafe { &*response });
            match session.inner.client().parse_search(resp) {
                Ok(page) => Some(page),
                Err(err) => {
                    warn!(token, "load failed: {err}");
                    None
                }
            }
        };
        session
            .inner
            .complete(RequestToken::from_raw(token), page)
            .into()
    })
    .unwrap_or_else(|_| FfiCompletion::of(FfiCompletionKind::Panic))
}

// ---------------------------------------------------------------------------
// Reading state
// ---------------------------------------------------------------------------

/// Number of records loaded for the current query. 0 for null.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_len(session: *const FfiSearchSession) -> u32 {
    if session.is_null() {
        return 0;
    }
    catch_unwind(|| unsafe { &*session }.inner.len() as u32).unwrap_or(0)
}

#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_is_loading(session: *const FfiSearchSession) -> bool {
    if session.is_null() {
        return false;
    }
    catch_unwind(|| unsafe { &*session }.inner.is_loading()).unwrap_or(false)
}

#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_view_state(session: *const FfiSearchSession) -> FfiViewState {
    if session.is_null() {
        return FfiViewState::Idle;
    }
    catch_unwind(|| unsafe { &*session }.inner.view_state().into()).unwrap_or(FfiViewState::Idle)
}

/// The record at `index`, or null if out of range. Free with
/// `booklist_free_book`.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_book(
    session: *const FfiSearchSession,
    index: u32,
) -> *mut FfiBook {
    catch_unwind(|| {
        if session.is_null() {
            return std::ptr::null_mut();
        }
        let session = unsafe { &*session };
        match session.inner.books().get(index as usize) {
            Some(book) => Box::into_raw(Box::new(FfiBook::from_core(book))),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Preview link of the record at `index` for the host's URL opener, or
/// null if out of range. Free with `booklist_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_session_select(
    session: *const FfiSearchSession,
    index: u32,
) -> *mut c_char {
    catch_unwind(|| {
        if session.is_null() {
            return std::ptr::null_mut();
        }
        let session = unsafe { &*session };
        c_string_opt(session.inner.select(index as usize).map(str::to_string))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Empty-state text for `state`, or null for states that show no message.
/// Free with `booklist_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_view_state_message(state: FfiViewState) -> *mut c_char {
    let message = match state {
        FfiViewState::EmptyNoConnection => {
            Some(booklist_core::EmptyReason::NoConnection.message())
        }
        FfiViewState::EmptyNoResults => Some(booklist_core::EmptyReason::NoResults.message()),
        FfiViewState::Idle | FfiViewState::Loading | FfiViewState::Results => None,
    };
    c_string_opt(message.map(str::to_string))
}

// ---------------------------------------------------------------------------
// Stateless parsing
// ---------------------------------------------------------------------------

/// Parse a volumes response without a session, using the legacy
/// abandon-page fault policy. Non-200 responses yield an empty list.
/// Returns null only if `response` is null. Free with
/// `booklist_free_book_list`.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_parse_volumes(response: *const FfiHttpResponse) -> *mut FfiBookList {
    catch_unwind(|| {
        if response.is_null() {
            return std::ptr::null_mut();
        }
        let resp = ffi_response_to_core(unsafe { &*response });
        let page = if resp.status == 200 {
            parse_volumes(Some(&resp.body), RecordFaults::AbandonPage)
        } else {
            warn!(status = resp.status, "not parsing error response");
            VolumePage::default()
        };
        FfiBookList::from_core(page)
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a page request from `booklist_session_submit`, `_load_more` or
/// `_on_scroll`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_free_page_request(req: *mut FfiPageRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let mut req = unsafe { Box::from_raw(req) };
        req.request.release();
    });
}

/// Free a book from `booklist_session_book`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_free_book(book: *mut FfiBook) {
    if book.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let book = unsafe { Box::from_raw(book) };
        book.release();
    });
}

/// Free a list from `booklist_parse_volumes`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_free_book_list(list: *mut FfiBookList) {
    if list.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let list = unsafe { Box::from_raw(list) };
        for book in unsafe { from_raw_parts(list.items, list.len) } {
            book.release();
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn booklist_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| drop_c_string(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
