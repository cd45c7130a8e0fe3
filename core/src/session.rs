//! Search session: query state, load state and the result store.
//!
//! # Design
//! A `SearchSession` is owned by exactly one screen controller and is the
//! only place results are stored. It is sans-IO: `submit` and `load_more`
//! hand out a `PageRequest`, and whoever executes it reports back through
//! `complete` with the same token.
//!
//! Every issued request carries a fresh `RequestToken` from a monotonic
//! counter, and the session remembers the single token it is waiting for.
//! A completion with any other token is stale and is dropped without
//! touching state. A new search therefore supersedes an in-flight load
//! without cancelling it, and the late response cannot leak old results into
//! the new query's list.
//!
//! Invariant: `books()` is the in-order concatenation of every page applied
//! since the last `submit`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::BooksClient;
use crate::config::SearchConfig;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::types::{BookRecord, SearchQuery, SortOrder, VolumePage};

/// Identifies one issued page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// A request the session wants executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub token: RequestToken,
    pub start_index: u32,
    pub request: HttpRequest,
}

/// What `complete` did with a finished load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The page was appended to the store.
    Applied { appended: usize },
    /// The load failed; the store is unchanged and the same page can be
    /// requested again.
    Failed,
    /// The token is not the one being waited for; nothing changed.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    NoConnection,
    NoResults,
}

impl EmptyReason {
    pub fn message(self) -> &'static str {
        match self {
            EmptyReason::NoConnection => "No internet connection.",
            EmptyReason::NoResults => "No books found.",
        }
    }
}

/// What the host should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Nothing searched yet.
    Idle,
    /// The first page of the current query is loading.
    Loading,
    /// At least one record is available.
    Results,
    Empty(EmptyReason),
}

/// The query the store currently belongs to. Preferences are captured at
/// submit time so every page of one query is requested the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ActiveQuery {
    text: String,
    order: SortOrder,
    free_only: bool,
}

/// State carried across host screen recreation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    active: Option<ActiveQuery>,
    next_start: u32,
    books: Vec<BookRecord>,
    exhausted: bool,
    loaded: bool,
    #[serde(default)]
    offline: bool,
    last_token: u64,
}

#[derive(Debug, Clone)]
pub struct SearchSession {
    client: BooksClient,
    page_size: u32,
    scroll_threshold: usize,
    order: SortOrder,
    free_only: bool,

    active: Option<ActiveQuery>,
    next_start: u32,
    books: Vec<BookRecord>,
    exhausted: bool,
    /// Whether any load for the active query has finished.
    loaded: bool,
    offline: bool,

    last_token: u64,
    in_flight: Option<RequestToken>,
}

impl SearchSession {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            client: BooksClient::new(&config.endpoint).with_record_faults(config.record_faults),
            page_size: config.effective_page_size(),
            scroll_threshold: config.scroll_threshold,
            order: config.order,
            free_only: config.free_only,
            active: None,
            next_start: 0,
            books: Vec::new(),
            exhausted: false,
            loaded: false,
            offline: false,
            last_token: 0,
            in_flight: None,
        }
    }

    /// Rebuild a session from a snapshot. The restored session is idle and
    /// treats every pre-snapshot token as stale; call `load_more` to resume
    /// a page that was still loading when the snapshot was taken.
    pub fn restore(config: &SearchConfig, snapshot: SessionSnapshot) -> Self {
        let mut session = Self::new(config);
        session.active = snapshot.active;
        session.next_start = snapshot.next_start;
        session.books = snapshot.books;
        session.exhausted = snapshot.exhausted;
        session.loaded = snapshot.loaded;
        session.offline = snapshot.offline;
        session.last_token = snapshot.last_token;
        session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active: self.active.clone(),
            next_start: self.next_start,
            books: self.books.clone(),
            exhausted: self.exhausted,
            loaded: self.loaded,
            offline: self.offline,
            last_token: self.last_token,
        }
    }

    pub fn client(&self) -> &BooksClient {
        &self.client
    }

    /// Applies from the next `submit` on.
    pub fn set_order(&mut self, order: SortOrder) {
        self.order = order;
    }

    /// Applies from the next `submit` on.
    pub fn set_free_only(&mut self, free_only: bool) {
        self.free_only = free_only;
    }

    /// Start a new search. Clears the store and requests the first page,
    /// superseding any load still in flight.
    ///
    /// A blank query is rejected with `EmptyQuery` and changes nothing.
    pub fn submit(&mut self, text: &str) -> Result<PageRequest, ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::EmptyQuery);
        }

        if let Some(stale) = self.in_flight.take() {
            debug!(token = stale.value(), "superseding in-flight load");
        }
        self.active = Some(ActiveQuery {
            text: text.to_string(),
            order: self.order,
            free_only: self.free_only,
        });
        self.next_start = 0;
        self.books.clear();
        self.exhausted = false;
        self.loaded = false;
        self.offline = false;

        match self.issue() {
            Ok(request) => Ok(request),
            Err(err) => {
                warn!("search request skipped: {err}");
                self.loaded = true;
                Err(err)
            }
        }
    }

    /// Request the next page of the active query.
    ///
    /// Returns `None` while a load is in flight, when nothing has been
    /// searched, or when the catalog has no more results.
    pub fn load_more(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() || self.active.is_none() || self.exhausted {
            return None;
        }
        match self.issue() {
            Ok(request) => Some(request),
            Err(err) => {
                warn!("next page request skipped: {err}");
                None
            }
        }
    }

    /// Scroll callback. Requests the next page once the visible window
    /// comes within `scroll_threshold` rows of the end of the store.
    pub fn on_scroll(&mut self, first_visible: usize, visible_count: usize) -> Option<PageRequest> {
        if self.books.is_empty() {
            return None;
        }
        let reach = first_visible
            .saturating_add(visible_count)
            .saturating_add(self.scroll_threshold);
        if reach < self.books.len() {
            return None;
        }
        self.load_more()
    }

    /// Report the outcome of a request. `None` means the fetch failed.
    pub fn complete(&mut self, token: RequestToken, page: Option<VolumePage>) -> Completion {
        if self.in_flight != Some(token) {
            debug!(
                token = token.value(),
                current = self.in_flight.map(RequestToken::value),
                "discarding stale completion"
            );
            return Completion::Stale;
        }
        self.in_flight = None;
        self.loaded = true;

        let Some(page) = page else {
            debug!(token = token.value(), start = self.next_start, "load failed");
            return Completion::Failed;
        };

        let appended = page.books.len();
        self.books.extend(page.books);
        self.next_start = self.next_start.saturating_add(self.page_size);
        if page.item_count == 0
            || (page.total_items > 0 && u64::from(self.next_start) >= page.total_items)
        {
            self.exhausted = true;
        }
        debug!(
            token = token.value(),
            appended,
            total = self.books.len(),
            exhausted = self.exhausted,
            "page applied"
        );
        Completion::Applied { appended }
    }

    /// Record that the connectivity probe failed. The store is cleared and
    /// no request is issued; the next successful `submit` lifts this.
    pub fn mark_offline(&mut self) {
        self.in_flight = None;
        self.active = None;
        self.books.clear();
        self.offline = true;
    }

    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn query(&self) -> Option<&str> {
        self.active.as_ref().map(|q| q.text.as_str())
    }

    /// Start offset of the next page to be requested.
    pub fn next_start(&self) -> u32 {
        self.next_start
    }

    /// Preview link of the record at `index`, for the host's URL opener.
    pub fn select(&self, index: usize) -> Option<&str> {
        self.books.get(index).map(|b| b.preview_link.as_str())
    }

    pub fn view_state(&self) -> ViewState {
        if self.offline {
            return ViewState::Empty(EmptyReason::NoConnection);
        }
        if !self.books.is_empty() {
            return ViewState::Results;
        }
        if self.in_flight.is_some() {
            return ViewState::Loading;
        }
        if self.loaded {
            return ViewState::Empty(EmptyReason::NoResults);
        }
        ViewState::Idle
    }

    fn issue(&mut self) -> Result<PageRequest, ApiError> {
        let active = self.active.as_ref().ok_or(ApiError::EmptyQuery)?;
        let query = SearchQuery {
            text: active.text.clone(),
            start_index: self.next_start,
            page_size: self.page_size,
            order: active.order,
            free_only: active.free_only,
        };
        let request = self.client.build_search(&query)?;

        self.last_token += 1;
        let token = RequestToken(self.last_token);
        self.in_flight = Some(token);
        debug!(token = token.value(), start = self.next_start, "issuing page request");

        Ok(PageRequest {
            token,
            start_index: self.next_start,
            request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;

    fn session() -> SearchSession {
        let config = SearchConfig {
            endpoint: "http://localhost:3000/books/v1/volumes".to_string(),
            ..SearchConfig::default()
        };
        SearchSession::new(&config)
    }

    fn book(title: &str) -> BookRecord {
        BookRecord {
            thumbnail_url: Some(format!("https://img.example/{title}.jpg")),
            title: title.to_string(),
            authors: None,
            published_date: None,
            preview_link: format!("https://books.example/{title}"),
        }
    }

    fn page(prefix: &str, n: usize, total_items: u64) -> VolumePage {
        VolumePage {
            books: (0..n).map(|i| book(&format!("{prefix}-{i}"))).collect(),
            item_count: n,
            total_items,
        }
    }

    #[test]
    fn blank_submit_changes_nothing() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        s.complete(first.token, Some(page("dune", 10, 100)));

        assert!(matches!(s.submit("  "), Err(ApiError::EmptyQuery)));
        assert_eq!(s.len(), 10);
        assert_eq!(s.query(), Some("dune"));
        assert!(!s.is_loading());
    }

    #[test]
    fn submit_requests_first_page_and_enters_loading() {
        let mut s = session();
        assert_eq!(s.view_state(), ViewState::Idle);
        let req = s.submit("dune").unwrap();
        assert_eq!(req.start_index, 0);
        assert!(req.request.url.contains("startIndex=0"));
        assert!(s.is_loading());
        assert_eq!(s.view_state(), ViewState::Loading);
    }

    #[test]
    fn scroll_near_end_requests_exactly_one_next_page() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        assert_eq!(
            s.complete(first.token, Some(page("dune", 10, 100))),
            Completion::Applied { appended: 10 }
        );
        assert_eq!(s.len(), 10);
        assert_eq!(s.view_state(), ViewState::Results);

        assert!(s.on_scroll(0, 4).is_none(), "far from the end");

        let next = s.on_scroll(4, 5).expect("near the end");
        assert_eq!(next.start_index, 10);
        assert!(next.request.url.contains("startIndex=10"));

        assert!(s.on_scroll(5, 5).is_none(), "suppressed while loading");
        assert!(s.load_more().is_none());
    }

    #[test]
    fn pages_concatenate_in_arrival_order() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        s.complete(first.token, Some(page("p1", 10, 100)));
        let second = s.load_more().unwrap();
        s.complete(second.token, Some(page("p2", 10, 100)));

        assert_eq!(s.len(), 20);
        assert_eq!(s.books()[0].title, "p1-0");
        assert_eq!(s.books()[10].title, "p2-0");
        assert_eq!(s.next_start(), 20);
    }

    #[test]
    fn stale_response_after_new_search_is_discarded() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        s.complete(first.token, Some(page("dune", 10, 100)));
        let dune_more = s.load_more().unwrap();

        let foundation = s.submit("foundation").unwrap();
        assert!(s.is_empty());

        assert_eq!(s.complete(dune_more.token, Some(page("dune2", 10, 100))), Completion::Stale);
        assert!(s.is_empty());
        assert!(s.is_loading(), "still waiting for the new query");

        s.complete(foundation.token, Some(page("foundation", 10, 100)));
        assert_eq!(s.len(), 10);
        assert!(s.books().iter().all(|b| b.title.starts_with("foundation")));
    }

    #[test]
    fn duplicate_completion_is_stale() {
        let mut s = session();
        let req = s.submit("dune").unwrap();
        s.complete(req.token, Some(page("dune", 10, 100)));
        assert_eq!(s.complete(req.token, Some(page("dune", 10, 100))), Completion::Stale);
        assert_eq!(s.len(), 10);
    }

    #[test]
    fn failed_load_returns_to_idle_and_keeps_offset() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        s.complete(first.token, Some(page("dune", 10, 100)));
        let second = s.load_more().unwrap();
        assert_eq!(s.complete(second.token, None), Completion::Failed);

        assert!(!s.is_loading());
        assert_eq!(s.len(), 10);
        let retry = s.load_more().unwrap();
        assert_eq!(retry.start_index, 10);
    }

    #[test]
    fn failed_first_page_shows_no_results() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        s.complete(first.token, None);
        assert_eq!(s.view_state(), ViewState::Empty(EmptyReason::NoResults));
    }

    #[test]
    fn truncated_page_is_retried_not_exhausted() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        s.complete(first.token, Some(page("dune", 10, 100)));
        let second = s.load_more().unwrap();

        let truncated = HttpResponse::ok(r#"{"totalItems":100,"items":["#);
        let parsed = s.client().parse_search(truncated).ok();
        assert_eq!(s.complete(second.token, parsed), Completion::Failed);

        assert!(!s.is_exhausted());
        assert_eq!(s.next_start(), 10);
        assert_eq!(s.len(), 10);
        let retry = s.load_more().unwrap();
        assert_eq!(retry.start_index, 10);
    }

    #[test]
    fn empty_page_exhausts_query() {
        let mut s = session();
        let first = s.submit("zzzz").unwrap();
        s.complete(first.token, Some(VolumePage::default()));
        assert!(s.is_exhausted());
        assert!(s.load_more().is_none());
        assert_eq!(s.view_state(), ViewState::Empty(EmptyReason::NoResults));
    }

    #[test]
    fn reaching_total_items_exhausts_query() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        s.complete(first.token, Some(page("dune", 10, 12)));
        assert!(!s.is_exhausted());
        let second = s.load_more().unwrap();
        s.complete(second.token, Some(page("dune2", 2, 12)));
        assert!(s.is_exhausted());
        assert!(s.on_scroll(10, 2).is_none());
    }

    #[test]
    fn preferences_apply_from_next_submit() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        s.complete(first.token, Some(page("dune", 10, 100)));

        s.set_order(SortOrder::Newest);
        s.set_free_only(true);
        let more = s.load_more().unwrap();
        assert!(more.request.url.contains("orderBy=relevance"));
        assert!(!more.request.url.contains("filter="));
        s.complete(more.token, None);

        let fresh = s.submit("dune").unwrap();
        assert!(fresh.request.url.contains("orderBy=newest"));
        assert!(fresh.request.url.ends_with("&filter=free-ebooks"));
    }

    #[test]
    fn offline_clears_store_until_next_submit() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        s.complete(first.token, Some(page("dune", 10, 100)));

        s.mark_offline();
        assert!(s.is_empty());
        assert_eq!(s.view_state(), ViewState::Empty(EmptyReason::NoConnection));
        assert!(s.load_more().is_none());

        s.submit("dune").unwrap();
        assert_eq!(s.view_state(), ViewState::Loading);
    }

    #[test]
    fn select_returns_preview_link() {
        let mut s = session();
        let first = s.submit("dune").unwrap();
        s.complete(first.token, Some(page("dune", 3, 3)));
        assert_eq!(s.select(1), Some("https://books.example/dune-1"));
        assert_eq!(s.select(3), None);
    }

    #[test]
    fn restored_session_discards_pre_snapshot_tokens() {
        let config = SearchConfig::default();
        let mut s = SearchSession::new(&config);
        let first = s.submit("dune").unwrap();
        s.complete(first.token, Some(page("dune", 10, 100)));
        let in_flight = s.load_more().unwrap();

        let snapshot = s.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: SessionSnapshot = serde_json::from_str(&json).unwrap();
        let mut s = SearchSession::restore(&config, restored);

        assert_eq!(s.len(), 10);
        assert!(!s.is_loading());
        assert_eq!(s.complete(in_flight.token, Some(page("late", 10, 100))), Completion::Stale);

        let resumed = s.load_more().unwrap();
        assert_eq!(resumed.start_index, 10);
        assert!(resumed.token > in_flight.token);
    }

    #[test]
    fn restored_offline_session_stays_offline() {
        let config = SearchConfig::default();
        let mut s = SearchSession::new(&config);
        s.mark_offline();

        let json = serde_json::to_string(&s.snapshot()).unwrap();
        let restored: SessionSnapshot = serde_json::from_str(&json).unwrap();
        let s = SearchSession::restore(&config, restored);
        assert_eq!(s.view_state(), ViewState::Empty(EmptyReason::NoConnection));
    }

    #[test]
    fn invalid_endpoint_skips_request() {
        let config = SearchConfig {
            endpoint: "not a url".to_string(),
            ..SearchConfig::default()
        };
        let mut s = SearchSession::new(&config);
        assert!(matches!(s.submit("dune"), Err(ApiError::InvalidEndpoint(_))));
        assert!(!s.is_loading());
        assert_eq!(s.view_state(), ViewState::Empty(EmptyReason::NoResults));
    }
}
