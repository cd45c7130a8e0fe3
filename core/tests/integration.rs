//! End-to-end searches against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port and drives the core
//! over real HTTP with `UreqTransport`, so URL building, fetching, parsing
//! and pagination are checked together against the server's request log.

use std::time::Duration;

use booklist_core::{
    AlwaysOnline, Completion, EmptyReason, SearchConfig, SearchController, SearchSession, Transport,
    UreqTransport, ViewState,
};
use mock_server::{Catalog, RequestLog};

const WAIT: Duration = Duration::from_secs(10);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Start the mock server on a random port; returns its volumes endpoint.
fn start_server() -> (String, RequestLog) {
    init_tracing();
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let log = RequestLog::default();
    let router = mock_server::app_with(Catalog::sample(), log.clone());
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::serve(listener, router).await
        })
        .unwrap();
    });

    (format!("http://{addr}{}", mock_server::VOLUMES_PATH), log)
}

fn config(endpoint: &str) -> SearchConfig {
    SearchConfig {
        endpoint: endpoint.to_string(),
        ..SearchConfig::default()
    }
}

#[test]
fn dune_first_page_then_scroll() {
    let (endpoint, log) = start_server();
    let config = config(&endpoint);
    let transport = UreqTransport::from_config(&config);
    let mut session = SearchSession::new(&config);

    // Step 1: submit and execute the first page by hand.
    let first = session.submit("dune").unwrap();
    let response = transport.execute(&first.request).unwrap();
    let page = session.client().parse_search(response).unwrap();
    assert_eq!(session.complete(first.token, Some(page)), Completion::Applied { appended: 10 });

    assert_eq!(session.len(), 10);
    for book in session.books() {
        assert!(!book.title.is_empty());
        assert!(!book.preview_link.is_empty());
        assert!(book.thumbnail_url.is_some());
    }

    // Step 2: scrolling near the end asks for exactly one more page.
    let next = session.on_scroll(5, 5).expect("near the end");
    assert_eq!(next.start_index, 10);
    assert!(session.on_scroll(6, 4).is_none());

    let response = transport.execute(&next.request).unwrap();
    let page = session.client().parse_search(response).unwrap();
    assert_eq!(session.complete(next.token, Some(page)), Completion::Applied { appended: 5 });
    assert_eq!(session.len(), 15);
    assert!(session.is_exhausted());

    let starts: Vec<Option<u32>> = log.blocking_entries().into_iter().map(|p| p.start_index).collect();
    assert_eq!(starts, [Some(0), Some(10)]);
}

#[test]
fn controller_pages_through_all_results() {
    let (endpoint, log) = start_server();
    let config = config(&endpoint);
    let mut controller =
        SearchController::new(&config, UreqTransport::from_config(&config), AlwaysOnline);

    assert_eq!(controller.search("dune"), ViewState::Loading);
    assert_eq!(controller.wait(WAIT), Some(Completion::Applied { appended: 10 }));

    assert!(controller.scrolled(7, 3));
    assert_eq!(controller.wait(WAIT), Some(Completion::Applied { appended: 5 }));

    // Exhausted: further scrolling issues nothing.
    assert!(!controller.scrolled(12, 3));
    assert_eq!(controller.session().len(), 15);
    assert_eq!(log.blocking_entries().len(), 2);
}

#[test]
fn new_query_replaces_results() {
    let (endpoint, _log) = start_server();
    let config = config(&endpoint);
    let mut controller =
        SearchController::new(&config, UreqTransport::from_config(&config), AlwaysOnline);

    controller.search("dune");
    controller.wait(WAIT);
    controller.search("asimov");
    assert!(controller.session().is_empty());
    assert_eq!(controller.wait(WAIT), Some(Completion::Applied { appended: 3 }));

    let titles: Vec<&str> = controller.session().books().iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Foundation", "Foundation and Empire", "Second Foundation"]);
}

#[test]
fn free_only_and_newest_reach_the_server() {
    let (endpoint, log) = start_server();
    let mut config = config(&endpoint);
    config.free_only = true;
    config.order = booklist_core::SortOrder::Newest;
    let mut controller =
        SearchController::new(&config, UreqTransport::from_config(&config), AlwaysOnline);

    controller.search("e");
    assert!(matches!(controller.wait(WAIT), Some(Completion::Applied { .. })));

    let entry = &log.blocking_entries()[0];
    assert_eq!(entry.filter.as_deref(), Some("free-ebooks"));
    assert_eq!(entry.order_by.as_deref(), Some("newest"));
    assert_eq!(controller.session().books()[0].title, "The Time Machine");
}

#[test]
fn no_matches_shows_empty_state() {
    let (endpoint, _log) = start_server();
    let config = config(&endpoint);
    let mut controller =
        SearchController::new(&config, UreqTransport::from_config(&config), AlwaysOnline);

    controller.search("nonexistent");
    assert_eq!(controller.wait(WAIT), Some(Completion::Applied { appended: 0 }));
    assert_eq!(
        controller.session().view_state(),
        ViewState::Empty(EmptyReason::NoResults)
    );
}

#[test]
fn wrong_path_degrades_to_empty_state() {
    let (endpoint, _log) = start_server();
    let config = config(&endpoint.replace("/volumes", "/nope"));
    let mut controller =
        SearchController::new(&config, UreqTransport::from_config(&config), AlwaysOnline);

    controller.search("dune");
    assert_eq!(controller.wait(WAIT), Some(Completion::Failed));
    assert_eq!(
        controller.session().view_state(),
        ViewState::Empty(EmptyReason::NoResults)
    );
}
