//! Book catalog search core for a single-screen mobile client.
//!
//! # Overview
//! Builds paged search requests against a Google Books style `volumes`
//! endpoint, parses the JSON responses into `BookRecord`s, and keeps the
//! ordered result list for the current query as the user scrolls.
//!
//! # Design
//! - Host-does-IO: `BooksClient` and `SearchSession` only produce
//!   `HttpRequest`s and consume `HttpResponse`s. `fetch::UreqTransport`
//!   executes them for Rust hosts; native hosts go through the FFI crate.
//! - `SearchSession` owns all query state. Request tokens make late
//!   responses for a superseded query harmless.
//! - `SearchController` adds background loading and the connectivity probe
//!   on top of a session.
//! - Failures degrade to an empty list plus a log line, never a panic.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod http;
pub mod parse;
pub mod query;
pub mod session;
pub mod types;

pub use client::BooksClient;
pub use config::SearchConfig;
pub use controller::{AlwaysOnline, Connectivity, SearchController};
pub use error::ApiError;
pub use fetch::{fetch_body, Transport, UreqTransport};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use parse::{decode_volumes, parse_volumes};
pub use query::build_search_url;
pub use session::{
    Completion, EmptyReason, PageRequest, RequestToken, SearchSession, SessionSnapshot, ViewState,
};
pub use types::{BookRecord, RecordFaults, SearchQuery, SortOrder, VolumePage};
