//! Domain types for book search.
//!
//! # Design
//! `BookRecord` is what the presentation layer renders; it is built once by
//! the parser and never mutated. The wire shape of the catalog response is
//! not modeled as structs here because the parser has to keep the records it
//! decoded before a malformed entry, which a derive-based decode of the
//! whole document cannot do.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Shown in place of the author line when a volume lists no authors.
pub const UNKNOWN_AUTHOR: &str = "Unknown author";

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub thumbnail_url: Option<String>,
    pub title: String,
    /// Authors joined with `", "`, or `None` when the volume lists none.
    pub authors: Option<String>,
    pub published_date: Option<String>,
    pub preview_link: String,
}

impl BookRecord {
    pub fn author_display(&self) -> &str {
        self.authors.as_deref().unwrap_or(UNKNOWN_AUTHOR)
    }
}

/// Result ordering understood by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Relevance,
    Newest,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Relevance => "relevance",
            SortOrder::Newest => "newest",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(SortOrder::Relevance),
            "newest" => Ok(SortOrder::Newest),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Everything the URL builder needs for one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub start_index: u32,
    pub page_size: u32,
    pub order: SortOrder,
    pub free_only: bool,
}

impl SearchQuery {
    /// First page of `text` with the default page size and ordering.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start_index: 0,
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            order: SortOrder::default(),
            free_only: false,
        }
    }
}

/// How the parser reacts to a malformed entry in the `items` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordFaults {
    /// Stop at the first malformed entry and keep the records before it.
    #[default]
    AbandonPage,
    /// Skip malformed entries and keep parsing.
    SkipRecord,
}

/// One parsed page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumePage {
    pub books: Vec<BookRecord>,
    /// Length of the response's `items` array, malformed entries included.
    pub item_count: usize,
    /// The catalog's `totalItems`, or 0 when the response omits it.
    pub total_items: u64,
}

impl VolumePage {
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
