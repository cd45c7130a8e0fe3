//! Search configuration.
//!
//! Settings a host would otherwise keep in its own preferences store: the
//! catalog endpoint, paging, default ordering and filter, and network
//! timeouts. Loaded from TOML; any missing entry falls back to its default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::types::{RecordFaults, SortOrder};

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/books/v1/volumes";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Largest `maxResults` the catalog accepts.
pub const MAX_PAGE_SIZE: u32 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub page_size: u32,
    pub order: SortOrder,
    pub free_only: bool,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Rows from the end of the loaded list at which the next page is requested.
    pub scroll_threshold: usize,
    pub record_faults: RecordFaults,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            order: SortOrder::Relevance,
            free_only: false,
            connect_timeout_ms: 15_000,
            read_timeout_ms: 10_000,
            scroll_threshold: 3,
            record_faults: RecordFaults::AbandonPage,
        }
    }
}

impl SearchConfig {
    /// Parse a TOML document, failing on syntax or type errors.
    pub fn from_toml_str(raw: &str) -> Result<Self, ApiError> {
        toml::from_str(raw).map_err(|e| ApiError::Config(e.to_string()))
    }

    /// Load from `path`, falling back to defaults when the file is missing or
    /// invalid so a search screen can always come up.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %path.display(), "no search config ({err}), using defaults");
                return Self::default();
            }
        };
        match Self::from_toml_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), "ignoring search config: {err}");
                Self::default()
            }
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Page size clamped into the range the catalog accepts.
    pub fn effective_page_size(&self) -> u32 {
        clamp_page_size(self.page_size)
    }
}

pub(crate) fn clamp_page_size(page_size: u32) -> u32 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}
