//! Stateless request builder and response parser for the catalog API.
//!
//! # Design
//! `BooksClient` holds only the endpoint and the parser's fault policy. A
//! search is split into `build_search`, which produces an `HttpRequest`, and
//! `parse_search`, which consumes the matching `HttpResponse`. Whoever sits
//! between the two (a `Transport`, or the native host across the FFI) does
//! the I/O, so this type stays deterministic.

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::parse::decode_volumes;
use crate::query::build_search_url;
use crate::types::{RecordFaults, SearchQuery, VolumePage};

#[derive(Debug, Clone)]
pub struct BooksClient {
    endpoint: String,
    record_faults: RecordFaults,
}

impl BooksClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            record_faults: RecordFaults::default(),
        }
    }

    pub fn with_record_faults(mut self, record_faults: RecordFaults) -> Self {
        self.record_faults = record_faults;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn record_faults(&self) -> RecordFaults {
        self.record_faults
    }

    pub fn build_search(&self, query: &SearchQuery) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: build_search_url(&self.endpoint, query)?,
            headers: vec![("accept".to_string(), "application/json".to_string())],
        })
    }

    /// Only a 200 counts as success. A 200 whose body is not a JSON object
    /// fails with `DeserializationError`, so a truncated page is retried
    /// rather than taken for the end of the results.
    pub fn parse_search(&self, response: HttpResponse) -> Result<VolumePage, ApiError> {
        check_status(&response)?;
        decode_volumes(&response.body, self.record_faults)
    }
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status == 200 {
        return Ok(());
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
