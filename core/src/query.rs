//! Search URL construction.

use crate::config::clamp_page_size;
use crate::error::ApiError;
use crate::types::SearchQuery;

/// Value of the `filter` parameter that restricts results to free e-books.
pub const FREE_EBOOKS_FILTER: &str = "free-ebooks";

/// Build `{endpoint}?q=..&maxResults=..&orderBy=..&startIndex=..[&filter=free-ebooks]`.
///
/// The query text is trimmed and percent-encoded. A blank query is an
/// error; callers treat it as "nothing to search for". An endpoint that
/// already carries a query string (an API key, say) is extended with `&`.
pub fn build_search_url(endpoint: &str, query: &SearchQuery) -> Result<String, ApiError> {
    let text = query.text.trim();
    if text.is_empty() {
        return Err(ApiError::EmptyQuery);
    }
    let endpoint = validate_endpoint(endpoint)?;
    let separator = if endpoint.contains('?') { '&' } else { '?' };

    let mut url = format!(
        "{endpoint}{separator}q={}&maxResults={}&orderBy={}&startIndex={}",
        urlencoding::encode(text),
        clamp_page_size(query.page_size),
        query.order,
        query.start_index,
    );
    if query.free_only {
        url.push_str("&filter=");
        url.push_str(FREE_EBOOKS_FILTER);
    }
    Ok(url)
}

fn validate_endpoint(endpoint: &str) -> Result<&str, ApiError> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let host = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .ok_or_else(|| ApiError::InvalidEndpoint(endpoint.to_string()))?;
    if host.is_empty() || host.starts_with('/') || host.contains(char::is_whitespace) {
        return Err(ApiError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(endpoint)
}
