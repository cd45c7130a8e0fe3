//! Decoding of the catalog's `volumes` response into `BookRecord`s.
//!
//! # Design
//! `parse_volumes` never fails outward: empty input, malformed JSON and a
//! missing `items` array all produce an empty page, and every fault is
//! logged. `decode_volumes` is the same walk but reports an unusable
//! document as an error, so a truncated page can be told apart from the end
//! of the results. The
//! document is walked as a `serde_json::Value` rather than decoded through
//! derived structs so that the records decoded before a malformed entry
//! survive it.
//!
//! With `RecordFaults::AbandonPage` the first malformed entry ends the parse
//! and only the records before it are returned, so one bad volume can cost
//! the rest of its page. `RecordFaults::SkipRecord` isolates faults per
//! entry instead.

use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::error::ApiError;
use crate::types::{BookRecord, RecordFaults, VolumePage};

/// Separator placed between author names.
pub const AUTHORS_DELIMITER: &str = ", ";

/// Parse a response body. `None` and blank bodies yield an empty page.
pub fn parse_volumes(body: Option<&str>, faults: RecordFaults) -> VolumePage {
    let Some(body) = body.filter(|b| !b.trim().is_empty()) else {
        return VolumePage::default();
    };
    decode_volumes(body, faults).unwrap_or_else(|err| {
        error!("problem parsing the volumes response: {err}");
        VolumePage::default()
    })
}

/// Decode a response body, failing when the document itself is unusable:
/// blank, not JSON, or not a JSON object. Malformed entries inside `items`
/// are handled by `faults` and never fail the page.
pub fn decode_volumes(body: &str, faults: RecordFaults) -> Result<VolumePage, ApiError> {
    if body.trim().is_empty() {
        return Err(malformed("empty volumes response"));
    }
    let root: Value =
        serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    let root = root
        .as_object()
        .ok_or_else(|| malformed("volumes response is not a JSON object"))?;

    let total_items = root.get("totalItems").and_then(Value::as_u64).unwrap_or(0);
    let Some(items) = root.get("items").and_then(Value::as_array) else {
        return Ok(VolumePage {
            total_items,
            ..VolumePage::default()
        });
    };

    let mut books = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match parse_item(item) {
            Ok(book) => books.push(book),
            Err(err) => match faults {
                RecordFaults::AbandonPage => {
                    error!(index, kept = books.len(), "abandoning page at malformed volume: {err}");
                    break;
                }
                RecordFaults::SkipRecord => {
                    warn!(index, "skipping malformed volume: {err}");
                }
            },
        }
    }

    Ok(VolumePage {
        books,
        item_count: items.len(),
        total_items,
    })
}

/// Decode one entry of the `items` array.
pub fn parse_item(item: &Value) -> Result<BookRecord, ApiError> {
    let info = item
        .get("volumeInfo")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("missing object volumeInfo"))?;

    let title = required_string(info, "title")?;
    let authors = match info.get("authors").and_then(Value::as_array) {
        Some(names) => Some(join_authors(names)?),
        None => None,
    };
    let published_date = optional_string(info, "publishedDate")?;
    let preview_link = required_string(info, "previewLink")?;
    let thumbnail_url = match info.get("imageLinks") {
        None | Some(Value::Null) => None,
        Some(Value::Object(links)) => Some(required_string(links, "thumbnail")?),
        Some(_) => return Err(malformed("imageLinks is not an object")),
    };

    Ok(BookRecord {
        thumbnail_url,
        title,
        authors,
        published_date,
        preview_link,
    })
}

fn join_authors(names: &[Value]) -> Result<String, ApiError> {
    let names = names
        .iter()
        .map(|name| name.as_str().ok_or_else(|| malformed("non-string author")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.join(AUTHORS_DELIMITER))
}

fn required_string(object: &Map<String, Value>, key: &str) -> Result<String, ApiError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| malformed(&format!("missing string field {key}")))
}

fn optional_string(object: &Map<String, Value>, key: &str) -> Result<Option<String>, ApiError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(malformed(&format!("field {key} is not a string"))),
    }
}

fn malformed(msg: &str) -> ApiError {
    ApiError::DeserializationError(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(title: &str) -> Value {
        serde_json::json!({
            "volumeInfo": {
                "title": title,
                "authors": ["Frank Herbert"],
                "publishedDate": "1965",
                "previewLink": format!("https://books.example/{title}"),
                "imageLinks": { "thumbnail": format!("https://img.example/{title}.jpg") }
            }
        })
    }

    fn body(items: Vec<Value>) -> String {
        serde_json::json!({ "totalItems": 42, "items": items }).to_string()
    }

    #[test]
    fn empty_and_absent_input_yield_nothing() {
        assert_eq!(parse_volumes(None, RecordFaults::AbandonPage), VolumePage::default());
        assert_eq!(parse_volumes(Some(""), RecordFaults::AbandonPage), VolumePage::default());
        assert_eq!(parse_volumes(Some("  \n"), RecordFaults::AbandonPage), VolumePage::default());
    }

    #[test]
    fn empty_items_array_yields_nothing() {
        let page = parse_volumes(Some(r#"{"items":[]}"#), RecordFaults::AbandonPage);
        assert!(page.is_empty());
        assert_eq!(page.item_count, 0);
    }

    #[test]
    fn missing_items_is_not_an_error() {
        let page = parse_volumes(Some(r#"{"kind":"books#volumes","totalItems":0}"#), RecordFaults::AbandonPage);
        assert!(page.is_empty());
        assert_eq!(page.total_items, 0);
    }

    #[test]
    fn malformed_json_yields_nothing() {
        assert!(parse_volumes(Some("not json"), RecordFaults::AbandonPage).is_empty());
        assert!(parse_volumes(Some("[1,2,3]"), RecordFaults::AbandonPage).is_empty());
    }

    #[test]
    fn decode_rejects_unusable_documents() {
        for raw in ["", "   ", r#"{"totalItems":100,"items":["#, "[1,2,3]"] {
            let result = decode_volumes(raw, RecordFaults::AbandonPage);
            assert!(matches!(result, Err(ApiError::DeserializationError(_))), "{raw:?}");
        }
        let page = decode_volumes(r#"{"totalItems":7}"#, RecordFaults::AbandonPage).unwrap();
        assert_eq!(page.item_count, 0);
        assert_eq!(page.total_items, 7);
    }

    #[test]
    fn full_volume_is_decoded() {
        let page = parse_volumes(Some(&body(vec![volume("Dune")])), RecordFaults::AbandonPage);
        assert_eq!(page.total_items, 42);
        assert_eq!(
            page.books,
            vec![BookRecord {
                thumbnail_url: Some("https://img.example/Dune.jpg".to_string()),
                title: "Dune".to_string(),
                authors: Some("Frank Herbert".to_string()),
                published_date: Some("1965".to_string()),
                preview_link: "https://books.example/Dune".to_string(),
            }]
        );
    }

    #[test]
    fn two_authors_are_comma_joined() {
        let item = serde_json::json!({
            "volumeInfo": { "title": "T", "authors": ["A", "B"], "previewLink": "L" }
        });
        let book = parse_item(&item).unwrap();
        assert_eq!(book.authors.as_deref(), Some("A, B"));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let item = serde_json::json!({ "volumeInfo": { "title": "T", "previewLink": "L" } });
        let book = parse_item(&item).unwrap();
        assert_eq!(book.title, "T");
        assert_eq!(book.preview_link, "L");
        assert!(book.thumbnail_url.is_none());
        assert!(book.authors.is_none());
        assert!(book.published_date.is_none());
        assert_eq!(book.author_display(), crate::types::UNKNOWN_AUTHOR);
    }

    #[test]
    fn image_links_without_thumbnail_is_malformed() {
        let item = serde_json::json!({
            "volumeInfo": { "title": "T", "previewLink": "L", "imageLinks": { "smallThumbnail": "s" } }
        });
        assert!(matches!(parse_item(&item), Err(ApiError::DeserializationError(_))));
    }

    #[test]
    fn missing_title_is_malformed() {
        let item = serde_json::json!({ "volumeInfo": { "previewLink": "L" } });
        assert!(parse_item(&item).is_err());
    }

    #[test]
    fn abandon_page_keeps_prefix_only() {
        let bad = serde_json::json!({ "volumeInfo": { "title": "No link" } });
        let raw = body(vec![volume("One"), volume("Two"), bad, volume("Four")]);
        let page = parse_volumes(Some(&raw), RecordFaults::AbandonPage);
        let titles: Vec<&str> = page.books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["One", "Two"]);
        assert_eq!(page.item_count, 4);
    }

    #[test]
    fn skip_record_isolates_faults() {
        let bad = serde_json::json!({ "id": "no-volume-info" });
        let raw = body(vec![volume("One"), bad, volume("Three")]);
        let page = parse_volumes(Some(&raw), RecordFaults::SkipRecord);
        let titles: Vec<&str> = page.books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["One", "Three"]);
    }
}
