use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const VOLUMES_PATH: &str = "/books/v1/volumes";
pub const MAX_RESULTS_LIMIT: u32 = 40;
const DEFAULT_MAX_RESULTS: u32 = 10;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    pub small_thumbnail: String,
    pub thumbnail: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    pub preview_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_links: Option<ImageLinks>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaleInfo {
    pub saleability: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: Uuid,
    pub volume_info: VolumeInfo,
    pub sale_info: SaleInfo,
}

impl Volume {
    pub fn is_free(&self) -> bool {
        self.sale_info.saleability == "FREE"
    }

    fn matches(&self, terms: &[String]) -> bool {
        let info = &self.volume_info;
        let mut haystack = info.title.to_lowercase();
        if let Some(authors) = &info.authors {
            for author in authors {
                haystack.push(' ');
                haystack.push_str(&author.to_lowercase());
            }
        }
        terms.iter().all(|term| haystack.contains(term.as_str()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumesResponse {
    pub kind: String,
    pub total_items: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Volume>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub q: Option<String>,
    pub max_results: Option<u32>,
    pub order_by: Option<String>,
    pub start_index: Option<u32>,
    pub filter: Option<String>,
}

/// In-memory book catalog, in relevance order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    volumes: Vec<Volume>,
}

impl Catalog {
    pub fn new(volumes: Vec<Volume>) -> Self {
        Self { volumes }
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// A fixed catalog with enough "dune" matches for several pages, a few
    /// free books, and volumes without authors, dates, or thumbnails.
    pub fn sample() -> Self {
        const FRANK: &[&str] = &["Frank Herbert"];
        const BRIAN_KJA: &[&str] = &["Brian Herbert", "Kevin J. Anderson"];
        const ASIMOV: &[&str] = &["Isaac Asimov"];
        const SHELLEY: &[&str] = &["Mary Shelley"];
        const AUSTEN: &[&str] = &["Jane Austen"];
        const WELLS: &[&str] = &["H. G. Wells"];
        const TOLSTOY: &[&str] = &["Leo Tolstoy"];
        const NONE: &[&str] = &[];
        let rows: &[(&str, &[&str], Option<&str>, bool, bool)] = &[
            ("Dune", FRANK, Some("1965-08-01"), true, false),
            ("Dune Messiah", FRANK, Some("1969"), true, false),
            ("Children of Dune", FRANK, Some("1976"), true, false),
            ("God Emperor of Dune", FRANK, Some("1981"), true, false),
            ("Heretics of Dune", FRANK, Some("1984"), true, false),
            ("Chapterhouse: Dune", FRANK, Some("1985"), true, false),
            ("Dune: House Atreides", BRIAN_KJA, Some("1999"), true, false),
            ("Dune: House Harkonnen", BRIAN_KJA, Some("2000"), true, false),
            ("Dune: House Corrino", BRIAN_KJA, Some("2001"), true, false),
            ("Dune: The Butlerian Jihad", BRIAN_KJA, Some("2002"), true, false),
            ("Dune: The Machine Crusade", BRIAN_KJA, Some("2003"), true, false),
            ("Dune: The Battle of Corrin", BRIAN_KJA, Some("2004"), true, false),
            ("Hunters of Dune", BRIAN_KJA, Some("2006"), true, false),
            ("Sandworms of Dune", BRIAN_KJA, Some("2007"), false, false),
            ("The Road to Dune", NONE, None, false, false),
            ("Foundation", ASIMOV, Some("1951"), true, false),
            ("Foundation and Empire", ASIMOV, Some("1952"), true, false),
            ("Second Foundation", ASIMOV, Some("1953"), false, false),
            ("Frankenstein", SHELLEY, Some("1818"), true, true),
            ("Pride and Prejudice", AUSTEN, Some("1813"), true, true),
            ("The Time Machine", WELLS, Some("1895"), true, true),
            ("War and Peace", TOLSTOY, None, false, true),
        ];

        let volumes = rows
            .iter()
            .map(|(title, authors, date, thumb, free)| {
                let id = Uuid::new_v4();
                Volume {
                    id,
                    volume_info: VolumeInfo {
                        title: title.to_string(),
                        authors: (!authors.is_empty())
                            .then(|| authors.iter().map(|a| a.to_string()).collect()),
                        published_date: date.map(str::to_string),
                        preview_link: format!("http://books.example.com/books?id={id}"),
                        image_links: thumb.then(|| ImageLinks {
                            small_thumbnail: format!("http://books.example.com/content?id={id}&zoom=5"),
                            thumbnail: format!("http://books.example.com/content?id={id}&zoom=1"),
                        }),
                    },
                    sale_info: SaleInfo {
                        saleability: if *free { "FREE" } else { "FOR_SALE" }.to_string(),
                    },
                }
            })
            .collect();
        Self { volumes }
    }

    /// Run a search the way the real endpoint does: all terms must match
    /// title or authors, then filter, order and page.
    pub fn search(&self, params: &SearchParams) -> Result<VolumesResponse, ApiFailure> {
        let q = params
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ApiFailure::bad_request("Missing query."))?;
        let max_results = params.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        if !(1..=MAX_RESULTS_LIMIT).contains(&max_results) {
            return Err(ApiFailure::bad_request("Invalid value at 'max_results'"));
        }
        let newest = match params.order_by.as_deref() {
            None | Some("relevance") => false,
            Some("newest") => true,
            Some(_) => return Err(ApiFailure::bad_request("Invalid value at 'order_by'")),
        };
        let free_only = match params.filter.as_deref() {
            None => false,
            Some("free-ebooks") => true,
            Some(_) => return Err(ApiFailure::bad_request("Invalid value at 'filter'")),
        };

        let terms: Vec<String> = q.split_whitespace().map(str::to_lowercase).collect();
        let mut hits: Vec<&Volume> = self
            .volumes
            .iter()
            .filter(|v| v.matches(&terms))
            .filter(|v| !free_only || v.is_free())
            .collect();
        if newest {
            // Undated volumes sort last.
            hits.sort_by(|a, b| {
                b.volume_info
                    .published_date
                    .cmp(&a.volume_info.published_date)
            });
        }

        let total_items = hits.len();
        let items = hits
            .into_iter()
            .skip(params.start_index.unwrap_or(0) as usize)
            .take(max_results as usize)
            .cloned()
            .collect();

        Ok(VolumesResponse {
            kind: "books#volumes".to_string(),
            total_items,
            items,
        })
    }
}

/// Error body in the catalog's `{"error": {...}}` shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiFailure {
    pub error: ApiFailureBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiFailureBody {
    pub code: u16,
    pub message: String,
}

impl ApiFailure {
    fn bad_request(message: &str) -> Self {
        Self {
            error: ApiFailureBody {
                code: 400,
                message: message.to_string(),
            },
        }
    }
}

/// Every query string the server has answered, in arrival order.
#[derive(Clone, Debug, Default)]
pub struct RequestLog(Arc<RwLock<Vec<SearchParams>>>);

impl RequestLog {
    pub async fn entries(&self) -> Vec<SearchParams> {
        self.0.read().await.clone()
    }

    /// For callers outside the runtime.
    pub fn blocking_entries(&self) -> Vec<SearchParams> {
        self.0.blocking_read().clone()
    }
}

#[derive(Clone)]
struct AppState {
    catalog: Arc<Catalog>,
    log: RequestLog,
}

pub fn app() -> Router {
    app_with(Catalog::sample(), RequestLog::default())
}

pub fn app_with(catalog: Catalog, log: RequestLog) -> Router {
    let state = AppState {
        catalog: Arc::new(catalog),
        log,
    };
    Router::new()
        .route(VOLUMES_PATH, get(search_volumes))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!("serving {VOLUMES_PATH} on {addr}");
    }
    axum::serve(listener, router).await
}

async fn search_volumes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<VolumesResponse>, (StatusCode, Json<ApiFailure>)> {
    debug!(?params, "volumes search");
    state.log.0.write().await.push(params.clone());
    state
        .catalog
        .search(&params)
        .map(Json)
        .map_err(|failure| (StatusCode::BAD_REQUEST, Json(failure)))
}
