use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};

use argus_core::compiler::DefinitionPayload;
use argus_core::session::SessionProvider;

use crate::dto::{
    DocumentListResponse, DocumentResponse, ErrorResponse, HealthResponse,
    RegisterScraperResponse, ScraperListResponse, ScraperSummary, WriteDocumentRequest,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router<P: SessionProvider + 'static>(state: Arc<AppState<P>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/listings", get(all_listings::<P>))
        .route("/v1/listings/{slug}", get(source_listings::<P>))
        .route("/v1/scrapers", get(list_scrapers::<P>))
        .route("/v1/scrapers", post(register_scraper::<P>))
        .route("/v1/journal", get(list_journal::<P>))
        .route("/v1/journal/stats", get(journal_stats::<P>))
        .route("/v1/journal/report", get(journal_report::<P>))
        .route("/v1/journal/{doc}", get(read_document::<P>))
        .route("/v1/journal/{doc}", put(write_document::<P>))
        .route("/v1/journal/{doc}/append", post(append_document::<P>))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health() -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Scrape every registered source. Broken sources contribute nothing,
/// so the response is always a 200 with whatever was reachable.
pub async fn all_listings<P: SessionProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
) -> impl IntoResponse {
    let records = state.coordinator.run_all(state.registry.snapshot()).await;
    axum::Json(records)
}

pub async fn source_listings<P: SessionProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(definition) = state.registry.get(&slug) else {
        return Ok(not_found(format!("no scraper registered under `{slug}`")));
    };
    let records = state.coordinator.run_one(&definition).await;
    Ok(axum::Json(records).into_response())
}

// ---------------------------------------------------------------------------
// Scrapers
// ---------------------------------------------------------------------------

pub async fn list_scrapers<P: SessionProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
) -> impl IntoResponse {
    let scrapers: Vec<ScraperSummary> = state
        .registry
        .snapshot()
        .iter()
        .map(ScraperSummary::from)
        .collect();
    axum::Json(ScraperListResponse { scrapers })
}

pub async fn register_scraper<P: SessionProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    axum::Json(body): axum::Json<DefinitionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let definition = state.compiler.compile(body)?;
    let slug = definition.slug();
    let response = RegisterScraperResponse {
        name: definition.name,
        endpoint: format!("/v1/listings/{slug}"),
        slug,
    };
    Ok((StatusCode::CREATED, axum::Json(response)))
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

pub async fn list_journal<P: SessionProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.journal.list_documents()?;
    Ok(axum::Json(DocumentListResponse { documents }))
}

pub async fn journal_stats<P: SessionProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(axum::Json(state.journal.scraper_stats()?))
}

pub async fn journal_report<P: SessionProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(axum::Json(state.journal.status_report()?))
}

pub async fn read_document<P: SessionProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    Path(doc): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.journal.document_exists(&doc) {
        return Ok(not_found(format!("document `{doc}` not found")));
    }
    let content = state.journal.read_document(&doc)?;
    Ok(axum::Json(DocumentResponse { content }).into_response())
}

pub async fn write_document<P: SessionProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    Path(doc): Path<String>,
    axum::Json(body): axum::Json<WriteDocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.journal.write_document(&doc, &body.content)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn append_document<P: SessionProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    Path(doc): Path<String>,
    axum::Json(body): axum::Json<WriteDocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.journal.append_document(&doc, &body.content)?;
    Ok(StatusCode::NO_CONTENT)
}

fn not_found(message: String) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(ErrorResponse {
            error: "not_found".to_string(),
            message,
        }),
    )
        .into_response()
}
