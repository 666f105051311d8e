use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use nw_archive::{ArchiveMeta, ArchiveQuery, ArchivedArticle, SortOrder};
use nw_core::{CanonicalArticle, Error};

use crate::AppState;

const MAX_PAGE_SIZE: i64 = 200;
const DEFAULT_LIMIT: i64 = 50;

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NoResults => StatusCode::NOT_FOUND,
            Error::Upstream(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct NewsParams {
    term: String,
    advanced: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    query: String,
    #[serde(rename = "totalResults")]
    total_results: usize,
    articles: Vec<CanonicalArticle>,
}

pub async fn get_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsParams>,
) -> Result<Json<NewsResponse>, ApiError> {
    let query = params
        .advanced
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(params.term);
    let language = params.language.filter(|s| !s.trim().is_empty());

    let aggregate = state
        .aggregator
        .aggregate(&query, language.as_deref())
        .await?;
    for report in &aggregate.reports {
        info!(
            provider = report.provider,
            status = ?report.status,
            count = report.count,
            "provider outcome"
        );
    }
    if aggregate.articles.is_empty() {
        return Err(Error::NoResults.into());
    }

    // archiving is best-effort relative to the response
    match state
        .archive
        .upsert_all(&query, language.as_deref(), &aggregate.articles)
        .await
    {
        Ok(inserted) => info!(query = %query, inserted, "archived aggregate"),
        Err(e) => warn!(query = %query, error = %e, "failed to archive aggregate"),
    }

    Ok(Json(NewsResponse {
        total_results: aggregate.articles.len(),
        articles: aggregate.articles,
        query,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ArchiveParams {
    term: Option<String>,
    source: Option<String>,
    category: Option<String>,
    #[serde(default)]
    order: SortOrder,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ArchiveResponse {
    total: i64,
    articles: Vec<ArchivedArticle>,
}

pub async fn get_archive(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ArchiveParams>,
) -> Result<Json<ArchiveResponse>, ApiError> {
    let query = ArchiveQuery {
        term: params.term.filter(|s| !s.trim().is_empty()),
        source: params.source.filter(|s| !s.trim().is_empty()),
        category: params.category.filter(|s| !s.trim().is_empty()),
        order: params.order,
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_PAGE_SIZE),
        offset: params.offset.unwrap_or(0).max(0),
    };
    let (total, articles) = state.archive.query(&query).await?;
    Ok(Json(ArchiveResponse { total, articles }))
}

#[derive(Debug, Deserialize)]
pub struct MetaParams {
    limit: Option<i64>,
}

pub async fn get_archive_meta(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MetaParams>,
) -> Result<Json<ArchiveMeta>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_PAGE_SIZE);
    Ok(Json(state.archive.facets(limit).await?))
}
