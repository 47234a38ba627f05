//! Page content routes
//!
//! - GET  /:name/pages/:page          cached content (`?extract=true` fills a miss first)
//! - PUT  /:name/pages/:page          save an edit
//! - POST /:name/pages/:page/extract  force re-extraction
//! - POST /:name/extract              extract the next batch (`?page=N` hint)

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{document_name, path_params};
use crate::content::{PageContent, PageStatus};
use crate::error::{AppError, Result};
use crate::extract::BatchProgress;
use crate::state::AppState;

/// Create the pages router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:name/pages/:page", get(get_page).put(save_page))
        .route("/:name/pages/:page/extract", post(force_extract))
        .route("/:name/extract", post(ensure))
}

#[derive(Debug, Default, Deserialize)]
pub struct GetPageQuery {
    /// Run a batch extraction on a miss before answering
    #[serde(default)]
    pub extract: bool,
}

#[derive(Debug, Deserialize)]
pub struct SavePageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SavePageResponse {
    pub page: usize,
    pub saved: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnsureQuery {
    /// Page the user is looking at (default: 1)
    pub page: Option<usize>,
}

async fn get_page(
    State(state): State<AppState>,
    path: std::result::Result<Path<(String, usize)>, PathRejection>,
    Query(query): Query<GetPageQuery>,
) -> Result<Json<PageContent>> {
    let (name, page) = path_params(path)?;
    let name = document_name(&name)?;
    let content = state.content();

    let cached = content.get_page(&name, page).await?;
    if cached.status == PageStatus::Found || !query.extract {
        return Ok(Json(cached));
    }

    content.ensure(&name, page).await?;
    Ok(Json(content.get_page(&name, page).await?))
}

async fn save_page(
    State(state): State<AppState>,
    path: std::result::Result<Path<(String, usize)>, PathRejection>,
    payload: std::result::Result<Json<SavePageRequest>, JsonRejection>,
) -> Result<Json<SavePageResponse>> {
    let Json(request) = payload.map_err(|e| AppError::InvalidPayload(e.body_text()))?;
    let (name, page) = path_params(path)?;
    let name = document_name(&name)?;

    state
        .content()
        .save_page(&name, page, &request.content)
        .await?;

    Ok(Json(SavePageResponse { page, saved: true }))
}

async fn force_extract(
    State(state): State<AppState>,
    path: std::result::Result<Path<(String, usize)>, PathRejection>,
) -> Result<Json<PageContent>> {
    let (name, page) = path_params(path)?;
    let name = document_name(&name)?;
    let content = state.content().force_extract(&name, page).await?;

    Ok(Json(PageContent {
        page,
        content,
        status: PageStatus::Found,
    }))
}

async fn ensure(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
    Query(query): Query<EnsureQuery>,
) -> Result<Json<BatchProgress>> {
    let name = document_name(&path_params(path)?)?;
    let progress = state
        .content()
        .ensure(&name, query.page.unwrap_or(1))
        .await?;
    Ok(Json(progress))
}
