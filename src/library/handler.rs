//! HTTP handlers for books and histories

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};

use super::{BookStore, HistoryStore};
use crate::api::{ItemResponse, PageResponse};
use crate::error::ApiError;
use crate::handler::AppState;
use crate::model::{Book, BookInput, History, HistoryInput};
use crate::pagination::{PageParams, PageRequest};

type ItemResult<T> = Result<Json<ItemResponse<T>>, ApiError>;
type PageResult<T> = Result<Json<PageResponse<T>>, ApiError>;

// ============================================================================
// Extraction
// ============================================================================

fn page_request(query: Result<Query<PageParams>, QueryRejection>) -> Result<PageRequest, ApiError> {
    let Query(params) = query.map_err(|e| {
        tracing::info!(error = %e, "rejected pagination query");
        ApiError::BadRequest
    })?;
    Ok(PageRequest::try_from(params)?)
}

// non-integer ids never match a resource
fn resource_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|_| ApiError::NotFound)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|e| {
        tracing::warn!(error = %e, "rejected request body");
        ApiError::Unprocessable
    })
}

// ============================================================================
// Book Handlers
// ============================================================================

pub async fn list_books(
    State(state): State<AppState>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> PageResult<Book> {
    let request = page_request(query)?;
    let session = state.db.session().await;
    let page = BookStore::new(session.connection()).list(request).await?;

    tracing::info!(page = request.page(), total = page.total_items, "listed books");
    Ok(Json(page.into()))
}

pub async fn get_book(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ItemResult<Book> {
    let id = resource_id(path)?;
    let session = state.db.session().await;

    match BookStore::new(session.connection()).get(id).await? {
        Some(book) => Ok(Json(ItemResponse::new(book))),
        None => Err(ApiError::NotFound),
    }
}

pub async fn create_book(
    State(state): State<AppState>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> ItemResult<Book> {
    let input = body(payload)?;
    let session = state.db.session().await;

    let book = BookStore::new(session.connection())
        .create(input)
        .await
        .map_err(ApiError::from_mutation)?;

    tracing::info!(id = book.summary.id, "created book");
    Ok(Json(ItemResponse::new(book)))
}

pub async fn update_book(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> ItemResult<Book> {
    let id = resource_id(path)?;
    let input = body(payload)?;
    let session = state.db.session().await;

    match BookStore::new(session.connection())
        .update(id, input)
        .await
        .map_err(ApiError::from_mutation)?
    {
        Some(book) => {
            tracing::info!(id, "updated book");
            Ok(Json(ItemResponse::new(book)))
        }
        None => Err(ApiError::NotFound),
    }
}

pub async fn delete_book(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ItemResult<Book> {
    let id = resource_id(path)?;
    let session = state.db.session().await;

    match BookStore::new(session.connection())
        .delete(id)
        .await
        .map_err(ApiError::from_mutation)?
    {
        Some(book) => {
            tracing::info!(id, "deleted book");
            Ok(Json(ItemResponse::new(book)))
        }
        None => Err(ApiError::NotFound),
    }
}

// ============================================================================
// History Handlers
// ============================================================================

pub async fn list_histories(
    State(state): State<AppState>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> PageResult<History> {
    let request = page_request(query)?;
    let session = state.db.session().await;
    let page = HistoryStore::new(session.connection()).list(request).await?;

    tracing::info!(page = request.page(), total = page.total_items, "listed histories");
    Ok(Json(page.into()))
}

pub async fn get_history(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ItemResult<History> {
    let id = resource_id(path)?;
    let session = state.db.session().await;

    match HistoryStore::new(session.connection()).get(id).await? {
        Some(history) => Ok(Json(ItemResponse::new(history))),
        None => Err(ApiError::NotFound),
    }
}

pub async fn create_history(
    State(state): State<AppState>,
    payload: Result<Json<HistoryInput>, JsonRejection>,
) -> ItemResult<History> {
    let input = body(payload)?;
    let session = state.db.session().await;

    let history = HistoryStore::new(session.connection())
        .create(input)
        .await
        .map_err(ApiError::from_mutation)?;

    tracing::info!(id = history.summary.id, "created history");
    Ok(Json(ItemResponse::new(history)))
}

pub async fn update_history(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<HistoryInput>, JsonRejection>,
) -> ItemResult<History> {
    let id = resource_id(path)?;
    let input = body(payload)?;
    let session = state.db.session().await;

    match HistoryStore::new(session.connection())
        .update(id, input)
        .await
        .map_err(ApiError::from_mutation)?
    {
        Some(history) => {
            tracing::info!(id, "updated history");
            Ok(Json(ItemResponse::new(history)))
        }
        None => Err(ApiError::NotFound),
    }
}

pub async fn delete_history(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ItemResult<History> {
    let id = resource_id(path)?;
    let session = state.db.session().await;

    match HistoryStore::new(session.connection())
        .delete(id)
        .await
        .map_err(ApiError::from_mutation)?
    {
        Some(history) => {
            tracing::info!(id, "deleted history");
            Ok(Json(ItemResponse::new(history)))
        }
        None => Err(ApiError::NotFound),
    }
}
