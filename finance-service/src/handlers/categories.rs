use crate::dtos::{CategoryResponse, CreateCategoryRequest, RenameCategoryRequest};
use crate::middleware::UserId;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

pub async fn list_categories(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    let categories = state.db.list_categories(&user_id.0).await?;

    Ok(Json(
        categories
            .into_iter()
            .map(CategoryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

pub async fn create_category(
    State(state): State<AppState>,
    user_id: UserId,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let category = state
        .db
        .create_category(&user_id.0, req.name.trim())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse::with_count(category, 0)),
    ))
}

pub async fn rename_category(
    State(state): State<AppState>,
    user_id: UserId,
    Path(category_id): Path<Uuid>,
    Json(req): Json<RenameCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let category = state
        .db
        .rename_category(&user_id.0, category_id, req.name.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Category {} not found", category_id)))?;

    Ok(Json(CategoryResponse::from(category)))
}

/// Transactions filed under the category become uncategorized.
pub async fn delete_category(
    State(state): State<AppState>,
    user_id: UserId,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_category(&user_id.0, category_id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Category {} not found",
            category_id
        )));
    }

    tracing::info!(category_id = %category_id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
