use crate::dtos::{BudgetResponse, BudgetSummaryResponse, CreateBudgetRequest, UpdateBudgetRequest};
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

pub async fn list_budgets(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    let budgets = state.db.list_budgets(&user_id.0).await?;

    Ok(Json(
        budgets.into_iter().map(BudgetResponse::from).collect::<Vec<_>>(),
    ))
}

pub async fn create_budget(
    State(state): State<AppState>,
    user_id: UserId,
    Json(req): Json<CreateBudgetRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let budget = state
        .db
        .create_budget(
            &user_id.0,
            req.category_id,
            req.amount,
            req.start_date,
            req.end_date,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(BudgetResponse::from(budget))))
}

/// Partial update: fields left out of the body keep their stored values.
/// The merged period must still end on or after its start.
pub async fn update_budget(
    State(state): State<AppState>,
    user_id: UserId,
    Path(budget_id): Path<Uuid>,
    Json(req): Json<UpdateBudgetRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let not_found = || AppError::NotFound(anyhow::anyhow!("Budget {} not found", budget_id));

    let current = state
        .db
        .get_budget(&user_id.0, budget_id)
        .await?
        .ok_or_else(not_found)?;

    let start_date = req.start_date.unwrap_or(current.start_date);
    let end_date = req.end_date.unwrap_or(current.end_date);
    if end_date < start_date {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "end_date must not be before start_date"
        )));
    }

    let budget = state
        .db
        .update_budget(
            &user_id.0,
            budget_id,
            req.category_id.unwrap_or(current.category_id),
            req.amount.unwrap_or(current.amount),
            start_date,
            end_date,
        )
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(BudgetResponse::from(budget)))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    user_id: UserId,
    Path(budget_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_budget(&user_id.0, budget_id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Budget {} not found",
            budget_id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Spend against every budget, with progress and status.
pub async fn get_budget_summary(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    let budgets = state.db.budget_spend(&user_id.0).await?;

    Ok(Json(
        budgets
            .into_iter()
            .map(BudgetSummaryResponse::from)
            .collect::<Vec<_>>(),
    ))
}
