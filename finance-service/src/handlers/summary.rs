use crate::dtos::CategorySpendResponse;
use crate::middleware::UserId;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

/// Expense total per category, for the spending chart.
pub async fn spending_by_category(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    let spend = state.db.spending_by_category(&user_id.0).await?;

    Ok(Json(
        spend
            .into_iter()
            .map(CategorySpendResponse::from)
            .collect::<Vec<_>>(),
    ))
}
