use crate::dtos::{
    TransactionListParams, TransactionListResponse, TransactionResponse, UpdateTransactionRequest,
};
use crate::middleware::UserId;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn list_transactions(
    State(state): State<AppState>,
    user_id: UserId,
    Query(params): Query<TransactionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (page, page_size) = params.resolve();

    let (transactions, total) = state
        .db
        .list_transactions(&user_id.0, page, page_size)
        .await?;

    let total_pages = (total.max(0) as u64).div_ceil(u64::from(page_size));

    Ok(Json(TransactionListResponse {
        transactions: transactions.into_iter().map(TransactionResponse::from).collect(),
        total,
        page,
        page_size,
        total_pages,
    }))
}

/// Re-file a transaction under one of the caller's categories.
pub async fn update_transaction(
    State(state): State<AppState>,
    user_id: UserId,
    Path(transaction_id): Path<Uuid>,
    Json(req): Json<UpdateTransactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let transaction = state
        .db
        .update_transaction_category(&user_id.0, transaction_id, req.category_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Transaction {} not found", transaction_id))
        })?;

    Ok(Json(TransactionResponse::from(transaction)))
}
