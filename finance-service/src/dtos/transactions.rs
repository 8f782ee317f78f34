use crate::models::TransactionWithCategory;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct TransactionListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl TransactionListParams {
    /// 1-based page and a page size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn resolve(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, page_size)
    }
}

/// `category_id: null` (or an absent field) clears the category.
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    #[serde(default)]
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub date: NaiveDate,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<TransactionWithCategory> for TransactionResponse {
    fn from(tx: TransactionWithCategory) -> Self {
        Self {
            transaction_id: tx.transaction_id,
            account_id: tx.account_id,
            category_id: tx.category_id,
            category_name: tx.category_name,
            date: tx.transaction_date,
            description: tx.description,
            amount: tx.amount,
            created_at: tx.created_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}
