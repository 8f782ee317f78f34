use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A transaction as read off a statement by the extraction step, before it
/// is fingerprinted and persisted. Negative amounts are expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

/// A fingerprinted candidate ready for insertion.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub transaction_id: Uuid,
    pub user_id: String,
    pub account_id: Uuid,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub signature: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TransactionWithCategory {
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub created_utc: DateTime<Utc>,
}
