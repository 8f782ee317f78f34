use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub category_id: Uuid,
    pub user_id: String,
    pub name: String,
    pub is_user_created: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Category row joined with how many transactions are filed under it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryWithCount {
    pub category_id: Uuid,
    pub name: String,
    pub is_user_created: bool,
    pub transaction_count: i64,
    pub created_utc: DateTime<Utc>,
}

/// Total expense filed under one category; `value` is positive.
#[derive(Debug, Clone, FromRow)]
pub struct CategorySpend {
    pub name: String,
    pub value: Decimal,
}
