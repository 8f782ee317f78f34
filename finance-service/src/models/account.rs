use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Name of the account statements are filed under until multi-account
/// support exists.
pub const DEFAULT_ACCOUNT_NAME: &str = "Default Account";

pub const DEFAULT_ACCOUNT_TYPE: &str = "checking";

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub account_id: Uuid,
    pub user_id: String,
    pub name: String,
    pub account_type: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}
