use crate::models::{BudgetSpend, BudgetStatus, BudgetWithCategory};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_create_period", skip_on_field_errors = false))]
pub struct CreateBudgetRequest {
    pub category_id: Uuid,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBudgetRequest {
    pub category_id: Option<Uuid>,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        let mut err = ValidationError::new("positive");
        err.message = Some("Amount must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

fn validate_create_period(req: &CreateBudgetRequest) -> Result<(), ValidationError> {
    validate_period(req.start_date, req.end_date)
}

fn validate_period(
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if end_date < start_date {
        let mut err = ValidationError::new("period");
        err.message = Some("end_date must not be before start_date".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BudgetWithCategory> for BudgetResponse {
    fn from(budget: BudgetWithCategory) -> Self {
        Self {
            budget_id: budget.budget_id,
            category_id: budget.category_id,
            category_name: budget.category_name,
            amount: budget.amount,
            start_date: budget.start_date,
            end_date: budget.end_date,
            created_at: budget.created_utc,
            updated_at: budget.updated_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BudgetSummaryResponse {
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_spent: Decimal,
    /// Fraction of the budget used, between 0 and 1.
    #[serde(with = "rust_decimal::serde::float")]
    pub progress: Decimal,
    pub status: BudgetStatus,
}

impl From<BudgetSpend> for BudgetSummaryResponse {
    fn from(spend: BudgetSpend) -> Self {
        let progress = spend.progress().round_dp(4);
        let status = spend.status();
        Self {
            budget_id: spend.budget_id,
            category_id: spend.category_id,
            category_name: spend.category_name,
            amount: spend.amount,
            start_date: spend.start_date,
            end_date: spend.end_date,
            total_spent: spend.total_spent,
            progress,
            status,
        }
    }
}
