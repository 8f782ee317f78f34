use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct BudgetWithCategory {
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// A budget with the total expense recorded against its category inside the
/// budget period. `total_spent` is positive.
#[derive(Debug, Clone, FromRow)]
pub struct BudgetSpend {
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_spent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    OnTrack,
    Warning,
    Over,
}

impl BudgetSpend {
    /// Fraction of the budget used, capped at 1.
    pub fn progress(&self) -> Decimal {
        if self.amount <= Decimal::ZERO {
            return Decimal::ONE;
        }
        (self.total_spent / self.amount).min(Decimal::ONE)
    }

    pub fn status(&self) -> BudgetStatus {
        let progress = self.progress();
        if progress > Decimal::new(9, 1) {
            BudgetStatus::Over
        } else if progress > Decimal::new(7, 1) {
            BudgetStatus::Warning
        } else {
            BudgetStatus::OnTrack
        }
    }
}
