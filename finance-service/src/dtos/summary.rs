use crate::models::CategorySpend;
use rust_decimal::Decimal;
use serde::Serialize;

/// One slice of the spending chart.
#[derive(Debug, Serialize)]
pub struct CategorySpendResponse {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

impl From<CategorySpend> for CategorySpendResponse {
    fn from(spend: CategorySpend) -> Self {
        Self {
            name: spend.name,
            value: spend.value,
        }
    }
}
