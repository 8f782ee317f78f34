pub mod budgets;
pub mod categories;
pub mod summary;
pub mod transactions;
pub mod upload;

pub use budgets::{BudgetResponse, BudgetSummaryResponse, CreateBudgetRequest, UpdateBudgetRequest};
pub use categories::{CategoryResponse, CreateCategoryRequest, RenameCategoryRequest};
pub use summary::CategorySpendResponse;
pub use transactions::{
    TransactionListParams, TransactionListResponse, TransactionResponse, UpdateTransactionRequest,
};
pub use upload::UploadResponse;

use validator::ValidationError;

/// Reject names that are empty once surrounding whitespace is removed.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
