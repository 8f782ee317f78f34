pub mod budgets;
pub mod categories;
pub mod health;
pub mod summary;
pub mod transactions;
pub mod upload;

pub use budgets::{create_budget, delete_budget, get_budget_summary, list_budgets, update_budget};
pub use categories::{create_category, delete_category, list_categories, rename_category};
pub use health::{health_check, metrics_handler, readiness_check};
pub use summary::spending_by_category;
pub use transactions::{list_transactions, update_transaction};
pub use upload::upload_statement;
