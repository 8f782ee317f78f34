//! Domain models for finance-service.

pub mod account;
pub mod budget;
pub mod category;
pub mod transaction;

pub use account::{Account, DEFAULT_ACCOUNT_NAME, DEFAULT_ACCOUNT_TYPE};
pub use budget::{BudgetSpend, BudgetStatus, BudgetWithCategory};
pub use category::{Category, CategorySpend, CategoryWithCount};
pub use transaction::{NewTransaction, ParsedTransaction, TransactionWithCategory};
