//! Services module for finance-service.

pub mod database;
pub mod dedup;
pub mod error;
pub mod extraction;
pub mod file_parser;
pub mod ingest;
pub mod metrics;
pub mod providers;

pub use database::Database;
pub use error::IngestError;
pub use extraction::TransactionExtractor;
pub use file_parser::StatementFormat;
pub use ingest::{IngestOutcome, StatementIngestor};
pub use metrics::{get_metrics, init_metrics};
pub use providers::{CompletionProvider, OpenRouterProvider};
