//! Statement ingestion: file → text → candidates → default account → new rows.
//!
//! Steps run strictly in order and the first failure aborts the upload.
//! Nothing is written before the final step, which commits atomically.

use crate::services::database::Database;
use crate::services::error::IngestError;
use crate::services::extraction::TransactionExtractor;
use crate::services::file_parser::{parse_statement, StatementFormat};
use crate::services::metrics;
use bytes::Bytes;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub format: StatementFormat,
    /// Candidates the model returned after validation.
    pub extracted: usize,
    /// Rows actually inserted.
    pub inserted: u64,
}

#[derive(Clone)]
pub struct StatementIngestor {
    db: Arc<Database>,
    extractor: TransactionExtractor,
}

impl StatementIngestor {
    pub fn new(db: Arc<Database>, extractor: TransactionExtractor) -> Self {
        Self { db, extractor }
    }

    #[instrument(skip(self, data), fields(user_id = %user_id, mime_type = %mime_type, size = data.len()))]
    pub async fn ingest(
        &self,
        user_id: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<IngestOutcome, IngestError> {
        let format = match StatementFormat::from_mime(mime_type) {
            Ok(format) => format,
            Err(e) => {
                record_failure("unknown", &e);
                return Err(e);
            }
        };

        match self.run(user_id, format, data).await {
            Ok(outcome) => {
                metrics::record_statement_upload(format.as_str(), "success");
                info!(
                    format = format.as_str(),
                    extracted = outcome.extracted,
                    inserted = outcome.inserted,
                    "Statement ingested"
                );
                Ok(outcome)
            }
            Err(e) => {
                record_failure(format.as_str(), &e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        user_id: &str,
        format: StatementFormat,
        data: Bytes,
    ) -> Result<IngestOutcome, IngestError> {
        let text = parse_statement(format, data).await?;
        let candidates = self.extractor.extract(&text).await?;

        let account = self
            .db
            .find_or_create_default_account(user_id)
            .await
            .map_err(persistence_failure)?;

        let inserted = self
            .db
            .save_new_transactions(user_id, account.account_id, &candidates)
            .await
            .map_err(persistence_failure)?;

        Ok(IngestOutcome {
            format,
            extracted: candidates.len(),
            inserted,
        })
    }
}

fn record_failure(format: &str, err: &IngestError) {
    metrics::record_statement_upload(format, err.kind());
    metrics::record_error(err.kind());
    tracing::warn!(error = %err, kind = err.kind(), "Statement ingestion failed");
}

/// Database detail stays in the logs; the caller gets a generic reason.
fn persistence_failure(err: AppError) -> IngestError {
    tracing::error!(error = %err, "Persisting statement failed");
    IngestError::PersistenceFailure("the database rejected the statement".to_string())
}
