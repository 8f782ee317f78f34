//! Database service for finance-service.
//!
//! Every query is scoped by `user_id`; a row owned by another user behaves
//! exactly like a missing row.

use crate::models::{
    Account, BudgetSpend, BudgetWithCategory, Category, CategorySpend, CategoryWithCount,
    ParsedTransaction, TransactionWithCategory, DEFAULT_ACCOUNT_NAME, DEFAULT_ACCOUNT_TYPE,
};
use crate::services::dedup::{drop_existing, prepare_new_transactions};
use crate::services::metrics::{self, DB_QUERY_DURATION};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Rows per INSERT statement; 7 binds per row keeps each statement well
/// under PostgreSQL's 65535 bind-parameter limit.
const INSERT_CHUNK_ROWS: usize = 1000;

const BUDGET_COLUMNS: &str = r#"
    b.budget_id, b.category_id, c.name AS category_name, b.amount, b.start_date, b.end_date,
    b.created_utc, b.updated_utc
"#;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "finance-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Fetch the user's default account, creating it on first use. Concurrent
    /// first calls converge on one row through the `(user_id, name)` unique
    /// constraint.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn find_or_create_default_account(&self, user_id: &str) -> Result<Account, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_or_create_default_account"])
            .start_timer();

        if let Some(account) = self.find_account_by_name(user_id, DEFAULT_ACCOUNT_NAME).await? {
            timer.observe_duration();
            return Ok(account);
        }

        let created = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (account_id, user_id, name, account_type)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, name) DO NOTHING
            RETURNING account_id, user_id, name, account_type, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(DEFAULT_ACCOUNT_NAME)
        .bind(DEFAULT_ACCOUNT_TYPE)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create account: {}", e)))?;

        let account = match created {
            Some(account) => {
                info!(account_id = %account.account_id, "Default account created");
                account
            }
            // Lost the race to a concurrent upload.
            None => self
                .find_account_by_name(user_id, DEFAULT_ACCOUNT_NAME)
                .await?
                .ok_or_else(|| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Default account vanished after conflicting insert"
                    ))
                })?,
        };

        timer.observe_duration();
        Ok(account)
    }

    async fn find_account_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Account>, AppError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, user_id, name, account_type, created_utc, updated_utc
            FROM accounts
            WHERE user_id = $1 AND name = $2
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get account: {}", e)))
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Signatures from `signatures` that the user already has on file.
    #[instrument(skip(self, signatures), fields(user_id = %user_id, candidates = signatures.len()))]
    pub async fn existing_signatures(
        &self,
        user_id: &str,
        signatures: &[String],
    ) -> Result<HashSet<String>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["existing_signatures"])
            .start_timer();

        let existing = sqlx::query_scalar::<_, String>(
            r#"
            SELECT signature
            FROM transactions
            WHERE user_id = $1 AND signature = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(signatures)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to read existing signatures: {}", e))
        })?;

        timer.observe_duration();
        Ok(existing.into_iter().collect())
    }

    /// Fingerprint candidates, drop the ones already stored for the user and
    /// insert the rest in one database transaction. Returns the number of rows
    /// actually inserted; rows that lose a race with a concurrent upload are
    /// skipped by the conflict clause and not counted.
    #[instrument(skip(self, candidates), fields(user_id = %user_id, account_id = %account_id, candidates = candidates.len()))]
    pub async fn save_new_transactions(
        &self,
        user_id: &str,
        account_id: Uuid,
        candidates: &[ParsedTransaction],
    ) -> Result<u64, AppError> {
        if candidates.is_empty() {
            return Ok(0);
        }

        let prepared = prepare_new_transactions(candidates, user_id, account_id);
        let signatures: Vec<String> = prepared.iter().map(|t| t.signature.clone()).collect();
        let existing = self.existing_signatures(user_id, &signatures).await?;
        let fresh = drop_existing(prepared, &existing);

        if fresh.is_empty() {
            info!("All candidates already on file");
            metrics::record_transactions_saved(0, candidates.len() as u64);
            return Ok(0);
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_transactions"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let mut inserted = 0u64;
        for chunk in fresh.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO transactions (transaction_id, user_id, account_id, transaction_date, description, amount, signature) ",
            );
            builder.push_values(chunk, |mut row, candidate| {
                row.push_bind(candidate.transaction_id)
                    .push_bind(&candidate.user_id)
                    .push_bind(candidate.account_id)
                    .push_bind(candidate.transaction_date)
                    .push_bind(&candidate.description)
                    .push_bind(candidate.amount)
                    .push_bind(&candidate.signature);
            });
            builder.push(" ON CONFLICT (user_id, signature) DO NOTHING");

            let result = builder.build().execute(&mut *tx).await.map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert transactions: {}", e))
            })?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();
        metrics::record_transactions_saved(inserted, candidates.len() as u64 - inserted);

        info!(
            inserted = inserted,
            duplicates = candidates.len() as u64 - inserted,
            "Transactions saved"
        );

        Ok(inserted)
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Newest first. Returns the page and the user's total row count.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_transactions(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<TransactionWithCategory>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_transactions"])
            .start_timer();

        let limit = i64::from(page_size);
        let offset = i64::from(page.saturating_sub(1)) * limit;

        let transactions = sqlx::query_as::<_, TransactionWithCategory>(
            r#"
            SELECT t.transaction_id, t.account_id, t.category_id, c.name AS category_name,
                   t.transaction_date, t.description, t.amount, t.created_utc
            FROM transactions t
            LEFT JOIN categories c ON c.category_id = t.category_id
            WHERE t.user_id = $1
            ORDER BY t.transaction_date DESC, t.created_utc DESC, t.transaction_id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list transactions: {}", e)))?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transactions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count transactions: {}", e)))?;

        timer.observe_duration();

        Ok((transactions, total))
    }

    /// File a transaction under a category, or clear it with `None`.
    #[instrument(skip(self), fields(user_id = %user_id, transaction_id = %transaction_id))]
    pub async fn update_transaction_category(
        &self,
        user_id: &str,
        transaction_id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<Option<TransactionWithCategory>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_transaction_category"])
            .start_timer();

        if let Some(category_id) = category_id {
            self.ensure_category_owned(user_id, category_id).await?;
        }

        let transaction = sqlx::query_as::<_, TransactionWithCategory>(
            r#"
            WITH updated AS (
                UPDATE transactions
                SET category_id = $3, updated_utc = NOW()
                WHERE user_id = $1 AND transaction_id = $2
                RETURNING transaction_id, account_id, category_id, transaction_date, description, amount, created_utc
            )
            SELECT u.transaction_id, u.account_id, u.category_id, c.name AS category_name,
                   u.transaction_date, u.description, u.amount, u.created_utc
            FROM updated u
            LEFT JOIN categories c ON c.category_id = u.category_id
            "#,
        )
        .bind(user_id)
        .bind(transaction_id)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update transaction: {}", e)))?;

        timer.observe_duration();

        Ok(transaction)
    }

    // =========================================================================
    // Category Operations
    // =========================================================================

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_categories(&self, user_id: &str) -> Result<Vec<CategoryWithCount>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_categories"])
            .start_timer();

        let categories = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.category_id, c.name, c.is_user_created,
                   COUNT(t.transaction_id) AS transaction_count, c.created_utc
            FROM categories c
            LEFT JOIN transactions t ON t.category_id = c.category_id
            WHERE c.user_id = $1
            GROUP BY c.category_id
            ORDER BY c.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list categories: {}", e)))?;

        timer.observe_duration();

        Ok(categories)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn create_category(&self, user_id: &str, name: &str) -> Result<Category, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_category"])
            .start_timer();

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (category_id, user_id, name, is_user_created)
            VALUES ($1, $2, $3, TRUE)
            RETURNING category_id, user_id, name, is_user_created, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create category: {}", e)))?;

        timer.observe_duration();
        info!(category_id = %category.category_id, "Category created");

        Ok(category)
    }

    #[instrument(skip(self), fields(user_id = %user_id, category_id = %category_id))]
    pub async fn rename_category(
        &self,
        user_id: &str,
        category_id: Uuid,
        name: &str,
    ) -> Result<Option<CategoryWithCount>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["rename_category"])
            .start_timer();

        let category = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            WITH c AS (
                UPDATE categories
                SET name = $3, updated_utc = NOW()
                WHERE user_id = $1 AND category_id = $2
                RETURNING category_id, name, is_user_created, created_utc
            )
            SELECT c.category_id, c.name, c.is_user_created,
                   (SELECT COUNT(*) FROM transactions t WHERE t.category_id = c.category_id) AS transaction_count,
                   c.created_utc
            FROM c
            "#,
        )
        .bind(user_id)
        .bind(category_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to rename category: {}", e)))?;

        timer.observe_duration();

        Ok(category)
    }

    /// Transactions filed under the category become uncategorized; budgets
    /// on it are removed with it.
    #[instrument(skip(self), fields(user_id = %user_id, category_id = %category_id))]
    pub async fn delete_category(&self, user_id: &str, category_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_category"])
            .start_timer();

        let result = sqlx::query("DELETE FROM categories WHERE user_id = $1 AND category_id = $2")
            .bind(user_id)
            .bind(category_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete category: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    async fn ensure_category_owned(&self, user_id: &str, category_id: Uuid) -> Result<(), AppError> {
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM categories WHERE user_id = $1 AND category_id = $2)",
        )
        .bind(user_id)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check category: {}", e)))?;

        if owned {
            Ok(())
        } else {
            Err(AppError::NotFound(anyhow::anyhow!(
                "Category {} not found",
                category_id
            )))
        }
    }

    // =========================================================================
    // Budget Operations
    // =========================================================================

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_budgets(&self, user_id: &str) -> Result<Vec<BudgetWithCategory>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_budgets"])
            .start_timer();

        let budgets = sqlx::query_as::<_, BudgetWithCategory>(&format!(
            r#"
            SELECT {BUDGET_COLUMNS}
            FROM budgets b
            JOIN categories c ON c.category_id = b.category_id
            WHERE b.user_id = $1
            ORDER BY b.end_date DESC, b.created_utc DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list budgets: {}", e)))?;

        timer.observe_duration();

        Ok(budgets)
    }

    #[instrument(skip(self), fields(user_id = %user_id, budget_id = %budget_id))]
    pub async fn get_budget(
        &self,
        user_id: &str,
        budget_id: Uuid,
    ) -> Result<Option<BudgetWithCategory>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_budget"])
            .start_timer();

        let budget = sqlx::query_as::<_, BudgetWithCategory>(&format!(
            r#"
            SELECT {BUDGET_COLUMNS}
            FROM budgets b
            JOIN categories c ON c.category_id = b.category_id
            WHERE b.user_id = $1 AND b.budget_id = $2
            "#
        ))
        .bind(user_id)
        .bind(budget_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get budget: {}", e)))?;

        timer.observe_duration();

        Ok(budget)
    }

    #[instrument(skip(self), fields(user_id = %user_id, category_id = %category_id))]
    pub async fn create_budget(
        &self,
        user_id: &str,
        category_id: Uuid,
        amount: Decimal,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<BudgetWithCategory, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_budget"])
            .start_timer();

        self.ensure_category_owned(user_id, category_id).await?;

        let budget = sqlx::query_as::<_, BudgetWithCategory>(&format!(
            r#"
            WITH b AS (
                INSERT INTO budgets (budget_id, user_id, category_id, amount, start_date, end_date)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT {BUDGET_COLUMNS}
            FROM b
            JOIN categories c ON c.category_id = b.category_id
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(category_id)
        .bind(amount)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create budget: {}", e)))?;

        timer.observe_duration();
        info!(budget_id = %budget.budget_id, "Budget created");

        Ok(budget)
    }

    /// Overwrite a budget's fields. Callers merge partial updates first.
    #[instrument(skip(self), fields(user_id = %user_id, budget_id = %budget_id))]
    pub async fn update_budget(
        &self,
        user_id: &str,
        budget_id: Uuid,
        category_id: Uuid,
        amount: Decimal,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Option<BudgetWithCategory>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_budget"])
            .start_timer();

        self.ensure_category_owned(user_id, category_id).await?;

        let budget = sqlx::query_as::<_, BudgetWithCategory>(&format!(
            r#"
            WITH b AS (
                UPDATE budgets
                SET category_id = $3, amount = $4, start_date = $5, end_date = $6, updated_utc = NOW()
                WHERE user_id = $1 AND budget_id = $2
                RETURNING *
            )
            SELECT {BUDGET_COLUMNS}
            FROM b
            JOIN categories c ON c.category_id = b.category_id
            "#
        ))
        .bind(user_id)
        .bind(budget_id)
        .bind(category_id)
        .bind(amount)
        .bind(start_date)
        .bind(end_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update budget: {}", e)))?;

        timer.observe_duration();

        Ok(budget)
    }

    #[instrument(skip(self), fields(user_id = %user_id, budget_id = %budget_id))]
    pub async fn delete_budget(&self, user_id: &str, budget_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_budget"])
            .start_timer();

        let result = sqlx::query("DELETE FROM budgets WHERE user_id = $1 AND budget_id = $2")
            .bind(user_id)
            .bind(budget_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete budget: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    /// Each budget with the expenses filed under its category between its
    /// start and end dates (inclusive, UTC calendar days).
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn budget_spend(&self, user_id: &str) -> Result<Vec<BudgetSpend>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["budget_spend"])
            .start_timer();

        let budgets = sqlx::query_as::<_, BudgetSpend>(
            r#"
            SELECT b.budget_id, b.category_id, c.name AS category_name, b.amount,
                   b.start_date, b.end_date,
                   COALESCE(-SUM(t.amount), 0) AS total_spent
            FROM budgets b
            JOIN categories c ON c.category_id = b.category_id
            LEFT JOIN transactions t
                ON t.user_id = b.user_id
               AND t.category_id = b.category_id
               AND t.amount < 0
               AND t.transaction_date >= (b.start_date AT TIME ZONE 'UTC')::date
               AND t.transaction_date <= (b.end_date AT TIME ZONE 'UTC')::date
            WHERE b.user_id = $1
            GROUP BY b.budget_id, c.name
            ORDER BY b.end_date DESC, b.created_utc DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to compute budget spend: {}", e)))?;

        timer.observe_duration();

        Ok(budgets)
    }

    // =========================================================================
    // Summaries
    // =========================================================================

    /// Expense totals per category, largest first. Uncategorized expenses and
    /// income are excluded.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn spending_by_category(&self, user_id: &str) -> Result<Vec<CategorySpend>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["spending_by_category"])
            .start_timer();

        let spend = sqlx::query_as::<_, CategorySpend>(
            r#"
            SELECT c.name, -SUM(t.amount) AS value
            FROM transactions t
            JOIN categories c ON c.category_id = t.category_id
            WHERE t.user_id = $1 AND t.amount < 0
            GROUP BY c.category_id, c.name
            ORDER BY value DESC, c.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute spending by category: {}", e))
        })?;

        timer.observe_duration();

        Ok(spend)
    }
}
