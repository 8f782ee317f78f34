//! Application startup and lifecycle management.

use crate::config::FinanceConfig;
use crate::handlers::{
    create_budget, create_category, delete_budget, delete_category, get_budget_summary,
    health_check, list_budgets, list_categories, list_transactions, metrics_handler,
    readiness_check, rename_category, spending_by_category, update_budget, update_transaction,
    upload_statement,
};
use crate::middleware::http_metrics_middleware;
use crate::services::{
    init_metrics, CompletionProvider, Database, OpenRouterProvider, StatementIngestor,
    TransactionExtractor,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, security_headers_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: FinanceConfig,
    pub db: Arc<Database>,
    pub ingestor: StatementIngestor,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: FinanceConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: FinanceConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: FinanceConfig, run_migrations: bool) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let db = Arc::new(db);

        let provider: Arc<dyn CompletionProvider> =
            Arc::new(OpenRouterProvider::new(&config.ai).map_err(|e| {
                tracing::error!(error = %e, "Failed to create AI provider");
                AppError::ConfigError(anyhow::anyhow!("AI provider: {}", e))
            })?);

        tracing::info!(
            model = provider.model(),
            api_url = %config.ai.api_url,
            "AI provider configured"
        );

        let ingestor = StatementIngestor::new(db.clone(), TransactionExtractor::new(provider));

        let state = AppState {
            config: config.clone(),
            db,
            ingestor,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Finance service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = router(self.state);

        tracing::info!(
            service = "finance-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

/// All HTTP routes with the shared middleware stack.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.upload.max_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/transactions", get(list_transactions))
        .route("/transactions/upload", post(upload_statement))
        .route("/transactions/:id", patch(update_transaction))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            patch(rename_category).delete(delete_category),
        )
        .route("/budgets", get(list_budgets).post(create_budget))
        .route("/budgets/summary", get(get_budget_summary))
        .route("/budgets/:id", patch(update_budget).delete(delete_budget))
        .route("/summary/spending-by-category", get(spending_by_category))
        .route_layer(middleware::from_fn(http_metrics_middleware))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
