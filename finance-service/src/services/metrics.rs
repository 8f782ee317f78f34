//! Prometheus metrics for finance-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Counter for HTTP requests by method, matched route and status.
pub static HTTP_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS")
});

/// Histogram for HTTP request duration by method and matched route.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finance_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION")
});

/// Histogram for database query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finance_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for statement uploads by outcome.
pub static STATEMENT_UPLOADS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_statement_uploads_total",
        "Total number of statement uploads",
        &["format", "status"]
    )
    .expect("Failed to register STATEMENT_UPLOADS")
});

/// Counter for extracted transactions, inserted or skipped as duplicates.
pub static TRANSACTIONS_PROCESSED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_transactions_processed_total",
        "Total number of extracted transactions by outcome",
        &["outcome"]
    )
    .expect("Failed to register TRANSACTIONS_PROCESSED")
});

/// Histogram for language-model extraction latency.
pub static AI_EXTRACTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finance_ai_extraction_duration_seconds",
        "AI transaction extraction latency in seconds",
        &["model", "status"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("Failed to register AI_EXTRACTION_DURATION")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&STATEMENT_UPLOADS);
    Lazy::force(&TRANSACTIONS_PROCESSED);
    Lazy::force(&AI_EXTRACTION_DURATION);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record a completed HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Record a statement upload.
pub fn record_statement_upload(format: &str, status: &str) {
    STATEMENT_UPLOADS.with_label_values(&[format, status]).inc();
}

/// Record the result of a save: rows inserted and candidates skipped as duplicates.
pub fn record_transactions_saved(inserted: u64, skipped: u64) {
    TRANSACTIONS_PROCESSED
        .with_label_values(&["inserted"])
        .inc_by(inserted as f64);
    TRANSACTIONS_PROCESSED
        .with_label_values(&["duplicate"])
        .inc_by(skipped as f64);
}

/// Record one language-model extraction call.
pub fn record_ai_extraction(model: &str, status: &str, duration_secs: f64) {
    AI_EXTRACTION_DURATION
        .with_label_values(&[model, status])
        .observe(duration_secs);
}

/// Record an error.
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
