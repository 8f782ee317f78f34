//! Common test utilities for finance-service integration tests.
//!
//! Requires a PostgreSQL database in `TEST_DATABASE_URL`. The AI endpoint is
//! replaced by a `wiremock` server per test app.

use finance_service::config::{AiConfig, DatabaseConfig, FinanceConfig, UploadConfig};
use finance_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use sqlx::PgPool;
use std::sync::Once;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

pub const AI_PATH: &str = "/v1/chat/completions";
pub const AI_API_KEY: &str = "test-ai-key";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,finance_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn test_config(ai_api_url: String) -> FinanceConfig {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to a PostgreSQL database for integration tests");

    FinanceConfig {
        common: CommonConfig { port: 0 },
        service_name: "finance-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: database_url,
            max_connections: 2,
            min_connections: 1,
        },
        ai: AiConfig {
            api_url: ai_api_url,
            api_key: Secret::new(AI_API_KEY.to_string()),
            model: "test/model".to_string(),
            timeout_secs: 10,
        },
        upload: UploadConfig {
            max_bytes: 1024 * 1024,
        },
    }
}

/// Test application wrapper.
#[allow(dead_code)]
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub pool: PgPool,
    pub ai_server: MockServer,
    /// Fresh identity per test so tests never see each other's rows.
    pub user_id: String,
}

/// Spawn the application on a random port against a mocked AI endpoint.
pub async fn spawn_app() -> TestApp {
    init_tracing();

    let ai_server = MockServer::start().await;
    let config = test_config(format!("{}{}", ai_server.uri(), AI_PATH));

    let app = Application::build(config)
        .await
        .expect("Failed to build application");

    let port = app.port();
    let pool = app.db().pool().clone();

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let address = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();

    // Wait for the listener to accept requests.
    let mut attempts = 0;
    while client
        .get(format!("{}/health", address))
        .send()
        .await
        .is_err()
    {
        attempts += 1;
        assert!(attempts < 20, "Server did not start");
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    TestApp {
        address,
        port,
        client,
        pool,
        ai_server,
        user_id: format!("test-user-{}", Uuid::new_v4()),
    }
}

/// Chat-completion envelope whose first choice carries `content`.
pub fn completion(content: &str) -> Value {
    json!({
        "id": "gen-test",
        "model": "test/model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 40 }
    })
}

/// Minimal one-page PDF that draws `text` in Helvetica.
///
/// `text` must not contain parentheses or backslashes.
#[allow(dead_code)]
pub fn statement_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", index + 1, object).as_bytes());
    }

    let xref_offset = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}

#[allow(dead_code)]
impl TestApp {
    /// Make every AI call answer with `content`, replacing earlier mocks.
    pub async fn mock_ai_reply(&self, content: &str) {
        self.ai_server.reset().await;
        Mock::given(method("POST"))
            .and(path(AI_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
            .mount(&self.ai_server)
            .await;
    }

    pub async fn upload(&self, mime_type: &str, body: impl Into<Vec<u8>>) -> reqwest::Response {
        self.upload_as(&self.user_id, mime_type, body).await
    }

    pub async fn upload_as(
        &self,
        user_id: &str,
        mime_type: &str,
        body: impl Into<Vec<u8>>,
    ) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(body.into())
            .file_name("statement")
            .mime_str(mime_type)
            .expect("Invalid mime type");
        let form = reqwest::multipart::Form::new().part("statement", part);

        self.client
            .post(format!("{}/transactions/upload", self.address))
            .header("X-User-ID", user_id)
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute upload request")
    }

    /// Upload a CSV whose extraction yields `transactions` (a JSON array).
    /// Returns the reported new-transaction count.
    pub async fn seed_transactions(&self, transactions: Value) -> u64 {
        self.mock_ai_reply(&transactions.to_string()).await;
        let csv = format!("statement {}", Uuid::new_v4());
        let response = self.upload("text/csv", csv).await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("Invalid upload response");
        body["newTransactionsCount"].as_u64().expect("Missing count")
    }

    pub async fn get(&self, route: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, route))
            .header("X-User-ID", &self.user_id)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, route: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, route))
            .header("X-User-ID", &self.user_id)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch_json(&self, route: &str, body: &Value) -> reqwest::Response {
        self.client
            .patch(format!("{}{}", self.address, route))
            .header("X-User-ID", &self.user_id)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, route: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.address, route))
            .header("X-User-ID", &self.user_id)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Create a category and return its id.
    pub async fn create_category(&self, name: &str) -> String {
        let response = self.post_json("/categories", &json!({ "name": name })).await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("Invalid category response");
        body["category_id"]
            .as_str()
            .expect("Missing category_id")
            .to_string()
    }

    /// All of the user's transactions, newest first.
    pub async fn transactions(&self) -> Vec<Value> {
        let body: Value = self
            .get("/transactions?page_size=200")
            .await
            .json()
            .await
            .expect("Invalid transaction list");
        body["transactions"]
            .as_array()
            .cloned()
            .expect("Missing transactions")
    }
}
