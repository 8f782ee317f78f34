mod common;

use common::{completion, spawn_app, statement_pdf, AI_API_KEY, AI_PATH};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

const STARBUCKS_CSV: &str = "2024-01-05,STARBUCKS,-4.50";

fn starbucks_reply() -> String {
    json!([{ "date": "2024-01-05", "description": "STARBUCKS", "amount": -4.50 }]).to_string()
}

#[tokio::test]
async fn csv_statement_is_extracted_and_saved() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(path(AI_PATH))
        .and(header("authorization", format!("Bearer {}", AI_API_KEY).as_str()))
        .and(body_partial_json(json!({
            "model": "test/model",
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&starbucks_reply())))
        .expect(1)
        .mount(&app.ai_server)
        .await;

    let response = app.upload("text/csv", STARBUCKS_CSV).await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "newTransactionsCount": 1 }));

    let transactions = app.transactions().await;
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["description"], "STARBUCKS");
    assert_eq!(transactions[0]["amount"], json!(-4.5));
    assert_eq!(transactions[0]["date"], "2024-01-05");
    assert!(transactions[0]["category_id"].is_null());

    let signature: String =
        sqlx::query_scalar("SELECT signature FROM transactions WHERE user_id = $1")
            .bind(&app.user_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(signature.len(), 64);
}

#[tokio::test]
async fn statement_text_is_sent_to_the_model() {
    let app = spawn_app().await;
    app.mock_ai_reply("[]").await;

    app.upload("text/csv", STARBUCKS_CSV).await;

    let requests = app.ai_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains(STARBUCKS_CSV));
    assert_eq!(body["messages"][0]["role"], "user");
}

#[tokio::test]
async fn reuploading_the_same_statement_adds_nothing() {
    let app = spawn_app().await;
    app.mock_ai_reply(&starbucks_reply()).await;

    let first: Value = app.upload("text/csv", STARBUCKS_CSV).await.json().await.unwrap();
    let second: Value = app.upload("text/csv", STARBUCKS_CSV).await.json().await.unwrap();

    assert_eq!(first["newTransactionsCount"], 1);
    assert_eq!(second["newTransactionsCount"], 0);
    assert_eq!(app.transactions().await.len(), 1);
}

#[tokio::test]
async fn duplicates_differing_only_in_case_and_whitespace_are_collapsed() {
    let app = spawn_app().await;

    let inserted = app
        .seed_transactions(json!([
            { "date": "2024-01-05", "description": "STARBUCKS", "amount": -4.50 },
            { "date": "2024-01-05", "description": "  starbucks ", "amount": "-4.5" },
            { "date": "2024-01-06", "description": "PAYROLL", "amount": 2500 }
        ]))
        .await;

    assert_eq!(inserted, 2);
}

#[tokio::test]
async fn same_statement_for_two_users_is_saved_twice() {
    let app = spawn_app().await;
    app.mock_ai_reply(&starbucks_reply()).await;
    let other_user = format!("{}-other", app.user_id);

    let mine: Value = app.upload("text/csv", STARBUCKS_CSV).await.json().await.unwrap();
    let theirs: Value = app
        .upload_as(&other_user, "text/csv", STARBUCKS_CSV)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(mine["newTransactionsCount"], 1);
    assert_eq!(theirs["newTransactionsCount"], 1);
}

#[tokio::test]
async fn unsupported_file_type_is_rejected_before_ai_call() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(path(AI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("[]")))
        .expect(0)
        .mount(&app.ai_server)
        .await;

    let response = app.upload("image/png", vec![0x89, b'P', b'N', b'G']).await;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Unsupported file type"));

    let accounts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE user_id = $1")
        .bind(&app.user_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(accounts, 0);
}

#[tokio::test]
async fn missing_identity_is_rejected_before_ai_call() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(path(AI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("[]")))
        .expect(0)
        .mount(&app.ai_server)
        .await;

    let part = reqwest::multipart::Part::bytes(STARBUCKS_CSV.as_bytes().to_vec())
        .file_name("statement.csv")
        .mime_str("text/csv")
        .unwrap();
    let response = app
        .client
        .post(format!("{}/transactions/upload", app.address))
        .multipart(reqwest::multipart::Form::new().part("statement", part))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn missing_file_is_a_bad_request() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/transactions/upload", app.address))
        .header("X-User-ID", &app.user_id)
        .multipart(reqwest::multipart::Form::new().text("note", "no file here"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No file provided.");
}

#[tokio::test]
async fn empty_extraction_reports_zero() {
    let app = spawn_app().await;
    app.mock_ai_reply("[]").await;

    let response = app.upload("text/csv", "Statement period: January").await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["newTransactionsCount"], 0);
}

#[tokio::test]
async fn reply_wrapped_in_object_is_accepted() {
    let app = spawn_app().await;
    app.mock_ai_reply(
        &json!({
            "transactions": [
                { "date": "2024-03-01", "description": "RENT", "amount": -1200 },
                { "date": "2024-03-02", "description": "SALARY", "amount": 3000 }
            ]
        })
        .to_string(),
    )
    .await;

    let body: Value = app.upload("text/csv", "rent and salary").await.json().await.unwrap();

    assert_eq!(body["newTransactionsCount"], 2);
}

#[tokio::test]
async fn reply_without_array_fails_the_upload() {
    let app = spawn_app().await;
    app.mock_ai_reply(r#"{"message": "no transactions found"}"#).await;

    let response = app.upload("text/csv", STARBUCKS_CSV).await;

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Upload failed: Failed to process statement with AI"));
    assert!(app.transactions().await.is_empty());
}

#[tokio::test]
async fn ai_error_status_fails_the_upload_without_retry() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(path(AI_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&app.ai_server)
        .await;

    let response = app.upload("text/csv", STARBUCKS_CSV).await;

    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn empty_ai_content_fails_the_upload() {
    let app = spawn_app().await;
    app.mock_ai_reply("").await;

    let response = app.upload("text/csv", STARBUCKS_CSV).await;

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("empty response"));
}

#[tokio::test]
async fn default_account_is_created_once() {
    let app = spawn_app().await;
    app.mock_ai_reply(&starbucks_reply()).await;

    app.upload("text/csv", STARBUCKS_CSV).await;
    app.upload("text/csv", STARBUCKS_CSV).await;

    let (count, name, account_type): (i64, String, String) = sqlx::query_as(
        "SELECT COUNT(*) OVER (), name, account_type FROM accounts WHERE user_id = $1",
    )
    .bind(&app.user_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();

    assert_eq!(count, 1);
    assert_eq!(name, "Default Account");
    assert_eq!(account_type, "checking");
}

#[tokio::test]
async fn pdf_and_csv_with_the_same_text_persist_the_same_rows() {
    let app = spawn_app().await;
    app.mock_ai_reply(&starbucks_reply()).await;

    let pdf = app.upload("application/pdf", statement_pdf(STARBUCKS_CSV)).await;
    assert_eq!(pdf.status(), 200);
    let pdf: Value = pdf.json().await.unwrap();
    let csv: Value = app.upload("text/csv", STARBUCKS_CSV).await.json().await.unwrap();

    assert_eq!(pdf, json!({ "success": true, "newTransactionsCount": 1 }));
    assert_eq!(csv["newTransactionsCount"], 0);

    let requests = app.ai_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("STARBUCKS"));

    let transactions = app.transactions().await;
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["description"], "STARBUCKS");
}

#[tokio::test]
async fn out_of_range_amount_is_skipped_and_the_rest_is_saved() {
    let app = spawn_app().await;

    let inserted = app
        .seed_transactions(json!([
            { "date": "2024-01-05", "description": "STARBUCKS", "amount": -4.50 },
            { "date": "2024-01-05", "description": "GARBLED", "amount": "123456789012345678" }
        ]))
        .await;

    assert_eq!(inserted, 1);
    let transactions = app.transactions().await;
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["description"], "STARBUCKS");
}

#[tokio::test]
async fn nul_bytes_in_descriptions_do_not_fail_the_upload() {
    let app = spawn_app().await;

    let inserted = app
        .seed_transactions(json!([
            { "date": "2024-01-05", "description": "STARBUCKS", "amount": -4.50 },
            { "date": "2024-01-06", "description": "CAFE\u{0}X", "amount": -3 }
        ]))
        .await;

    assert_eq!(inserted, 2);
    let mut descriptions: Vec<String> = app
        .transactions()
        .await
        .iter()
        .map(|tx| tx["description"].as_str().unwrap().to_string())
        .collect();
    descriptions.sort();
    assert_eq!(descriptions, vec!["CAFEX", "STARBUCKS"]);
}

#[tokio::test]
async fn non_multipart_upload_gets_a_json_error() {
    let app = spawn_app().await;
    app.mock_ai_reply("[]").await;

    let response = app
        .client
        .post(format!("{}/transactions/upload", app.address))
        .header("X-User-ID", &app.user_id)
        .json(&json!({ "statement": STARBUCKS_CSV }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Expected a multipart upload"));
    assert!(app.ai_server.received_requests().await.unwrap().is_empty());
}
