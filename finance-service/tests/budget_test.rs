mod common;

use common::spawn_app;
use serde_json::{json, Value};
use uuid::Uuid;

const JANUARY_START: &str = "2024-01-01T00:00:00Z";
const JANUARY_END: &str = "2024-01-31T23:59:59Z";

#[tokio::test]
async fn create_and_list_budgets() {
    let app = spawn_app().await;
    let category_id = app.create_category("Groceries").await;

    let response = app
        .post_json(
            "/budgets",
            &json!({
                "category_id": category_id,
                "amount": 400,
                "start_date": JANUARY_START,
                "end_date": JANUARY_END
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["category_name"], "Groceries");
    assert_eq!(created["amount"], json!(400.0));

    let budgets: Vec<Value> = app.get("/budgets").await.json().await.unwrap();
    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets[0]["budget_id"], created["budget_id"]);
}

#[tokio::test]
async fn invalid_budgets_are_rejected() {
    let app = spawn_app().await;
    let category_id = app.create_category("Groceries").await;

    let response = app
        .post_json(
            "/budgets",
            &json!({
                "category_id": category_id,
                "amount": 0,
                "start_date": JANUARY_START,
                "end_date": JANUARY_END
            }),
        )
        .await;
    assert_eq!(response.status(), 422);

    let response = app
        .post_json(
            "/budgets",
            &json!({
                "category_id": category_id,
                "amount": 100,
                "start_date": JANUARY_END,
                "end_date": JANUARY_START
            }),
        )
        .await;
    assert_eq!(response.status(), 422);

    let response = app
        .post_json(
            "/budgets",
            &json!({
                "category_id": Uuid::new_v4(),
                "amount": 100,
                "start_date": JANUARY_START,
                "end_date": JANUARY_END
            }),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let app = spawn_app().await;
    let category_id = app.create_category("Fun").await;
    let created: Value = app
        .post_json(
            "/budgets",
            &json!({
                "category_id": category_id,
                "amount": 100,
                "start_date": JANUARY_START,
                "end_date": JANUARY_END
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let route = format!("/budgets/{}", created["budget_id"].as_str().unwrap());

    let response = app.patch_json(&route, &json!({ "amount": 150.5 })).await;
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["amount"], json!(150.5));
    assert_eq!(updated["start_date"], created["start_date"]);
    assert_eq!(updated["category_id"], category_id.as_str());

    let response = app
        .patch_json(&route, &json!({ "end_date": "2023-12-01T00:00:00Z" }))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn delete_budget() {
    let app = spawn_app().await;
    let category_id = app.create_category("Fun").await;
    let created: Value = app
        .post_json(
            "/budgets",
            &json!({
                "category_id": category_id,
                "amount": 100,
                "start_date": JANUARY_START,
                "end_date": JANUARY_END
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let route = format!("/budgets/{}", created["budget_id"].as_str().unwrap());

    assert_eq!(app.delete(&route).await.status(), 204);
    assert_eq!(app.delete(&route).await.status(), 404);

    let budgets: Vec<Value> = app.get("/budgets").await.json().await.unwrap();
    assert!(budgets.is_empty());
}

#[tokio::test]
async fn summary_sums_expenses_inside_the_period() {
    let app = spawn_app().await;
    let category_id = app.create_category("Groceries").await;
    app.post_json(
        "/budgets",
        &json!({
            "category_id": category_id,
            "amount": 100,
            "start_date": JANUARY_START,
            "end_date": JANUARY_END
        }),
    )
    .await;

    app.seed_transactions(json!([
        { "date": "2024-01-01", "description": "MARKET 1", "amount": -30 },
        { "date": "2024-01-31", "description": "MARKET 2", "amount": -45.5 },
        { "date": "2024-01-15", "description": "MARKET REFUND", "amount": 20 },
        { "date": "2024-02-01", "description": "MARKET 3", "amount": -60 }
    ]))
    .await;

    for tx in app.transactions().await {
        app.patch_json(
            &format!("/transactions/{}", tx["transaction_id"].as_str().unwrap()),
            &json!({ "category_id": category_id }),
        )
        .await;
    }

    let response = app.get("/budgets/summary").await;
    assert_eq!(response.status(), 200);
    let summary: Vec<Value> = response.json().await.unwrap();

    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["category_name"], "Groceries");
    assert_eq!(summary[0]["total_spent"], json!(75.5));
    assert_eq!(summary[0]["progress"], json!(0.755));
    assert_eq!(summary[0]["status"], "warning");
}

#[tokio::test]
async fn summary_caps_progress_when_overspent() {
    let app = spawn_app().await;
    let category_id = app.create_category("Dining").await;
    app.post_json(
        "/budgets",
        &json!({
            "category_id": category_id,
            "amount": 50,
            "start_date": JANUARY_START,
            "end_date": JANUARY_END
        }),
    )
    .await;
    app.seed_transactions(json!([
        { "date": "2024-01-10", "description": "STEAKHOUSE", "amount": -80 }
    ]))
    .await;
    let tx_id = app.transactions().await[0]["transaction_id"]
        .as_str()
        .unwrap()
        .to_string();
    app.patch_json(
        &format!("/transactions/{}", tx_id),
        &json!({ "category_id": category_id }),
    )
    .await;

    let summary: Vec<Value> = app.get("/budgets/summary").await.json().await.unwrap();

    assert_eq!(summary[0]["total_spent"], json!(80.0));
    assert_eq!(summary[0]["progress"], json!(1.0));
    assert_eq!(summary[0]["status"], "over");
}

#[tokio::test]
async fn deleting_a_category_removes_its_budgets() {
    let app = spawn_app().await;
    let category_id = app.create_category("Temporary").await;
    app.post_json(
        "/budgets",
        &json!({
            "category_id": category_id,
            "amount": 10,
            "start_date": JANUARY_START,
            "end_date": JANUARY_END
        }),
    )
    .await;

    app.delete(&format!("/categories/{}", category_id)).await;

    let budgets: Vec<Value> = app.get("/budgets").await.json().await.unwrap();
    assert!(budgets.is_empty());
}
