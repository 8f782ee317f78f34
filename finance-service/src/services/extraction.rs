//! Statement text to candidate transactions via a language model.
//!
//! The model's reply is untrusted input. It is accepted as a bare JSON array
//! or as an object wrapping one (`{"transactions": [...]}`); elements that do
//! not carry a valid date, description and amount are skipped.

use crate::models::ParsedTransaction;
use crate::services::error::IngestError;
use crate::services::metrics;
use crate::services::providers::{CompletionProvider, CompletionRequest};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Stored amounts carry four fractional digits.
const AMOUNT_SCALE: u32 = 4;

/// 10^15: the smallest magnitude `NUMERIC(19, 4)` cannot hold.
const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

#[derive(Clone)]
pub struct TransactionExtractor {
    provider: Arc<dyn CompletionProvider>,
}

impl TransactionExtractor {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// One model call per statement, no retry. Blank text yields no
    /// transactions without calling the model.
    #[instrument(skip(self, raw_text), fields(text_length = raw_text.len(), model = %self.provider.model()))]
    pub async fn extract(&self, raw_text: &str) -> Result<Vec<ParsedTransaction>, IngestError> {
        if raw_text.trim().is_empty() {
            tracing::info!("Statement has no text, skipping extraction");
            return Ok(Vec::new());
        }

        let request = CompletionRequest {
            prompt: build_prompt(raw_text),
            json_response: true,
        };

        let start = Instant::now();
        let result = self.provider.complete(&request).await;
        let elapsed = start.elapsed().as_secs_f64();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                metrics::record_ai_extraction(self.provider.model(), "error", elapsed);
                tracing::error!(error = %e, "AI extraction request failed");
                return Err(IngestError::ExtractionFailure(e.to_string()));
            }
        };

        let outcome = match response.text.as_deref().map(str::trim) {
            Some(content) if !content.is_empty() => parse_reply(content),
            _ => Err(IngestError::ExtractionFailure(
                "AI returned an empty response".to_string(),
            )),
        };

        let status = if outcome.is_ok() { "success" } else { "invalid_reply" };
        metrics::record_ai_extraction(self.provider.model(), status, elapsed);

        match &outcome {
            Ok(transactions) => tracing::info!(
                transactions = transactions.len(),
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                duration_secs = elapsed,
                "Transactions extracted"
            ),
            Err(e) => tracing::warn!(error = %e, "AI reply rejected"),
        }

        outcome
    }
}

pub fn build_prompt(raw_text: &str) -> String {
    format!(
        r#"You are an expert financial data processor. Analyze the following text from a bank or credit card statement.
Extract every financial transaction and return them as a JSON array of objects.

Each object must have exactly this structure:
{{ "date": "YYYY-MM-DD", "description": "Transaction Description", "amount": 123.45 }}

Rules:
- "date" must be a valid calendar date in YYYY-MM-DD format.
- "description" should be a concise summary of the transaction.
- "amount" must be a number. It is NEGATIVE for debits, withdrawals, fees and purchases, and POSITIVE for credits, deposits, refunds and income.
- Ignore summary text, marketing messages, running balances and any other non-transactional lines.
- Return only the JSON, with no explanations or markdown formatting.

Text to analyze:
---
{raw_text}
---
"#
    )
}

/// Decode message content into candidates.
pub fn parse_reply(content: &str) -> Result<Vec<ParsedTransaction>, IngestError> {
    let json: Value = serde_json::from_str(strip_code_fence(content)).map_err(|e| {
        IngestError::ExtractionFailure(format!("AI response is not valid JSON: {}", e))
    })?;

    let elements = locate_array(json).ok_or_else(|| {
        IngestError::ExtractionFailure("AI response is not a JSON array".to_string())
    })?;

    let total = elements.len();
    let transactions: Vec<ParsedTransaction> = elements
        .iter()
        .enumerate()
        .filter_map(|(index, element)| match parse_candidate(element) {
            Ok(tx) => Some(tx),
            Err(reason) => {
                tracing::warn!(index, reason, "Skipping malformed transaction in AI reply");
                None
            }
        })
        .collect();

    if transactions.len() < total {
        tracing::warn!(
            accepted = transactions.len(),
            skipped = total - transactions.len(),
            "AI reply contained malformed transactions"
        );
    }

    Ok(transactions)
}

/// The array itself, or the first array-valued key of an object.
fn locate_array(json: Value) -> Option<Vec<Value>> {
    match json {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.into_iter().find_map(|(_, value)| match value {
            Value::Array(items) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

/// Models sometimes ignore the no-markdown rule and fence the JSON.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_candidate(element: &Value) -> Result<ParsedTransaction, &'static str> {
    let object = element.as_object().ok_or("not an object")?;

    let date = object
        .get("date")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        .ok_or("missing or invalid date")?;

    // Postgres text rejects NUL, so control characters never reach the insert.
    let description: String = object
        .get("description")
        .and_then(Value::as_str)
        .ok_or("missing description")?
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let description = description.trim();
    if description.is_empty() {
        return Err("missing description");
    }

    let amount = object
        .get("amount")
        .and_then(parse_amount)
        .ok_or("missing or invalid amount")?;

    Ok(ParsedTransaction {
        date,
        description: description.to_string(),
        amount,
    })
}

fn parse_amount(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' '))
            .collect(),
        _ => return None,
    };

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
        .map(|amount| amount.round_dp(AMOUNT_SCALE))
        .filter(|amount| amount.abs() < MAX_AMOUNT)
}
