use serde::Serialize;

/// Body of a successful statement upload. Field names are camelCase for the
/// browser client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub new_transactions_count: u64,
}
