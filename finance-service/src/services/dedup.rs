//! Transaction fingerprints and candidate filtering.
//!
//! A signature is the SHA-256 of `date-amount-description` where the date is
//! `YYYY-MM-DD`, the amount is in normalized decimal form (`-4.50` and
//! `-4.5` agree) and the description is trimmed and lowercased. Two
//! statement lines with the same signature are the same transaction for a
//! given user.

use crate::models::{NewTransaction, ParsedTransaction};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use uuid::Uuid;

/// Deterministic fingerprint of a transaction's content.
pub fn transaction_signature(tx: &ParsedTransaction) -> String {
    let payload = format!(
        "{}-{}-{}",
        tx.date.format("%Y-%m-%d"),
        tx.amount.normalize(),
        tx.description.trim().to_lowercase()
    );
    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Fingerprint candidates and attach ownership. Candidates that repeat a
/// signature already seen in the same batch are dropped; the first wins.
pub fn prepare_new_transactions(
    candidates: &[ParsedTransaction],
    user_id: &str,
    account_id: Uuid,
) -> Vec<NewTransaction> {
    let mut seen = HashSet::with_capacity(candidates.len());

    candidates
        .iter()
        .filter_map(|tx| {
            let signature = transaction_signature(tx);
            if !seen.insert(signature.clone()) {
                return None;
            }
            Some(NewTransaction {
                transaction_id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                account_id,
                transaction_date: tx.date,
                description: tx.description.trim().to_string(),
                amount: tx.amount,
                signature,
            })
        })
        .collect()
}

/// Keep only candidates whose signature is not in `existing`.
pub fn drop_existing(
    candidates: Vec<NewTransaction>,
    existing: &HashSet<String>,
) -> Vec<NewTransaction> {
    candidates
        .into_iter()
        .filter(|tx| !existing.contains(&tx.signature))
        .collect()
}
