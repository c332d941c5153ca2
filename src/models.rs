// src/models.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A transaction output as reported by the upstream (`out[]` entries).
#[derive(Debug, Clone, Deserialize)]
pub struct Output {
    /// Value in satoshi. `None` when the upstream omitted it.
    #[serde(default)]
    pub value: Option<i64>,
}

/// A single transaction of a raw block
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub hash: String,

    #[serde(rename = "out", default)]
    pub outputs: Option<Vec<Output>>,
}

/// Snapshot of the chain tip at retrieval time
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub hash: String,
    pub time: i64, // unix seconds

    #[serde(rename = "tx")]
    pub transactions: Vec<Transaction>,
}

/// Transaction whose total output met the whale threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhaleTransaction {
    pub hash: String,
    #[serde(rename = "totalOutputBTC", with = "rust_decimal::serde::float")]
    pub total_output_value: Decimal,
}

/// Aggregates over one block, built fresh per analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub transaction_count: usize,
    pub total_output_value: Decimal,
    pub whale_transactions: Vec<WhaleTransaction>,
}

// ---------- API payloads ----------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsSummary {
    pub message: String,
    pub block_hash: String,
    pub block_time: String, // ISO-8601, millisecond precision
    pub number_of_transactions: usize,
    #[serde(rename = "totalOutputBTC", with = "rust_decimal::serde::float")]
    pub total_output_btc: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhaleReport {
    pub message: String,
    pub block_hash: String,
    pub block_time: String,
    pub whale_transactions_count: usize,
    pub whale_transactions: Vec<WhaleTransaction>,
}

/// Body pushed to the reporting webhook
#[derive(Debug, Serialize)]
pub struct BlockReport {
    pub block_hash: String,
    pub whale_transactions_count: usize,
    pub transaction_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_output_btc: Decimal,
}
