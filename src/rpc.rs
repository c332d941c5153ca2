// src/rpc.rs
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::RetrievalError;
use crate::models::Block;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Anything that can hand out the current chain tip
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn latest_block(&self) -> Result<Block, RetrievalError>;
}

#[derive(Debug, Deserialize)]
struct LatestBlock {
    hash: String,
}

/// blockchain.info data API client (`/latestblock` + `/rawblock/{hash}`)
#[derive(Debug, Clone)]
pub struct BlockchainInfoClient {
    client: Client,
    base_url: String,
}

impl BlockchainInfoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Hash of the current chain tip
    pub async fn latest_block_hash(&self) -> Result<String, RetrievalError> {
        let url = format!("{}/latestblock", self.base_url);
        let tip: LatestBlock = self.get_json(&url).await.map_err(|e| match e {
            RetrievalError::Status(StatusCode::NOT_FOUND) => RetrievalError::NotFound,
            other => other,
        })?;

        if tip.hash.trim().is_empty() {
            return Err(RetrievalError::NotFound);
        }
        Ok(tip.hash)
    }

    /// Full raw block by hash
    pub async fn raw_block(&self, hash: &str) -> Result<Block, RetrievalError> {
        let url = format!("{}/rawblock/{}", self.base_url, hash);
        self.get_json(&url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RetrievalError> {
        let resp = self.send_with_retry(url).await?;
        if !resp.status().is_success() {
            return Err(RetrievalError::Status(resp.status()));
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Retries transport failures only; any HTTP response is returned as is.
    async fn send_with_retry(&self, url: &str) -> Result<Response, RetrievalError> {
        let mut attempt = 1;
        loop {
            info!("📡 GET {}", url);
            match self.client.get(url).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!(
                        "⚠️ Upstream request failed (attempt {}): {}. Retrying...",
                        attempt, e
                    );
                    tokio::time::sleep(RETRY_PAUSE).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl BlockSource for BlockchainInfoClient {
    async fn latest_block(&self) -> Result<Block, RetrievalError> {
        let hash = self.latest_block_hash().await?;
        let block = self.raw_block(&hash).await?;
        info!("📦 Fetched block {} ({} txs)", block.hash, block.transactions.len());
        Ok(block)
    }
}
