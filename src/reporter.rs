use std::sync::Arc;
use eyre::{eyre, Result};
use reqwest::Client;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::analyzer::{analyze, Threshold};
use crate::config::Config;
use crate::models::{AnalysisResult, Block, BlockReport};
use crate::rpc::BlockSource;

const MAX_BACKOFF_SECS: u64 = 120;

/// Periodically push a summary of the latest block to `cfg.report_url`.
pub async fn run(cfg: Config, source: Arc<dyn BlockSource>) -> Result<()> {
    let Some(report_url) = cfg.report_url.clone() else {
        info!("Reporter disabled (REPORT_URL not set)");
        return Ok(());
    };

    let client = Client::builder().timeout(cfg.request_timeout).build()?;
    let base_delay = cfg.report_interval.as_secs();
    let mut retry_delay = base_delay;

    info!("Reporter started → {} every {}s", report_url, base_delay);

    loop {
        let sent = report_once(
            &client,
            &report_url,
            cfg.report_api_key.as_deref(),
            cfg.whale_threshold,
            source.as_ref(),
        )
        .await;

        match sent {
            Ok(report) => {
                retry_delay = base_delay; // reset after success
                info!("Data sent successfully: {:?}", report);
            }
            Err(e) => {
                warn!("Report failed this round: {:?}", e);
                retry_delay = backoff(retry_delay, base_delay);
            }
        }

        sleep(Duration::from_secs(retry_delay)).await;
    }
}

/// Double the delay, capped at 120s (or the base interval if that is longer).
fn backoff(current: u64, base: u64) -> u64 {
    current.saturating_mul(2).min(MAX_BACKOFF_SECS.max(base))
}

async fn report_once(
    client: &Client,
    url: &str,
    api_key: Option<&str>,
    threshold: Threshold,
    source: &dyn BlockSource,
) -> Result<BlockReport> {
    let block = source.latest_block().await?;
    let analysis = analyze(&block, threshold.value())?;
    let report = build_report(&block, &analysis);

    let mut req = client.post(url).json(&report);
    if let Some(key) = api_key {
        req = req.header("X-WP-API-KEY", key);
    }

    let resp = req.send().await?;
    if !resp.status().is_success() {
        return Err(eyre!("Report endpoint returned HTTP {}", resp.status()));
    }

    Ok(report)
}

pub fn build_report(block: &Block, analysis: &AnalysisResult) -> BlockReport {
    BlockReport {
        block_hash: block.hash.clone(),
        whale_transactions_count: analysis.whale_transactions.len(),
        transaction_count: analysis.transaction_count,
        total_output_btc: analysis.total_output_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrievalError;
    use async_trait::async_trait;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    struct FixedBlock(Value);

    #[async_trait]
    impl BlockSource for FixedBlock {
        async fn latest_block(&self) -> Result<Block, RetrievalError> {
            Ok(serde_json::from_value(self.0.clone())?)
        }
    }

    fn sample_block() -> Value {
        json!({
            "hash": "0000abc",
            "time": 1_700_000_000,
            "tx": [
                { "hash": "big", "out": [{ "value": 15_000_000_000i64 }] },
                { "hash": "small", "out": [{ "value": 25_000_000 }] },
            ]
        })
    }

    #[test]
    fn report_payload_from_analysis() {
        let block: Block = serde_json::from_value(sample_block()).unwrap();
        let analysis = analyze(&block, Threshold::default().value()).unwrap();

        let payload = serde_json::to_value(build_report(&block, &analysis)).unwrap();
        assert_eq!(
            payload,
            json!({
                "block_hash": "0000abc",
                "whale_transactions_count": 1,
                "transaction_count": 2,
                "total_output_btc": 150.25,
            })
        );
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        assert_eq!(backoff(15, 15), 30);
        assert_eq!(backoff(60, 15), 120);
        assert_eq!(backoff(120, 15), 120);
        assert_eq!(backoff(300, 300), 300);
    }

    #[test]
    fn backoff_saturates_on_huge_interval() {
        assert_eq!(backoff(u64::MAX, u64::MAX), u64::MAX);
        assert_eq!(backoff(u64::MAX / 2 + 1, u64::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn posts_report_with_api_key() {
        let (tx, mut rx) = mpsc::unbounded_channel::<(Option<String>, Value)>();
        let hook = Router::new().route(
            "/hook",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let tx = tx.clone();
                async move {
                    let key = headers
                        .get("X-WP-API-KEY")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    tx.send((key, body)).ok();
                    "ok"
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, hook).await.unwrap();
        });

        let source = FixedBlock(sample_block());
        let report = report_once(&Client::new(), &url, Some("secret"), Threshold::default(), &source)
            .await
            .unwrap();
        assert_eq!(report.transaction_count, 2);

        let (key, body) = rx.recv().await.unwrap();
        assert_eq!(key.as_deref(), Some("secret"));
        assert_eq!(body["block_hash"], "0000abc");
        assert_eq!(body["whale_transactions_count"], 1);
    }

    #[tokio::test]
    async fn rejected_report_is_an_error() {
        let hook = Router::new().route(
            "/hook",
            post(|| async { axum::http::StatusCode::UNAUTHORIZED }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, hook).await.unwrap();
        });

        let source = FixedBlock(sample_block());
        let result = report_once(&Client::new(), &url, None, Threshold::default(), &source).await;
        assert!(result.is_err());
    }
}
