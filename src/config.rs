use dotenvy::dotenv;
use eyre::{Result, WrapErr};
use std::{env, net::IpAddr, str::FromStr, time::Duration};
use tracing::info;

use crate::analyzer::Threshold;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    pub blockchain_api_url: String,
    pub request_timeout: Duration,
    pub whale_threshold: Threshold, // used by the reporter
    pub report_url: Option<String>,
    pub report_api_key: Option<String>,
    pub report_interval: Duration,
}

pub fn load() -> Result<Config> {
    dotenv().ok(); // .env is optional
    from_lookup(|key| env::var(key).ok())
}

/// Build a config from any key lookup (the process environment in production).
pub fn from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    // API port (default: 3000)
    let port: u16 = parse_or(non_empty("PORT"), 3000);

    // Listen address (default: loopback)
    let bind_addr = parse_or(non_empty("BIND_ADDR"), IpAddr::from([127, 0, 0, 1]));

    let blockchain_api_url =
        non_empty("BLOCKCHAIN_API_URL").unwrap_or_else(|| "https://blockchain.info".to_string());

    let request_timeout = Duration::from_secs(parse_or::<u64>(non_empty("REQUEST_TIMEOUT_SECS"), 10));

    // Reporter threshold (default: 100 BTC); must parse
    let whale_threshold = match non_empty("WHALE_THRESHOLD") {
        Some(raw) => raw.parse::<Threshold>().wrap_err("WHALE_THRESHOLD")?,
        None => Threshold::default(),
    };

    let report_url = non_empty("REPORT_URL");
    let report_api_key = non_empty("BLOCKCHAIN_API_KEY");
    let report_interval = Duration::from_secs(parse_or::<u64>(non_empty("REPORT_INTERVAL_SECS"), 15).max(1));

    let cfg = Config {
        port,
        bind_addr,
        blockchain_api_url,
        request_timeout,
        whale_threshold,
        report_url,
        report_api_key,
        report_interval,
    };

    info!(
        "Loaded config: port={} bind={} upstream={} timeout={:?} reporter={}",
        cfg.port,
        cfg.bind_addr,
        cfg.blockchain_api_url,
        cfg.request_timeout,
        cfg.report_url.as_deref().unwrap_or("disabled"),
    );

    Ok(cfg)
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}
