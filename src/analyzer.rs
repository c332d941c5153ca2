// src/analyzer.rs
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::{AnalysisError, ThresholdError};
use crate::models::{AnalysisResult, Block, Transaction, WhaleTransaction};

/// Satoshi → BTC is a shift of 8 decimal places
const BTC_SCALE: u32 = 8;

pub const DEFAULT_THRESHOLD_BTC: i64 = 100;

/// Whale threshold in BTC, validated to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(Decimal);

impl Threshold {
    pub fn value(self) -> Decimal {
        self.0
    }

    /// Absent or empty query values fall back to the default.
    pub fn from_query(raw: Option<&str>) -> Result<Self, ThresholdError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(s) => s.parse(),
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold(Decimal::from(DEFAULT_THRESHOLD_BTC))
    }
}

impl FromStr for Threshold {
    type Err = ThresholdError;

    /// Totals are whole satoshis, so the value is rounded up to 8 places without
    /// changing which transactions qualify. Anything above `Decimal::MAX` is
    /// unreachable and clamps to it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        // float grammar only: no `_` separators, no inf/NaN
        let approx = s
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(|| ThresholdError::NotNumeric(s.to_string()))?;

        // f64 underflows tiny inputs to 0, so look at the digits themselves
        let nonzero = s
            .chars()
            .take_while(|c| !matches!(c, 'e' | 'E'))
            .any(|c| matches!(c, '1'..='9'));
        if nonzero && s.starts_with('-') {
            return Err(ThresholdError::Negative(s.to_string()));
        }

        let unsigned = s.trim_start_matches(&['+', '-'][..]);
        let one_sat = Decimal::new(1, BTC_SCALE);
        let exact = Decimal::from_str_exact(unsigned).or_else(|_| Decimal::from_scientific(unsigned));

        let value = match exact {
            Ok(v) if v.is_zero() && nonzero => one_sat,
            Ok(v) => v.round_dp_with_strategy(BTC_SCALE, RoundingStrategy::AwayFromZero),
            Err(_) if approx >= Decimal::MAX.to_f64().unwrap_or(f64::MAX) => Decimal::MAX,
            Err(_) if approx < 1e-8 => {
                if nonzero {
                    one_sat
                } else {
                    Decimal::ZERO
                }
            }
            Err(_) => return Err(ThresholdError::OutOfRange(s.to_string())),
        };

        Ok(Threshold(value))
    }
}

/// Aggregate a block and pick out transactions with total output >= `threshold` BTC.
///
/// Satoshi values are summed as integers and scaled once, so the block total is
/// exact and always equals the sum of the per-transaction totals.
pub fn analyze(block: &Block, threshold: Decimal) -> Result<AnalysisResult, AnalysisError> {
    let mut total_sats: i128 = 0;
    let mut whale_transactions = Vec::new();

    for tx in &block.transactions {
        let tx_sats = transaction_satoshis(tx)?;
        total_sats = total_sats
            .checked_add(tx_sats)
            .ok_or_else(|| total_overflow(&block.hash))?;

        let tx_total = to_btc(tx_sats).ok_or_else(|| AnalysisError::MalformedBlock {
            tx_hash: tx.hash.clone(),
            reason: "output sum exceeds decimal range",
        })?;
        if tx_total >= threshold {
            whale_transactions.push(WhaleTransaction {
                hash: tx.hash.clone(),
                total_output_value: tx_total,
            });
        }
    }

    Ok(AnalysisResult {
        transaction_count: block.transactions.len(),
        total_output_value: scale_total(&block.hash, total_sats)?,
        whale_transactions,
    })
}

fn transaction_satoshis(tx: &Transaction) -> Result<i128, AnalysisError> {
    let outputs = tx.outputs.as_ref().ok_or_else(|| AnalysisError::MalformedBlock {
        tx_hash: tx.hash.clone(),
        reason: "missing output list",
    })?;

    let mut sats: i128 = 0;
    for out in outputs {
        let value = out.value.ok_or_else(|| AnalysisError::MalformedBlock {
            tx_hash: tx.hash.clone(),
            reason: "output without value",
        })?;
        sats += i128::from(value);
    }
    Ok(sats)
}

fn to_btc(sats: i128) -> Option<Decimal> {
    Decimal::try_from_i128_with_scale(sats, BTC_SCALE)
        .ok()
        .map(|d| d.normalize())
}

fn scale_total(block_hash: &str, sats: i128) -> Result<Decimal, AnalysisError> {
    to_btc(sats).ok_or_else(|| total_overflow(block_hash))
}

fn total_overflow(block_hash: &str) -> AnalysisError {
    AnalysisError::TotalOverflow {
        block_hash: block_hash.to_string(),
    }
}
