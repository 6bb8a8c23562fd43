//! Hypothetical index holdings and their valuation.

use crate::domain::capping::WeightRow;

/// Share count per ticker, aligned with the price table's ticker order.
///
/// Owned by a single backtest run; recomputed on rebalance dates and held
/// constant in between.
#[derive(Debug, Clone, PartialEq)]
pub struct HypotheticalShares {
    shares: Vec<f64>,
}

impl HypotheticalShares {
    pub fn empty(ticker_count: usize) -> Self {
        Self {
            shares: vec![0.0; ticker_count],
        }
    }

    /// Shares that invest `market_value` according to `weights` at `prices`.
    /// Tickers without a positive price and a positive weight hold nothing.
    pub fn from_weights(
        tickers: &[String],
        prices: &[Option<f64>],
        weights: &WeightRow,
        market_value: f64,
    ) -> Self {
        let shares = tickers
            .iter()
            .zip(prices)
            .map(|(ticker, price)| {
                let weight = weights.weight(ticker);
                match price {
                    Some(p) if *p > 0.0 && weight > 0.0 => market_value * weight / p,
                    _ => 0.0,
                }
            })
            .collect();
        Self { shares }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.shares
    }

    pub fn held_count(&self) -> usize {
        self.shares.iter().filter(|s| **s > 0.0).count()
    }

    /// Total market value at `prices`; missing prices contribute nothing.
    pub fn market_value(&self, prices: &[Option<f64>]) -> f64 {
        self.shares
            .iter()
            .zip(prices)
            .map(|(shares, price)| match price {
                Some(p) if p.is_finite() => shares * p,
                _ => 0.0,
            })
            .sum()
    }

    /// Each holding's share of `total_market_value`; all zero when the total
    /// is not positive.
    pub fn weights(&self, prices: &[Option<f64>], total_market_value: f64) -> Vec<f64> {
        self.shares
            .iter()
            .zip(prices)
            .map(|(shares, price)| match price {
                Some(p) if total_market_value > 0.0 && p.is_finite() => {
                    shares * p / total_market_value
                }
                _ => 0.0,
            })
            .collect()
    }
}
