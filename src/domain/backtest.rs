//! Divisor-based index backtest.
//!
//! Walks the price calendar one day at a time carrying a hypothetical shares
//! vector. On rebalance dates the shares are reset from the new target weights
//! at the current portfolio value, so a rebalance alone never moves the level.
//! Every day the level is the portfolio value over a fixed divisor.

use crate::domain::calendar::{IndexDates, set_index_dates};
use crate::domain::capping::WeightRow;
use crate::domain::error::IndexError;
use crate::domain::portfolio::HypotheticalShares;
use crate::domain::table::PriceTable;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_level: f64,
    pub initial_divisor: f64,
    /// Date the published series starts at `start_level`. Defaults to the
    /// first rebalance date of the weight table.
    pub first_index_date: Option<NaiveDate>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            start_level: 100.0,
            initial_divisor: 1_000_000.0,
            first_index_date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexPoint {
    pub date: NaiveDate,
    pub level: f64,
}

/// Per-ticker values for one simulated day, in price-table ticker order.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyValues {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub tickers: Vec<String>,
    pub dates: IndexDates,
    pub daily_shares: Vec<DailyValues>,
    pub daily_weights: Vec<DailyValues>,
    pub total_market_values: Vec<(NaiveDate, f64)>,
    /// Weights on the final simulated day.
    pub last_day_weights: Vec<(String, f64)>,
    /// Daily levels from the first index date, anchored at the start level.
    pub index_series: Vec<IndexPoint>,
}

impl BacktestResult {
    /// Levels on calendar month starts only, for reporting.
    pub fn monthly_series(&self) -> Vec<IndexPoint> {
        month_start_points(&self.index_series)
    }

    pub fn level_on(&self, date: NaiveDate) -> Option<f64> {
        self.index_series
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.index_series[i].level)
    }

    pub fn rebalance_count(&self) -> usize {
        self.daily_shares
            .windows(2)
            .filter(|w| w[0].values != w[1].values)
            .count()
    }
}

pub fn month_start_points(points: &[IndexPoint]) -> Vec<IndexPoint> {
    points.iter().copied().filter(|p| p.date.day() == 1).collect()
}

/// Runs the index over `prices`.
///
/// `rebalance_dates` are the dates on which shares are reset; a rebalance date
/// with no weight row is skipped and the current shares carried over.
pub fn run_backtest(
    config: &BacktestConfig,
    weights: &[WeightRow],
    prices: &PriceTable,
    rebalance_dates: &[NaiveDate],
) -> Result<BacktestResult, IndexError> {
    let mut weight_by_date: BTreeMap<NaiveDate, &WeightRow> = BTreeMap::new();
    for row in weights {
        if weight_by_date.insert(row.rebalance_date, row).is_some() {
            debug!(
                date = %row.rebalance_date,
                "several selections share this adjustment date, keeping the latest"
            );
        }
    }
    let (Some(first_weight), Some(last_weight)) = (
        weight_by_date.keys().next().copied(),
        weight_by_date.keys().next_back().copied(),
    ) else {
        return Err(IndexError::alignment("weight table is empty"));
    };

    let requested = config.first_index_date.unwrap_or(first_weight);
    let dates = set_index_dates(prices.dates(), rebalance_dates, requested)?;
    if dates.first_date < first_weight || dates.first_date > last_weight {
        return Err(IndexError::alignment(format!(
            "first index date {} is outside the weights range {} to {}",
            dates.first_date, first_weight, last_weight
        )));
    }

    let initial_weights = weight_by_date
        .range(..=dates.first_date)
        .next_back()
        .map(|(_, row)| *row)
        .ok_or_else(|| IndexError::alignment("no weights at or before the first index date"))?;
    let Some(seed_prices) = prices.row(dates.last_rebal_date) else {
        return Err(IndexError::alignment(format!(
            "no prices on the last rebalance date {}",
            dates.last_rebal_date
        )));
    };

    let tickers = prices.tickers();
    let initial_market_value = config.start_level * config.initial_divisor;
    let mut shares = HypotheticalShares::from_weights(
        tickers,
        seed_prices,
        initial_weights,
        initial_market_value,
    );

    let rebalance_set: HashSet<NaiveDate> = rebalance_dates.iter().copied().collect();
    let offset = prices.date_position(dates.last_rebal_date).unwrap_or(0);

    let mut raw_levels = Vec::with_capacity(dates.gross_dates.len());
    let mut daily_shares = Vec::with_capacity(dates.gross_dates.len());
    let mut daily_weights = Vec::with_capacity(dates.gross_dates.len());
    let mut total_market_values = Vec::with_capacity(dates.gross_dates.len());

    for (i, date) in dates.gross_dates.iter().copied().enumerate() {
        let row = prices.row_at(offset + i);

        if rebalance_set.contains(&date) {
            match weight_by_date.get(&date) {
                Some(target) => {
                    let value = shares.market_value(row);
                    shares = HypotheticalShares::from_weights(tickers, row, target, value);
                    info!(%date, holdings = shares.held_count(), "rebalancing");
                }
                None => warn!(%date, "no weights found for rebalance date, keeping current shares"),
            }
        }

        let total_market_value = shares.market_value(row);
        if total_market_value > 0.0 {
            raw_levels.push(IndexPoint {
                date,
                level: total_market_value / config.initial_divisor,
            });
        }

        daily_weights.push(DailyValues {
            date,
            values: shares.weights(row, total_market_value),
        });
        daily_shares.push(DailyValues {
            date,
            values: shares.as_slice().to_vec(),
        });
        total_market_values.push((date, total_market_value));
    }

    let index_series = renormalize(&raw_levels, dates.first_date, config.start_level);
    if index_series.is_empty() {
        warn!("index run produced no valid index levels");
    }

    let last_day_weights = daily_weights
        .last()
        .map(|day| tickers.iter().cloned().zip(day.values.iter().copied()).collect())
        .unwrap_or_default();

    Ok(BacktestResult {
        tickers: tickers.to_vec(),
        dates,
        daily_shares,
        daily_weights,
        total_market_values,
        last_day_weights,
        index_series,
    })
}

/// Rescales `levels` from `first_date` onwards so the first point equals
/// `start_level` exactly.
pub fn renormalize(
    levels: &[IndexPoint],
    first_date: NaiveDate,
    start_level: f64,
) -> Vec<IndexPoint> {
    let start = levels.partition_point(|p| p.date < first_date);
    let Some(anchor) = levels.get(start).copied() else {
        return Vec::new();
    };
    levels[start..]
        .iter()
        .map(|p| IndexPoint {
            date: p.date,
            level: if p.date == anchor.date {
                start_level
            } else {
                start_level * p.level / anchor.level
            },
        })
        .collect()
}

/// Weights, prices and rebalance dates aligned for one backtest run.
#[derive(Debug, Clone)]
pub struct PreparedIndex {
    pub weights: Vec<WeightRow>,
    pub prices: PriceTable,
    pub rebalance_dates: Vec<NaiveDate>,
}

/// Sorts the weight table, drops prices before the first rebalance date and
/// takes the rebalance dates as the weight dates that are also price dates.
pub fn prepare_for_index(
    weights: &[WeightRow],
    prices: &PriceTable,
) -> Result<PreparedIndex, IndexError> {
    let mut weights = weights.to_vec();
    weights.sort_by_key(|row| row.rebalance_date);
    let Some(first_rebalance) = weights.first().map(|row| row.rebalance_date) else {
        return Err(IndexError::alignment("no rebalancing data available"));
    };

    let prices = prices.from_date(first_rebalance);
    let mut rebalance_dates: Vec<NaiveDate> = weights
        .iter()
        .map(|row| row.rebalance_date)
        .filter(|date| prices.contains_date(*date))
        .collect();
    rebalance_dates.dedup();

    Ok(PreparedIndex {
        weights,
        prices,
        rebalance_dates,
    })
}
