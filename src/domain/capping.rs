//! Market-cap weights with maximum/minimum weight capping.
//!
//! Weights are computed per selection date over the eligible tickers (market
//! cap present and above the inclusion threshold), capped iteratively, floored
//! until no name is left under the minimum, and renormalised to sum to one.

use crate::domain::calendar::RebalanceDatePair;
use crate::domain::table::MarketCapTable;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ITERATIONS: usize = 100;

const BOUND_TOLERANCE: f64 = 1e-9;

/// Capping parameters shared by every rebalance of one index run.
#[derive(Debug, Clone, PartialEq)]
pub struct CapParams {
    pub market_cap_threshold: f64,
    pub max_cap: f64,
    pub min_cap: f64,
    pub max_iterations: usize,
}

impl Default for CapParams {
    fn default() -> Self {
        CapParams {
            market_cap_threshold: 1000.0,
            max_cap: 1.0,
            min_cap: 0.0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Result of one capping run.
#[derive(Debug, Clone, PartialEq)]
pub struct CapOutcome {
    pub weights: Vec<(String, f64)>,
    pub iterations: usize,
    /// False when the returned weights still break the cap or the floor,
    /// either because the iteration budget ran out or the bounds are
    /// infeasible for this many names.
    pub converged: bool,
}

/// Target weights effective from `rebalance_date` (the adjustment date).
/// Every universe ticker has an entry; ineligible tickers carry 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRow {
    pub rebalance_date: NaiveDate,
    pub selection_date: NaiveDate,
    pub weights: BTreeMap<String, f64>,
}

impl WeightRow {
    pub fn weight(&self, ticker: &str) -> f64 {
        self.weights.get(ticker).copied().unwrap_or(0.0)
    }
}

/// Raw market-cap weights over the tickers whose cap is present, finite and
/// strictly above `threshold`. `None` when no ticker qualifies.
pub fn eligible_weights(
    tickers: &[String],
    market_caps: &[Option<f64>],
    threshold: f64,
) -> Option<Vec<(String, f64)>> {
    let eligible: Vec<(String, f64)> = tickers
        .iter()
        .zip(market_caps)
        .filter_map(|(ticker, cap)| match cap {
            Some(c) if c.is_finite() && *c > threshold => Some((ticker.clone(), *c)),
            _ => None,
        })
        .collect();

    let total: f64 = eligible.iter().map(|(_, c)| c).sum();
    if eligible.is_empty() || total <= 0.0 {
        return None;
    }
    Some(
        eligible
            .into_iter()
            .map(|(ticker, cap)| (ticker, cap / total))
            .collect(),
    )
}

/// Applies the maximum cap iteratively, then floors repeatedly until no name
/// sits below `min_cap`, then renormalises.
///
/// `iterations` counts capping passes only. Flooring is bounded separately by
/// the same `max_iterations`.
pub fn cap_weights(
    raw: &[(String, f64)],
    max_cap: f64,
    min_cap: f64,
    max_iterations: usize,
) -> CapOutcome {
    let mut w: Vec<f64> = raw.iter().map(|(_, x)| *x).collect();

    let mut iterations = 0;
    while iterations < max_iterations && w.iter().any(|x| *x > max_cap) {
        for x in w.iter_mut() {
            *x = x.min(max_cap);
        }
        let excess = 1.0 - w.iter().sum::<f64>();
        let free_total: f64 = w.iter().filter(|x| **x < max_cap).sum();
        if free_total > 0.0 {
            for x in w.iter_mut().filter(|x| **x < max_cap) {
                *x += *x / free_total * excess;
            }
        }
        iterations += 1;
    }

    let mut pinned = vec![false; w.len()];
    let mut floor_passes = 0;
    while floor_passes < max_iterations
        && w.iter().zip(&pinned).any(|(x, p)| !*p && *x < min_cap)
    {
        floor_weights(&mut w, &mut pinned, max_cap, min_cap);
        floor_passes += 1;
    }

    let total: f64 = w.iter().sum();
    if total > 0.0 {
        for x in w.iter_mut() {
            *x /= total;
        }
    }

    let converged = w
        .iter()
        .all(|x| *x <= max_cap + BOUND_TOLERANCE && *x >= min_cap - BOUND_TOLERANCE);
    if !converged {
        warn!(
            iterations,
            max_cap, min_cap, "weight capping did not converge, using best-effort weights"
        );
    }

    CapOutcome {
        weights: raw
            .iter()
            .zip(w)
            .map(|((ticker, _), x)| (ticker.clone(), x))
            .collect(),
        iterations,
        converged,
    }
}

/// One flooring pass. Every unpinned name below `min_cap` is raised to it and
/// pinned there. The shortfall comes pro rata from the unpinned names under
/// `max_cap`, or from every unpinned name when those cannot cover it.
fn floor_weights(w: &mut [f64], pinned: &mut [bool], max_cap: f64, min_cap: f64) {
    let mut shortfall = 0.0;
    for (x, p) in w.iter_mut().zip(pinned.iter_mut()) {
        if !*p && *x < min_cap {
            shortfall += min_cap - *x;
            *x = min_cap;
            *p = true;
        }
    }

    let free_total: f64 = w
        .iter()
        .zip(pinned.iter())
        .filter(|(x, p)| !**p && **x < max_cap)
        .map(|(x, _)| x)
        .sum();
    let all_total: f64 = w
        .iter()
        .zip(pinned.iter())
        .filter(|(_, p)| !**p)
        .map(|(x, _)| x)
        .sum();
    let (donor_total, capped_donate) = if free_total >= shortfall {
        (free_total, false)
    } else {
        (all_total, true)
    };
    if donor_total <= 0.0 {
        return;
    }

    let donors: Vec<f64> = w.to_vec();
    for (i, x) in w.iter_mut().enumerate() {
        if !pinned[i] && (capped_donate || donors[i] < max_cap) {
            *x -= donors[i] / donor_total * shortfall;
        }
    }
}

/// Builds one capped weight row per rebalance pair. Market caps are read on
/// the selection date; the row is keyed by the adjustment date. Selection
/// dates without eligible tickers are skipped.
pub fn calculate_weights(
    market_caps: &MarketCapTable,
    pairs: &[RebalanceDatePair],
    params: &CapParams,
) -> Vec<WeightRow> {
    let tickers = market_caps.tickers();
    let mut rows = Vec::with_capacity(pairs.len());

    for pair in pairs {
        let Some(caps) = market_caps.row(pair.selection_date) else {
            warn!(selection_date = %pair.selection_date, "no market caps on selection date");
            continue;
        };
        let Some(raw) = eligible_weights(tickers, caps, params.market_cap_threshold) else {
            warn!(
                selection_date = %pair.selection_date,
                "skipping date: no valid companies after filtering"
            );
            continue;
        };

        let outcome = cap_weights(&raw, params.max_cap, params.min_cap, params.max_iterations);
        debug!(
            selection_date = %pair.selection_date,
            eligible = outcome.weights.len(),
            iterations = outcome.iterations,
            "weights capped"
        );

        let mut weights: BTreeMap<String, f64> =
            tickers.iter().map(|t| (t.clone(), 0.0)).collect();
        weights.extend(outcome.weights);
        rows.push(WeightRow {
            rebalance_date: pair.adjustment_date,
            selection_date: pair.selection_date,
            weights,
        });
    }

    if rows.is_empty() {
        warn!("no rebalancing data found, check the input criteria and data");
    }
    rows
}
