//! Rebalance calendar: selection dates from a scenario, adjustment dates from
//! the price calendar, and the date range an index run iterates over.

use crate::domain::error::IndexError;
use crate::domain::scenario::{Occurrence, Scenario};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;
use tracing::warn;

/// Date the weights are decided on and the later traded date they take
/// effect on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RebalanceDatePair {
    pub selection_date: NaiveDate,
    pub adjustment_date: NaiveDate,
}

/// Picks the scenario's selection dates out of the market-cap calendar.
pub fn selection_dates(marketcap_dates: &[NaiveDate], scenario: &Scenario) -> Vec<NaiveDate> {
    let mut by_month: BTreeMap<(i32, u32), Vec<NaiveDate>> = BTreeMap::new();
    for date in marketcap_dates {
        if date.weekday() == scenario.weekday && scenario.frequency.includes_month(date.month()) {
            by_month
                .entry((date.year(), date.month()))
                .or_default()
                .push(*date);
        }
    }

    by_month
        .into_values()
        .filter_map(|mut days| {
            days.sort_unstable();
            match scenario.occurrence {
                Occurrence::Last => days.last().copied(),
                Occurrence::Nth(n) => days.get(usize::from(n).saturating_sub(1)).copied(),
            }
        })
        .collect()
}

/// Resolves selection dates and maps each to the first price date on or after
/// `selection + offset_days`. Selections with no such price date are dropped.
pub fn resolve_rebalance_dates(
    marketcap_dates: &[NaiveDate],
    price_dates: &[NaiveDate],
    scenario: &Scenario,
    offset_days: i64,
) -> Vec<RebalanceDatePair> {
    let mut calendar = price_dates.to_vec();
    calendar.sort_unstable();
    calendar.dedup();

    let mut pairs = Vec::new();
    for selection_date in selection_dates(marketcap_dates, scenario) {
        let target = selection_date + Duration::days(offset_days);
        let idx = calendar.partition_point(|d| *d < target);
        match calendar.get(idx) {
            Some(&adjustment_date) => pairs.push(RebalanceDatePair {
                selection_date,
                adjustment_date,
            }),
            None => warn!(
                %selection_date,
                "skipping rebalance: no price data on or after {target}"
            ),
        }
    }
    pairs
}

/// Dates that frame one index run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDates {
    /// First index date after clamping/snapping to the price calendar.
    pub first_date: NaiveDate,
    /// Latest rebalance date at or before `first_date`.
    pub last_rebal_date: NaiveDate,
    /// Price dates from `last_rebal_date` onwards.
    pub gross_dates: Vec<NaiveDate>,
}

/// Frames one index run on the price calendar. `price_dates` is expected in
/// ascending order; `gross_dates` keeps the order it is given in.
pub fn set_index_dates(
    price_dates: &[NaiveDate],
    rebal_dates: &[NaiveDate],
    first_date: NaiveDate,
) -> Result<IndexDates, IndexError> {
    let Some(earliest) = price_dates.iter().copied().min() else {
        return Err(IndexError::alignment("price calendar is empty"));
    };

    let mut first = first_date.max(earliest);
    if !price_dates.contains(&first) {
        let Some(snapped) = price_dates.iter().copied().filter(|d| *d < first).max() else {
            return Err(IndexError::alignment(format!("no price date on or before {first}")));
        };
        warn!(
            requested = %first,
            using = %snapped,
            "no price data on the first index date, using the previous available date"
        );
        first = snapped;
    }

    let last_rebal_date = rebal_dates
        .iter()
        .copied()
        .filter(|d| *d <= first)
        .max()
        .unwrap_or(first);

    Ok(IndexDates {
        first_date: first,
        last_rebal_date,
        gross_dates: price_dates
            .iter()
            .copied()
            .filter(|d| *d >= last_rebal_date)
            .collect(),
    })
}
