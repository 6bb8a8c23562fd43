//! Dividend-adjusted price series for total-return index variants.

use crate::domain::error::IndexError;
use crate::domain::table::{DividendTable, PriceTable};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexVariant {
    PriceReturn,
    GrossTotalReturn,
    NetTotalReturn,
}

impl IndexVariant {
    pub fn code(&self) -> &'static str {
        match self {
            IndexVariant::PriceReturn => "PR",
            IndexVariant::GrossTotalReturn => "GTR",
            IndexVariant::NetTotalReturn => "NTR",
        }
    }
}

impl FromStr for IndexVariant {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PR" => Ok(IndexVariant::PriceReturn),
            "GTR" => Ok(IndexVariant::GrossTotalReturn),
            "NTR" => Ok(IndexVariant::NetTotalReturn),
            _ => Err(IndexError::UnknownVariant {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for IndexVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Withholding tax rate per ticker, resolved through its country of
/// incorporation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxRates {
    by_ticker: HashMap<String, f64>,
}

impl TaxRates {
    pub fn new(countries: &HashMap<String, String>, rates: &HashMap<String, f64>) -> Self {
        let by_ticker = countries
            .iter()
            .filter_map(|(ticker, country)| rates.get(country).map(|r| (ticker.clone(), *r)))
            .collect();
        Self { by_ticker }
    }

    /// Rate for `ticker`; unknown tickers are not taxed.
    pub fn rate(&self, ticker: &str) -> f64 {
        match self.by_ticker.get(ticker) {
            Some(rate) => *rate,
            None => {
                debug!(ticker, "no withholding tax rate, dividends taken gross");
                0.0
            }
        }
    }
}

/// Inputs that only total-return variants need.
#[derive(Debug, Clone)]
pub struct DividendInputs<'a> {
    pub dividends: &'a DividendTable,
    pub tax_rates: &'a TaxRates,
    pub ignore_past_dividends: bool,
    pub index_start_date: Option<NaiveDate>,
}

/// Returns the price table for `variant`. Price-return is the identity;
/// total-return variants reinvest dividends (net of withholding tax for NTR).
pub fn adjust_prices(
    prices: &PriceTable,
    inputs: Option<&DividendInputs<'_>>,
    variant: IndexVariant,
) -> PriceTable {
    let inputs = match (variant, inputs) {
        (IndexVariant::PriceReturn, _) | (_, None) => return prices.clone(),
        (_, Some(inputs)) => inputs,
    };

    let cutoff = match (inputs.ignore_past_dividends, inputs.index_start_date) {
        (true, Some(start)) => {
            info!(%start, "ignoring dividends before the index start date");
            Some(start)
        }
        _ => {
            info!("dividends before the index start date are included");
            None
        }
    };

    prices.map_columns(|ticker, column| {
        let tax = match variant {
            IndexVariant::NetTotalReturn => inputs.tax_rates.rate(ticker),
            _ => 0.0,
        };
        let dividends: Vec<f64> = prices
            .dates()
            .iter()
            .map(|date| {
                if cutoff.is_some_and(|c| *date < c) {
                    return 0.0;
                }
                inputs.dividends.value(*date, ticker).unwrap_or(0.0) * (1.0 - tax)
            })
            .collect();
        reinvest_dividends(column, &dividends)
    })
}

/// Sequential reinvestment fold for one ticker.
///
/// `adj[0] = div[0] + p[0] * (1 + r[0])`, then
/// `adj[t] = div[t] + adj[t-1] * (1 + r[t])`, where `r` is the raw price
/// return (zero when either price is missing). A ticker that starts trading
/// after the first date is seeded with its first raw price. Exact zeros in the
/// result mean "no price" and come back as `None`.
pub fn reinvest_dividends(prices: &[Option<f64>], dividends: &[f64]) -> Vec<Option<f64>> {
    let first_valid = prices.iter().position(|p| p.is_some());
    let mut out = Vec::with_capacity(prices.len());
    let mut previous = 0.0_f64;

    for (t, price) in prices.iter().enumerate() {
        let ret = match (t.checked_sub(1).and_then(|p| prices[p]), price) {
            (Some(prev), Some(cur)) if prev != 0.0 => cur / prev - 1.0,
            _ => 0.0,
        };
        let ret = if ret.is_finite() { ret } else { 0.0 };
        let dividend = dividends.get(t).copied().unwrap_or(0.0);

        let value = if t == 0 {
            let p0 = price.unwrap_or(0.0);
            dividend + p0 * (1.0 + ret)
        } else {
            let seed = if Some(t) == first_valid {
                price.unwrap_or(0.0)
            } else {
                0.0
            };
            dividend + previous * (1.0 + ret) + seed
        };

        out.push(value);
        previous = value;
    }

    out.into_iter()
        .map(|v| if v == 0.0 { None } else { Some(v) })
        .collect()
}
