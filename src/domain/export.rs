//! Audit workbook: the tables of one index run laid out as named sheets.
//!
//! Sheet names, order and visibility are a compatibility surface for
//! downstream tooling that reads the exported files.

use crate::domain::backtest::{BacktestResult, DailyValues, IndexPoint};
use crate::domain::capping::WeightRow;
use crate::domain::table::{DateTable, MarketCapTable, PriceTable};
use crate::domain::total_return::IndexVariant;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const SHEET_INDEX_LEVEL: &str = "Index Level";
pub const SHEET_MARKET_CAP: &str = "MarketCap";
pub const SHEET_PRICES: &str = "Prices";
pub const SHEET_PRICES_BACKTESTING: &str = "Prices - Backtesting";
pub const SHEET_MCAP_SELECTION: &str = "MCap - Selection Date";
pub const SHEET_WEIGHTS_REBALANCING: &str = "Weights - Rebalancing Date";
pub const SHEET_SHARES: &str = "Calculated Shares";
pub const SHEET_WEIGHTS: &str = "Calculated Weights";
/// Month-start levels of every variant side by side.
pub const SHEET_INDEX_LEVELS: &str = "Index Levels";

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub hidden: bool,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    pub variant: IndexVariant,
    pub sheets: Vec<Sheet>,
    /// Final-day weights, written separately as an upload file.
    pub last_day_weights: Vec<(String, f64)>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// Input tables of a run, exported next to its results.
#[derive(Debug, Clone, Copy)]
pub struct WorkbookInputs<'a> {
    pub market_caps: &'a MarketCapTable,
    pub prices: &'a PriceTable,
    /// Prices after the variant's dividend adjustment.
    pub adjusted_prices: &'a PriceTable,
    pub selection_dates: &'a [NaiveDate],
}

pub fn build_workbook(
    variant: IndexVariant,
    inputs: &WorkbookInputs,
    weights: &[WeightRow],
    result: &BacktestResult,
) -> Workbook {
    let first_rebalance = weights.iter().map(|w| w.rebalance_date).min();
    let sheets = vec![
        index_sheet(&result.monthly_series()),
        table_sheet(SHEET_MARKET_CAP, true, inputs.market_caps, |_| true),
        table_sheet(SHEET_PRICES, true, inputs.prices, |_| true),
        table_sheet(SHEET_PRICES_BACKTESTING, false, inputs.adjusted_prices, |date| {
            first_rebalance.is_some_and(|first| date >= first)
        }),
        table_sheet(SHEET_MCAP_SELECTION, true, inputs.market_caps, |date| {
            inputs.selection_dates.contains(&date)
        }),
        weights_sheet(&result.tickers, weights),
        daily_sheet(SHEET_SHARES, &result.tickers, &result.daily_shares),
        daily_sheet(SHEET_WEIGHTS, &result.tickers, &result.daily_weights),
    ];
    Workbook {
        variant,
        sheets,
        last_day_weights: result.last_day_weights.clone(),
    }
}

/// One `Date` column plus one level column per variant, over the union of
/// their month-start dates. A variant without a level on a date leaves the
/// cell blank.
pub fn index_levels_sheet(series: &[(IndexVariant, Vec<IndexPoint>)]) -> Sheet {
    let mut header = vec!["Date".to_string()];
    header.extend(series.iter().map(|(variant, _)| variant.code().to_string()));

    let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for (i, (_, points)) in series.iter().enumerate() {
        for point in points {
            by_date
                .entry(point.date)
                .or_insert_with(|| vec![None; series.len()])[i] = Some(point.level);
        }
    }
    let rows = by_date
        .into_iter()
        .map(|(date, levels)| {
            let mut cells = vec![date.to_string()];
            cells.extend(levels.into_iter().map(cell));
            cells
        })
        .collect();
    Sheet {
        name: SHEET_INDEX_LEVELS.to_string(),
        hidden: false,
        header,
        rows,
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn table_sheet(
    name: &str,
    hidden: bool,
    table: &DateTable,
    keep: impl Fn(NaiveDate) -> bool,
) -> Sheet {
    let mut header = vec!["Date".to_string()];
    header.extend(table.tickers().iter().cloned());
    let rows = table
        .dates()
        .iter()
        .enumerate()
        .filter(|(_, date)| keep(**date))
        .map(|(i, date)| {
            let mut cells = vec![date.to_string()];
            cells.extend(table.row_at(i).iter().map(|v| cell(*v)));
            cells
        })
        .collect();
    Sheet {
        name: name.to_string(),
        hidden,
        header,
        rows,
    }
}

fn index_sheet(points: &[IndexPoint]) -> Sheet {
    Sheet {
        name: SHEET_INDEX_LEVEL.to_string(),
        hidden: false,
        header: vec!["Date".to_string(), "Index Level".to_string()],
        rows: points
            .iter()
            .map(|p| vec![p.date.to_string(), p.level.to_string()])
            .collect(),
    }
}

fn weights_sheet(tickers: &[String], weights: &[WeightRow]) -> Sheet {
    let mut header = vec!["Rebalance Date".to_string(), "Selection Date".to_string()];
    header.extend(tickers.iter().cloned());
    let rows = weights
        .iter()
        .map(|row| {
            let mut cells = vec![row.rebalance_date.to_string(), row.selection_date.to_string()];
            cells.extend(tickers.iter().map(|t| row.weight(t).to_string()));
            cells
        })
        .collect();
    Sheet {
        name: SHEET_WEIGHTS_REBALANCING.to_string(),
        hidden: false,
        header,
        rows,
    }
}

fn daily_sheet(name: &str, tickers: &[String], days: &[DailyValues]) -> Sheet {
    let mut header = vec!["Date".to_string()];
    header.extend(tickers.iter().cloned());
    let rows = days
        .iter()
        .map(|day| {
            let mut cells = vec![day.date.to_string()];
            cells.extend(day.values.iter().map(|v| v.to_string()));
            cells
        })
        .collect();
    Sheet {
        name: name.to_string(),
        hidden: true,
        header,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{BacktestConfig, run_backtest};
    use crate::domain::table::DateTable;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    struct Sample {
        caps: MarketCapTable,
        prices: PriceTable,
        weights: Vec<WeightRow>,
        result: BacktestResult,
    }

    impl Sample {
        fn workbook(&self) -> Workbook {
            let inputs = WorkbookInputs {
                market_caps: &self.caps,
                prices: &self.prices,
                adjusted_prices: &self.prices,
                selection_dates: &[d(1, 26)],
            };
            build_workbook(IndexVariant::PriceReturn, &inputs, &self.weights, &self.result)
        }
    }

    /// Prices from 2024-01-26; the only rebalance is 2024-01-30.
    fn sample() -> Sample {
        let dates: Vec<NaiveDate> = d(1, 26).iter_days().take(8).collect();
        let tickers = vec!["A".to_string(), "B".to_string()];
        let prices = DateTable::new(
            dates.clone(),
            tickers.clone(),
            (0..8).map(|i| vec![Some(10.0 + i as f64), Some(20.0)]).collect(),
        )
        .unwrap();
        let caps = DateTable::new(
            dates.clone(),
            tickers,
            (0..8).map(|_| vec![Some(300.0), None]).collect(),
        )
        .unwrap();
        let weights = vec![WeightRow {
            rebalance_date: d(1, 30),
            selection_date: d(1, 26),
            weights: [("A".to_string(), 0.5), ("B".to_string(), 0.5)].into(),
        }];
        let backtest_prices = prices.from_date(d(1, 30));
        let result =
            run_backtest(&BacktestConfig::default(), &weights, &backtest_prices, &[d(1, 30)])
                .unwrap();
        Sample {
            caps,
            prices,
            weights,
            result,
        }
    }

    #[test]
    fn sheets_in_order_with_visibility() {
        let wb = sample().workbook();
        let layout: Vec<(&str, bool)> =
            wb.sheets.iter().map(|s| (s.name.as_str(), s.hidden)).collect();
        assert_eq!(
            layout,
            vec![
                (SHEET_INDEX_LEVEL, false),
                (SHEET_MARKET_CAP, true),
                (SHEET_PRICES, true),
                (SHEET_PRICES_BACKTESTING, false),
                (SHEET_MCAP_SELECTION, true),
                (SHEET_WEIGHTS_REBALANCING, false),
                (SHEET_SHARES, true),
                (SHEET_WEIGHTS, true),
            ]
        );
    }

    #[test]
    fn index_sheet_holds_month_starts() {
        let wb = sample().workbook();
        let sheet = wb.sheet(SHEET_INDEX_LEVEL).unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0][0], "2024-02-01");
    }

    #[test]
    fn daily_sheets_have_one_row_per_day() {
        let wb = sample().workbook();
        let shares = wb.sheet(SHEET_SHARES).unwrap();
        assert_eq!(shares.header, vec!["Date", "A", "B"]);
        assert_eq!(shares.rows.len(), 4);
        let rebal = wb.sheet(SHEET_WEIGHTS_REBALANCING).unwrap();
        assert_eq!(rebal.rows[0], vec!["2024-01-30", "2024-01-26", "0.5", "0.5"]);
        assert_eq!(wb.last_day_weights.len(), 2);
    }

    #[test]
    fn input_sheets_cover_their_date_ranges() {
        let wb = sample().workbook();
        assert_eq!(wb.sheet(SHEET_MARKET_CAP).unwrap().rows.len(), 8);
        assert_eq!(wb.sheet(SHEET_PRICES).unwrap().rows.len(), 8);

        let backtesting = wb.sheet(SHEET_PRICES_BACKTESTING).unwrap();
        assert_eq!(backtesting.rows.len(), 4);
        assert_eq!(backtesting.rows[0], vec!["2024-01-30", "14", "20"]);

        let selection = wb.sheet(SHEET_MCAP_SELECTION).unwrap();
        assert_eq!(selection.header, vec!["Date", "A", "B"]);
        // missing market caps stay blank
        assert_eq!(selection.rows, vec![vec!["2024-01-26", "300", ""]]);
    }

    #[test]
    fn index_levels_align_variants_by_date() {
        let point = |m, day, level| IndexPoint {
            date: d(m, day),
            level,
        };
        let sheet = index_levels_sheet(&[
            (IndexVariant::PriceReturn, vec![point(2, 1, 100.0), point(3, 1, 101.0)]),
            (IndexVariant::GrossTotalReturn, vec![point(3, 1, 102.5)]),
        ]);
        assert_eq!(sheet.name, SHEET_INDEX_LEVELS);
        assert!(!sheet.hidden);
        assert_eq!(sheet.header, vec!["Date", "PR", "GTR"]);
        assert_eq!(
            sheet.rows,
            vec![
                vec!["2024-02-01", "100", ""],
                vec!["2024-03-01", "101", "102.5"],
            ]
        );
    }
}
