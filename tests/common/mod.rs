#![allow(dead_code)]

use chrono::NaiveDate;
use indexmaker::domain::error::IndexError;
use indexmaker::domain::export::{Sheet, Workbook};
use indexmaker::domain::table::{DateTable, DividendTable, MarketCapTable, PriceTable};
use indexmaker::domain::total_return::IndexVariant;
use indexmaker::ports::data_port::MarketDataPort;
use indexmaker::ports::export_port::ExportPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Every calendar day from `start` to `end` inclusive.
pub fn calendar(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|x| *x <= end).collect()
}

pub fn names(tickers: &[&str]) -> Vec<String> {
    tickers.iter().map(|t| t.to_string()).collect()
}

/// Builds a table by calling `value(date, ticker_index)` for every cell.
pub fn table(
    dates: &[NaiveDate],
    tickers: &[&str],
    value: impl Fn(NaiveDate, usize) -> Option<f64>,
) -> DateTable {
    let rows = dates
        .iter()
        .map(|date| (0..tickers.len()).map(|i| value(*date, i)).collect())
        .collect();
    DateTable::new(dates.to_vec(), names(tickers), rows).unwrap()
}

/// First half of 2024, three tickers:
/// - A at 10, stepping to 11 on 2024-02-10; market cap 3000
/// - B flat at 20; market cap 1000
/// - C flat at 5; market cap 10, below the default inclusion threshold
pub fn sample_prices() -> PriceTable {
    let dates = calendar(d(2024, 1, 1), d(2024, 6, 30));
    table(&dates, &["A", "B", "C"], |date, i| match i {
        0 if date >= d(2024, 2, 10) => Some(11.0),
        0 => Some(10.0),
        1 => Some(20.0),
        _ => Some(5.0),
    })
}

pub fn sample_market_caps() -> MarketCapTable {
    let dates = calendar(d(2024, 1, 1), d(2024, 6, 30));
    table(&dates, &["A", "B", "C"], |_, i| Some([3000.0, 1000.0, 10.0][i]))
}

/// One dividend of `amount` on A, paid on `date`.
pub fn dividend_on(date: NaiveDate, amount: f64) -> DividendTable {
    let dates = calendar(d(2024, 1, 1), d(2024, 6, 30));
    table(&dates, &["A"], |x, _| (x == date).then_some(amount))
}

/// Wide CSV text for a table; missing values are blank cells.
pub fn wide_csv(table: &DateTable) -> String {
    let mut out = String::from("date");
    for ticker in table.tickers() {
        out.push(',');
        out.push_str(ticker);
    }
    out.push('\n');
    for (i, date) in table.dates().iter().enumerate() {
        out.push_str(&date.to_string());
        for value in table.row_at(i) {
            out.push(',');
            if let Some(v) = value {
                out.push_str(&v.to_string());
            }
        }
        out.push('\n');
    }
    out
}

pub struct MockMarketData {
    pub prices: PriceTable,
    pub market_caps: MarketCapTable,
    pub dividends: Option<DividendTable>,
    pub countries: HashMap<String, String>,
    pub tax_rates: HashMap<String, f64>,
    pub fail_prices: Option<String>,
}

impl MockMarketData {
    pub fn new(prices: PriceTable, market_caps: MarketCapTable) -> Self {
        Self {
            prices,
            market_caps,
            dividends: None,
            countries: HashMap::new(),
            tax_rates: HashMap::new(),
            fail_prices: None,
        }
    }

    pub fn sample() -> Self {
        Self::new(sample_prices(), sample_market_caps())
    }

    pub fn with_dividends(mut self, dividends: DividendTable) -> Self {
        self.dividends = Some(dividends);
        self
    }

    pub fn with_tax(mut self, ticker: &str, country: &str, rate: f64) -> Self {
        self.countries.insert(ticker.to_string(), country.to_string());
        self.tax_rates.insert(country.to_string(), rate);
        self
    }

    pub fn with_price_error(mut self, reason: &str) -> Self {
        self.fail_prices = Some(reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn load_prices(&self) -> Result<PriceTable, IndexError> {
        match &self.fail_prices {
            Some(reason) => Err(IndexError::data(reason.clone())),
            None => Ok(self.prices.clone()),
        }
    }

    fn load_market_caps(&self) -> Result<MarketCapTable, IndexError> {
        Ok(self.market_caps.clone())
    }

    fn load_dividends(&self) -> Result<Option<DividendTable>, IndexError> {
        Ok(self.dividends.clone())
    }

    fn load_countries(&self) -> Result<HashMap<String, String>, IndexError> {
        Ok(self.countries.clone())
    }

    fn load_tax_rates(&self) -> Result<HashMap<String, f64>, IndexError> {
        Ok(self.tax_rates.clone())
    }
}

/// Exporter that only records what it was asked to write.
#[derive(Default)]
pub struct RecordingExporter {
    pub written: RefCell<Vec<(IndexVariant, PathBuf, usize)>>,
    /// Header of every index levels sheet written.
    pub levels: RefCell<Vec<Vec<String>>>,
}

impl ExportPort for RecordingExporter {
    fn write(&self, workbook: &Workbook, output_dir: &Path) -> Result<(), IndexError> {
        self.written.borrow_mut().push((
            workbook.variant,
            output_dir.to_path_buf(),
            workbook.sheets.len(),
        ));
        Ok(())
    }

    fn write_index_levels(&self, sheet: &Sheet, _output_dir: &Path) -> Result<(), IndexError> {
        self.levels.borrow_mut().push(sheet.header.clone());
        Ok(())
    }
}
