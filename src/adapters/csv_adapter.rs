//! CSV file market data adapter.
//!
//! Tables are wide: a `date` column followed by one column per ticker, blank
//! cells meaning "no value". The two tax mapping files are long:
//! `ticker,country` and `country,withholding_tax`.

use crate::domain::error::IndexError;
use crate::domain::table::{DateTable, DividendTable, MarketCapTable, PriceTable};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvMarketData {
    pub price_file: PathBuf,
    pub market_cap_file: PathBuf,
    pub dividend_file: Option<PathBuf>,
    pub country_file: Option<PathBuf>,
    pub tax_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct CountryRecord {
    ticker: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct TaxRecord {
    country: String,
    withholding_tax: f64,
}

impl CsvMarketData {
    pub fn new(price_file: PathBuf, market_cap_file: PathBuf) -> Self {
        Self {
            price_file,
            market_cap_file,
            dividend_file: None,
            country_file: None,
            tax_file: None,
        }
    }

    /// Reads file locations from the `[data]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, IndexError> {
        let path = |key: &str| {
            config
                .get_string("data", key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        };
        let required = |key: &str| {
            path(key).ok_or_else(|| IndexError::ConfigMissing {
                section: "data".to_string(),
                key: key.to_string(),
            })
        };
        Ok(Self {
            price_file: required("price_file")?,
            market_cap_file: required("market_cap_file")?,
            dividend_file: path("dividend_file"),
            country_file: path("country_file"),
            tax_file: path("tax_file"),
        })
    }

    fn optional_file<'a>(file: Option<&'a PathBuf>, what: &str) -> Option<&'a Path> {
        if file.is_none() {
            debug!("no {what} file configured");
        }
        file.map(PathBuf::as_path)
    }
}

fn read_file(path: &Path) -> Result<String, IndexError> {
    fs::read_to_string(path).map_err(|e| {
        IndexError::data(format!("failed to read {}: {}", path.display(), e))
    })
}

fn parse_date(value: &str, path: &Path) -> Result<NaiveDate, IndexError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        IndexError::data(format!(
            "invalid date '{}' in {}: {}",
            value,
            path.display(),
            e
        ))
    })
}

fn parse_cell(value: &str, path: &Path, date: NaiveDate) -> Result<Option<f64>, IndexError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<f64>().map(Some).map_err(|e| {
        IndexError::data(format!(
            "invalid value '{}' on {} in {}: {}",
            value,
            date,
            path.display(),
            e
        ))
    })
}

/// Reads a wide `date,<ticker>...` table. Rows may come in any date order;
/// ticker headers are upper-cased.
pub fn read_wide_table(path: &Path) -> Result<DateTable, IndexError> {
    let content = read_file(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| IndexError::data(format!("CSV header error in {}: {}", path.display(), e)))?
        .clone();
    if headers.is_empty() {
        return Err(IndexError::data(format!("{} has no header", path.display())));
    }
    let tickers: Vec<String> = headers.iter().skip(1).map(|t| t.to_uppercase()).collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| {
            IndexError::data(format!("CSV parse error in {}: {}", path.display(), e))
        })?;
        let date_str = record
            .get(0)
            .ok_or_else(|| IndexError::data(format!("missing date column in {}", path.display())))?;
        let date = parse_date(date_str, path)?;
        let values = (1..=tickers.len())
            .map(|i| parse_cell(record.get(i).unwrap_or(""), path, date))
            .collect::<Result<Vec<_>, _>>()?;
        records.push((date, values));
    }

    records.sort_by_key(|(date, _)| *date);
    let (dates, rows): (Vec<NaiveDate>, Vec<Vec<Option<f64>>>) = records.into_iter().unzip();
    DateTable::new(dates, tickers, rows)
}

fn read_records<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, IndexError> {
    let content = read_file(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    rdr.deserialize()
        .map(|r| {
            r.map_err(|e| IndexError::data(format!("CSV parse error in {}: {}", path.display(), e)))
        })
        .collect()
}

impl MarketDataPort for CsvMarketData {
    fn load_prices(&self) -> Result<PriceTable, IndexError> {
        read_wide_table(&self.price_file)
    }

    fn load_market_caps(&self) -> Result<MarketCapTable, IndexError> {
        read_wide_table(&self.market_cap_file)
    }

    fn load_dividends(&self) -> Result<Option<DividendTable>, IndexError> {
        Self::optional_file(self.dividend_file.as_ref(), "dividend")
            .map(read_wide_table)
            .transpose()
    }

    fn load_countries(&self) -> Result<HashMap<String, String>, IndexError> {
        let Some(path) = Self::optional_file(self.country_file.as_ref(), "country") else {
            return Ok(HashMap::new());
        };
        Ok(read_records::<CountryRecord>(path)?
            .into_iter()
            .map(|r| (r.ticker.to_uppercase(), r.country))
            .collect())
    }

    fn load_tax_rates(&self) -> Result<HashMap<String, f64>, IndexError> {
        let Some(path) = Self::optional_file(self.tax_file.as_ref(), "tax") else {
            return Ok(HashMap::new());
        };
        Ok(read_records::<TaxRecord>(path)?
            .into_iter()
            .map(|r| (r.country, r.withholding_tax))
            .collect())
    }
}
