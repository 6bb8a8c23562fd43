//! Date × ticker value tables (prices, market caps, dividends).
//!
//! One row per date, one column per ticker, `None` for missing values. Dates
//! are strictly increasing and the ticker set is fixed once the table is built.

use crate::domain::error::IndexError;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct DateTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
    date_index: HashMap<NaiveDate, usize>,
    ticker_index: HashMap<String, usize>,
}

/// Closing prices per date and ticker.
pub type PriceTable = DateTable;
/// Market capitalisations per date and ticker.
pub type MarketCapTable = DateTable;
/// Cash dividends per date and ticker (ex-date convention).
pub type DividendTable = DateTable;

impl DateTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, IndexError> {
        if dates.len() != rows.len() {
            return Err(IndexError::data(format!(
                "{} dates but {} rows",
                dates.len(),
                rows.len()
            )));
        }
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(IndexError::data(format!(
                "dates must be strictly increasing ({} followed by {})",
                pair[0], pair[1]
            )));
        }
        for (date, row) in dates.iter().zip(&rows) {
            if row.len() != tickers.len() {
                return Err(IndexError::data(format!(
                    "row {} has {} values, expected {}",
                    date,
                    row.len(),
                    tickers.len()
                )));
            }
        }

        let mut ticker_index = HashMap::with_capacity(tickers.len());
        for (i, ticker) in tickers.iter().enumerate() {
            if ticker_index.insert(ticker.clone(), i).is_some() {
                return Err(IndexError::data(format!("duplicate ticker column: {ticker}")));
            }
        }
        let date_index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        Ok(Self {
            dates,
            tickers,
            rows,
            date_index,
            ticker_index,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.date_index.contains_key(&date)
    }

    pub fn date_position(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn ticker_position(&self, ticker: &str) -> Option<usize> {
        self.ticker_index.get(ticker).copied()
    }

    /// All values on `date`, in ticker order.
    pub fn row(&self, date: NaiveDate) -> Option<&[Option<f64>]> {
        self.date_position(date).map(|i| self.rows[i].as_slice())
    }

    pub fn row_at(&self, index: usize) -> &[Option<f64>] {
        &self.rows[index]
    }

    pub fn value(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        let row = self.date_position(date)?;
        let col = self.ticker_position(ticker)?;
        self.rows[row][col]
    }

    /// Restricts the table to `tickers`, in the given order. Unknown tickers
    /// are ignored.
    pub fn select_tickers(&self, tickers: &[String]) -> DateTable {
        let cols: Vec<(String, usize)> = tickers
            .iter()
            .filter_map(|t| self.ticker_position(t).map(|i| (t.clone(), i)))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| cols.iter().map(|(_, i)| row[*i]).collect())
            .collect();
        let names = cols.into_iter().map(|(t, _)| t).collect();
        Self::from_parts(self.dates.clone(), names, rows)
    }

    /// Rows dated on or after `start`.
    pub fn from_date(&self, start: NaiveDate) -> DateTable {
        let first = self.dates.partition_point(|d| *d < start);
        Self::from_parts(
            self.dates[first..].to_vec(),
            self.tickers.clone(),
            self.rows[first..].to_vec(),
        )
    }

    /// Builds a table with the same axes and values computed per ticker column.
    pub fn map_columns<F>(&self, mut f: F) -> DateTable
    where
        F: FnMut(&str, &[Option<f64>]) -> Vec<Option<f64>>,
    {
        let mut rows = vec![vec![None; self.tickers.len()]; self.dates.len()];
        for (col, ticker) in self.tickers.iter().enumerate() {
            let column: Vec<Option<f64>> = self.rows.iter().map(|row| row[col]).collect();
            let mapped = f(ticker, &column);
            for (row, value) in rows.iter_mut().zip(mapped) {
                row[col] = value;
            }
        }
        Self {
            dates: self.dates.clone(),
            tickers: self.tickers.clone(),
            rows,
            date_index: self.date_index.clone(),
            ticker_index: self.ticker_index.clone(),
        }
    }

    // Axes taken from an already validated table.
    fn from_parts(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Self {
        let date_index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let ticker_index = tickers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self {
            dates,
            tickers,
            rows,
            date_index,
            ticker_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> DateTable {
        DateTable::new(
            vec![d(1), d(2), d(3)],
            vec!["AAA".into(), "BBB".into()],
            vec![
                vec![Some(10.0), None],
                vec![Some(11.0), Some(5.0)],
                vec![Some(12.0), Some(6.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn lookup_by_date_and_ticker() {
        let t = sample();
        assert_eq!(t.value(d(2), "AAA"), Some(11.0));
        assert_eq!(t.value(d(1), "BBB"), None);
        assert_eq!(t.value(d(9), "AAA"), None);
        assert_eq!(t.value(d(1), "ZZZ"), None);
        assert_eq!(t.row(d(3)), Some(&[Some(12.0), Some(6.0)][..]));
    }

    #[test]
    fn rejects_unsorted_dates() {
        let err = DateTable::new(
            vec![d(2), d(1)],
            vec!["AAA".into()],
            vec![vec![None], vec![None]],
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::Data { .. }));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let result = DateTable::new(
            vec![d(1), d(1)],
            vec!["AAA".into()],
            vec![vec![None], vec![None]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_ragged_rows() {
        let result = DateTable::new(
            vec![d(1)],
            vec!["AAA".into(), "BBB".into()],
            vec![vec![Some(1.0)]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_duplicate_tickers() {
        let result = DateTable::new(
            vec![d(1)],
            vec!["AAA".into(), "AAA".into()],
            vec![vec![Some(1.0), Some(2.0)]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn select_tickers_keeps_requested_order() {
        let t = sample().select_tickers(&["BBB".into(), "NOPE".into(), "AAA".into()]);
        assert_eq!(t.tickers(), &["BBB".to_string(), "AAA".to_string()]);
        assert_eq!(t.value(d(2), "BBB"), Some(5.0));
        assert_eq!(t.row(d(1)), Some(&[None, Some(10.0)][..]));
    }

    #[test]
    fn from_date_drops_earlier_rows() {
        let t = sample().from_date(d(2));
        assert_eq!(t.dates(), &[d(2), d(3)]);
        assert_eq!(t.value(d(2), "AAA"), Some(11.0));
        assert!(!t.contains_date(d(1)));
    }

    #[test]
    fn map_columns_applies_per_ticker() {
        let t = sample().map_columns(|_, col| col.iter().map(|v| v.map(|x| x * 2.0)).collect());
        assert_eq!(t.value(d(3), "AAA"), Some(24.0));
        assert_eq!(t.value(d(1), "BBB"), None);
    }
}
