//! Hand-off of the most recently used ticker set between requests.

use crate::domain::error::IndexError;

/// Remembers the last ticker list an index was built for, so a request with
/// no tickers can reuse it.
pub trait TickerSetStore {
    fn get(&self) -> Result<Option<Vec<String>>, IndexError>;

    fn set(&self, tickers: &[String]) -> Result<(), IndexError>;
}
