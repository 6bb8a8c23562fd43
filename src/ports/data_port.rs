//! Market data access port trait.

use crate::domain::error::IndexError;
use crate::domain::table::{DividendTable, MarketCapTable, PriceTable};
use std::collections::HashMap;

/// Source of the input tables for an index run. Price and market-cap tables
/// are expected on a common date axis, already currency-normalised.
pub trait MarketDataPort {
    fn load_prices(&self) -> Result<PriceTable, IndexError>;

    fn load_market_caps(&self) -> Result<MarketCapTable, IndexError>;

    /// Dividends per date and ticker; `None` when no dividend source exists.
    fn load_dividends(&self) -> Result<Option<DividendTable>, IndexError>;

    /// Country of incorporation per ticker.
    fn load_countries(&self) -> Result<HashMap<String, String>, IndexError>;

    /// Dividend withholding tax rate per country, as a fraction.
    fn load_tax_rates(&self) -> Result<HashMap<String, f64>, IndexError>;
}
