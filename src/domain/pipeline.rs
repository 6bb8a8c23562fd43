//! End-to-end index construction for a ticker request.
//!
//! Resolves the ticker universe, restricts the input tables to it, derives
//! one weight table from market caps and runs the backtest once per index
//! variant on the (possibly dividend-adjusted) prices.

use crate::domain::backtest::{BacktestConfig, BacktestResult, prepare_for_index, run_backtest};
use crate::domain::calendar::{RebalanceDatePair, resolve_rebalance_dates};
use crate::domain::capping::{CapParams, WeightRow, calculate_weights};
use crate::domain::config_validation::{resolve_scenario, resolve_variants, validate_index_config};
use crate::domain::error::IndexError;
use crate::domain::export::{Sheet, Workbook, WorkbookInputs, build_workbook, index_levels_sheet};
use crate::domain::scenario::Scenario;
use crate::domain::table::{MarketCapTable, PriceTable};
use crate::domain::total_return::{DividendInputs, IndexVariant, TaxRates, adjust_prices};
use crate::domain::universe::{Universe, parse_tickers, resolve_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::ticker_store_port::TickerSetStore;
use tracing::{info, warn};

/// Everything an index run needs besides the data.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSettings {
    pub scenario: Scenario,
    pub offset_days: i64,
    pub caps: CapParams,
    pub backtest: BacktestConfig,
    pub variants: Vec<IndexVariant>,
    pub ignore_past_dividends: bool,
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexSettings {
            scenario: Scenario::default(),
            offset_days: 0,
            caps: CapParams::default(),
            backtest: BacktestConfig::default(),
            variants: vec![IndexVariant::PriceReturn],
            ignore_past_dividends: true,
        }
    }
}

impl IndexSettings {
    /// Reads the `[index]` and `[scenario]` sections after validating them.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, IndexError> {
        validate_index_config(config)?;
        let defaults = IndexSettings::default();
        let caps = CapParams {
            market_cap_threshold: config.get_double(
                "index",
                "market_cap_threshold",
                defaults.caps.market_cap_threshold,
            ),
            max_cap: config.get_double("index", "max_cap", defaults.caps.max_cap),
            min_cap: config.get_double("index", "min_cap", defaults.caps.min_cap),
            max_iterations: config.get_int(
                "index",
                "max_iterations",
                defaults.caps.max_iterations as i64,
            ) as usize,
        };
        let backtest = BacktestConfig {
            start_level: config.get_double("index", "start_level", defaults.backtest.start_level),
            initial_divisor: config.get_double(
                "index",
                "initial_divisor",
                defaults.backtest.initial_divisor,
            ),
            first_index_date: config.get_date("index", "first_index_date"),
        };
        Ok(IndexSettings {
            scenario: resolve_scenario(config)?,
            offset_days: config.get_int("index", "offset_days", defaults.offset_days),
            caps,
            backtest,
            variants: resolve_variants(config)?,
            ignore_past_dividends: config.get_bool(
                "index",
                "ignore_past_dividends",
                defaults.ignore_past_dividends,
            ),
        })
    }

    fn needs_dividends(&self) -> bool {
        self.variants
            .iter()
            .any(|v| *v != IndexVariant::PriceReturn)
    }
}

/// One backtest per index variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRun {
    pub variant: IndexVariant,
    pub rebalance_pairs: Vec<RebalanceDatePair>,
    pub weights: Vec<WeightRow>,
    /// Prices after this variant's dividend adjustment.
    pub adjusted_prices: PriceTable,
    pub result: BacktestResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    pub runs: Vec<VariantRun>,
    pub found: Vec<String>,
    pub removed: Vec<String>,
    pub available_text: String,
    pub removed_text: String,
    /// Input tables restricted to the found tickers.
    pub prices: PriceTable,
    pub market_caps: MarketCapTable,
}

impl IndexReport {
    pub fn run(&self, variant: IndexVariant) -> Option<&VariantRun> {
        self.runs.iter().find(|r| r.variant == variant)
    }

    pub fn workbook(&self, run: &VariantRun) -> Workbook {
        let selection_dates: Vec<_> = run
            .rebalance_pairs
            .iter()
            .map(|p| p.selection_date)
            .collect();
        let inputs = WorkbookInputs {
            market_caps: &self.market_caps,
            prices: &self.prices,
            adjusted_prices: &run.adjusted_prices,
            selection_dates: &selection_dates,
        };
        build_workbook(run.variant, &inputs, &run.weights, &run.result)
    }

    /// Side-by-side month-start levels, only when several variants ran.
    pub fn index_levels(&self) -> Option<Sheet> {
        if self.runs.len() < 2 {
            return None;
        }
        let series: Vec<_> = self
            .runs
            .iter()
            .map(|run| (run.variant, run.result.monthly_series()))
            .collect();
        Some(index_levels_sheet(&series))
    }
}

/// Tickers for a request: the parsed input, or the stored set when the input
/// is empty or `default`.
pub fn requested_tickers(
    ticker_input: Option<&str>,
    store: &dyn TickerSetStore,
) -> Result<Vec<String>, IndexError> {
    if let Some(tickers) = ticker_input.and_then(parse_tickers) {
        return Ok(tickers);
    }
    let stored = store.get()?.unwrap_or_default();
    info!(count = stored.len(), "using the stored ticker set");
    Ok(parse_tickers(&stored.join(",")).unwrap_or_default())
}

/// Builds the index for `ticker_input` and remembers the tickers it used.
pub fn make_index(
    ticker_input: Option<&str>,
    settings: &IndexSettings,
    data: &dyn MarketDataPort,
    store: &dyn TickerSetStore,
) -> Result<IndexReport, IndexError> {
    let requested = requested_tickers(ticker_input, store)?;

    let all_prices = data.load_prices()?;
    let Universe { found, removed } = resolve_universe(&requested, all_prices.tickers());
    if found.is_empty() {
        return Err(IndexError::alignment(
            "none of the requested tickers have price data",
        ));
    }
    if !removed.is_empty() {
        warn!(tickers = %removed.join(", "), "requested tickers not found in price data");
    }

    let prices = all_prices.select_tickers(&found);
    let market_caps = data.load_market_caps()?.select_tickers(&found);
    info!(
        tickers = found.len(),
        scenario = %settings.scenario,
        "building index"
    );

    let pairs = resolve_rebalance_dates(
        market_caps.dates(),
        prices.dates(),
        &settings.scenario,
        settings.offset_days,
    );
    let weights = calculate_weights(&market_caps, &pairs, &settings.caps);

    let dividends = if settings.needs_dividends() {
        match data.load_dividends()? {
            Some(table) => Some(table.select_tickers(&found)),
            None => {
                return Err(IndexError::data(
                    "total-return variants need a dividend table",
                ));
            }
        }
    } else {
        None
    };
    let tax_rates = if settings.variants.contains(&IndexVariant::NetTotalReturn) {
        TaxRates::new(&data.load_countries()?, &data.load_tax_rates()?)
    } else {
        TaxRates::default()
    };
    let index_start_date = settings
        .backtest
        .first_index_date
        .or_else(|| pairs.first().map(|p| p.adjustment_date));

    let mut runs = Vec::with_capacity(settings.variants.len());
    for variant in &settings.variants {
        let inputs = dividends.as_ref().map(|table| DividendInputs {
            dividends: table,
            tax_rates: &tax_rates,
            ignore_past_dividends: settings.ignore_past_dividends,
            index_start_date,
        });
        let adjusted = adjust_prices(&prices, inputs.as_ref(), *variant);
        let prepared = prepare_for_index(&weights, &adjusted)?;
        let result = run_backtest(
            &settings.backtest,
            &prepared.weights,
            &prepared.prices,
            &prepared.rebalance_dates,
        )?;
        info!(
            %variant,
            points = result.index_series.len(),
            rebalances = prepared.rebalance_dates.len(),
            "index run complete"
        );
        runs.push(VariantRun {
            variant: *variant,
            rebalance_pairs: pairs.clone(),
            weights: prepared.weights,
            adjusted_prices: adjusted,
            result,
        });
    }

    store.set(&found)?;

    let universe = Universe { found, removed };
    Ok(IndexReport {
        available_text: universe.available_text(),
        removed_text: universe.removed_text(),
        found: universe.found,
        removed: universe.removed,
        runs,
        prices,
        market_caps,
    })
}
