//! Configuration validation.
//!
//! Checks the `[data]`, `[index]` and `[scenario]` sections before any data
//! is loaded, so a bad value fails fast with the key that caused it.

use crate::domain::error::IndexError;
use crate::domain::scenario::{DEFAULT_SCENARIO_ID, Frequency, Occurrence, Scenario};
use crate::domain::total_return::IndexVariant;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub fn validate_index_config(config: &dyn ConfigPort) -> Result<(), IndexError> {
    validate_start_level(config)?;
    validate_initial_divisor(config)?;
    validate_threshold(config)?;
    validate_caps(config)?;
    validate_max_iterations(config)?;
    validate_offset_days(config)?;
    validate_first_index_date(config)?;
    resolve_scenario(config)?;
    resolve_variants(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), IndexError> {
    require_path(config, "price_file")?;
    require_path(config, "market_cap_file")?;

    let variants = resolve_variants(config)?;
    if variants.iter().any(|v| *v != IndexVariant::PriceReturn) {
        require_path(config, "dividend_file")?;
    }
    if variants.contains(&IndexVariant::NetTotalReturn) {
        require_path(config, "country_file")?;
        require_path(config, "tax_file")?;
    }
    Ok(())
}

/// The rebalancing scenario: a custom `[scenario]` section when it names a
/// frequency, otherwise the `[index] scenario` id (default 29).
pub fn resolve_scenario(config: &dyn ConfigPort) -> Result<Scenario, IndexError> {
    let custom = config
        .get_string("scenario", "frequency")
        .filter(|f| !f.trim().is_empty());
    let Some(frequency) = custom else {
        let id = parse_value::<i64>(config, "index", "scenario")?.unwrap_or(DEFAULT_SCENARIO_ID);
        return Scenario::from_id(id);
    };

    let occurrence = match config.get_string("scenario", "occurrence") {
        Some(value) => value.parse::<Occurrence>()?,
        None => {
            return Err(IndexError::ConfigMissing {
                section: "scenario".to_string(),
                key: "occurrence".to_string(),
            });
        }
    };
    let months = parse_month_pair(config)?;
    Ok(Scenario {
        occurrence,
        frequency: Frequency::parse(&frequency, months)?,
        ..Scenario::default()
    })
}

/// Index variants to build, in configured order; `PR` when none are listed.
pub fn resolve_variants(config: &dyn ConfigPort) -> Result<Vec<IndexVariant>, IndexError> {
    let mut variants = Vec::new();
    for item in config.get_list("index", "variants") {
        let variant = item.parse::<IndexVariant>()?;
        if !variants.contains(&variant) {
            variants.push(variant);
        }
    }
    if variants.is_empty() {
        variants.push(IndexVariant::PriceReturn);
    }
    Ok(variants)
}

fn parse_month_pair(config: &dyn ConfigPort) -> Result<Option<[u32; 2]>, IndexError> {
    let items = config.get_list("scenario", "months");
    if items.is_empty() {
        return Ok(None);
    }
    let bad_months = || IndexError::ConfigInvalid {
        section: "scenario".to_string(),
        key: "months".to_string(),
        reason: "expected two comma-separated month numbers".to_string(),
    };
    let months: Vec<u32> = items
        .iter()
        .map(|m| m.parse::<u32>().map_err(|_| bad_months()))
        .collect::<Result<_, _>>()?;
    match months.as_slice() {
        [a, b] => Ok(Some([*a, *b])),
        _ => Err(bad_months()),
    }
}

/// Parses `[section] key` when present; `Ok(None)` when absent.
fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, IndexError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| IndexError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("cannot parse '{}'", raw.trim()),
            }),
    }
}

fn invalid(key: &str, reason: &str) -> IndexError {
    IndexError::ConfigInvalid {
        section: "index".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_start_level(config: &dyn ConfigPort) -> Result<(), IndexError> {
    match parse_value::<f64>(config, "index", "start_level")? {
        Some(v) if !(v.is_finite() && v > 0.0) => {
            Err(invalid("start_level", "start_level must be positive"))
        }
        _ => Ok(()),
    }
}

fn validate_initial_divisor(config: &dyn ConfigPort) -> Result<(), IndexError> {
    match parse_value::<f64>(config, "index", "initial_divisor")? {
        Some(v) if !(v.is_finite() && v > 0.0) => {
            Err(invalid("initial_divisor", "initial_divisor must be positive"))
        }
        _ => Ok(()),
    }
}

fn validate_threshold(config: &dyn ConfigPort) -> Result<(), IndexError> {
    match parse_value::<f64>(config, "index", "market_cap_threshold")? {
        Some(v) if !(v.is_finite() && v >= 0.0) => Err(invalid(
            "market_cap_threshold",
            "market_cap_threshold must be non-negative",
        )),
        _ => Ok(()),
    }
}

fn validate_caps(config: &dyn ConfigPort) -> Result<(), IndexError> {
    let max_cap = parse_value::<f64>(config, "index", "max_cap")?.unwrap_or(1.0);
    let min_cap = parse_value::<f64>(config, "index", "min_cap")?.unwrap_or(0.0);
    if !(max_cap > 0.0 && max_cap <= 1.0) {
        return Err(invalid("max_cap", "max_cap must be in (0, 1]"));
    }
    if !(0.0..1.0).contains(&min_cap) {
        return Err(invalid("min_cap", "min_cap must be in [0, 1)"));
    }
    if min_cap > max_cap {
        return Err(invalid("min_cap", "min_cap must not exceed max_cap"));
    }
    Ok(())
}

fn validate_max_iterations(config: &dyn ConfigPort) -> Result<(), IndexError> {
    match parse_value::<i64>(config, "index", "max_iterations")? {
        Some(v) if v < 1 => Err(invalid("max_iterations", "max_iterations must be at least 1")),
        _ => Ok(()),
    }
}

fn validate_offset_days(config: &dyn ConfigPort) -> Result<(), IndexError> {
    match parse_value::<i64>(config, "index", "offset_days")? {
        Some(v) if v < 0 => Err(invalid("offset_days", "offset_days must be non-negative")),
        _ => Ok(()),
    }
}

fn validate_first_index_date(config: &dyn ConfigPort) -> Result<(), IndexError> {
    match config.get_string("index", "first_index_date") {
        Some(s)
            if !s.trim().is_empty() && config.get_date("index", "first_index_date").is_none() =>
        {
            Err(invalid(
                "first_index_date",
                "invalid first_index_date format, expected YYYY-MM-DD",
            ))
        }
        _ => Ok(()),
    }
}

fn require_path(config: &dyn ConfigPort, key: &str) -> Result<(), IndexError> {
    match config.get_string("data", key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(IndexError::ConfigMissing {
            section: "data".to_string(),
            key: key.to_string(),
        }),
    }
}
