//! Index universe: ticker parsing and matching against the available data.

use std::collections::HashSet;

/// Ticker input that means "reuse the last ticker set".
pub const DEFAULT_TICKERS_KEYWORD: &str = "default";

/// Requested tickers split by availability, each in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    pub found: Vec<String>,
    pub removed: Vec<String>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.found.len()
    }

    pub fn available_text(&self) -> String {
        if self.found.is_empty() {
            return String::new();
        }
        format!(
            "Please find below the historical index performance for following tickers: {}",
            self.found.join(", ")
        )
    }

    pub fn removed_text(&self) -> String {
        if self.removed.is_empty() {
            return String::new();
        }
        format!(
            "Following tickers in your request were not found: {}",
            self.removed.join(", ")
        )
    }
}

/// Parses a comma-separated ticker list: trimmed, upper-cased, blanks and
/// repeats dropped. Returns `None` for empty input or the `default` keyword.
pub fn parse_tickers(input: &str) -> Option<Vec<String>> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(DEFAULT_TICKERS_KEYWORD) {
        return None;
    }

    let mut seen = HashSet::new();
    let tickers: Vec<String> = trimmed
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect();
    if tickers.is_empty() { None } else { Some(tickers) }
}

/// Splits `requested` into tickers present in `available` and the rest.
pub fn resolve_universe(requested: &[String], available: &[String]) -> Universe {
    let available: HashSet<&str> = available.iter().map(String::as_str).collect();
    let (found, removed) = requested
        .iter()
        .cloned()
        .partition(|t| available.contains(t.as_str()));
    Universe { found, removed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_basic() {
        assert_eq!(parse_tickers("AAPL,MSFT,NVDA"), Some(names(&["AAPL", "MSFT", "NVDA"])));
    }

    #[test]
    fn parse_whitespace_and_case() {
        assert_eq!(parse_tickers("  aapl , msft ,Nvda"), Some(names(&["AAPL", "MSFT", "NVDA"])));
    }

    #[test]
    fn parse_drops_blanks_and_repeats() {
        assert_eq!(parse_tickers("AAPL,,aapl, MSFT,"), Some(names(&["AAPL", "MSFT"])));
    }

    #[test]
    fn parse_default_and_empty() {
        assert_eq!(parse_tickers(""), None);
        assert_eq!(parse_tickers("   "), None);
        assert_eq!(parse_tickers("default"), None);
        assert_eq!(parse_tickers("DEFAULT"), None);
        assert_eq!(parse_tickers(" , ,"), None);
    }

    #[test]
    fn resolve_keeps_request_order() {
        let u = resolve_universe(
            &names(&["MSFT", "XXXX", "AAPL", "YYYY"]),
            &names(&["AAPL", "MSFT", "NVDA"]),
        );
        assert_eq!(u.found, names(&["MSFT", "AAPL"]));
        assert_eq!(u.removed, names(&["XXXX", "YYYY"]));
        assert_eq!(u.count(), 2);
    }

    #[test]
    fn texts() {
        let u = resolve_universe(&names(&["AAPL", "ZZZ"]), &names(&["AAPL"]));
        assert_eq!(
            u.available_text(),
            "Please find below the historical index performance for following tickers: AAPL"
        );
        assert_eq!(
            u.removed_text(),
            "Following tickers in your request were not found: ZZZ"
        );

        let u = resolve_universe(&names(&["AAPL"]), &names(&["AAPL"]));
        assert_eq!(u.removed_text(), "");
        let u = resolve_universe(&[], &names(&["AAPL"]));
        assert_eq!(u.available_text(), "");
    }
}
