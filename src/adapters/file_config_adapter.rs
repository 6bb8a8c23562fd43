//! INI file configuration adapter.

use crate::domain::error::IndexError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| IndexError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, IndexError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| IndexError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[data]
price_file = data/prices.csv
market_cap_file = data/mcap.csv

[index]
start_level = 100
variants = PR, GTR
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "price_file"),
            Some("data/prices.csv".to_string())
        );
        assert_eq!(adapter.get_list("index", "variants"), vec!["PR", "GTR"]);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[index]\nstart_level = 100\n").unwrap();
        assert_eq!(adapter.get_string("index", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[index]\nscenario = 7\noffset_days = abc\n").unwrap();
        assert_eq!(adapter.get_int("index", "scenario", 29), 7);
        assert_eq!(adapter.get_int("index", "offset_days", 0), 0);
        assert_eq!(adapter.get_int("index", "missing", 42), 42);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[index]\nmax_cap = 0.25\nmin_cap = none\n").unwrap();
        assert_eq!(adapter.get_double("index", "max_cap", 1.0), 0.25);
        assert_eq!(adapter.get_double("index", "min_cap", 0.0), 0.0);
        assert_eq!(adapter.get_double("index", "missing", 99.9), 99.9);
    }

    #[test]
    fn get_bool_values() {
        let adapter =
            FileConfigAdapter::from_string("[index]\na = true\nb = no\nc = 1\nd = maybe\n")
                .unwrap();
        assert!(adapter.get_bool("index", "a", false));
        assert!(!adapter.get_bool("index", "b", true));
        assert!(adapter.get_bool("index", "c", false));
        assert!(adapter.get_bool("index", "d", true));
        assert!(!adapter.get_bool("index", "missing", false));
    }

    #[test]
    fn get_date_parses_iso_dates() {
        let adapter = FileConfigAdapter::from_string(
            "[index]\nfirst_index_date = 2020-01-03\nbad = 2020/01/03\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_date("index", "first_index_date"),
            NaiveDate::from_ymd_opt(2020, 1, 3)
        );
        assert_eq!(adapter.get_date("index", "bad"), None);
        assert_eq!(adapter.get_date("index", "missing"), None);
    }

    #[test]
    fn get_list_drops_blank_entries() {
        let adapter = FileConfigAdapter::from_string("[index]\ntickers = AAPL, ,MSFT,\n").unwrap();
        assert_eq!(adapter.get_list("index", "tickers"), vec!["AAPL", "MSFT"]);
        assert!(adapter.get_list("index", "missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[export]\noutput_dir = /tmp/out\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("export", "output_dir"),
            Some("/tmp/out".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(IndexError::ConfigParse { .. })));
    }
}
