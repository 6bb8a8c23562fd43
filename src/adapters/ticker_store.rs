//! Ticker set stores: an INI file shared between runs, and an in-memory one.

use crate::domain::error::IndexError;
use crate::ports::ticker_store_port::TickerSetStore;
use configparser::ini::Ini;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tracing::debug;

const SECTION: &str = "session";
const KEY: &str = "tickers";

/// Keeps the last ticker set under `[session] tickers` in an INI file.
/// Other sections in the file are left alone.
pub struct FileTickerStore {
    path: PathBuf,
}

impl FileTickerStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<Ini, IndexError> {
        let mut ini = Ini::new();
        if self.path.exists() {
            ini.load(&self.path).map_err(|reason| IndexError::ConfigParse {
                file: self.path.display().to_string(),
                reason,
            })?;
        }
        Ok(ini)
    }
}

impl TickerSetStore for FileTickerStore {
    fn get(&self) -> Result<Option<Vec<String>>, IndexError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no ticker store yet");
            return Ok(None);
        }
        let tickers = self.load()?.get(SECTION, KEY).map(|value| {
            value
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        });
        Ok(tickers.filter(|t| !t.is_empty()))
    }

    fn set(&self, tickers: &[String]) -> Result<(), IndexError> {
        let mut ini = self.load()?;
        ini.set(SECTION, KEY, Some(tickers.join(",")));
        ini.write(&self.path)?;
        debug!(path = %self.path.display(), count = tickers.len(), "ticker set stored");
        Ok(())
    }
}

/// Process-local store for library callers and tests.
#[derive(Debug, Default)]
pub struct InMemoryTickerStore {
    tickers: RefCell<Option<Vec<String>>>,
}

impl InMemoryTickerStore {
    pub fn with_tickers(tickers: &[&str]) -> Self {
        Self {
            tickers: RefCell::new(Some(tickers.iter().map(|t| t.to_string()).collect())),
        }
    }
}

impl TickerSetStore for InMemoryTickerStore {
    fn get(&self) -> Result<Option<Vec<String>>, IndexError> {
        Ok(self.tickers.borrow().clone())
    }

    fn set(&self, tickers: &[String]) -> Result<(), IndexError> {
        *self.tickers.borrow_mut() = Some(tickers.to_vec());
        Ok(())
    }
}
