//! Rebalancing scenarios: which weekday occurrence in which months selects
//! the constituents' weights.

use crate::domain::error::IndexError;
use chrono::Weekday;
use std::fmt;
use std::str::FromStr;

/// Scenario used when configuration names none: 4th Friday of April/October.
pub const DEFAULT_SCENARIO_ID: i64 = 29;

/// Which occurrence of the base weekday inside a month is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    /// 1-based occurrence; months with fewer occurrences select nothing.
    Nth(u8),
    /// Last occurrence in the month, whatever its ordinal.
    Last,
}

impl FromStr for Occurrence {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IndexError::ConfigInvalid {
            section: "scenario".into(),
            key: "occurrence".into(),
            reason: format!("expected 1-5, -1 or 'last' (got {s})"),
        };
        match s.trim().to_lowercase().as_str() {
            "last" | "-1" => Ok(Occurrence::Last),
            other => match other.parse::<u8>() {
                Ok(n @ 1..=5) => Ok(Occurrence::Nth(n)),
                _ => Err(invalid()),
            },
        }
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occurrence::Nth(1) => write!(f, "1st"),
            Occurrence::Nth(2) => write!(f, "2nd"),
            Occurrence::Nth(3) => write!(f, "3rd"),
            Occurrence::Nth(n) => write!(f, "{n}th"),
            Occurrence::Last => write!(f, "last"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Monthly,
    /// Quarter-end months: March, June, September, December.
    Quarterly,
    SemiAnnual { months: [u32; 2] },
}

impl Frequency {
    pub fn includes_month(&self, month: u32) -> bool {
        match self {
            Frequency::Monthly => true,
            Frequency::Quarterly => month % 3 == 0,
            Frequency::SemiAnnual { months } => months.contains(&month),
        }
    }

    /// Parses a frequency name. Semi-annual frequencies need their month pair,
    /// which configuration supplies separately.
    pub fn parse(value: &str, months: Option<[u32; 2]>) -> Result<Self, IndexError> {
        match value.trim().to_lowercase().as_str() {
            "m" | "monthly" => Ok(Frequency::Monthly),
            "q" | "quarterly" => Ok(Frequency::Quarterly),
            "semi-annual" | "semiannual" | "s" => match months {
                Some([a, b]) if (1..=12).contains(&a) && (1..=12).contains(&b) && a != b => {
                    Ok(Frequency::SemiAnnual { months: [a, b] })
                }
                _ => Err(IndexError::ConfigInvalid {
                    section: "scenario".into(),
                    key: "months".into(),
                    reason: "semi-annual scenarios need two distinct months in 1-12".into(),
                }),
            },
            _ => Err(IndexError::UnsupportedFrequency {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Quarterly => write!(f, "quarterly"),
            Frequency::SemiAnnual { months } => {
                write!(f, "semi-annual ({}, {})", months[0], months[1])
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scenario {
    pub occurrence: Occurrence,
    pub weekday: Weekday,
    pub frequency: Frequency,
}

impl Scenario {
    /// Looks up one of the fixed scenarios 1-40.
    ///
    /// Ids run in blocks of five (1st, 2nd, 3rd, 4th, last Friday): monthly,
    /// quarterly, then semi-annual over the month pairs (1, 7) through (6, 12).
    pub fn from_id(id: i64) -> Result<Self, IndexError> {
        if !(1..=40).contains(&id) {
            return Err(IndexError::UnknownScenario { id });
        }
        let block = (id - 1) / 5;
        let occurrence = match (id - 1) % 5 {
            4 => Occurrence::Last,
            n => Occurrence::Nth(n as u8 + 1),
        };
        let frequency = match block {
            0 => Frequency::Monthly,
            1 => Frequency::Quarterly,
            b => {
                let first = (b - 1) as u32;
                Frequency::SemiAnnual {
                    months: [first, first + 6],
                }
            }
        };
        Ok(Scenario {
            occurrence,
            weekday: Weekday::Fri,
            frequency,
        })
    }

    /// Every scenario in the lookup table, by id.
    pub fn all() -> Vec<(i64, Scenario)> {
        (1..=40)
            .filter_map(|id| Scenario::from_id(id).ok().map(|s| (id, s)))
            .collect()
    }
}

/// Scenario [`DEFAULT_SCENARIO_ID`].
impl Default for Scenario {
    fn default() -> Self {
        Scenario {
            occurrence: Occurrence::Nth(4),
            weekday: Weekday::Fri,
            frequency: Frequency::SemiAnnual { months: [4, 10] },
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.occurrence, self.weekday, self.frequency)
    }
}
