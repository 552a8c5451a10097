use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Storage form of a calendar date, e.g. `2024_01_31`.
pub const DATE_KEY_FORMAT: &str = "%Y_%m_%d";

/// Missing dates older than this many days are dropped from the ledger.
pub const MISSING_DATE_RETENTION_DAYS: i64 = 30;

/// Upper bound on objects inspected per candidate date.
pub const DISCOVERY_MAX_KEYS: usize = 10;

pub const CSV_EXTENSION: &str = ".csv";

pub const DEFAULT_PROCESSOR: &str = "data-ingestion";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    "date",
    "client_id",
    "client_name",
    "service_name",
    "total_consumed_tokens",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateKeyError {
    pub value: String,
}

impl fmt::Display for DateKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid date key {:?}, expected YYYY_MM_DD", self.value)
    }
}

impl std::error::Error for DateKeyError {}

/// Calendar date as used in object keys, the checkpoint and the ledger.
///
/// Ordering is chronological, which matches the lexical order of the
/// `YYYY_MM_DD` string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn next_day(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    pub fn days_before(&self, days: i64) -> Option<Self> {
        self.0.checked_sub_signed(Duration::days(days)).map(Self)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(value.trim(), DATE_KEY_FORMAT)
            .map(Self)
            .map_err(|_| DateKeyError {
                value: value.to_string(),
            })
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Every date in `[start, end]`, ascending. Empty when `start > end`.
pub fn date_range(start: DateKey, end: DateKey) -> Vec<DateKey> {
    let mut dates = Vec::new();
    let mut current = Some(start);
    while let Some(date) = current {
        if date > end {
            break;
        }
        dates.push(date);
        current = date.next_day();
    }
    dates
}

/// Directory-like prefix under which files for `date` land.
pub fn date_prefix(prefix: &str, date: DateKey) -> String {
    format!("{}{}/", prefix, date_marker(date))
}

/// Substring every matching object key must contain.
pub fn date_marker(date: DateKey) -> String {
    format!("consumption_{}", date)
}

/// Object entry returned by a store listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<String>,
}

/// A discovered file awaiting load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub key: String,
    pub date: DateKey,
    pub size: u64,
    pub last_modified: Option<String>,
}

/// One row destined for the `consumptions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub date: String,
    pub client_id: String,
    pub client_name: Option<String>,
    pub service_name: Option<String>,
    pub total_consumed_tokens: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    NoNewFiles,
    Failed,
}

/// Structured result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub message: String,
    pub processed_dates: Vec<DateKey>,
}

impl RunOutcome {
    pub fn no_new_files() -> Self {
        Self {
            status: RunStatus::NoNewFiles,
            message: "No new files to process".to_string(),
            processed_dates: Vec::new(),
        }
    }

    pub fn completed(processed_dates: Vec<DateKey>) -> Self {
        Self {
            status: RunStatus::Completed,
            message: format!("Successfully processed {} files", processed_dates.len()),
            processed_dates,
        }
    }

    pub fn failed(message: impl Into<String>, processed_dates: Vec<DateKey>) -> Self {
        Self {
            status: RunStatus::Failed,
            message: message.into(),
            processed_dates,
        }
    }
}
