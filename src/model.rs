use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::EtlError;
use crate::schema::status;

pub type StoreId = i64;

// ── Status ──────────────────────────────────────────────────────────────────

/// Whether a movement is finalized or still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "FECHADO")]
    Closed,
    #[serde(rename = "EM_ABERTO")]
    Open,
}

impl Status {
    /// Code stored in the source tables.
    pub fn as_code(&self) -> &'static str {
        match self {
            Status::Closed => status::CLOSED,
            Status::Open => status::OPEN,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for Status {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            status::CLOSED | "CLOSED" => Ok(Status::Closed),
            status::OPEN | "OPEN" => Ok(Status::Open),
            other => Err(EtlError::Validation(format!(
                "Invalid status: '{other}'. Must be '{}' or '{}'",
                status::CLOSED,
                status::OPEN
            ))),
        }
    }
}

// ── Dates ───────────────────────────────────────────────────────────────────

/// Inclusive date range. A range with `start > end` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateGranularity {
    #[default]
    Monthly,
    Daily,
}

impl FromStr for DateGranularity {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" | "ano-mês" | "ano-mes" => Ok(DateGranularity::Monthly),
            "daily" | "day" | "ano-mês-dia" | "ano-mes-dia" => Ok(DateGranularity::Daily),
            other => Err(EtlError::Validation(format!(
                "Invalid date granularity: '{other}'. Must be 'monthly' or 'daily'"
            ))),
        }
    }
}

/// A destination date truncated to the requested granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeBucket {
    Month { year: i32, month: u32 },
    Day(NaiveDate),
}

impl TimeBucket {
    pub fn from_date(date: NaiveDate, granularity: DateGranularity) -> Self {
        match granularity {
            DateGranularity::Monthly => TimeBucket::Month {
                year: date.year(),
                month: date.month(),
            },
            DateGranularity::Daily => TimeBucket::Day(date),
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBucket::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            TimeBucket::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for TimeBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lenient date parsing for values coming out of the record store.
///
/// Accepts `YYYY-MM-DD`, optionally followed by a time part. Anything else is
/// `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

// ── Stores ──────────────────────────────────────────────────────────────────

/// The closed set of valid store identifiers, `1..=count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSet {
    count: StoreId,
}

impl StoreSet {
    pub fn new(count: StoreId) -> Self {
        Self {
            count: count.max(0),
        }
    }

    pub fn contains(&self, store: StoreId) -> bool {
        (1..=self.count).contains(&store)
    }

    pub fn ids(&self) -> Vec<StoreId> {
        (1..=self.count).collect()
    }
}

/// Store selector input: one store or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreSelection {
    #[default]
    All,
    Store(StoreId),
}

impl StoreSelection {
    pub fn store(&self) -> Option<StoreId> {
        match self {
            StoreSelection::All => None,
            StoreSelection::Store(id) => Some(*id),
        }
    }
}

impl FromStr for StoreSelection {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") || s.eq_ignore_ascii_case("todas") {
            return Ok(StoreSelection::All);
        }
        s.parse::<StoreId>()
            .map(StoreSelection::Store)
            .map_err(|_| EtlError::Validation(format!("Store must be an integer, got '{s}'")))
    }
}

// ── Records ─────────────────────────────────────────────────────────────────

/// One transfer event ("romaneio") between two stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementHeader {
    pub store: StoreId,
    pub movement_id: String,
    pub registration_date: NaiveDate,
    pub destination_store: StoreId,
    pub status: Status,
}

/// One item line within a movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementLine {
    pub registration_date: NaiveDate,
    pub store: StoreId,
    pub item_code: String,
    pub item_subcode: Option<String>,
    pub quantity: f64,
    pub movement_id: String,
    pub description: String,
}

/// A movement line joined to its header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRecord {
    pub origin_store: StoreId,
    pub destination_store: StoreId,
    pub item_code: String,
    pub item_subcode: Option<String>,
    pub quantity: f64,
    pub description: String,
    pub destination_date: TimeBucket,
}

impl TransferRecord {
    /// True when the sub-code is null, empty or whitespace only.
    pub fn has_empty_subcode(&self) -> bool {
        self.item_subcode
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
    }
}
