#![allow(dead_code)]

use std::cell::Cell;

use chrono::NaiveDate;
use etl_estoque::loader::{LoadParams, RecordSource};
use etl_estoque::model::TimeBucket;
use etl_estoque::{
    DateRange, EtlError, MemorySource, MovementHeader, MovementLine, Status, TransferRecord,
};
use polars::prelude::DataFrame;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn march_2025() -> DateRange {
    DateRange::new(date(2025, 3, 1), date(2025, 3, 31))
}

pub fn params(status: Status, range: DateRange, store: Option<i64>) -> LoadParams {
    LoadParams {
        status,
        range,
        store,
    }
}

pub fn header(
    store: i64,
    movement_id: &str,
    destination_store: i64,
    registration_date: NaiveDate,
    status: Status,
) -> MovementHeader {
    MovementHeader {
        store,
        movement_id: movement_id.to_string(),
        registration_date,
        destination_store,
        status,
    }
}

pub fn line(
    store: i64,
    movement_id: &str,
    item_code: &str,
    item_subcode: Option<&str>,
    quantity: f64,
    registration_date: NaiveDate,
) -> MovementLine {
    MovementLine {
        registration_date,
        store,
        item_code: item_code.to_string(),
        item_subcode: item_subcode.map(str::to_string),
        quantity,
        movement_id: movement_id.to_string(),
        description: format!("item {item_code}"),
    }
}

pub fn record(
    origin_store: i64,
    destination_store: i64,
    item_code: &str,
    item_subcode: Option<&str>,
    quantity: f64,
) -> TransferRecord {
    TransferRecord {
        origin_store,
        destination_store,
        item_code: item_code.to_string(),
        item_subcode: item_subcode.map(str::to_string),
        quantity,
        description: String::new(),
        destination_date: TimeBucket::Month {
            year: 2025,
            month: 3,
        },
    }
}

/// Closed transfers in March 2025 join to five records totalling 31:
///
/// | movement | route | item      | qty |
/// |----------|-------|-----------|-----|
/// | A1       | 1 → 2 | 100 / AX  | 8   |
/// | A1       | 1 → 2 | 200 / -   | 10  |
/// | A2       | 1 → 3 | 105 / AX  | 7   |
/// | B1       | 2 → 1 | 205 / AX  | 4   |
/// | B1       | 2 → 1 | 100 / BQ  | 2   |
///
/// A3 is open, C1 falls in April and Z9 has no header.
pub fn sample_headers() -> Vec<MovementHeader> {
    vec![
        header(1, "A1", 2, date(2025, 3, 5), Status::Closed),
        header(1, "A2", 3, date(2025, 3, 12), Status::Closed),
        header(2, "B1", 1, date(2025, 3, 20), Status::Closed),
        header(3, "C1", 2, date(2025, 4, 2), Status::Closed),
        header(1, "A3", 4, date(2025, 3, 15), Status::Open),
    ]
}

pub fn sample_lines() -> Vec<MovementLine> {
    vec![
        line(1, "A1", "100", Some("AX"), 5.0, date(2025, 3, 4)),
        line(1, "A1", "100", Some("AX"), 3.0, date(2025, 3, 4)),
        line(1, "A1", "200", None, 10.0, date(2025, 3, 4)),
        line(1, "A2", "105", Some("AX"), 7.0, date(2025, 3, 11)),
        line(2, "B1", "205", Some("AX"), 4.0, date(2025, 3, 19)),
        line(2, "B1", "100", Some("BQ"), 2.0, date(2025, 3, 19)),
        line(3, "C1", "300", None, 9.0, date(2025, 4, 1)),
        line(1, "A3", "100", Some("AX"), 6.0, date(2025, 3, 14)),
        line(5, "Z9", "999", None, 1.0, date(2025, 3, 10)),
    ]
}

pub fn sample_source() -> MemorySource {
    MemorySource::new(sample_headers(), sample_lines())
}

/// Wraps a source and counts how often each table is fetched.
pub struct CountingSource<S> {
    pub inner: S,
    pub header_fetches: Cell<usize>,
    pub line_fetches: Cell<usize>,
}

impl<S> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            header_fetches: Cell::new(0),
            line_fetches: Cell::new(0),
        }
    }
}

impl<S: RecordSource> RecordSource for CountingSource<S> {
    fn fetch_headers(&self, params: &LoadParams) -> Result<DataFrame, EtlError> {
        self.header_fetches.set(self.header_fetches.get() + 1);
        self.inner.fetch_headers(params)
    }

    fn fetch_lines(&self, params: &LoadParams) -> Result<DataFrame, EtlError> {
        self.line_fetches.set(self.line_fetches.get() + 1);
        self.inner.fetch_lines(params)
    }

    fn run_query(&self, query: &str) -> Result<DataFrame, EtlError> {
        self.inner.run_query(query)
    }
}
