//! Record loading: movement headers and movement lines for one request.
//!
//! Sources implement [`RecordSource`] and return frames already restricted to
//! the request's status, date range and store. [`load_records`] types the
//! columns, pre-aggregates line quantities and short-circuits requests that
//! cannot match anything.

use chrono::NaiveDate;
use polars::prelude::*;
use polars::sql::SQLContext;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::EtlError;
use crate::model::{DateRange, MovementHeader, MovementLine, Status, StoreId, StoreSet};
use crate::schema::{header, line};

/// Fully-specified parameters of one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LoadParams {
    pub status: Status,
    pub range: DateRange,
    pub store: Option<StoreId>,
}

/// Header and line frames of one load.
#[derive(Debug, Clone)]
pub struct LoadedRecords {
    pub headers: DataFrame,
    pub lines: DataFrame,
}

impl LoadedRecords {
    pub fn empty() -> Result<Self, EtlError> {
        Ok(Self {
            headers: headers_frame(&[])?,
            lines: lines_frame(&[])?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.headers.height() == 0 || self.lines.height() == 0
    }
}

/// A read-only store of movement records.
pub trait RecordSource {
    /// Transfer headers matching status, date range and (optional) store.
    fn fetch_headers(&self, params: &LoadParams) -> Result<DataFrame, EtlError>;

    /// Movement lines within the date range and (optional) store.
    fn fetch_lines(&self, params: &LoadParams) -> Result<DataFrame, EtlError>;

    /// Run a free-form read query as-is.
    fn run_query(&self, query: &str) -> Result<DataFrame, EtlError>;
}

/// Load and type the records for one request.
///
/// An empty date range or a store outside `stores` matches no rows and never
/// reaches the source.
pub fn load_records<S: RecordSource + ?Sized>(
    source: &S,
    params: &LoadParams,
    stores: &StoreSet,
) -> Result<LoadedRecords, EtlError> {
    if params.range.is_empty() {
        debug!(start = %params.range.start, end = %params.range.end, "empty date range");
        return LoadedRecords::empty();
    }
    if let Some(store) = params.store {
        if !stores.contains(store) {
            warn!(store, "store outside the valid range, no rows match");
            return LoadedRecords::empty();
        }
    }

    let headers = typed_headers(source.fetch_headers(params)?)?;
    let lines = aggregate_lines(typed_lines(source.fetch_lines(params)?)?)?;

    info!(
        status = %params.status,
        start = %params.range.start,
        end = %params.range.end,
        headers = headers.height(),
        lines = lines.height(),
        "records loaded"
    );
    Ok(LoadedRecords { headers, lines })
}

// ── Frame typing ────────────────────────────────────────────────────────────

pub(crate) fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), EtlError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(EtlError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

fn trimmed(name: &str) -> Expr {
    col(name)
        .cast(DataType::String)
        .str()
        .strip_chars(lit(" \t\r\n"))
}

/// Integer column from any numeric or textual representation; junk becomes null.
fn int_column(name: &str) -> Expr {
    trimmed(name)
        .cast(DataType::Float64)
        .cast(DataType::Int64)
        .alias(name)
}

fn float_column(name: &str) -> Expr {
    trimmed(name).cast(DataType::Float64).alias(name)
}

fn text_column(name: &str) -> Expr {
    col(name).cast(DataType::String).alias(name)
}

/// ISO `YYYY-MM-DD` text; dates, datetimes and datetime strings are accepted,
/// unparseable values become null.
fn date_column(name: &str) -> Expr {
    trimmed(name)
        .str()
        .to_date(StrptimeOptions {
            format: Some("%Y-%m-%d".into()),
            strict: false,
            exact: false,
            ..Default::default()
        })
        .cast(DataType::String)
        .alias(name)
}

/// Cast header columns to their canonical types and order.
pub fn typed_headers(df: DataFrame) -> Result<DataFrame, EtlError> {
    require_columns(&df, &header::REQUIRED)?;
    let df = df
        .lazy()
        .select([
            int_column(header::STORE),
            text_column(header::MOVEMENT_ID),
            date_column(header::REGISTRATION_DATE),
            int_column(header::DESTINATION_STORE),
            trimmed(header::STATUS).str().to_uppercase().alias(header::STATUS),
        ])
        .collect()?;
    Ok(df)
}

/// Cast line columns to their canonical types and order.
pub fn typed_lines(df: DataFrame) -> Result<DataFrame, EtlError> {
    require_columns(&df, &line::REQUIRED)?;
    let df = df
        .lazy()
        .select([
            date_column(line::REGISTRATION_DATE),
            int_column(line::STORE),
            trimmed(line::ITEM_CODE).alias(line::ITEM_CODE),
            text_column(line::ITEM_SUBCODE),
            float_column(line::QUANTITY),
            text_column(line::MOVEMENT_ID),
            text_column(line::DESCRIPTION),
        ])
        .collect()?;
    Ok(df)
}

/// Sum line quantities per (date, store, item, sub-code, movement, description).
pub fn aggregate_lines(df: DataFrame) -> Result<DataFrame, EtlError> {
    let keys: Vec<Expr> = line::AGGREGATION_KEY.iter().map(|c| col(*c)).collect();
    let df = df
        .lazy()
        .group_by_stable(keys)
        .agg([col(line::QUANTITY).sum()])
        .select(line::REQUIRED.iter().map(|c| col(*c)).collect::<Vec<_>>())
        .collect()?;
    Ok(df)
}

// ── Server-side filters for frame-backed sources ────────────────────────────

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn in_range(column: &str, range: &DateRange) -> Expr {
    col(column)
        .gt_eq(lit(iso(range.start)))
        .and(col(column).lt_eq(lit(iso(range.end))))
}

/// Restrict typed headers to eligible transfers of the requested status,
/// range and store.
///
/// `raw` is the frame before typing; eligibility columns are only checked
/// when the source carries them.
pub fn filter_headers(
    raw: DataFrame,
    params: &LoadParams,
) -> Result<DataFrame, EtlError> {
    let schema = raw.schema();
    let mut eligible = lit(true);
    if schema.contains(header::OPERATION_CODE) {
        eligible = eligible.and(
            int_column(header::OPERATION_CODE).eq(lit(header::TRANSFER_OPERATION)),
        );
    }
    for column in [
        header::PURCHASE_ORDER_STORE,
        header::PURCHASE_ORDER_CODE,
        header::ORIGIN_TYPE,
    ] {
        if schema.contains(column) {
            eligible = eligible.and(trimmed(column).is_null().or(trimmed(column).eq(lit(""))));
        }
    }

    let raw = raw.lazy().filter(eligible).collect()?;
    let mut predicate = col(header::STATUS)
        .eq(lit(params.status.as_code()))
        .and(in_range(header::REGISTRATION_DATE, &params.range));
    if let Some(store) = params.store {
        predicate = predicate.and(col(header::STORE).eq(lit(store)));
    }

    let df = typed_headers(raw)?.lazy().filter(predicate).collect()?;
    Ok(df)
}

/// Restrict typed lines to the requested range and store.
pub fn filter_lines(raw: DataFrame, params: &LoadParams) -> Result<DataFrame, EtlError> {
    let mut predicate = in_range(line::REGISTRATION_DATE, &params.range);
    if let Some(store) = params.store {
        predicate = predicate.and(col(line::STORE).eq(lit(store)));
    }
    let df = typed_lines(raw)?.lazy().filter(predicate).collect()?;
    Ok(df)
}

/// Execute a free-form query with polars SQL over the two movement tables.
pub(crate) fn run_sql(
    query: &str,
    headers: DataFrame,
    lines: DataFrame,
) -> Result<DataFrame, EtlError> {
    let mut ctx = SQLContext::new();
    ctx.register(header::TABLE, headers.lazy());
    ctx.register(line::TABLE, lines.lazy());
    let df = ctx
        .execute(query)
        .and_then(|lf| lf.collect())
        .map_err(|e| EtlError::Query(e.to_string()))?;
    Ok(df)
}

// ── Typed records → frames ──────────────────────────────────────────────────

pub fn headers_frame(headers: &[MovementHeader]) -> Result<DataFrame, EtlError> {
    let stores: Vec<i64> = headers.iter().map(|h| h.store).collect();
    let ids: Vec<&str> = headers.iter().map(|h| h.movement_id.as_str()).collect();
    let dates: Vec<String> = headers.iter().map(|h| iso(h.registration_date)).collect();
    let destinations: Vec<i64> = headers.iter().map(|h| h.destination_store).collect();
    let statuses: Vec<&str> = headers.iter().map(|h| h.status.as_code()).collect();

    let df = DataFrame::new(vec![
        Column::new(header::STORE.into(), &stores),
        Column::new(header::MOVEMENT_ID.into(), &ids),
        Column::new(header::REGISTRATION_DATE.into(), &dates),
        Column::new(header::DESTINATION_STORE.into(), &destinations),
        Column::new(header::STATUS.into(), &statuses),
    ])?;
    Ok(df)
}

pub fn lines_frame(lines: &[MovementLine]) -> Result<DataFrame, EtlError> {
    let dates: Vec<String> = lines.iter().map(|l| iso(l.registration_date)).collect();
    let stores: Vec<i64> = lines.iter().map(|l| l.store).collect();
    let codes: Vec<&str> = lines.iter().map(|l| l.item_code.as_str()).collect();
    let subcodes: Vec<Option<&str>> = lines.iter().map(|l| l.item_subcode.as_deref()).collect();
    let quantities: Vec<f64> = lines.iter().map(|l| l.quantity).collect();
    let ids: Vec<&str> = lines.iter().map(|l| l.movement_id.as_str()).collect();
    let descriptions: Vec<&str> = lines.iter().map(|l| l.description.as_str()).collect();

    let df = DataFrame::new(vec![
        Column::new(line::REGISTRATION_DATE.into(), &dates),
        Column::new(line::STORE.into(), &stores),
        Column::new(line::ITEM_CODE.into(), &codes),
        Column::new(line::ITEM_SUBCODE.into(), &subcodes),
        Column::new(line::QUANTITY.into(), &quantities),
        Column::new(line::MOVEMENT_ID.into(), &ids),
        Column::new(line::DESCRIPTION.into(), &descriptions),
    ])?;
    Ok(df)
}

// ── In-memory source ────────────────────────────────────────────────────────

/// Records held in memory; filters like a server would.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    headers: Vec<MovementHeader>,
    lines: Vec<MovementLine>,
}

impl MemorySource {
    pub fn new(headers: Vec<MovementHeader>, lines: Vec<MovementLine>) -> Self {
        Self { headers, lines }
    }
}

impl RecordSource for MemorySource {
    fn fetch_headers(&self, params: &LoadParams) -> Result<DataFrame, EtlError> {
        filter_headers(headers_frame(&self.headers)?, params)
    }

    fn fetch_lines(&self, params: &LoadParams) -> Result<DataFrame, EtlError> {
        filter_lines(lines_frame(&self.lines)?, params)
    }

    fn run_query(&self, query: &str) -> Result<DataFrame, EtlError> {
        run_sql(query, headers_frame(&self.headers)?, lines_frame(&self.lines)?)
    }
}

// ── SQL sources ─────────────────────────────────────────────────────────────

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

/// Query text with positional `?` placeholders and their bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub text: String,
    pub params: Vec<SqlParam>,
}

impl SqlQuery {
    /// A query with no bound values.
    pub fn raw(text: &str) -> Self {
        Self {
            text: text.to_string(),
            params: Vec::new(),
        }
    }

    /// Eligible transfer headers for `params`.
    pub fn headers(params: &LoadParams) -> Self {
        let mut text = format!(
            "SELECT R.{store}, R.{id}, R.{date}, R.{dest}, R.{status}\n\
             FROM {table} R\n\
             WHERE R.{op} = ?\n\
             AND R.{status} = ?\n\
             AND R.{po_store} IS NULL\n\
             AND R.{po_code} IS NULL\n\
             AND R.{origin_type} IS NULL\n\
             AND R.{date} BETWEEN ? AND ?",
            store = header::STORE,
            id = header::MOVEMENT_ID,
            date = header::REGISTRATION_DATE,
            dest = header::DESTINATION_STORE,
            status = header::STATUS,
            table = header::TABLE,
            op = header::OPERATION_CODE,
            po_store = header::PURCHASE_ORDER_STORE,
            po_code = header::PURCHASE_ORDER_CODE,
            origin_type = header::ORIGIN_TYPE,
        );
        let mut bound = vec![
            SqlParam::Int(header::TRANSFER_OPERATION),
            SqlParam::Text(params.status.as_code().to_string()),
            SqlParam::Date(params.range.start),
            SqlParam::Date(params.range.end),
        ];
        if let Some(store) = params.store {
            text.push_str(&format!("\nAND R.{} = ?", header::STORE));
            bound.push(SqlParam::Int(store));
        }
        Self {
            text,
            params: bound,
        }
    }

    /// Movement lines for `params`, summed per line key.
    pub fn lines(params: &LoadParams) -> Self {
        let mut text = format!(
            "SELECT ri.{date} AS {date}, ri.{store}, ri.{code}, ri.{sub}, \
             SUM(ri.{qty}) AS {qty}, ri.{id}, ri.{desc}\n\
             FROM {table} ri\n\
             WHERE ri.{date} BETWEEN ? AND ?",
            date = line::REGISTRATION_DATE,
            store = line::STORE,
            code = line::ITEM_CODE,
            sub = line::ITEM_SUBCODE,
            qty = line::QUANTITY,
            id = line::MOVEMENT_ID,
            desc = line::DESCRIPTION,
            table = line::TABLE,
        );
        let mut bound = vec![
            SqlParam::Date(params.range.start),
            SqlParam::Date(params.range.end),
        ];
        if let Some(store) = params.store {
            text.push_str(&format!("\nAND ri.{} = ?", line::STORE));
            bound.push(SqlParam::Int(store));
        }
        text.push_str(&format!(
            "\nGROUP BY ri.{}, ri.{}, ri.{}, ri.{}, ri.{}, ri.{}",
            line::REGISTRATION_DATE,
            line::STORE,
            line::ITEM_CODE,
            line::ITEM_SUBCODE,
            line::DESCRIPTION,
            line::MOVEMENT_ID,
        ));
        Self {
            text,
            params: bound,
        }
    }
}

/// Executes bound queries against a relational database.
pub trait SqlExecutor {
    fn execute(&self, query: &SqlQuery) -> Result<DataFrame, EtlError>;
}

/// A [`RecordSource`] backed by a SQL database.
pub struct SqlSource<E> {
    executor: E,
}

impl<E: SqlExecutor> SqlSource<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: SqlExecutor> RecordSource for SqlSource<E> {
    fn fetch_headers(&self, params: &LoadParams) -> Result<DataFrame, EtlError> {
        self.executor.execute(&SqlQuery::headers(params))
    }

    fn fetch_lines(&self, params: &LoadParams) -> Result<DataFrame, EtlError> {
        self.executor.execute(&SqlQuery::lines(params))
    }

    fn run_query(&self, query: &str) -> Result<DataFrame, EtlError> {
        self.executor.execute(&SqlQuery::raw(query))
    }
}
