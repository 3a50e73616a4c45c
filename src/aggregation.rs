use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use polars::prelude::*;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::EtlError;
use crate::model::{StoreId, TimeBucket, TransferRecord};
use crate::visualization::{item_label, route_label};

/// Grouping dimension of a transfer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    OriginStore,
    DestinationStore,
    ItemCode,
    /// Item code and sub-code, e.g. `"100 - AX"`.
    ItemLabel,
    /// Origin → destination pair.
    Route,
    Period,
}

impl Dimension {
    pub fn value(&self, record: &TransferRecord) -> AxisValue {
        match self {
            Dimension::OriginStore => AxisValue::Store(record.origin_store),
            Dimension::DestinationStore => AxisValue::Store(record.destination_store),
            Dimension::ItemCode => AxisValue::Text(record.item_code.clone()),
            Dimension::ItemLabel => AxisValue::Text(item_label(
                &record.item_code,
                record.item_subcode.as_deref(),
            )),
            Dimension::Route => AxisValue::Route(record.origin_store, record.destination_store),
            Dimension::Period => AxisValue::Period(record.destination_date),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::OriginStore => "origin_store",
            Dimension::DestinationStore => "destination_store",
            Dimension::ItemCode => "item_code",
            Dimension::ItemLabel => "item_label",
            Dimension::Route => "route",
            Dimension::Period => "period",
        }
    }
}

/// One member of a pivot axis.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AxisValue {
    Store(StoreId),
    Route(StoreId, StoreId),
    Text(String),
    Period(TimeBucket),
}

impl AxisValue {
    /// Axis enumeration for a list of stores.
    pub fn stores(ids: &[StoreId]) -> Vec<AxisValue> {
        ids.iter().map(|id| AxisValue::Store(*id)).collect()
    }
}

impl fmt::Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisValue::Store(id) => write!(f, "{id}"),
            AxisValue::Route(origin, destination) => {
                f.write_str(&route_label(*origin, *destination))
            }
            AxisValue::Text(s) => f.write_str(s),
            AxisValue::Period(bucket) => write!(f, "{bucket}"),
        }
    }
}

impl Serialize for AxisValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AxisValue::Store(id) => serializer.serialize_i64(*id),
            other => serializer.collect_str(other),
        }
    }
}

// ── Pivot ───────────────────────────────────────────────────────────────────

/// Declarative sum pivot: row and column dimensions plus optional complete
/// axis enumerations.
#[derive(Debug, Clone)]
pub struct PivotSpec {
    pub rows: Dimension,
    pub columns: Dimension,
    /// Row members in display order. Members absent from the data are kept
    /// with zero cells; records outside the list are left out of the table.
    pub row_axis: Option<Vec<AxisValue>>,
    pub column_axis: Option<Vec<AxisValue>>,
}

impl PivotSpec {
    pub fn sum(rows: Dimension, columns: Dimension) -> Self {
        Self {
            rows,
            columns,
            row_axis: None,
            column_axis: None,
        }
    }

    pub fn with_row_axis(mut self, axis: Vec<AxisValue>) -> Self {
        self.row_axis = Some(axis);
        self
    }

    pub fn with_column_axis(mut self, axis: Vec<AxisValue>) -> Self {
        self.column_axis = Some(axis);
        self
    }
}

/// Dense 2-D table: `values[row][column]`, zero where no record contributed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_dimension: Dimension,
    pub column_dimension: Dimension,
    pub rows: Vec<AxisValue>,
    pub columns: Vec<AxisValue>,
    pub values: Vec<Vec<f64>>,
}

impl PivotTable {
    /// True when either axis has no members.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn get(&self, row: &AxisValue, column: &AxisValue) -> Option<f64> {
        let r = self.rows.iter().position(|v| v == row)?;
        let c = self.columns.iter().position(|v| v == column)?;
        Some(self.values[r][c])
    }

    pub fn row_totals(&self) -> Vec<f64> {
        self.values.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn max_value(&self) -> f64 {
        self.values
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }

    /// Frame with one label column for the rows and one column per column member.
    pub fn to_frame(&self) -> Result<DataFrame, EtlError> {
        let labels: Vec<String> = self.rows.iter().map(|r| r.to_string()).collect();
        let mut columns = vec![Column::new(self.row_dimension.name().into(), &labels)];
        for (c, member) in self.columns.iter().enumerate() {
            let values: Vec<f64> = self.values.iter().map(|row| row[c]).collect();
            columns.push(Column::new(member.to_string().into(), &values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

fn on_axis(supplied: Option<&HashSet<AxisValue>>, value: &AxisValue) -> bool {
    supplied.map_or(true, |axis| axis.contains(value))
}

/// Pivot records along two dimensions, summing quantities.
///
/// A supplied axis is the complete member list of that axis: records whose
/// member is not on it are skipped.
pub fn pivot(records: &[TransferRecord], spec: &PivotSpec) -> PivotTable {
    let row_set: Option<HashSet<AxisValue>> =
        spec.row_axis.as_ref().map(|axis| axis.iter().cloned().collect());
    let column_set: Option<HashSet<AxisValue>> =
        spec.column_axis.as_ref().map(|axis| axis.iter().cloned().collect());

    let mut cells: HashMap<(AxisValue, AxisValue), f64> = HashMap::new();
    let mut observed_rows = BTreeSet::new();
    let mut observed_cols = BTreeSet::new();
    let mut skipped = 0usize;

    for record in records {
        let row = spec.rows.value(record);
        let column = spec.columns.value(record);
        if !on_axis(row_set.as_ref(), &row) || !on_axis(column_set.as_ref(), &column) {
            skipped += 1;
            continue;
        }
        observed_rows.insert(row.clone());
        observed_cols.insert(column.clone());
        *cells.entry((row, column)).or_insert(0.0) += record.quantity;
    }
    if skipped > 0 {
        debug!(
            skipped,
            rows = spec.rows.name(),
            columns = spec.columns.name(),
            "records outside the pivot axes left out"
        );
    }

    let rows = spec
        .row_axis
        .clone()
        .unwrap_or_else(|| observed_rows.into_iter().collect());
    let columns = spec
        .column_axis
        .clone()
        .unwrap_or_else(|| observed_cols.into_iter().collect());

    let values = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| {
                    cells
                        .get(&(row.clone(), column.clone()))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .collect();

    PivotTable {
        row_dimension: spec.rows,
        column_dimension: spec.columns,
        rows,
        columns,
        values,
    }
}

// ── Group totals and ranking ────────────────────────────────────────────────

/// Summed quantity per member of `dimension`, ordered by member.
pub fn group_totals(records: &[TransferRecord], dimension: Dimension) -> Vec<(AxisValue, f64)> {
    let mut totals: BTreeMap<AxisValue, f64> = BTreeMap::new();
    for record in records {
        *totals.entry(dimension.value(record)).or_insert(0.0) += record.quantity;
    }
    totals.into_iter().collect()
}

/// Order totals by descending quantity; equal quantities keep member order.
pub fn rank_descending(totals: &mut [(AxisValue, f64)]) {
    totals.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

/// The `n` members of `dimension` with the largest summed quantity.
pub fn top_n(records: &[TransferRecord], dimension: Dimension, n: usize) -> Vec<(AxisValue, f64)> {
    let mut totals = group_totals(records, dimension);
    rank_descending(&mut totals);
    totals.truncate(n);
    totals
}

/// Keep only records whose `dimension` member is among the top `n`.
pub fn restrict_to_top_n(
    records: &[TransferRecord],
    dimension: Dimension,
    n: usize,
) -> Vec<TransferRecord> {
    let keep: HashSet<AxisValue> = top_n(records, dimension, n)
        .into_iter()
        .map(|(member, _)| member)
        .collect();
    records
        .iter()
        .filter(|r| keep.contains(&dimension.value(r)))
        .cloned()
        .collect()
}

// ── Summary ─────────────────────────────────────────────────────────────────

/// Headline figures of a record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_quantity: f64,
    pub mean_quantity: f64,
    pub record_count: usize,
    pub unique_items: usize,
    pub unique_origin_stores: usize,
}

/// `None` for an empty record set.
pub fn summarize(records: &[TransferRecord]) -> Option<Summary> {
    if records.is_empty() {
        return None;
    }
    let total_quantity: f64 = records.iter().map(|r| r.quantity).sum();
    let items: HashSet<String> = records
        .iter()
        .map(|r| item_label(&r.item_code, r.item_subcode.as_deref()))
        .collect();
    let origins: HashSet<StoreId> = records.iter().map(|r| r.origin_store).collect();
    Some(Summary {
        total_quantity,
        mean_quantity: total_quantity / records.len() as f64,
        record_count: records.len(),
        unique_items: items.len(),
        unique_origin_stores: origins.len(),
    })
}
