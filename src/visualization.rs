//! Chart-ready row sets for the dashboards.
//!
//! Builders produce serializable bar, grouped-bar, pie and heatmap payloads
//! and return [`Chart::NoData`] instead of an empty chart. Rendering is left
//! to the host UI.

use serde::Serialize;

use crate::aggregation::{rank_descending, AxisValue, PivotTable};
use crate::config::ColorConfig;
use crate::model::StoreId;

/// Placeholder shown for an absent sub-code.
pub const EMPTY_SUBCODE_LABEL: &str = "(empty)";

// ── Chart payloads ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "chart", rename_all = "snake_case")]
pub enum Chart<T> {
    Ready(T),
    NoData,
}

impl<T> Chart<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Chart::NoData)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Chart::Ready(chart) => Some(chart),
            Chart::NoData => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    /// Value printed on the bar, e.g. `"1,234"`.
    pub value_label: String,
    pub color: String,
}

/// Horizontal bar chart; bars are listed bottom to top.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub name: String,
    pub color: String,
    /// One value per category, zero-filled.
    pub values: Vec<f64>,
}

/// Bars grouped by category with one coloured series per ranked item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    /// Percentage of the pie total.
    pub share: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieChart {
    pub title: String,
    pub slices: Vec<Slice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<f64>>,
    pub max_value: f64,
}

/// Axis and title text of a chart.
#[derive(Debug, Clone, Copy)]
pub struct Titles<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarOrder {
    Ascending,
    Descending,
    /// Keep the order of the input entries.
    Member,
}

// ── Labels and formatting ───────────────────────────────────────────────────

/// `"<code> - <subcode>"`, with a placeholder for a blank sub-code.
pub fn item_label(item_code: &str, item_subcode: Option<&str>) -> String {
    match item_subcode.map(str::trim).filter(|s| !s.is_empty()) {
        Some(sub) => format!("{item_code} - {sub}"),
        None => format!("{item_code} - {EMPTY_SUBCODE_LABEL}"),
    }
}

pub fn route_label(origin: StoreId, destination: StoreId) -> String {
    format!("{origin} → {destination}")
}

/// Round to an integer and group thousands with commas.
pub fn format_quantity(value: f64) -> String {
    let rounded = value.round();
    if !rounded.is_finite() {
        return value.to_string();
    }
    let digits = format!("{}", rounded.abs() as u128);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

// ── Colours ─────────────────────────────────────────────────────────────────

/// Colour per rank: the leading `primary_cutoff` share of entries, then up to
/// `secondary_cutoff`, then the rest.
pub fn band_colors(n: usize, colors: &ColorConfig) -> Vec<String> {
    let primary_end = (n as f64 * colors.primary_cutoff) as usize;
    let secondary_end = (n as f64 * colors.secondary_cutoff) as usize;
    (0..n)
        .map(|i| {
            if i < primary_end {
                colors.primary.clone()
            } else if i < secondary_end {
                colors.secondary.clone()
            } else {
                colors.accent.clone()
            }
        })
        .collect()
}

/// Category colour for a rank, cycling through the palette.
pub fn palette_color(rank: usize, colors: &ColorConfig) -> String {
    if colors.palette.is_empty() {
        return colors.bar.clone();
    }
    colors.palette[rank % colors.palette.len()].clone()
}

// ── Builders ────────────────────────────────────────────────────────────────

/// Horizontal bar chart from labelled totals.
pub fn bar_chart(
    titles: Titles<'_>,
    entries: &[(AxisValue, f64)],
    order: BarOrder,
    colors: &ColorConfig,
) -> Chart<BarChart> {
    if entries.is_empty() {
        return Chart::NoData;
    }
    let mut sorted = entries.to_vec();
    match order {
        BarOrder::Ascending => {
            sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        }
        BarOrder::Descending => rank_descending(&mut sorted),
        BarOrder::Member => {}
    }
    let bars = sorted
        .into_iter()
        .map(|(label, value)| Bar {
            label: label.to_string(),
            value,
            value_label: format_quantity(value),
            color: colors.bar.clone(),
        })
        .collect();
    Chart::Ready(BarChart {
        title: titles.title.to_string(),
        x_label: titles.x_label.to_string(),
        y_label: titles.y_label.to_string(),
        bars,
    })
}

/// Grouped bars: one series per pivot row (in row order), one category per
/// pivot column.
pub fn grouped_bar_chart(
    titles: Titles<'_>,
    pivot: &PivotTable,
    colors: &ColorConfig,
) -> Chart<GroupedBarChart> {
    if pivot.is_empty() {
        return Chart::NoData;
    }
    let series = pivot
        .rows
        .iter()
        .zip(&pivot.values)
        .enumerate()
        .map(|(rank, (row, values))| BarSeries {
            name: row.to_string(),
            color: palette_color(rank, colors),
            values: values.clone(),
        })
        .collect();
    Chart::Ready(GroupedBarChart {
        title: titles.title.to_string(),
        x_label: titles.x_label.to_string(),
        y_label: titles.y_label.to_string(),
        categories: pivot.columns.iter().map(|c| c.to_string()).collect(),
        series,
    })
}

/// Pie of the `limit` largest entries, coloured by rank band.
pub fn pie_chart(
    title: &str,
    entries: &[(AxisValue, f64)],
    limit: usize,
    colors: &ColorConfig,
) -> Chart<PieChart> {
    let mut ranked = entries.to_vec();
    rank_descending(&mut ranked);
    ranked.truncate(limit);

    let total: f64 = ranked.iter().map(|(_, v)| v).sum();
    if ranked.is_empty() || total == 0.0 {
        return Chart::NoData;
    }

    let band = band_colors(ranked.len(), colors);
    let slices = ranked
        .into_iter()
        .zip(band)
        .map(|((label, value), color)| Slice {
            label: label.to_string(),
            value,
            share: value / total * 100.0,
            color,
        })
        .collect();
    Chart::Ready(PieChart {
        title: title.to_string(),
        slices,
    })
}

pub fn heatmap(titles: Titles<'_>, pivot: &PivotTable) -> Chart<Heatmap> {
    if pivot.is_empty() {
        return Chart::NoData;
    }
    Chart::Ready(Heatmap {
        title: titles.title.to_string(),
        x_label: titles.x_label.to_string(),
        y_label: titles.y_label.to_string(),
        rows: pivot.rows.iter().map(|r| r.to_string()).collect(),
        columns: pivot.columns.iter().map(|c| c.to_string()).collect(),
        cells: pivot.values.clone(),
        max_value: pivot.max_value(),
    })
}
