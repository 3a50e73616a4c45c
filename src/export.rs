use std::io::Write;

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::EtlError;
use crate::model::TransferRecord;
use crate::schema::display;

/// A rendered CSV download.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvExport {
    pub filename: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl CsvExport {
    pub fn as_text(&self) -> Result<&str, EtlError> {
        std::str::from_utf8(&self.bytes).map_err(|e| EtlError::InvalidData(e.to_string()))
    }
}

/// `etl_estoque_YYYYMMDD_HHMMSS.csv`
pub fn export_filename(generated_at: NaiveDateTime) -> String {
    format!("etl_estoque_{}.csv", generated_at.format("%Y%m%d_%H%M%S"))
}

/// The displayed table: one row per record, display column names.
pub fn display_frame(records: &[TransferRecord]) -> Result<DataFrame, EtlError> {
    let origins: Vec<i64> = records.iter().map(|r| r.origin_store).collect();
    let destinations: Vec<i64> = records.iter().map(|r| r.destination_store).collect();
    let codes: Vec<&str> = records.iter().map(|r| r.item_code.as_str()).collect();
    let subcodes: Vec<Option<&str>> = records.iter().map(|r| r.item_subcode.as_deref()).collect();
    let quantities: Vec<f64> = records.iter().map(|r| r.quantity).collect();
    let descriptions: Vec<&str> = records.iter().map(|r| r.description.as_str()).collect();
    let dates: Vec<String> = records
        .iter()
        .map(|r| r.destination_date.to_string())
        .collect();

    let df = DataFrame::new(vec![
        Column::new(display::ORIGIN_STORE.into(), &origins),
        Column::new(display::DESTINATION_STORE.into(), &destinations),
        Column::new(display::ITEM_CODE.into(), &codes),
        Column::new(display::ITEM_SUBCODE.into(), &subcodes),
        Column::new(display::QUANTITY.into(), &quantities),
        Column::new(display::DESCRIPTION.into(), &descriptions),
        Column::new(display::DESTINATION_DATE.into(), &dates),
    ])?;
    Ok(df)
}

/// Write a frame as comma-separated UTF-8 with a header row.
pub fn write_csv<W: Write>(df: &mut DataFrame, writer: W) -> Result<(), EtlError> {
    CsvWriter::new(writer)
        .include_header(true)
        .with_separator(b',')
        .finish(df)?;
    Ok(())
}

/// Render the displayed records as a timestamped CSV download.
pub fn export_csv(
    records: &[TransferRecord],
    generated_at: NaiveDateTime,
) -> Result<CsvExport, EtlError> {
    let mut df = display_frame(records)?;
    let mut bytes = Vec::new();
    write_csv(&mut df, &mut bytes)?;
    let filename = export_filename(generated_at);
    debug!(%filename, rows = records.len(), "csv export rendered");
    Ok(CsvExport { filename, bytes })
}
