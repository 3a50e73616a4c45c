use polars::prelude::*;
use tracing::debug;

use crate::error::EtlError;
use crate::loader::{require_columns, LoadedRecords};
use crate::model::{parse_date, DateGranularity, TimeBucket, TransferRecord};
use crate::schema::{header, line, transfer};

/// Inner-join movement lines to their headers on (store, movement id).
///
/// The header's store becomes the origin, its destination code the
/// destination and its registration date the destination date. The line's
/// own date is carried as `DATA_ORIGEM` and never competes with the header's.
///
/// Returns the columns of [`transfer::ALL`] plus `DATA_ORIGEM`.
pub fn join_movements(headers: &DataFrame, lines: &DataFrame) -> Result<DataFrame, EtlError> {
    require_columns(headers, &header::REQUIRED)?;
    require_columns(lines, &line::REQUIRED)?;

    let headers = headers.clone().lazy().select([
        col(header::STORE).cast(DataType::Int64),
        col(header::MOVEMENT_ID).cast(DataType::String),
        col(header::DESTINATION_STORE)
            .cast(DataType::Int64)
            .alias(transfer::DESTINATION_STORE),
        col(header::REGISTRATION_DATE)
            .cast(DataType::String)
            .alias(transfer::DESTINATION_DATE),
    ]);

    let lines = lines.clone().lazy().select([
        col(line::STORE).cast(DataType::Int64),
        col(line::MOVEMENT_ID).cast(DataType::String),
        col(line::ITEM_CODE).cast(DataType::String),
        col(line::ITEM_SUBCODE).cast(DataType::String),
        col(line::QUANTITY).cast(DataType::Float64),
        col(line::DESCRIPTION).cast(DataType::String),
        col(line::REGISTRATION_DATE)
            .cast(DataType::String)
            .alias(transfer::ORIGIN_DATE),
    ]);

    let df = lines
        .join(
            headers,
            [col(line::STORE), col(line::MOVEMENT_ID)],
            [col(header::STORE), col(header::MOVEMENT_ID)],
            JoinArgs::new(JoinType::Inner),
        )
        .rename([line::STORE], [transfer::ORIGIN_STORE], true)
        .select([
            col(transfer::ORIGIN_STORE),
            col(transfer::DESTINATION_STORE),
            col(transfer::ITEM_CODE),
            col(transfer::ITEM_SUBCODE),
            col(transfer::QUANTITY),
            col(transfer::DESCRIPTION),
            col(transfer::DESTINATION_DATE),
            col(transfer::ORIGIN_DATE),
        ])
        .collect()?;

    debug!(rows = df.height(), "movements joined");
    Ok(df)
}

/// Convert a joined frame into transfer records bucketed by `granularity`.
///
/// Rows with a missing or unparseable destination date, or without store
/// identifiers, are dropped. A null quantity counts as zero.
pub fn transfers_from_frame(
    df: &DataFrame,
    granularity: DateGranularity,
) -> Result<Vec<TransferRecord>, EtlError> {
    require_columns(df, &transfer::ALL)?;

    let origins = df.column(transfer::ORIGIN_STORE)?.i64()?;
    let destinations = df.column(transfer::DESTINATION_STORE)?.i64()?;
    let codes = df.column(transfer::ITEM_CODE)?.str()?;
    let subcodes = df.column(transfer::ITEM_SUBCODE)?.str()?;
    let quantities = df.column(transfer::QUANTITY)?.f64()?;
    let descriptions = df.column(transfer::DESCRIPTION)?.str()?;
    let dates = df.column(transfer::DESTINATION_DATE)?.str()?;

    let mut records = Vec::with_capacity(df.height());
    let mut dropped = 0usize;
    for i in 0..df.height() {
        let (Some(origin_store), Some(destination_store)) = (origins.get(i), destinations.get(i))
        else {
            dropped += 1;
            continue;
        };
        let Some(date) = dates.get(i).and_then(parse_date) else {
            dropped += 1;
            continue;
        };

        records.push(TransferRecord {
            origin_store,
            destination_store,
            item_code: codes.get(i).unwrap_or("").to_string(),
            item_subcode: subcodes.get(i).map(|s| s.to_string()),
            quantity: quantities.get(i).unwrap_or(0.0),
            description: descriptions.get(i).unwrap_or("").to_string(),
            destination_date: TimeBucket::from_date(date, granularity),
        });
    }

    if dropped > 0 {
        debug!(dropped, kept = records.len(), "rows without usable date or store dropped");
    }
    Ok(records)
}

/// Join loaded records and convert them to transfer records.
pub fn join_records(
    loaded: &LoadedRecords,
    granularity: DateGranularity,
) -> Result<Vec<TransferRecord>, EtlError> {
    let joined = join_movements(&loaded.headers, &loaded.lines)?;
    transfers_from_frame(&joined, granularity)
}
