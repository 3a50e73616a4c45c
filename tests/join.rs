mod common;

use common::*;
use etl_estoque::join::{join_movements, join_records, transfers_from_frame};
use etl_estoque::loader::load_records;
use etl_estoque::model::{StoreSet, TimeBucket};
use etl_estoque::schema::transfer;
use etl_estoque::{DateGranularity, MemorySource, Status};
use polars::prelude::*;

#[test]
fn single_header_and_line_become_one_monthly_transfer() {
    let source = MemorySource::new(
        vec![header(1, "A1", 2, date(2025, 3, 5), Status::Closed)],
        vec![line(1, "A1", "100", Some(""), 5.0, date(2025, 3, 5))],
    );
    let loaded = load_records(
        &source,
        &params(Status::Closed, march_2025(), None),
        &StoreSet::new(13),
    )
    .unwrap();

    let records = join_records(&loaded, DateGranularity::Monthly).unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.origin_store, 1);
    assert_eq!(r.destination_store, 2);
    assert_eq!(r.item_code, "100");
    assert!(r.has_empty_subcode());
    assert_eq!(r.quantity, 5.0);
    assert_eq!(
        r.destination_date,
        TimeBucket::Month {
            year: 2025,
            month: 3
        }
    );
}

#[test]
fn unmatched_lines_are_absent_and_count_never_grows() {
    let loaded = load_records(
        &sample_source(),
        &params(Status::Closed, march_2025(), None),
        &StoreSet::new(13),
    )
    .unwrap();

    let records = join_records(&loaded, DateGranularity::Monthly).unwrap();
    assert!(records.len() <= loaded.lines.height());
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.item_code != "999"));
    // A3 is open, so its line has no closed header to join to
    assert!(!records
        .iter()
        .any(|r| r.origin_store == 1 && r.destination_store == 4));
    let total: f64 = records.iter().map(|r| r.quantity).sum();
    assert_eq!(total, 31.0);
}

#[test]
fn header_date_wins_over_line_date() {
    let source = MemorySource::new(
        vec![header(4, "D1", 7, date(2025, 3, 31), Status::Closed)],
        vec![line(4, "D1", "700", Some("K"), 1.0, date(2025, 3, 2))],
    );
    let loaded = load_records(
        &source,
        &params(Status::Closed, march_2025(), None),
        &StoreSet::new(13),
    )
    .unwrap();

    let joined = join_movements(&loaded.headers, &loaded.lines).unwrap();
    let destination = joined.column(transfer::DESTINATION_DATE).unwrap().str().unwrap();
    let origin = joined.column(transfer::ORIGIN_DATE).unwrap().str().unwrap();
    assert_eq!(destination.get(0), Some("2025-03-31"));
    assert_eq!(origin.get(0), Some("2025-03-02"));

    let records = transfers_from_frame(&joined, DateGranularity::Daily).unwrap();
    assert_eq!(records[0].destination_date, TimeBucket::Day(date(2025, 3, 31)));
}

#[test]
fn unparseable_dates_are_dropped() {
    let headers = df!(
        "LOJA" => [1i64, 1],
        "ROMANEIO" => ["A1", "A2"],
        "CADASTRO" => ["2025-03-05", "not a date"],
        "CADASTRO_CODIGO" => [2i64, 3],
        "SITUACAO" => ["FECHADO", "FECHADO"],
    )
    .unwrap();
    let lines = df!(
        "CADASTRO" => ["2025-03-05", "2025-03-05"],
        "LOJA" => [1i64, 1],
        "CODIGO_X" => ["100", "200"],
        "CODIGO_SEQUENCIA" => ["AX", "BX"],
        "QUANTIDADE" => [5.0, 6.0],
        "ROMANEIO" => ["A1", "A2"],
        "DESCRICAO" => ["a", "b"],
    )
    .unwrap();

    let joined = join_movements(&headers, &lines).unwrap();
    assert_eq!(joined.height(), 2);
    let records = transfers_from_frame(&joined, DateGranularity::Monthly).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].item_code, "100");
}

#[test]
fn missing_columns_are_reported() {
    let headers = df!("LOJA" => [1i64]).unwrap();
    let lines = df!("LOJA" => [1i64]).unwrap();
    let err = join_movements(&headers, &lines).unwrap_err();
    assert!(err.to_string().contains("Missing column"));
}
