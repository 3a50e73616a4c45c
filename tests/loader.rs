mod common;

use std::cell::RefCell;

use common::*;
use etl_estoque::loader::{
    filter_headers, headers_frame, lines_frame, load_records, SqlExecutor, SqlParam, SqlQuery,
    SqlSource,
};
use etl_estoque::model::StoreSet;
use etl_estoque::schema::{header, line};
use etl_estoque::{DateRange, EtlError, RecordSource, Status};
use polars::prelude::*;

/// Records every query and answers from the sample data.
#[derive(Default)]
struct RecordingExecutor {
    queries: RefCell<Vec<SqlQuery>>,
}

impl SqlExecutor for RecordingExecutor {
    fn execute(&self, query: &SqlQuery) -> Result<DataFrame, EtlError> {
        self.queries.borrow_mut().push(query.clone());
        if query.text.contains(line::TABLE) {
            lines_frame(&sample_lines())
        } else {
            headers_frame(&sample_headers())
        }
    }
}

#[test]
fn header_query_binds_every_value() {
    let range = march_2025();
    let query = SqlQuery::headers(&params(Status::Open, range, Some(7)));

    assert_eq!(
        query.params,
        vec![
            SqlParam::Int(4),
            SqlParam::Text("EM_ABERTO".into()),
            SqlParam::Date(range.start),
            SqlParam::Date(range.end),
            SqlParam::Int(7),
        ]
    );
    assert_eq!(query.text.matches('?').count(), query.params.len());
    assert!(!query.text.contains("EM_ABERTO"));
    assert!(!query.text.contains("2025"));
    assert!(query.text.contains("COMPRA_PEDIDO_LOJA IS NULL"));
}

#[test]
fn line_query_groups_by_line_key() {
    let query = SqlQuery::lines(&params(Status::Closed, march_2025(), None));
    assert_eq!(query.params.len(), 2);
    assert_eq!(query.text.matches('?').count(), 2);
    assert!(query.text.contains("SUM(ri.QUANTIDADE)"));
    assert!(query.text.contains("GROUP BY"));
    assert!(query.text.contains(line::TABLE));
}

#[test]
fn sql_source_loads_through_executor() {
    let source = SqlSource::new(RecordingExecutor::default());
    let loaded = load_records(
        &source,
        &params(Status::Closed, march_2025(), None),
        &StoreSet::new(13),
    )
    .unwrap();

    assert_eq!(source.executor().queries.borrow().len(), 2);
    // the executor ignores the filter, so every header comes back
    assert_eq!(loaded.headers.height(), sample_headers().len());
    // duplicate A1 / 100 / AX lines are summed
    assert_eq!(loaded.lines.height(), sample_lines().len() - 1);
}

#[test]
fn free_form_query_passes_through_unbound() {
    let source = SqlSource::new(RecordingExecutor::default());
    source.run_query("SELECT 1 FROM romaneios_dbf").unwrap();
    let queries = source.executor().queries.borrow();
    assert_eq!(queries[0].text, "SELECT 1 FROM romaneios_dbf");
    assert!(queries[0].params.is_empty());
}

#[test]
fn empty_range_never_reaches_the_source() {
    let source = SqlSource::new(RecordingExecutor::default());
    let backwards = DateRange::new(date(2025, 4, 1), date(2025, 3, 1));
    let loaded = load_records(
        &source,
        &params(Status::Closed, backwards, None),
        &StoreSet::new(13),
    )
    .unwrap();

    assert!(loaded.is_empty());
    assert!(source.executor().queries.borrow().is_empty());
}

#[test]
fn store_outside_range_matches_nothing() {
    let source = SqlSource::new(RecordingExecutor::default());
    for store in [0, 14, -1] {
        let loaded = load_records(
            &source,
            &params(Status::Closed, march_2025(), Some(store)),
            &StoreSet::new(13),
        )
        .unwrap();
        assert!(loaded.is_empty());
    }
    assert!(source.executor().queries.borrow().is_empty());
}

#[test]
fn memory_source_filters_like_the_server() {
    let loaded = load_records(
        &sample_source(),
        &params(Status::Closed, march_2025(), Some(1)),
        &StoreSet::new(13),
    )
    .unwrap();

    let ids = loaded.headers.column(header::MOVEMENT_ID).unwrap().str().unwrap();
    let ids: Vec<&str> = ids.into_iter().flatten().collect();
    assert_eq!(ids, ["A1", "A2"]);

    let stores = loaded.lines.column(line::STORE).unwrap().i64().unwrap();
    assert!(stores.into_iter().all(|s| s == Some(1)));
    let quantities = loaded.lines.column(line::QUANTITY).unwrap().f64().unwrap();
    assert_eq!(quantities.sum(), Some(8.0 + 10.0 + 7.0 + 6.0));
}

#[test]
fn eligibility_columns_exclude_non_transfers() {
    let raw = df!(
        "LOJA" => ["1", "1", "1", "1"],
        "ROMANEIO" => ["A1", "A2", "A3", "A4"],
        "CADASTRO" => ["2025-03-05", "2025-03-06", "2025-03-07", "2025-03-08"],
        "CADASTRO_CODIGO" => ["2", "2", "2", "2"],
        "SITUACAO" => ["FECHADO", "FECHADO", "FECHADO", "fechado"],
        "OPERACAO_CODIGO" => ["4", "5", "4", "4"],
        "COMPRA_PEDIDO_LOJA" => [None, None, Some("3"), None],
        "COMPRA_PEDIDO_CODIGO" => [None::<&str>, None, None, None],
        "ORIGEM_TIPO" => [None::<&str>, None, None, None],
    )
    .unwrap();

    let df = filter_headers(raw, &params(Status::Closed, march_2025(), None)).unwrap();
    let ids = df.column(header::MOVEMENT_ID).unwrap().str().unwrap();
    let ids: Vec<&str> = ids.into_iter().flatten().collect();
    assert_eq!(ids, ["A1", "A4"]);
}

#[test]
fn polars_sql_over_registered_tables() {
    let df = sample_source()
        .run_query("SELECT ROMANEIO FROM romaneios_dbf WHERE LOJA = 1")
        .unwrap();
    assert_eq!(df.height(), 3);

    let err = sample_source().run_query("SELECT * FROM missing_table").unwrap_err();
    assert!(matches!(err, EtlError::Query(_)));
}
