mod common;

use std::collections::HashMap;

use common::*;
use etl_estoque::aggregation::{
    group_totals, pivot, restrict_to_top_n, summarize, top_n, AxisValue, Dimension, PivotSpec,
};
use etl_estoque::TransferRecord;
use proptest::prelude::*;

fn record_strategy() -> impl Strategy<Value = TransferRecord> {
    (-2i64..=16, -2i64..=16, "[0-9]{1,2}", 0.0f64..100.0).prop_map(
        |(origin, destination, code, qty)| record(origin, destination, &code, Some("A"), qty),
    )
}

fn text(s: &str) -> AxisValue {
    AxisValue::Text(s.to_string())
}

#[test]
fn pivot_sums_and_zero_fills() {
    let records = vec![
        record(1, 2, "100", Some("AX"), 5.0),
        record(1, 2, "100", Some("AX"), 3.0),
        record(1, 3, "200", None, 4.0),
    ];
    let table = pivot(
        &records,
        &PivotSpec::sum(Dimension::ItemLabel, Dimension::DestinationStore),
    );

    assert_eq!(table.rows, vec![text("100 - AX"), text("200 - (empty)")]);
    assert_eq!(table.columns, vec![AxisValue::Store(2), AxisValue::Store(3)]);
    assert_eq!(table.get(&text("100 - AX"), &AxisValue::Store(2)), Some(8.0));
    assert_eq!(table.get(&text("100 - AX"), &AxisValue::Store(3)), Some(0.0));
    assert_eq!(table.row_totals(), vec![8.0, 4.0]);
    assert_eq!(table.max_value(), 8.0);
}

#[test]
fn supplied_axis_keeps_order_and_skips_unknown_members() {
    let records = vec![record(20, 2, "100", None, 1.0), record(1, 2, "100", None, 2.0)];
    let spec = PivotSpec::sum(Dimension::OriginStore, Dimension::ItemCode)
        .with_row_axis(AxisValue::stores(&[3, 1]));
    let table = pivot(&records, &spec);
    assert_eq!(table.rows, vec![AxisValue::Store(3), AxisValue::Store(1)]);
    assert_eq!(table.values, vec![vec![0.0], vec![2.0]]);
}

#[test]
fn store_axis_stays_at_thirteen_with_stray_destinations() {
    let stores: Vec<i64> = (1..=13).collect();
    let records = vec![
        record(1, 99, "100", None, 4.0),
        record(1, 0, "100", None, 2.0),
        record(1, 5, "100", None, 1.0),
    ];
    let table = pivot(
        &records,
        &PivotSpec::sum(Dimension::DestinationStore, Dimension::Period)
            .with_row_axis(AxisValue::stores(&stores)),
    );
    assert_eq!(table.rows, AxisValue::stores(&stores));
    assert_eq!(table.row_totals().iter().sum::<f64>(), 1.0);
    assert_eq!(table.get(&AxisValue::Store(5), &table.columns[0]), Some(1.0));
}

#[test]
fn route_labels_use_arrow() {
    let totals = group_totals(&[record(1, 2, "100", None, 1.0)], Dimension::Route);
    assert_eq!(totals[0].0.to_string(), "1 → 2");
}

#[test]
fn top_n_ties_break_on_member_order() {
    let records = vec![
        record(1, 2, "300", None, 5.0),
        record(1, 2, "100", None, 5.0),
        record(1, 2, "200", None, 9.0),
    ];
    let ranked = top_n(&records, Dimension::ItemCode, 2);
    assert_eq!(ranked, vec![(text("200"), 9.0), (text("100"), 5.0)]);
}

#[test]
fn restrict_keeps_only_top_members() {
    let records = vec![
        record(1, 2, "100", None, 1.0),
        record(1, 3, "100", None, 1.0),
        record(1, 2, "200", None, 5.0),
        record(1, 2, "300", None, 0.5),
    ];
    let kept = restrict_to_top_n(&records, Dimension::ItemCode, 2);
    assert_eq!(kept.len(), 3);
    assert!(kept.iter().all(|r| r.item_code != "300"));
}

#[test]
fn summary_counts_items_and_stores() {
    assert!(summarize(&[]).is_none());
    let summary = summarize(&[
        record(1, 2, "100", Some("A"), 6.0),
        record(2, 3, "100", Some("B"), 2.0),
        record(2, 3, "100", Some("A"), 4.0),
    ])
    .unwrap();
    assert_eq!(summary.total_quantity, 12.0);
    assert_eq!(summary.mean_quantity, 4.0);
    assert_eq!(summary.record_count, 3);
    assert_eq!(summary.unique_items, 2);
    assert_eq!(summary.unique_origin_stores, 2);
}

#[test]
fn pivot_frame_has_label_column_plus_one_per_member() {
    let table = pivot(
        &[record(1, 2, "100", None, 1.0), record(1, 5, "100", None, 1.0)],
        &PivotSpec::sum(Dimension::OriginStore, Dimension::DestinationStore),
    );
    let df = table.to_frame().unwrap();
    assert_eq!(df.shape(), (1, 3));
    assert_eq!(df.get_column_names_str(), vec!["origin_store", "2", "5"]);
}

proptest! {
    #[test]
    fn top_n_is_bounded_and_never_skips_a_larger_total(
        records in proptest::collection::vec(record_strategy(), 0..40),
        n in 1usize..10,
    ) {
        let top = top_n(&records, Dimension::ItemCode, n);
        prop_assert!(top.len() <= n);

        let totals: HashMap<AxisValue, f64> =
            group_totals(&records, Dimension::ItemCode).into_iter().collect();
        let smallest_kept = top.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
        for (member, total) in &totals {
            if !top.iter().any(|(m, _)| m == member) {
                prop_assert!(*total <= smallest_kept);
            }
        }
    }

    #[test]
    fn complete_store_axis_always_has_every_store(
        records in proptest::collection::vec(record_strategy(), 0..40),
    ) {
        let stores: Vec<i64> = (1..=13).collect();
        let table = pivot(
            &records,
            &PivotSpec::sum(Dimension::DestinationStore, Dimension::Period)
                .with_row_axis(AxisValue::stores(&stores)),
        );
        prop_assert_eq!(&table.rows, &AxisValue::stores(&stores));
        prop_assert_eq!(table.values.len(), 13);

        let on_axis: f64 = records
            .iter()
            .filter(|r| (1..=13).contains(&r.destination_store))
            .map(|r| r.quantity)
            .sum();
        let pivoted: f64 = table.row_totals().iter().sum();
        prop_assert!((pivoted - on_axis).abs() < 1e-6);
    }
}
