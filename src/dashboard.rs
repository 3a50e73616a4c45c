//! Request/response dashboards over a [`RecordSource`].
//!
//! Each request runs the whole pipeline (load, join, filter, aggregate,
//! present) and returns a serializable response. Loaded records are served
//! from a [`QueryCache`] while fresh.

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::aggregation::{
    group_totals, pivot, restrict_to_top_n, summarize, top_n, AxisValue, Dimension, PivotSpec,
    Summary,
};
use crate::cache::QueryCache;
use crate::config::DashboardConfig;
use crate::error::EtlError;
use crate::export::{export_csv, CsvExport};
use crate::filter::{apply_filters, has_item_code_filter, FilterPredicate, SubcodeFilter};
use crate::join::join_records;
use crate::loader::{load_records, LoadParams, LoadedRecords, RecordSource};
use crate::model::{
    DateGranularity, DateRange, Status, StoreId, StoreSelection, TransferRecord,
};
use crate::visualization::{
    bar_chart, grouped_bar_chart, heatmap, pie_chart, BarChart, BarOrder, Chart,
    GroupedBarChart, Heatmap, PieChart, Titles,
};

/// Informational message attached to a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notice {
    /// The request matched no records.
    NoData,
    /// Input was corrected or partially ignored.
    Warning(String),
    /// The request failed; carries the user-facing message.
    Error(String),
}

impl Notice {
    pub fn from_error(err: &EtlError) -> Self {
        error!(error = %err, "dashboard request failed");
        Notice::Error(err.user_message())
    }
}

/// Parse the store selector, falling back to all stores on malformed input.
pub fn parse_store_selection(input: &str) -> (StoreSelection, Option<Notice>) {
    match input.parse::<StoreSelection>() {
        Ok(selection) => (selection, None),
        Err(err) => {
            warn!(input, "invalid store selection, using all stores");
            let message = match err {
                EtlError::Validation(msg) => msg,
                other => other.to_string(),
            };
            (
                StoreSelection::All,
                Some(Notice::Warning(format!("{message}; showing all stores"))),
            )
        }
    }
}

// ── Requests and responses ──────────────────────────────────────────────────

/// Transfer overview: item filters, period buckets and top items.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverviewRequest {
    pub status: Status,
    pub range: DateRange,
    #[serde(default)]
    pub store: StoreSelection,
    #[serde(default)]
    pub granularity: DateGranularity,
    #[serde(default)]
    pub predicates: Vec<FilterPredicate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewResponse {
    pub notices: Vec<Notice>,
    /// True when at least one predicate named an item code.
    pub item_filtered: bool,
    pub records: Vec<TransferRecord>,
    pub bar: Chart<BarChart>,
    pub heatmap: Chart<Heatmap>,
    pub pie: Chart<PieChart>,
    pub summary: Option<Summary>,
}

/// Outgoing flow of one store, or totals per store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreFlowRequest {
    pub status: Status,
    pub range: DateRange,
    #[serde(default)]
    pub store: StoreSelection,
    #[serde(default)]
    pub item_code: String,
    #[serde(default)]
    pub item_subcode: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum FlowCharts {
    SingleStore {
        store: StoreId,
        /// Item label × destination store, top items only.
        outgoing: Chart<GroupedBarChart>,
        product_totals: Chart<BarChart>,
        destination_totals: Chart<BarChart>,
    },
    AllStores {
        origin_totals: Chart<BarChart>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreFlowResponse {
    pub notices: Vec<Notice>,
    pub records: Vec<TransferRecord>,
    pub summary: Option<Summary>,
    pub charts: FlowCharts,
}

/// Where the items leaving one store end up.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RedistributionRequest {
    pub status: Status,
    pub range: DateRange,
    pub origin_store: StoreId,
    /// Item-code search applied to the table only.
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedistributionResponse {
    pub notices: Vec<Notice>,
    pub origin_store: StoreId,
    pub records: Vec<TransferRecord>,
    pub summary: Option<Summary>,
    /// Top items per destination store.
    pub items_by_destination: Chart<GroupedBarChart>,
    pub destination_share: Chart<PieChart>,
    /// Destination store × month over every store.
    pub incoming_heatmap: Chart<Heatmap>,
    /// Origin store × month over every store.
    pub outgoing_heatmap: Chart<Heatmap>,
}

// ── Dashboard ───────────────────────────────────────────────────────────────

pub struct Dashboard<S> {
    source: S,
    config: DashboardConfig,
    cache: QueryCache,
}

impl<S: RecordSource> Dashboard<S> {
    pub fn new(source: S, config: DashboardConfig) -> Result<Self, EtlError> {
        config.validate()?;
        let cache = QueryCache::new(config.cache_ttl());
        Ok(Self {
            source,
            config,
            cache,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    /// Loaded records for `params`, from the cache when fresh.
    pub fn load(&mut self, params: &LoadParams) -> Result<LoadedRecords, EtlError> {
        if let Some(hit) = self.cache.get(params) {
            return Ok(hit.clone());
        }
        let loaded = load_records(&self.source, params, &self.config.stores())?;
        self.cache.insert(*params, loaded.clone());
        Ok(loaded)
    }

    /// Joined transfer records for `params`.
    pub fn transfers(
        &mut self,
        params: &LoadParams,
        granularity: DateGranularity,
    ) -> Result<Vec<TransferRecord>, EtlError> {
        let loaded = self.load(params)?;
        join_records(&loaded, granularity)
    }

    fn limit_predicates(
        &self,
        predicates: &[FilterPredicate],
        notices: &mut Vec<Notice>,
    ) -> Vec<FilterPredicate> {
        let max = self.config.max_predicates;
        if predicates.len() > max {
            warn!(given = predicates.len(), max, "too many item filters, extra ones ignored");
            notices.push(Notice::Warning(format!(
                "At most {max} item filters are applied; {} ignored",
                predicates.len() - max
            )));
        }
        predicates.iter().take(max).cloned().collect()
    }

    fn store_axis(&self) -> Vec<AxisValue> {
        AxisValue::stores(&self.config.stores().ids())
    }

    pub fn transfer_overview(
        &mut self,
        request: &OverviewRequest,
    ) -> Result<OverviewResponse, EtlError> {
        let mut notices = Vec::new();
        let predicates = self.limit_predicates(&request.predicates, &mut notices);
        let params = LoadParams {
            status: request.status,
            range: request.range,
            store: request.store.store(),
        };

        let records = self.transfers(&params, request.granularity)?;
        let item_filtered = has_item_code_filter(&predicates);
        let mut filtered = apply_filters(&records, &predicates);
        if !item_filtered {
            filtered = restrict_to_top_n(&filtered, Dimension::ItemLabel, self.config.overview_top_n);
        }

        let colors = &self.config.colors;
        let (bar, heat) = if item_filtered {
            (
                bar_chart(
                    Titles {
                        title: "Transfers between stores",
                        x_label: "Total quantity",
                        y_label: "Origin → Destination",
                    },
                    &group_totals(&filtered, Dimension::Route),
                    BarOrder::Ascending,
                    colors,
                ),
                heatmap(
                    Titles {
                        title: "Transfers between stores by period",
                        x_label: "Period",
                        y_label: "Origin → Destination",
                    },
                    &pivot(&filtered, &PivotSpec::sum(Dimension::Route, Dimension::Period)),
                ),
            )
        } else {
            (
                bar_chart(
                    Titles {
                        title: "Quantity by item",
                        x_label: "Total quantity",
                        y_label: "Item",
                    },
                    &group_totals(&filtered, Dimension::ItemLabel),
                    BarOrder::Ascending,
                    colors,
                ),
                heatmap(
                    Titles {
                        title: "Quantity by item and period",
                        x_label: "Period",
                        y_label: "Item",
                    },
                    &pivot(&filtered, &PivotSpec::sum(Dimension::ItemLabel, Dimension::Period)),
                ),
            )
        };
        let pie = pie_chart(
            "Share by destination store",
            &group_totals(&filtered, Dimension::DestinationStore),
            self.config.ranking_top_n,
            colors,
        );

        if filtered.is_empty() {
            notices.push(Notice::NoData);
        }
        info!(records = filtered.len(), item_filtered, "transfer overview built");

        Ok(OverviewResponse {
            notices,
            item_filtered,
            summary: summarize(&filtered),
            records: filtered,
            bar,
            heatmap: heat,
            pie,
        })
    }

    pub fn store_flow(&mut self, request: &StoreFlowRequest) -> Result<StoreFlowResponse, EtlError> {
        let mut notices = Vec::new();
        let params = LoadParams {
            status: request.status,
            range: request.range,
            store: request.store.store(),
        };
        let records = self.transfers(&params, DateGranularity::Daily)?;
        // One form pair: a sub-code on its own still narrows the records.
        let predicate = FilterPredicate::from_form(&request.item_code, &request.item_subcode);
        let filtered: Vec<TransferRecord> = if predicate.is_blank() {
            records
        } else {
            records.into_iter().filter(|r| predicate.matches(r)).collect()
        };

        let n = self.config.ranking_top_n;
        let colors = &self.config.colors;
        let charts = match request.store {
            StoreSelection::Store(store) => {
                let ranked = top_n(&filtered, Dimension::ItemLabel, n);
                let row_axis: Vec<AxisValue> = ranked.iter().map(|(m, _)| m.clone()).collect();
                let outgoing = pivot(
                    &restrict_to_top_n(&filtered, Dimension::ItemLabel, n),
                    &PivotSpec::sum(Dimension::ItemLabel, Dimension::DestinationStore)
                        .with_row_axis(row_axis)
                        .with_column_axis(self.store_axis()),
                );
                let outgoing = if ranked.is_empty() {
                    Chart::NoData
                } else {
                    grouped_bar_chart(
                        Titles {
                            title: "Outgoing items by destination",
                            x_label: "Destination store",
                            y_label: "Total quantity",
                        },
                        &outgoing,
                        colors,
                    )
                };
                FlowCharts::SingleStore {
                    store,
                    outgoing,
                    product_totals: bar_chart(
                        Titles {
                            title: "Total by item",
                            x_label: "Total quantity",
                            y_label: "Item",
                        },
                        &ranked,
                        BarOrder::Descending,
                        colors,
                    ),
                    destination_totals: bar_chart(
                        Titles {
                            title: "Flow by destination store",
                            x_label: "Total quantity",
                            y_label: "Destination store",
                        },
                        &group_totals(&filtered, Dimension::DestinationStore),
                        BarOrder::Descending,
                        colors,
                    ),
                }
            }
            StoreSelection::All => FlowCharts::AllStores {
                origin_totals: bar_chart(
                    Titles {
                        title: "Quantity by origin store",
                        x_label: "Origin store",
                        y_label: "Total quantity",
                    },
                    &group_totals(&filtered, Dimension::OriginStore),
                    BarOrder::Member,
                    colors,
                ),
            },
        };

        if filtered.is_empty() {
            notices.push(Notice::NoData);
        }
        info!(records = filtered.len(), store = ?request.store, "store flow built");

        Ok(StoreFlowResponse {
            notices,
            summary: summarize(&filtered),
            records: filtered,
            charts,
        })
    }

    pub fn redistribution(
        &mut self,
        request: &RedistributionRequest,
    ) -> Result<RedistributionResponse, EtlError> {
        let mut notices = Vec::new();
        if !self.config.stores().contains(request.origin_store) {
            warn!(store = request.origin_store, "origin store outside the valid range");
        }
        let params = LoadParams {
            status: request.status,
            range: request.range,
            store: None,
        };
        let all = self.transfers(&params, DateGranularity::Monthly)?;
        let outgoing: Vec<TransferRecord> = all
            .iter()
            .filter(|r| r.origin_store == request.origin_store)
            .cloned()
            .collect();

        let table = if request.search.trim().is_empty() {
            outgoing.clone()
        } else {
            apply_filters(&outgoing, &[FilterPredicate::new(&request.search, SubcodeFilter::Any)])
        };

        let n = self.config.ranking_top_n;
        let colors = &self.config.colors;
        let ranked: Vec<AxisValue> = top_n(&outgoing, Dimension::ItemCode, n)
            .into_iter()
            .map(|(m, _)| m)
            .collect();
        let items_by_destination = if ranked.is_empty() {
            Chart::NoData
        } else {
            grouped_bar_chart(
                Titles {
                    title: "Items by destination store (top items)",
                    x_label: "Destination store",
                    y_label: "Total quantity",
                },
                &pivot(
                    &restrict_to_top_n(&outgoing, Dimension::ItemCode, n),
                    &PivotSpec::sum(Dimension::ItemCode, Dimension::DestinationStore)
                        .with_row_axis(ranked)
                        .with_column_axis(self.store_axis()),
                ),
                colors,
            )
        };
        let destination_share = pie_chart(
            "Share by destination store",
            &group_totals(&outgoing, Dimension::DestinationStore),
            usize::MAX,
            colors,
        );

        let incoming_heatmap = heatmap(
            Titles {
                title: "Items entering each destination store by month",
                x_label: "Month",
                y_label: "Destination store",
            },
            &pivot(
                &all,
                &PivotSpec::sum(Dimension::DestinationStore, Dimension::Period)
                    .with_row_axis(self.store_axis()),
            ),
        );
        let outgoing_heatmap = heatmap(
            Titles {
                title: "Items leaving each origin store by month",
                x_label: "Month",
                y_label: "Origin store",
            },
            &pivot(
                &all,
                &PivotSpec::sum(Dimension::OriginStore, Dimension::Period)
                    .with_row_axis(self.store_axis()),
            ),
        );

        if outgoing.is_empty() {
            notices.push(Notice::NoData);
        }
        info!(
            origin_store = request.origin_store,
            records = outgoing.len(),
            "redistribution analysis built"
        );

        Ok(RedistributionResponse {
            notices,
            origin_store: request.origin_store,
            summary: summarize(&outgoing),
            records: table,
            items_by_destination,
            destination_share,
            incoming_heatmap,
            outgoing_heatmap,
        })
    }

    /// Run a user-supplied read query as-is.
    pub fn custom_query(&self, query: &str) -> Result<DataFrame, EtlError> {
        if query.trim().is_empty() {
            return Err(EtlError::Validation("Query cannot be empty".into()));
        }
        let df = self.source.run_query(query)?;
        info!(rows = df.height(), "custom query executed");
        Ok(df)
    }

    /// CSV download of the displayed records.
    pub fn export(
        &self,
        records: &[TransferRecord],
        generated_at: NaiveDateTime,
    ) -> Result<CsvExport, EtlError> {
        export_csv(records, generated_at)
    }
}
