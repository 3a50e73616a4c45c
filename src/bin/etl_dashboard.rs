use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{prelude::*, EnvFilter};

use etl_estoque::dashboard::{parse_store_selection, Notice};
use etl_estoque::{
    load_config_path, CsvSource, Dashboard, DashboardConfig, DateGranularity, DateRange,
    FilterPredicate, OverviewRequest, RedistributionRequest, Status, StoreFlowRequest,
};

#[derive(Parser)]
#[command(version, about = "Inventory transfer dashboards over CSV exports")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the header and line CSV files; overrides the config.
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct Period {
    /// FECHADO or EM_ABERTO.
    #[arg(long, default_value = "FECHADO")]
    status: Status,
    #[arg(long)]
    start: NaiveDate,
    #[arg(long)]
    end: NaiveDate,
}

impl Period {
    fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Transfer overview with item filters.
    Overview {
        #[command(flatten)]
        period: Period,
        /// Store number, or "all".
        #[arg(long, default_value = "all")]
        store: String,
        #[arg(long, default_value = "monthly")]
        granularity: DateGranularity,
        /// Item filter as CODE or CODE:SUBCODE; repeatable. Use "(empty)" as
        /// the sub-code to select items without one.
        #[arg(long = "item", value_name = "CODE[:SUBCODE]")]
        items: Vec<String>,
    },
    /// Outgoing flow of one store, or totals per store.
    Flow {
        #[command(flatten)]
        period: Period,
        #[arg(long, default_value = "all")]
        store: String,
        #[arg(long, default_value = "")]
        item_code: String,
        #[arg(long, default_value = "")]
        item_subcode: String,
        /// Write the table as CSV into this directory.
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,
    },
    /// Redistribution of the items leaving one store.
    Redistribution {
        #[command(flatten)]
        period: Period,
        #[arg(long)]
        origin_store: i64,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Run a free-form SQL query over romaneios_dbf and romaneios_itens_dbf.
    Query { sql: String },
}

fn parse_item(raw: &str) -> FilterPredicate {
    match raw.split_once(':') {
        Some((code, sub)) => FilterPredicate::from_form(code, sub),
        None => FilterPredicate::from_form(raw, ""),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data.base_path = dir;
    }
    let source = CsvSource::from_config(&config.data);
    let mut dashboard = Dashboard::new(source, config)?;

    match cli.cmd {
        Cmd::Overview {
            period,
            store,
            granularity,
            items,
        } => {
            let (store, notice) = parse_store_selection(&store);
            let request = OverviewRequest {
                status: period.status,
                range: period.range(),
                store,
                granularity,
                predicates: items.iter().map(|i| parse_item(i)).collect(),
            };
            let mut response = dashboard.transfer_overview(&request)?;
            if let Some(notice) = notice {
                response.notices.insert(0, notice);
            }
            print_json(&response)?;
        }
        Cmd::Flow {
            period,
            store,
            item_code,
            item_subcode,
            export,
        } => {
            let (store, notice) = parse_store_selection(&store);
            let request = StoreFlowRequest {
                status: period.status,
                range: period.range(),
                store,
                item_code,
                item_subcode,
            };
            let mut response = dashboard.store_flow(&request)?;
            if let Some(notice) = notice {
                response.notices.insert(0, notice);
            }
            if let Some(dir) = export {
                let csv = dashboard.export(&response.records, Local::now().naive_local())?;
                let path = dir.join(&csv.filename);
                std::fs::write(&path, &csv.bytes)
                    .with_context(|| format!("writing {}", path.display()))?;
                tracing::info!(path = %path.display(), "table exported");
            }
            print_json(&response)?;
        }
        Cmd::Redistribution {
            period,
            origin_store,
            search,
        } => {
            let request = RedistributionRequest {
                status: period.status,
                range: period.range(),
                origin_store,
                search,
            };
            print_json(&dashboard.redistribution(&request)?)?;
        }
        Cmd::Query { sql } => {
            let df = dashboard.custom_query(&sql)?;
            println!("{df}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        let message = match err.downcast_ref::<etl_estoque::EtlError>() {
            Some(etl) => Notice::from_error(etl),
            None => Notice::Error(err.to_string()),
        };
        print_json(&message)?;
        return Err(err);
    }
    Ok(())
}
