pub mod aggregation;
pub mod cache;
pub mod config;
pub mod csv_source;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod filter;
pub mod join;
pub mod loader;
pub mod model;
pub mod schema;
pub mod visualization;

#[cfg(feature = "python")]
mod python;

pub use config::{load_config_path, load_config_str, DashboardConfig};
pub use csv_source::CsvSource;
pub use dashboard::{
    Dashboard, Notice, OverviewRequest, RedistributionRequest, StoreFlowRequest,
};
pub use error::EtlError;
pub use filter::{apply_filters, FilterPredicate, SubcodeFilter};
pub use loader::{load_records, LoadParams, MemorySource, RecordSource};
pub use model::{
    DateGranularity, DateRange, MovementHeader, MovementLine, Status, StoreSelection,
    TransferRecord,
};
