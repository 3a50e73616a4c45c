//! Dashboard configuration, loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! store_count = 13
//! overview_top_n = 7
//! ranking_top_n = 10
//!
//! [colors]
//! primary_cutoff = 0.6
//! secondary_cutoff = 0.9
//!
//! [data]
//! base_path = "data"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EtlError;
use crate::model::StoreSet;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Stores are numbered 1..=store_count.
    pub store_count: i64,
    /// Items kept by the transfer overview when no item code is filtered.
    pub overview_top_n: usize,
    /// Items or slices kept by ranking charts.
    pub ranking_top_n: usize,
    /// Upper bound on (item code, sub-code) pairs per request.
    pub max_predicates: usize,
    /// Lifetime of a cached query result.
    pub cache_ttl_secs: u64,
    pub colors: ColorConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub bar: String,
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    /// Fraction of ranked entries painted with `primary`.
    pub primary_cutoff: f64,
    /// Cumulative fraction painted with `primary` or `secondary`.
    pub secondary_cutoff: f64,
    /// Per-category colours for ranked items, reused cyclically.
    pub palette: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub base_path: PathBuf,
    pub headers_file: String,
    pub lines_file: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            store_count: 13,
            overview_top_n: 7,
            ranking_top_n: 10,
            max_predicates: 10,
            cache_ttl_secs: 300,
            colors: ColorConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            bar: "skyblue".to_string(),
            primary: "#1f77b4".to_string(),
            secondary: "#2ca02c".to_string(),
            accent: "#ff7f0e".to_string(),
            primary_cutoff: 0.6,
            secondary_cutoff: 0.9,
            // no green or red, so the palette never collides with the bands
            palette: [
                "#1f77b4", "#ff7f0e", "#9467bd", "#17becf", "#bcbd22", "#8c564b", "#e377c2",
                "#7f7f7f", "#aec7e8", "#ffbb78",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            headers_file: "romaneios.csv".to_string(),
            lines_file: "romaneios_itens.csv".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn stores(&self) -> StoreSet {
        StoreSet::new(self.store_count)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), EtlError> {
        if self.store_count < 1 {
            return Err(EtlError::Config(format!(
                "store_count must be positive, got {}",
                self.store_count
            )));
        }
        if self.overview_top_n == 0 || self.ranking_top_n == 0 {
            return Err(EtlError::Config("top-N limits must be at least 1".into()));
        }
        if self.max_predicates == 0 {
            return Err(EtlError::Config("max_predicates must be at least 1".into()));
        }
        let c = &self.colors;
        if !(0.0..=1.0).contains(&c.primary_cutoff)
            || !(0.0..=1.0).contains(&c.secondary_cutoff)
            || c.primary_cutoff > c.secondary_cutoff
        {
            return Err(EtlError::Config(format!(
                "colour cutoffs must satisfy 0 <= primary ({}) <= secondary ({}) <= 1",
                c.primary_cutoff, c.secondary_cutoff
            )));
        }
        if c.palette.is_empty() {
            return Err(EtlError::Config("palette cannot be empty".into()));
        }
        Ok(())
    }
}

/// Parse and validate a configuration from a TOML string.
pub fn load_config_str(s: &str) -> Result<DashboardConfig, EtlError> {
    let cfg: DashboardConfig = toml::from_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Parse and validate a configuration file.
pub fn load_config_path<P: AsRef<Path>>(path: P) -> Result<DashboardConfig, EtlError> {
    let s = std::fs::read_to_string(path)?;
    load_config_str(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.stores().ids().len(), 13);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn partial_document_overrides_fields() {
        let cfg = load_config_str(
            r#"
            store_count = 12
            ranking_top_n = 5

            [colors]
            primary = "navy"

            [data]
            base_path = "/srv/etl"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.store_count, 12);
        assert_eq!(cfg.ranking_top_n, 5);
        assert_eq!(cfg.overview_top_n, 7);
        assert_eq!(cfg.colors.primary, "navy");
        assert_eq!(cfg.colors.secondary, "#2ca02c");
        assert_eq!(cfg.data.base_path, PathBuf::from("/srv/etl"));
        assert_eq!(cfg.data.lines_file, "romaneios_itens.csv");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = load_config_str("stores = 3").unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn unordered_cutoffs_are_rejected() {
        let err = load_config_str(
            r#"
            [colors]
            primary_cutoff = 0.9
            secondary_cutoff = 0.5
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cutoffs"));
    }

    #[test]
    fn non_positive_store_count_is_rejected() {
        assert!(load_config_str("store_count = 0").is_err());
    }
}
