use chrono::{Local, NaiveDate};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::{load_config_path, DashboardConfig};
use crate::csv_source::CsvSource;
use crate::dashboard::{
    parse_store_selection, Dashboard, OverviewRequest, RedistributionRequest, StoreFlowRequest,
};
use crate::error::EtlError;
use crate::export::display_frame;
use crate::filter::FilterPredicate;
use crate::loader::LoadParams;
use crate::model::{DateGranularity, DateRange, Status};

fn date_range(start: &str, end: &str) -> PyResult<DateRange> {
    let parse = |s: &str| {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| PyValueError::new_err(format!("Invalid date '{s}': {e}")))
    };
    Ok(DateRange::new(parse(start)?, parse(end)?))
}

fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
    Ok(serde_json::to_string(value).map_err(EtlError::from)?)
}

/// Dashboards over CSV exports of the movement tables.
///
/// Responses are returned as JSON strings; tables as polars DataFrames.
#[pyclass]
pub struct EtlDashboard {
    inner: Dashboard<CsvSource>,
}

#[pymethods]
impl EtlDashboard {
    #[new]
    #[pyo3(signature = (base_path=None, config_path=None))]
    fn new(base_path: Option<String>, config_path: Option<String>) -> PyResult<Self> {
        let mut config = match config_path {
            Some(path) => load_config_path(path)?,
            None => DashboardConfig::default(),
        };
        if let Some(path) = base_path {
            config.data.base_path = path.into();
        }
        let source = CsvSource::from_config(&config.data);
        Ok(Self {
            inner: Dashboard::new(source, config)?,
        })
    }

    /// Joined transfer records as a display table.
    #[pyo3(signature = (status, start, end, store="", granularity="monthly"))]
    fn transfers(
        &mut self,
        status: &str,
        start: &str,
        end: &str,
        store: &str,
        granularity: &str,
    ) -> PyResult<PyDataFrame> {
        let (selection, _) = parse_store_selection(store);
        let params = LoadParams {
            status: status.parse::<Status>()?,
            range: date_range(start, end)?,
            store: selection.store(),
        };
        let records = self
            .inner
            .transfers(&params, granularity.parse::<DateGranularity>()?)?;
        Ok(PyDataFrame(display_frame(&records)?))
    }

    /// `predicates` is a list of (item code, sub-code) form pairs.
    #[pyo3(signature = (status, start, end, store="", granularity="monthly", predicates=Vec::new()))]
    fn overview(
        &mut self,
        status: &str,
        start: &str,
        end: &str,
        store: &str,
        granularity: &str,
        predicates: Vec<(String, String)>,
    ) -> PyResult<String> {
        let (selection, notice) = parse_store_selection(store);
        let request = OverviewRequest {
            status: status.parse()?,
            range: date_range(start, end)?,
            store: selection,
            granularity: granularity.parse()?,
            predicates: predicates
                .iter()
                .map(|(code, sub)| FilterPredicate::from_form(code, sub))
                .collect(),
        };
        let mut response = self.inner.transfer_overview(&request)?;
        if let Some(notice) = notice {
            response.notices.insert(0, notice);
        }
        to_json(&response)
    }

    #[pyo3(signature = (status, start, end, store="", item_code="", item_subcode=""))]
    fn store_flow(
        &mut self,
        status: &str,
        start: &str,
        end: &str,
        store: &str,
        item_code: &str,
        item_subcode: &str,
    ) -> PyResult<String> {
        let (selection, notice) = parse_store_selection(store);
        let request = StoreFlowRequest {
            status: status.parse()?,
            range: date_range(start, end)?,
            store: selection,
            item_code: item_code.to_string(),
            item_subcode: item_subcode.to_string(),
        };
        let mut response = self.inner.store_flow(&request)?;
        if let Some(notice) = notice {
            response.notices.insert(0, notice);
        }
        to_json(&response)
    }

    /// Returns `(filename, csv_text)` for the store flow table.
    #[pyo3(signature = (status, start, end, store="", item_code="", item_subcode=""))]
    fn export_store_flow(
        &mut self,
        status: &str,
        start: &str,
        end: &str,
        store: &str,
        item_code: &str,
        item_subcode: &str,
    ) -> PyResult<(String, String)> {
        let (selection, _) = parse_store_selection(store);
        let request = StoreFlowRequest {
            status: status.parse()?,
            range: date_range(start, end)?,
            store: selection,
            item_code: item_code.to_string(),
            item_subcode: item_subcode.to_string(),
        };
        let response = self.inner.store_flow(&request)?;
        let export = self
            .inner
            .export(&response.records, Local::now().naive_local())?;
        let text = export.as_text()?.to_string();
        Ok((export.filename, text))
    }

    #[pyo3(signature = (status, start, end, origin_store, search=""))]
    fn redistribution(
        &mut self,
        status: &str,
        start: &str,
        end: &str,
        origin_store: i64,
        search: &str,
    ) -> PyResult<String> {
        let request = RedistributionRequest {
            status: status.parse()?,
            range: date_range(start, end)?,
            origin_store,
            search: search.to_string(),
        };
        to_json(&self.inner.redistribution(&request)?)
    }

    fn query(&self, sql: &str) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.custom_query(sql)?))
    }

    fn invalidate_cache(&mut self) {
        self.inner.invalidate_cache();
    }
}

#[pymodule]
fn etl_estoque(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<EtlDashboard>()?;
    m.add("CLOSED", crate::schema::status::CLOSED)?;
    m.add("OPEN", crate::schema::status::OPEN)?;
    m.add("EMPTY_MARKER", crate::filter::EMPTY_MARKER)?;
    Ok(())
}
