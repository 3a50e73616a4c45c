use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Config: {0}")]
    Config(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),
}

impl EtlError {
    /// Message shown to the dashboard user.
    ///
    /// Source and processing failures collapse into one generic message; the
    /// detailed error is only logged.
    pub fn user_message(&self) -> String {
        match self {
            EtlError::Validation(msg) => msg.clone(),
            EtlError::Config(msg) => format!("Invalid configuration: {msg}"),
            _ => "Failed to process data. Check the database connection and the \
                  parameters provided."
                .to_string(),
        }
    }
}

impl From<toml::de::Error> for EtlError {
    fn from(err: toml::de::Error) -> Self {
        EtlError::Config(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<EtlError> for pyo3::PyErr {
    fn from(err: EtlError) -> pyo3::PyErr {
        match err {
            EtlError::Validation(msg) => pyo3::exceptions::PyValueError::new_err(msg),
            other => {
                tracing::error!(error = %other, "request failed");
                pyo3::exceptions::PyRuntimeError::new_err(other.user_message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_failures_hide_their_detail() {
        let io = EtlError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "/srv/data/romaneios.csv",
        ));
        assert!(io.to_string().contains("/srv/data"));
        assert!(!io.user_message().contains("/srv/data"));
        assert!(io.user_message().starts_with("Failed to process data"));

        let query = EtlError::Query("no such table: romaneios_dbf".into());
        assert!(!query.user_message().contains("romaneios_dbf"));
    }

    #[test]
    fn validation_and_config_keep_their_message() {
        assert_eq!(
            EtlError::Validation("Query cannot be empty".into()).user_message(),
            "Query cannot be empty"
        );
        assert_eq!(
            EtlError::Config("store_count must be positive".into()).user_message(),
            "Invalid configuration: store_count must be positive"
        );
    }
}
